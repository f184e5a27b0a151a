//! Logic modules: from validated descriptors to an ordered component set.
//!
//! # Modules
//!
//! - `coordinator`: expands component lists into descriptors, entry by entry
//! - `resolver`: dependency graph and stable instantiation order

pub mod coordinator;
pub mod resolver;
