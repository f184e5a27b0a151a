//! Engine modules: turn a resolved plan into an initialization sequence.
//!
//! The engine layer sits between resolution (what exists and in which order)
//! and whatever consumes the output (a code renderer or the component
//! registry).
//!
//! # Modules
//!
//! - `emitter`: `ResolvedPlan` -> ordered `InitOperation` sequence
//! - `codegen`: `InitSequence` -> C++ statements

pub mod codegen;
pub mod emitter;
