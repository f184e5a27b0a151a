//! storagecfg Library
//!
//! Compiles declarative storage component documents (SD/MMC host, card and
//! path-prefixed storage front-ends) into an ordered initialization sequence.

pub mod catalog;
pub mod cli;
pub mod config;
pub mod document;
pub mod engine;
pub mod error;
pub mod identifier;
pub mod logic;
pub mod node;
pub mod registry;
pub mod schema;
pub mod types;

// Re-export main types for convenience
pub use catalog::SchemaCatalog;
pub use config::{CompileOptions, PrefixPolicy};
pub use document::{compile, compile_with, CompiledDocument};
pub use error::WiringError;
pub use identifier::{Identifier, IdentifierRegistry};
pub use node::ConfigNode;
pub use registry::{ComponentRegistry, Handle, MountTable, RegistryError, RouteError};
pub use schema::{
    ComponentDescriptor, ComponentSchema, DependencyRef, FieldSpec, FieldValue, SchemaBuilder,
    SchemaError, validate,
};
pub use types::{ComponentKind, ComponentType, Platform, Role, ValueKind};

// Pipeline stages
pub use engine::codegen::render_cpp;
pub use engine::emitter::{emit, InitOperation, InitSequence};
pub use logic::coordinator::{expand, expand_builtin, expand_each};
pub use logic::resolver::{resolve, ResolvedPlan};
