//! Error handling module for storagecfg
//!
//! `WiringError` is the structured taxonomy produced while validating,
//! resolving and expanding a document. Every variant names the offending
//! identifier or field so an outer tool can format it for humans.
//! Replay and routing errors live next to the registry.

use thiserror::Error;

use crate::identifier::Identifier;
use crate::types::{ComponentKind, ComponentType, ValueKind};

/// Validation and resolution errors.
///
/// All of these are raised before any `InitOperation` is emitted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WiringError {
    /// A required key is absent from the node
    #[error("Component '{component}' is missing required field '{field}'")]
    MissingField { component: String, field: String },

    /// A present key holds a value of the wrong kind
    #[error("Field '{field}' has invalid value '{value}': expected {expected}")]
    InvalidValue {
        field: String,
        value: String,
        expected: ValueKind,
    },

    /// A discriminator outside the known set
    #[error("Unsupported {field} '{value}' (supported: {})", .supported.join(", "))]
    UnsupportedVariant {
        field: String,
        value: String,
        supported: Vec<String>,
    },

    /// A key the schema does not declare
    #[error("Unknown field '{field}' for component '{component}'")]
    UnknownField {
        component: ComponentType,
        field: String,
    },

    /// A top-level document key that names no component
    #[error("Unknown component '{key}'")]
    UnknownComponent { key: String },

    /// A dependency reference naming an identifier no component declares
    #[error("Component '{component}' references unknown ID '{identifier}' (field '{field}')")]
    UnresolvedReference {
        identifier: Identifier,
        component: Identifier,
        field: String,
    },

    /// A dependency reference naming a component of the wrong type
    #[error(
        "Component '{component}' field '{field}' must reference a {expected}, but '{identifier}' is a {found}"
    )]
    IncompatibleReference {
        component: Identifier,
        field: String,
        identifier: Identifier,
        expected: ComponentType,
        found: ComponentType,
    },

    /// Components depending on each other in a loop
    #[error("Cyclic dependency: {}", join_cycle(.cycle))]
    CyclicDependency { cycle: Vec<Identifier> },

    /// The same identifier declared twice
    #[error("ID '{identifier}' is declared more than once")]
    DuplicateIdentifier { identifier: Identifier },

    /// Two storage front-ends mounted under the same prefix
    #[error("Path prefix '{prefix}' is used by both '{first}' and '{second}'")]
    DuplicatePathPrefix {
        prefix: String,
        first: Identifier,
        second: Identifier,
    },

    /// An error inside one entry of a component list
    #[error("{component}[{index}]: {source}")]
    InEntry {
        component: ComponentKind,
        index: usize,
        source: Box<WiringError>,
    },
}

impl WiringError {
    /// Strip `InEntry` wrappers and return the underlying error.
    pub fn root_cause(&self) -> &WiringError {
        let mut current = self;
        while let WiringError::InEntry { source, .. } = current {
            current = source;
        }
        current
    }

    /// Wrap this error with the position of the list entry that produced it.
    pub fn in_entry(self, component: ComponentKind, index: usize) -> Self {
        WiringError::InEntry {
            component,
            index,
            source: Box::new(self),
        }
    }
}

fn join_cycle(cycle: &[Identifier]) -> String {
    cycle
        .iter()
        .map(Identifier::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}
