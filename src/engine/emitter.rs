//! Instantiation Emitter
//!
//! Walks a `ResolvedPlan` and produces the ordered `InitOperation` sequence
//! that brings every component to life.
//!
//! # Per-component operations
//!
//! | Step | Operation | Count |
//! |------|-----------|-------|
//! | 1 | Construct | one |
//! | 2 | Register  | one |
//! | 3 | Configure | one per descriptor field, in schema order |
//! | 4 | Wire      | one per dependency reference, in declaration order |
//!
//! # Design
//!
//! - **Pure logic**: No I/O; the sequence is data for a downstream renderer
//!   or for `ComponentRegistry::apply`
//! - **Ordered input only**: `emit` takes a `ResolvedPlan`, so a Wire always
//!   targets a component constructed earlier in the same sequence
//! - **Not cached**: every call builds a fresh sequence

use serde::Serialize;
use std::fmt;
use tracing::debug;

use crate::identifier::Identifier;
use crate::logic::resolver::ResolvedPlan;
use crate::schema::FieldValue;
use crate::types::ComponentType;

// ============================================================================
// Operation Types
// ============================================================================

/// One atomic step of the initialization sequence
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum InitOperation {
    /// Allocate the component under its identifier
    Construct {
        identifier: Identifier,
        component_type: ComponentType,
    },

    /// Attach the component to the component registry
    Register { identifier: Identifier },

    /// Set one field on the component
    Configure {
        identifier: Identifier,
        field: String,
        value: FieldValue,
    },

    /// Hand an already-constructed component to a dependent one
    Wire {
        identifier: Identifier,
        field: String,
        target: Identifier,
    },
}

impl InitOperation {
    /// The component this operation acts on
    pub fn identifier(&self) -> &Identifier {
        match self {
            Self::Construct { identifier, .. }
            | Self::Register { identifier }
            | Self::Configure { identifier, .. }
            | Self::Wire { identifier, .. } => identifier,
        }
    }
}

impl fmt::Display for InitOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Construct { identifier, component_type } => {
                write!(f, "Construct({}, {})", identifier, component_type)
            }
            Self::Register { identifier } => write!(f, "Register({})", identifier),
            Self::Configure { identifier, field, value } => {
                write!(f, "Configure({}, {}, {})", identifier, field, value)
            }
            Self::Wire { identifier, field, target } => {
                write!(f, "Wire({}, {}, {})", identifier, field, target)
            }
        }
    }
}

/// An ordered initialization sequence
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct InitSequence {
    ops: Vec<InitOperation>,
}

impl InitSequence {
    pub fn ops(&self) -> &[InitOperation] {
        &self.ops
    }

    pub fn iter(&self) -> std::slice::Iter<'_, InitOperation> {
        self.ops.iter()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Number of components the sequence constructs
    pub fn component_count(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, InitOperation::Construct { .. }))
            .count()
    }

    /// Returns a summary of the sequence for logging/display.
    pub fn summary(&self) -> String {
        let mut lines = vec![
            "Initialization Sequence".to_string(),
            format!("  Components: {}", self.component_count()),
            format!("  Operations ({}):", self.ops.len()),
        ];
        for (i, op) in self.ops.iter().enumerate() {
            lines.push(format!("    {}. {}", i + 1, op));
        }
        lines.join("\n")
    }
}

impl<'a> IntoIterator for &'a InitSequence {
    type Item = &'a InitOperation;
    type IntoIter = std::slice::Iter<'a, InitOperation>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.iter()
    }
}

// ============================================================================
// Emission
// ============================================================================

/// Emit the initialization sequence for a resolved plan.
///
/// Infallible: every failure mode was ruled out when the plan was resolved.
pub fn emit(plan: &ResolvedPlan) -> InitSequence {
    let mut ops = Vec::new();

    for desc in plan.descriptors() {
        let identifier = desc.identifier();

        ops.push(InitOperation::Construct {
            identifier: identifier.clone(),
            component_type: desc.component_type(),
        });
        ops.push(InitOperation::Register {
            identifier: identifier.clone(),
        });
        for (field, value) in desc.fields() {
            ops.push(InitOperation::Configure {
                identifier: identifier.clone(),
                field: field.clone(),
                value: value.clone(),
            });
        }
        for dep in desc.dependency_refs() {
            ops.push(InitOperation::Wire {
                identifier: identifier.clone(),
                field: dep.field.clone(),
                target: dep.target.clone(),
            });
        }
    }

    debug!("Emitted {} operations for {} components", ops.len(), plan.len());
    InitSequence { ops }
}

// ============================================================================
// Tests
// ============================================================================
