//! Identifier Registry
//!
//! Allocates and checks component identifiers within one document. An
//! identifier ends up as a variable name in generated code, so it must be a
//! valid C identifier and must not collide with a reserved word.
//!
//! The registry is scoped to a single compilation run. It is passed by
//! `&mut` through the validation pass; nothing here is global.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::error::WiringError;
use crate::types::ComponentType;

/// Words that cannot be used as identifiers in generated code
const RESERVED_WORDS: &[&str] = &[
    "App", "alignas", "alignof", "and", "asm", "auto", "bool", "break", "case", "catch", "char",
    "class", "const", "constexpr", "continue", "default", "delete", "do", "double", "else",
    "enum", "explicit", "extern", "false", "float", "for", "friend", "goto", "if", "inline",
    "int", "long", "mutable", "namespace", "new", "noexcept", "not", "nullptr", "operator", "or",
    "private", "protected", "public", "register", "return", "short", "signed", "sizeof",
    "static", "struct", "switch", "template", "this", "throw", "true", "try", "typedef",
    "typename", "union", "unsigned", "using", "virtual", "void", "volatile", "while",
];

/// A component identifier, unique within one document
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identifier(String);

impl Identifier {
    /// Validate and wrap a raw identifier.
    ///
    /// Returns `None` unless `raw` matches `[A-Za-z_][A-Za-z0-9_]*` and is
    /// not a reserved word.
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        let mut chars = raw.chars();
        let head_ok = chars
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
        if !head_ok || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return None;
        }
        if RESERVED_WORDS.contains(&raw.as_str()) {
            return None;
        }
        Some(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Identifier {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Identifier::new(value.clone()).ok_or_else(|| format!("invalid identifier '{}'", value))
    }
}

impl From<Identifier> for String {
    fn from(value: Identifier) -> Self {
        value.0
    }
}

/// Document-scoped set of live identifiers
#[derive(Debug, Default)]
pub struct IdentifierRegistry {
    /// Explicit ids seen during the pre-scan; generated ids avoid these
    reserved: HashSet<Identifier>,
    /// Ids owned by a validated component
    claimed: HashSet<Identifier>,
}

impl IdentifierRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep `id` out of the generated-id space without claiming it.
    ///
    /// Used for explicit ids that appear later in the document than the
    /// component that needs a generated one.
    pub fn reserve(&mut self, id: Identifier) {
        self.reserved.insert(id);
    }

    /// Mark `id` as owned by a component.
    ///
    /// # Errors
    ///
    /// `DuplicateIdentifier` when the id was already claimed.
    pub fn claim(&mut self, id: Identifier) -> Result<(), WiringError> {
        if self.claimed.contains(&id) {
            return Err(WiringError::DuplicateIdentifier { identifier: id });
        }
        self.claimed.insert(id);
        Ok(())
    }

    /// Generate and claim a fresh id for a component that declared none.
    ///
    /// Produces `<type>_id`, then `<type>_id_2`, `<type>_id_3`, ...
    pub fn allocate(&mut self, component_type: ComponentType) -> Identifier {
        let base = format!("{}_id", component_type);
        let mut candidate = Identifier(base.clone());
        let mut n = 1;
        while self.reserved.contains(&candidate) || self.claimed.contains(&candidate) {
            n += 1;
            candidate = Identifier(format!("{}_{}", base, n));
        }
        self.claimed.insert(candidate.clone());
        candidate
    }

    /// Give up a claim so the id can be claimed or generated again.
    ///
    /// Returns whether `id` was claimed. Reservations are kept.
    pub fn release(&mut self, id: &Identifier) -> bool {
        self.claimed.remove(id)
    }

    pub fn is_claimed(&self, id: &Identifier) -> bool {
        self.claimed.contains(id)
    }

    /// Number of claimed ids
    pub fn len(&self) -> usize {
        self.claimed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claimed.is_empty()
    }
}
