//! Component Descriptors and the Schema Validator
//!
//! A `ComponentSchema` declares the shape of one component type: which keys
//! are required, which are optional (possibly with a default), and which
//! hold references to other components. `validate` checks a raw
//! `ConfigNode` against a schema and produces an immutable
//! `ComponentDescriptor`.
//!
//! # Validation Order
//!
//! 1. The node must be a mapping
//! 2. Discriminator (`platform`), before anything else can happen
//! 3. Explicit `id` syntax
//! 4. Declared fields, in schema order
//! 5. Undeclared keys
//! 6. Identifier allocation, only when the node declared no `id`
//!
//! Reference fields are recorded as unresolved `DependencyRef`s. Whether the
//! target exists is decided later by the resolver, so forward references
//! within a document are legal.

use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::error::WiringError;
use crate::identifier::{Identifier, IdentifierRegistry};
use crate::node::ConfigNode;
use crate::types::{ComponentType, Platform, ValueKind};

/// Key holding the component identifier, implicit on every schema
pub const ID_KEY: &str = "id";

/// Key holding the discriminator in platform lists
pub const PLATFORM_KEY: &str = "platform";

// ============================================================================
// Descriptor Types
// ============================================================================

/// A validated scalar field value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    String(String),
    Integer(i64),
    Boolean(bool),
}

impl FieldValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    fn matches_kind(&self, kind: ValueKind) -> bool {
        match (self, kind) {
            (Self::String(_), ValueKind::String) => true,
            (Self::String(s), ValueKind::NonEmptyString) => !s.trim().is_empty(),
            (Self::String(s), ValueKind::PathPrefix) => is_valid_prefix(s),
            (Self::Integer(i), ValueKind::Integer { min, max }) => (min..=max).contains(i),
            (Self::Boolean(_), ValueKind::Boolean) => true,
            _ => false,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "{:?}", s),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Boolean(b) => write!(f, "{}", b),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

/// An unresolved reference from one component to another
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyRef {
    /// Field the reference was declared under (e.g. `sd_mmc_id`)
    pub field: String,
    /// Identifier of the referenced component
    pub target: Identifier,
    /// Type the referenced component must have
    pub expected: ComponentType,
}

/// Normalized, validated representation of one declared component.
///
/// Produced by `validate` (or assembled directly with the `with_*`
/// methods) and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentDescriptor {
    identifier: Identifier,
    component_type: ComponentType,
    fields: Vec<(String, FieldValue)>,
    dependency_refs: Vec<DependencyRef>,
}

impl ComponentDescriptor {
    pub fn new(identifier: Identifier, component_type: ComponentType) -> Self {
        Self {
            identifier,
            component_type,
            fields: Vec::new(),
            dependency_refs: Vec::new(),
        }
    }

    /// Add a configured field
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    /// Add a dependency reference
    pub fn with_ref(
        mut self,
        field: impl Into<String>,
        target: Identifier,
        expected: ComponentType,
    ) -> Self {
        self.dependency_refs.push(DependencyRef {
            field: field.into(),
            target,
            expected,
        });
        self
    }

    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    pub fn component_type(&self) -> ComponentType {
        self.component_type
    }

    /// Configured fields in schema declaration order
    pub fn fields(&self) -> &[(String, FieldValue)] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Dependency references in declaration order
    pub fn dependency_refs(&self) -> &[DependencyRef] {
        &self.dependency_refs
    }

    /// Mount prefix, if this is a storage front-end with one configured
    pub fn path_prefix(&self) -> Option<&str> {
        self.component_type
            .mount_field()
            .and_then(|field| self.field(field))
            .and_then(FieldValue::as_str)
    }
}

// ============================================================================
// Schema Types
// ============================================================================

/// Errors in a schema definition itself
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("Field '{field}' is declared twice in the {component} schema")]
    DuplicateField {
        component: ComponentType,
        field: String,
    },

    #[error("Field name '{field}' is reserved")]
    ReservedField { field: String },

    #[error("Field '{field}' cannot use kind {kind}")]
    UnsupportedKind { field: String, kind: ValueKind },

    #[error("Default for field '{field}' is not {kind}")]
    InvalidDefault { field: String, kind: ValueKind },
}

/// Shape of one field in a schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    pub kind: ValueKind,
    pub required: bool,
    /// Value used when an optional field is absent
    pub default: Option<FieldValue>,
}

impl FieldSpec {
    /// Create a required field
    pub fn required(name: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: true,
            default: None,
        }
    }

    /// Create an optional field
    pub fn optional(name: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
            default: None,
        }
    }

    /// Add a default value (optional fields only)
    pub fn with_default(mut self, value: impl Into<FieldValue>) -> Self {
        self.default = Some(value.into());
        self
    }
}

/// Declared shape of one component type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentSchema {
    component_type: ComponentType,
    platform: Option<Platform>,
    fields: Vec<FieldSpec>,
}

impl ComponentSchema {
    /// Create a new schema builder
    pub fn builder(component_type: ComponentType) -> SchemaBuilder {
        SchemaBuilder::new(component_type)
    }

    pub fn component_type(&self) -> ComponentType {
        self.component_type
    }

    /// Discriminator this schema is selected by, for platform schemas
    pub fn platform(&self) -> Option<Platform> {
        self.platform
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    fn declares(&self, key: &str) -> bool {
        key == ID_KEY
            || (key == PLATFORM_KEY && self.platform.is_some())
            || self.fields.iter().any(|f| f.name == key)
    }
}

/// Builder for creating ComponentSchema instances
#[derive(Debug, Clone)]
pub struct SchemaBuilder {
    component_type: ComponentType,
    platform: Option<Platform>,
    fields: Vec<FieldSpec>,
}

impl SchemaBuilder {
    /// Create a new builder
    pub fn new(component_type: ComponentType) -> Self {
        Self {
            component_type,
            platform: None,
            fields: Vec::new(),
        }
    }

    /// Mark as a platform schema selected by `platform`
    pub fn platform(mut self, platform: Platform) -> Self {
        self.platform = Some(platform);
        self
    }

    /// Add a field
    pub fn field(mut self, spec: FieldSpec) -> Self {
        self.fields.push(spec);
        self
    }

    /// Build the schema
    pub fn build(self) -> Result<ComponentSchema, SchemaError> {
        let mut seen = HashSet::new();
        for spec in &self.fields {
            if spec.name == ID_KEY || spec.name == PLATFORM_KEY {
                return Err(SchemaError::ReservedField {
                    field: spec.name.clone(),
                });
            }
            if !seen.insert(spec.name.as_str()) {
                return Err(SchemaError::DuplicateField {
                    component: self.component_type,
                    field: spec.name.clone(),
                });
            }
            if matches!(spec.kind, ValueKind::Mapping) {
                return Err(SchemaError::UnsupportedKind {
                    field: spec.name.clone(),
                    kind: spec.kind,
                });
            }
            if let Some(ref default) = spec.default {
                if spec.required || !default.matches_kind(spec.kind) {
                    return Err(SchemaError::InvalidDefault {
                        field: spec.name.clone(),
                        kind: spec.kind,
                    });
                }
            }
        }

        Ok(ComponentSchema {
            component_type: self.component_type,
            platform: self.platform,
            fields: self.fields,
        })
    }
}

// ============================================================================
// Validation
// ============================================================================

/// Outcome of checking one field value
enum Checked {
    Value(FieldValue),
    Reference(Identifier),
}

/// Validate a raw node against a schema.
///
/// # Errors
///
/// - `InvalidValue` when the node is not a mapping or a field has the wrong kind
/// - `MissingField` when a required key (or the discriminator) is absent
/// - `UnsupportedVariant` when the discriminator names no known platform
/// - `UnknownField` when the node carries a key the schema does not declare
///
/// The only state touched is `ids`, and only to allocate an identifier for
/// a node that declared none, after every check passed. Claiming explicit
/// identifiers is left to the caller.
pub fn validate(
    node: &ConfigNode,
    schema: &ComponentSchema,
    ids: &mut IdentifierRegistry,
) -> Result<ComponentDescriptor, WiringError> {
    let component = schema.component_type;

    let pairs = node.as_mapping().ok_or_else(|| WiringError::InvalidValue {
        field: component.to_string(),
        value: node.to_string(),
        expected: ValueKind::Mapping,
    })?;

    check_discriminator(node, schema)?;
    let explicit_id = explicit_identifier(node)?;

    let mut fields = Vec::new();
    let mut dependency_refs = Vec::new();
    for spec in &schema.fields {
        match node.get(&spec.name) {
            None if spec.required => {
                return Err(WiringError::MissingField {
                    component: component.to_string(),
                    field: spec.name.clone(),
                });
            }
            None => {
                if let Some(ref default) = spec.default {
                    fields.push((spec.name.clone(), default.clone()));
                }
            }
            Some(value) => match check_value(spec, value)? {
                Checked::Value(v) => fields.push((spec.name.clone(), v)),
                Checked::Reference(target) => {
                    if let ValueKind::Reference(expected) = spec.kind {
                        dependency_refs.push(DependencyRef {
                            field: spec.name.clone(),
                            target,
                            expected,
                        });
                    }
                }
            },
        }
    }

    if let Some((key, _)) = pairs.iter().find(|(key, _)| !schema.declares(key)) {
        return Err(WiringError::UnknownField {
            component,
            field: key.clone(),
        });
    }

    let identifier = match explicit_id {
        Some(id) => id,
        None => ids.allocate(component),
    };

    Ok(ComponentDescriptor {
        identifier,
        component_type: component,
        fields,
        dependency_refs,
    })
}

/// Read the discriminator of a platform-list entry.
///
/// Fails before any other check so an unknown platform never reaches a
/// schema.
pub fn read_platform(node: &ConfigNode) -> Result<Option<Platform>, WiringError> {
    let Some(raw) = node.get(PLATFORM_KEY) else {
        return Ok(None);
    };
    let value = raw.as_str().unwrap_or_default();
    Platform::from_str(value)
        .map(Some)
        .map_err(|_| WiringError::UnsupportedVariant {
            field: PLATFORM_KEY.to_string(),
            value: raw.to_string(),
            supported: Platform::names(),
        })
}

fn check_discriminator(node: &ConfigNode, schema: &ComponentSchema) -> Result<(), WiringError> {
    let Some(expected) = schema.platform else {
        return Ok(());
    };
    match read_platform(node)? {
        None => Err(WiringError::MissingField {
            component: schema.component_type.to_string(),
            field: PLATFORM_KEY.to_string(),
        }),
        Some(found) if found != expected => Err(WiringError::UnsupportedVariant {
            field: PLATFORM_KEY.to_string(),
            value: found.to_string(),
            supported: vec![expected.to_string()],
        }),
        Some(_) => Ok(()),
    }
}

/// Parse the optional explicit `id` of a node
pub fn explicit_identifier(node: &ConfigNode) -> Result<Option<Identifier>, WiringError> {
    let Some(raw) = node.get(ID_KEY) else {
        return Ok(None);
    };
    raw.as_str()
        .and_then(Identifier::new)
        .map(Some)
        .ok_or_else(|| WiringError::InvalidValue {
            field: ID_KEY.to_string(),
            value: raw.to_string(),
            expected: ValueKind::Identifier,
        })
}

fn check_value(spec: &FieldSpec, value: &ConfigNode) -> Result<Checked, WiringError> {
    let checked = match (spec.kind, value) {
        (ValueKind::Reference(_), ConfigNode::String(s)) => {
            Identifier::new(s.as_str()).map(Checked::Reference)
        }
        (ValueKind::Identifier, ConfigNode::String(s)) => {
            Identifier::new(s.as_str()).map(|_| Checked::Value(FieldValue::String(s.clone())))
        }
        (_, ConfigNode::String(s)) => Some(FieldValue::String(s.clone()))
            .filter(|v| v.matches_kind(spec.kind))
            .map(Checked::Value),
        (_, ConfigNode::Integer(i)) => Some(FieldValue::Integer(*i))
            .filter(|v| v.matches_kind(spec.kind))
            .map(Checked::Value),
        (_, ConfigNode::Bool(b)) => Some(FieldValue::Boolean(*b))
            .filter(|v| v.matches_kind(spec.kind))
            .map(Checked::Value),
        _ => None,
    };

    checked.ok_or_else(|| WiringError::InvalidValue {
        field: spec.name.clone(),
        value: value.to_string(),
        expected: spec.kind,
    })
}

fn is_valid_prefix(prefix: &str) -> bool {
    !prefix.trim().is_empty() && !prefix.contains("://")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> Identifier {
        Identifier::new(s).expect("valid identifier") // test: known-good input
    }

    fn storage_schema() -> ComponentSchema {
        ComponentSchema::builder(ComponentType::SdMmcStorage)
            .platform(Platform::SdMmc)
            .field(FieldSpec::required("path_prefix", ValueKind::PathPrefix))
            .field(FieldSpec::required(
                "sd_mmc_id",
                ValueKind::Reference(ComponentType::SdMmcCard),
            ))
            .build()
            .unwrap()
    }

    fn host_schema() -> ComponentSchema {
        ComponentSchema::builder(ComponentType::SdmmcHost)
            .field(FieldSpec::required("slot", ValueKind::Integer { min: 0, max: 1 }))
            .field(FieldSpec::optional("mode_1bit", ValueKind::Boolean).with_default(false))
            .build()
            .unwrap()
    }

    fn storage_node(pairs: Vec<(&str, ConfigNode)>) -> ConfigNode {
        ConfigNode::mapping(pairs)
    }

    // =========================================================================
    // Schema Builder Tests
    // =========================================================================

    #[test]
    fn test_builder_rejects_duplicate_fields() {
        let result = ComponentSchema::builder(ComponentType::SdmmcHost)
            .field(FieldSpec::required("slot", ValueKind::Integer { min: 0, max: 1 }))
            .field(FieldSpec::optional("slot", ValueKind::Boolean))
            .build();
        assert!(matches!(result, Err(SchemaError::DuplicateField { .. })));
    }

    #[test]
    fn test_builder_rejects_reserved_names() {
        let result = ComponentSchema::builder(ComponentType::SdmmcHost)
            .field(FieldSpec::optional("id", ValueKind::String))
            .build();
        assert!(matches!(result, Err(SchemaError::ReservedField { .. })));
    }

    #[test]
    fn test_builder_rejects_bad_defaults() {
        let result = ComponentSchema::builder(ComponentType::SdmmcHost)
            .field(
                FieldSpec::optional("slot", ValueKind::Integer { min: 0, max: 1 }).with_default(5i64),
            )
            .build();
        assert!(matches!(result, Err(SchemaError::InvalidDefault { .. })));

        let result = ComponentSchema::builder(ComponentType::SdmmcHost)
            .field(
                FieldSpec::required("slot", ValueKind::Integer { min: 0, max: 1 }).with_default(0i64),
            )
            .build();
        assert!(matches!(result, Err(SchemaError::InvalidDefault { .. })));
    }

    // =========================================================================
    // Validation Tests
    // =========================================================================

    #[test]
    fn test_validate_storage_entry() {
        let mut ids = IdentifierRegistry::new();
        let node = storage_node(vec![
            ("platform", ConfigNode::from("sd_mmc")),
            ("id", ConfigNode::from("sd")),
            ("path_prefix", ConfigNode::from("sd")),
            ("sd_mmc_id", ConfigNode::from("card0")),
        ]);

        let desc = validate(&node, &storage_schema(), &mut ids).unwrap();

        assert_eq!(desc.identifier(), &id("sd"));
        assert_eq!(desc.component_type(), ComponentType::SdMmcStorage);
        assert_eq!(desc.fields(), &[("path_prefix".to_string(), FieldValue::from("sd"))]);
        assert_eq!(
            desc.dependency_refs(),
            &[DependencyRef {
                field: "sd_mmc_id".to_string(),
                target: id("card0"),
                expected: ComponentType::SdMmcCard,
            }]
        );
        assert_eq!(desc.path_prefix(), Some("sd"));
        // Explicit ids are claimed by the caller, not by validate
        assert!(ids.is_empty());
    }

    #[test]
    fn test_validate_missing_required_field() {
        let mut ids = IdentifierRegistry::new();
        let node = storage_node(vec![
            ("platform", ConfigNode::from("sd_mmc")),
            ("sd_mmc_id", ConfigNode::from("card0")),
        ]);

        let err = validate(&node, &storage_schema(), &mut ids).unwrap_err();
        assert_eq!(
            err,
            WiringError::MissingField {
                component: "sd_mmc_storage".to_string(),
                field: "path_prefix".to_string(),
            }
        );
    }

    #[test]
    fn test_validate_invalid_value_kinds() {
        let mut ids = IdentifierRegistry::new();

        let node = ConfigNode::mapping([("slot", ConfigNode::Integer(2))]);
        let err = validate(&node, &host_schema(), &mut ids).unwrap_err();
        assert!(matches!(err, WiringError::InvalidValue { ref field, .. } if field == "slot"));

        let node = ConfigNode::mapping([("slot", ConfigNode::from("1"))]);
        let err = validate(&node, &host_schema(), &mut ids).unwrap_err();
        assert!(matches!(err, WiringError::InvalidValue { ref field, .. } if field == "slot"));

        let node = storage_node(vec![
            ("platform", ConfigNode::from("sd_mmc")),
            ("path_prefix", ConfigNode::from("sd://")),
            ("sd_mmc_id", ConfigNode::from("card0")),
        ]);
        let err = validate(&node, &storage_schema(), &mut ids).unwrap_err();
        assert_eq!(
            err,
            WiringError::InvalidValue {
                field: "path_prefix".to_string(),
                value: "sd://".to_string(),
                expected: ValueKind::PathPrefix,
            }
        );
    }

    #[test]
    fn test_validate_rejects_empty_and_blank_prefix() {
        let mut ids = IdentifierRegistry::new();

        for prefix in ["", "   ", "\t"] {
            let node = storage_node(vec![
                ("platform", ConfigNode::from("sd_mmc")),
                ("path_prefix", ConfigNode::from(prefix)),
                ("sd_mmc_id", ConfigNode::from("card0")),
            ]);
            let err = validate(&node, &storage_schema(), &mut ids).unwrap_err();
            assert_eq!(
                err,
                WiringError::InvalidValue {
                    field: "path_prefix".to_string(),
                    value: prefix.to_string(),
                    expected: ValueKind::PathPrefix,
                }
            );
        }
        assert!(ids.is_empty());
    }

    #[test]
    fn test_validate_reference_must_be_identifier() {
        let mut ids = IdentifierRegistry::new();
        let node = storage_node(vec![
            ("platform", ConfigNode::from("sd_mmc")),
            ("path_prefix", ConfigNode::from("sd")),
            ("sd_mmc_id", ConfigNode::from("not an id")),
        ]);

        let err = validate(&node, &storage_schema(), &mut ids).unwrap_err();
        assert!(matches!(
            err,
            WiringError::InvalidValue { expected: ValueKind::Reference(ComponentType::SdMmcCard), .. }
        ));
    }

    #[test]
    fn test_validate_unknown_platform_checked_first() {
        let mut ids = IdentifierRegistry::new();
        // Also missing every required field; the discriminator error wins
        let node = storage_node(vec![("platform", ConfigNode::from("spiffs"))]);

        let err = validate(&node, &storage_schema(), &mut ids).unwrap_err();
        assert!(matches!(err, WiringError::UnsupportedVariant { ref value, .. } if value == "spiffs"));
        assert!(ids.is_empty());
    }

    #[test]
    fn test_validate_missing_platform() {
        let mut ids = IdentifierRegistry::new();
        let node = storage_node(vec![
            ("path_prefix", ConfigNode::from("sd")),
            ("sd_mmc_id", ConfigNode::from("card0")),
        ]);

        let err = validate(&node, &storage_schema(), &mut ids).unwrap_err();
        assert!(matches!(err, WiringError::MissingField { ref field, .. } if field == "platform"));
    }

    #[test]
    fn test_validate_rejects_unknown_keys() {
        let mut ids = IdentifierRegistry::new();
        let node = ConfigNode::mapping([
            ("slot", ConfigNode::Integer(1)),
            ("clk_pin", ConfigNode::Integer(14)),
        ]);

        let err = validate(&node, &host_schema(), &mut ids).unwrap_err();
        assert_eq!(
            err,
            WiringError::UnknownField {
                component: ComponentType::SdmmcHost,
                field: "clk_pin".to_string(),
            }
        );
    }

    #[test]
    fn test_validate_platform_key_not_allowed_on_fixed_schema() {
        let mut ids = IdentifierRegistry::new();
        let node = ConfigNode::mapping([
            ("platform", ConfigNode::from("sd_mmc")),
            ("slot", ConfigNode::Integer(1)),
        ]);

        let err = validate(&node, &host_schema(), &mut ids).unwrap_err();
        assert!(matches!(err, WiringError::UnknownField { ref field, .. } if field == "platform"));
    }

    #[test]
    fn test_validate_applies_defaults_and_allocates_id() {
        let mut ids = IdentifierRegistry::new();
        let node = ConfigNode::mapping([("slot", ConfigNode::Integer(1))]);

        let desc = validate(&node, &host_schema(), &mut ids).unwrap();

        assert_eq!(desc.identifier(), &id("sdmmc_host_id"));
        assert_eq!(
            desc.fields(),
            &[
                ("slot".to_string(), FieldValue::Integer(1)),
                ("mode_1bit".to_string(), FieldValue::Boolean(false)),
            ]
        );
        assert!(ids.is_claimed(&id("sdmmc_host_id")));
    }

    #[test]
    fn test_validate_rejects_bad_explicit_id() {
        let mut ids = IdentifierRegistry::new();
        let node = ConfigNode::mapping([
            ("id", ConfigNode::from("my-host")),
            ("slot", ConfigNode::Integer(1)),
        ]);

        let err = validate(&node, &host_schema(), &mut ids).unwrap_err();
        assert_eq!(
            err,
            WiringError::InvalidValue {
                field: "id".to_string(),
                value: "my-host".to_string(),
                expected: ValueKind::Identifier,
            }
        );
    }

    #[test]
    fn test_validate_rejects_non_mapping() {
        let mut ids = IdentifierRegistry::new();
        let err = validate(&ConfigNode::from("sd"), &host_schema(), &mut ids).unwrap_err();
        assert!(matches!(err, WiringError::InvalidValue { expected: ValueKind::Mapping, .. }));
    }

    #[test]
    fn test_field_value_display_quotes_strings() {
        assert_eq!(FieldValue::from("/sd").to_string(), "\"/sd\"");
        assert_eq!(FieldValue::from(3i64).to_string(), "3");
        assert_eq!(FieldValue::from(true).to_string(), "true");
    }
}
