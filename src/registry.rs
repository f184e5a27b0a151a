//! Component registry and storage mount table
//!
//! `ComponentRegistry` is the collaborator `Register` operations target. It
//! replays an `InitSequence` and afterwards answers lookups by identifier.
//! One registry belongs to one compilation run and is passed around
//! explicitly.
//!
//! `MountTable` maps path prefixes to storage front-ends. A path such as
//! `sd://music/a.wav` is routed by splitting on `://`: the part before it
//! names the front-end, the rest is the path relative to that front-end.

use std::collections::{BTreeMap, HashMap};
use thiserror::Error;
use tracing::{debug, warn};

use crate::engine::emitter::{InitOperation, InitSequence};
use crate::identifier::Identifier;
use crate::schema::FieldValue;
use crate::types::ComponentType;

/// Separator between a mount prefix and the relative path
pub const PREFIX_SEPARATOR: &str = "://";

/// Errors raised while replaying operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Construct issued twice for the same identifier
    #[error("Component '{identifier}' is already constructed")]
    AlreadyConstructed { identifier: Identifier },

    /// An operation on an identifier that was never constructed
    #[error("Component '{identifier}' has not been constructed")]
    NotConstructed { identifier: Identifier },

    /// Register issued twice for the same identifier
    #[error("Component '{identifier}' is already registered")]
    AlreadyRegistered { identifier: Identifier },

    /// Wiring to or from a component that is not registered yet
    #[error("Component '{identifier}' has not been registered")]
    NotRegistered { identifier: Identifier },
}

/// Errors raised while routing a prefixed path
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    #[error("Invalid path '{path}': must start with a storage prefix followed by '://'")]
    MissingSeparator { path: String },

    #[error("Storage prefix '{prefix}' does not exist")]
    UnknownPrefix { prefix: String },
}

// ============================================================================
// Mount Table
// ============================================================================

/// Prefix -> storage front-end
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MountTable {
    mounts: BTreeMap<String, Identifier>,
}

impl MountTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mount `identifier` under `prefix`.
    ///
    /// Returns the front-end previously mounted there, which is replaced.
    pub fn mount(&mut self, prefix: impl Into<String>, identifier: Identifier) -> Option<Identifier> {
        let prefix = prefix.into();
        let previous = self.mounts.insert(prefix.clone(), identifier);
        if let Some(ref old) = previous {
            warn!("Prefix '{}' was mounted by '{}', replaced", prefix, old);
        }
        previous
    }

    pub fn get(&self, prefix: &str) -> Option<&Identifier> {
        self.mounts.get(prefix)
    }

    /// Resolve a prefixed path to its front-end and relative path.
    ///
    /// # Errors
    ///
    /// - `MissingSeparator` if the path has no `://`
    /// - `UnknownPrefix` if nothing is mounted under the prefix
    pub fn route<'p>(&self, path: &'p str) -> Result<(&Identifier, &'p str), RouteError> {
        let (prefix, relative) =
            path.split_once(PREFIX_SEPARATOR)
                .ok_or_else(|| RouteError::MissingSeparator {
                    path: path.to_string(),
                })?;
        let identifier = self.get(prefix).ok_or_else(|| RouteError::UnknownPrefix {
            prefix: prefix.to_string(),
        })?;
        Ok((identifier, relative))
    }

    /// Join a prefix and a relative path back into a routable path
    pub fn qualify(prefix: &str, relative: &str) -> String {
        format!("{}{}{}", prefix, PREFIX_SEPARATOR, relative)
    }

    /// Mounted prefixes in sorted order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Identifier)> {
        self.mounts.iter().map(|(p, id)| (p.as_str(), id))
    }

    pub fn len(&self) -> usize {
        self.mounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mounts.is_empty()
    }
}

// ============================================================================
// Component Registry
// ============================================================================

/// A constructed component as seen by the registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handle {
    identifier: Identifier,
    component_type: ComponentType,
    registered: bool,
    settings: Vec<(String, FieldValue)>,
    links: Vec<(String, Identifier)>,
}

impl Handle {
    fn new(identifier: Identifier, component_type: ComponentType) -> Self {
        Self {
            identifier,
            component_type,
            registered: false,
            settings: Vec::new(),
            links: Vec::new(),
        }
    }

    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    pub fn component_type(&self) -> ComponentType {
        self.component_type
    }

    pub fn is_registered(&self) -> bool {
        self.registered
    }

    /// Value of a configured field
    pub fn setting(&self, field: &str) -> Option<&FieldValue> {
        self.settings.iter().find(|(f, _)| f == field).map(|(_, v)| v)
    }

    /// Component wired under `field`
    pub fn link(&self, field: &str) -> Option<&Identifier> {
        self.links.iter().find(|(f, _)| f == field).map(|(_, id)| id)
    }

    pub fn links(&self) -> &[(String, Identifier)] {
        &self.links
    }
}

/// Registry of constructed components for one compilation run
#[derive(Debug, Default)]
pub struct ComponentRegistry {
    handles: HashMap<Identifier, Handle>,
    /// Registration order
    order: Vec<Identifier>,
    mounts: MountTable,
}

impl ComponentRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry by replaying a whole sequence
    pub fn from_sequence(sequence: &InitSequence) -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        registry.apply(sequence)?;
        Ok(registry)
    }

    /// Replay every operation of `sequence` in order.
    ///
    /// Stops at the first failing operation; operations before it stay
    /// applied.
    pub fn apply(&mut self, sequence: &InitSequence) -> Result<(), RegistryError> {
        for op in sequence {
            self.apply_op(op)?;
        }
        debug!(
            "Registry holds {} components, {} mounts",
            self.order.len(),
            self.mounts.len()
        );
        Ok(())
    }

    /// Replay a single operation
    pub fn apply_op(&mut self, op: &InitOperation) -> Result<(), RegistryError> {
        match op {
            InitOperation::Construct { identifier, component_type } => {
                if self.handles.contains_key(identifier) {
                    return Err(RegistryError::AlreadyConstructed {
                        identifier: identifier.clone(),
                    });
                }
                self.handles
                    .insert(identifier.clone(), Handle::new(identifier.clone(), *component_type));
            }
            InitOperation::Register { identifier } => {
                let handle = self.handle_mut(identifier)?;
                if handle.registered {
                    return Err(RegistryError::AlreadyRegistered {
                        identifier: identifier.clone(),
                    });
                }
                handle.registered = true;
                self.order.push(identifier.clone());
            }
            InitOperation::Configure { identifier, field, value } => {
                let handle = self.handle_mut(identifier)?;
                handle.settings.push((field.clone(), value.clone()));
                let mount_field = handle.component_type.mount_field();
                if mount_field == Some(field.as_str()) {
                    if let Some(prefix) = value.as_str() {
                        self.mounts.mount(prefix, identifier.clone());
                    }
                }
            }
            InitOperation::Wire { identifier, field, target } => {
                self.require_registered(target)?;
                self.require_registered(identifier)?;
                let handle = self.handle_mut(identifier)?;
                handle.links.push((field.clone(), target.clone()));
            }
        }
        Ok(())
    }

    /// Look up a registered component
    pub fn lookup(&self, identifier: &Identifier) -> Option<&Handle> {
        self.handles.get(identifier).filter(|h| h.registered)
    }

    /// Registered components in registration order
    pub fn registered(&self) -> impl Iterator<Item = &Handle> {
        self.order.iter().filter_map(|id| self.handles.get(id))
    }

    pub fn mounts(&self) -> &MountTable {
        &self.mounts
    }

    /// Route a prefixed path to the front-end mounted under its prefix
    pub fn route<'p>(&self, path: &'p str) -> Result<(&Handle, &'p str), RouteError> {
        let (identifier, relative) = self.mounts.route(path)?;
        let handle = self.lookup(identifier).ok_or_else(|| RouteError::UnknownPrefix {
            prefix: path.split(PREFIX_SEPARATOR).next().unwrap_or_default().to_string(),
        })?;
        Ok((handle, relative))
    }

    /// Number of registered components
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    fn handle_mut(&mut self, identifier: &Identifier) -> Result<&mut Handle, RegistryError> {
        self.handles
            .get_mut(identifier)
            .ok_or_else(|| RegistryError::NotConstructed {
                identifier: identifier.clone(),
            })
    }

    fn require_registered(&self, identifier: &Identifier) -> Result<(), RegistryError> {
        match self.handles.get(identifier) {
            None => Err(RegistryError::NotConstructed {
                identifier: identifier.clone(),
            }),
            Some(h) if !h.registered => Err(RegistryError::NotRegistered {
                identifier: identifier.clone(),
            }),
            Some(_) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::emitter::emit;
    use crate::logic::resolver::resolve;
    use crate::schema::ComponentDescriptor;

    fn id(s: &str) -> Identifier {
        Identifier::new(s).expect("valid identifier") // test: known-good input
    }

    fn two_mounts() -> InitSequence {
        let card = ComponentDescriptor::new(id("card0"), ComponentType::SdMmcCard);
        let sd = ComponentDescriptor::new(id("sd"), ComponentType::SdMmcStorage)
            .with_field("path_prefix", "sd")
            .with_ref("sd_mmc_id", id("card0"), ComponentType::SdMmcCard);
        let media = ComponentDescriptor::new(id("media"), ComponentType::SdMmcStorage)
            .with_field("path_prefix", "media")
            .with_ref("sd_mmc_id", id("card0"), ComponentType::SdMmcCard);
        emit(&resolve(vec![sd, media, card]).unwrap())
    }

    fn construct(name: &str) -> InitOperation {
        InitOperation::Construct {
            identifier: id(name),
            component_type: ComponentType::SdMmcCard,
        }
    }

    #[test]
    fn test_replay_registers_every_component() {
        let registry = ComponentRegistry::from_sequence(&two_mounts()).unwrap();

        assert_eq!(registry.len(), 3);
        for name in ["card0", "sd", "media"] {
            assert!(registry.lookup(&id(name)).is_some(), "{name} not registered");
        }
        let order: Vec<&str> = registry.registered().map(|h| h.identifier().as_str()).collect();
        assert_eq!(order, vec!["card0", "sd", "media"]);
    }

    #[test]
    fn test_replay_records_settings_and_links() {
        let registry = ComponentRegistry::from_sequence(&two_mounts()).unwrap();
        let sd = registry.lookup(&id("sd")).unwrap();

        assert_eq!(sd.setting("path_prefix"), Some(&FieldValue::from("sd")));
        assert_eq!(sd.link("sd_mmc_id"), Some(&id("card0")));
    }

    #[test]
    fn test_route_splits_prefix() {
        let registry = ComponentRegistry::from_sequence(&two_mounts()).unwrap();

        let (handle, relative) = registry.route("sd://music/a.wav").unwrap();
        assert_eq!(handle.identifier(), &id("sd"));
        assert_eq!(relative, "music/a.wav");

        let (handle, _) = registry.route("media://").unwrap();
        assert_eq!(handle.identifier(), &id("media"));
    }

    #[test]
    fn test_route_errors() {
        let registry = ComponentRegistry::from_sequence(&two_mounts()).unwrap();

        assert_eq!(
            registry.route("music/a.wav").unwrap_err(),
            RouteError::MissingSeparator {
                path: "music/a.wav".to_string()
            }
        );
        assert_eq!(
            registry.route("usb://a.wav").unwrap_err(),
            RouteError::UnknownPrefix {
                prefix: "usb".to_string()
            }
        );
    }

    #[test]
    fn test_duplicate_construct_rejected() {
        let mut registry = ComponentRegistry::new();
        registry.apply_op(&construct("a")).unwrap();

        assert_eq!(
            registry.apply_op(&construct("a")).unwrap_err(),
            RegistryError::AlreadyConstructed { identifier: id("a") }
        );
    }

    #[test]
    fn test_register_requires_construct() {
        let mut registry = ComponentRegistry::new();
        let err = registry
            .apply_op(&InitOperation::Register { identifier: id("a") })
            .unwrap_err();
        assert_eq!(err, RegistryError::NotConstructed { identifier: id("a") });
    }

    #[test]
    fn test_wire_requires_registered_target() {
        let mut registry = ComponentRegistry::new();
        registry.apply_op(&construct("a")).unwrap();
        registry
            .apply_op(&InitOperation::Register { identifier: id("a") })
            .unwrap();
        registry.apply_op(&construct("b")).unwrap();

        let err = registry
            .apply_op(&InitOperation::Wire {
                identifier: id("a"),
                field: "peer".to_string(),
                target: id("b"),
            })
            .unwrap_err();
        assert_eq!(err, RegistryError::NotRegistered { identifier: id("b") });
    }

    #[test]
    fn test_unregistered_component_is_not_visible() {
        let mut registry = ComponentRegistry::new();
        registry.apply_op(&construct("a")).unwrap();

        assert!(registry.lookup(&id("a")).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_mount_replaces_previous() {
        let mut table = MountTable::new();
        assert_eq!(table.mount("sd", id("a")), None);
        assert_eq!(table.mount("sd", id("b")), Some(id("a")));
        assert_eq!(table.get("sd"), Some(&id("b")));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_qualify_round_trips_through_route() {
        let mut table = MountTable::new();
        table.mount("sd", id("a"));

        let path = MountTable::qualify("sd", "img/logo.bmp");
        assert_eq!(path, "sd://img/logo.bmp");
        assert_eq!(table.route(&path).unwrap(), (&id("a"), "img/logo.bmp"));
    }
}
