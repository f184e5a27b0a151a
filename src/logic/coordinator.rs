//! Multi-Instance Coordinator
//!
//! Expands a list of component entries into descriptors, one per entry, in
//! declaration order.
//!
//! - `expand`: platform lists, where each entry picks its schema through its
//!   `platform` discriminator
//! - `expand_each`: lists where every entry shares one fixed schema
//!
//! Both are fail-fast: the first bad entry aborts the whole list and no
//! descriptors are returned. Errors are wrapped in `WiringError::InEntry`
//! carrying the entry's position. A failed list releases every id its
//! earlier entries claimed, so the registry is left as it was found.

use strum::IntoEnumIterator;
use tracing::debug;

use crate::catalog::SchemaCatalog;
use crate::error::WiringError;
use crate::identifier::IdentifierRegistry;
use crate::node::ConfigNode;
use crate::schema::{self, ComponentDescriptor, ComponentSchema};
use crate::types::{ComponentKind, Platform, ValueKind};

/// Expand a platform list.
///
/// `schema_for` is the discriminator dispatch table; the built-in one is
/// `SchemaCatalog::for_platform`.
///
/// # Errors
///
/// Any `WiringError` from validating or claiming an entry, wrapped with the
/// entry's index. A second occurrence of an explicit id fails with
/// `DuplicateIdentifier` at that entry.
pub fn expand<'s, F>(
    kind: ComponentKind,
    node: &ConfigNode,
    schema_for: F,
    ids: &mut IdentifierRegistry,
) -> Result<Vec<ComponentDescriptor>, WiringError>
where
    F: Fn(Platform) -> Option<&'s ComponentSchema>,
{
    expand_entries(kind, node, ids, |entry| {
        if entry.as_mapping().is_none() {
            return Err(WiringError::InvalidValue {
                field: kind.to_string(),
                value: entry.to_string(),
                expected: ValueKind::Mapping,
            });
        }
        let platform = schema::read_platform(entry)?.ok_or_else(|| WiringError::MissingField {
            component: kind.to_string(),
            field: schema::PLATFORM_KEY.to_string(),
        })?;
        schema_for(platform).ok_or_else(|| WiringError::UnsupportedVariant {
            field: schema::PLATFORM_KEY.to_string(),
            value: platform.to_string(),
            supported: Platform::iter()
                .filter(|p| schema_for(*p).is_some())
                .map(|p| p.to_string())
                .collect(),
        })
    })
}

/// Expand a list whose entries all share `schema`
pub fn expand_each(
    kind: ComponentKind,
    node: &ConfigNode,
    schema: &ComponentSchema,
    ids: &mut IdentifierRegistry,
) -> Result<Vec<ComponentDescriptor>, WiringError> {
    expand_entries(kind, node, ids, |_| Ok(schema))
}

/// Expand every entry of a family using the built-in catalog
pub fn expand_builtin(
    kind: ComponentKind,
    node: &ConfigNode,
    catalog: &SchemaCatalog,
    ids: &mut IdentifierRegistry,
) -> Result<Vec<ComponentDescriptor>, WiringError> {
    match kind.fixed_type().and_then(|ty| catalog.get(ty)) {
        Some(schema) => expand_each(kind, node, schema, ids),
        None => expand(kind, node, |p| catalog.for_platform(p), ids),
    }
}

fn expand_entries<'s, S>(
    kind: ComponentKind,
    node: &ConfigNode,
    ids: &mut IdentifierRegistry,
    select: S,
) -> Result<Vec<ComponentDescriptor>, WiringError>
where
    S: Fn(&ConfigNode) -> Result<&'s ComponentSchema, WiringError>,
{
    let entries = node.entries();
    let mut descriptors: Vec<ComponentDescriptor> = Vec::with_capacity(entries.len());

    for (index, entry) in entries.into_iter().enumerate() {
        // A failing entry claims nothing; only earlier entries need undoing
        let descriptor = match expand_one(entry, ids, &select) {
            Ok(descriptor) => descriptor,
            Err(e) => {
                for done in &descriptors {
                    ids.release(done.identifier());
                }
                return Err(e.in_entry(kind, index));
            }
        };
        debug!(
            "{}[{}] -> {} ({})",
            kind,
            index,
            descriptor.identifier(),
            descriptor.component_type()
        );
        descriptors.push(descriptor);
    }

    Ok(descriptors)
}

fn expand_one<'s, S>(
    entry: &ConfigNode,
    ids: &mut IdentifierRegistry,
    select: &S,
) -> Result<ComponentDescriptor, WiringError>
where
    S: Fn(&ConfigNode) -> Result<&'s ComponentSchema, WiringError>,
{
    let schema = select(entry)?;
    let explicit = schema::explicit_identifier(entry)?;
    let descriptor = schema::validate(entry, schema, ids)?;
    if let Some(id) = explicit {
        ids.claim(id)?;
    }
    Ok(descriptor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::Identifier;
    use crate::types::ComponentType;

    fn id(s: &str) -> Identifier {
        Identifier::new(s).expect("valid identifier") // test: known-good input
    }

    fn storage_entry(id: &str, prefix: &str) -> ConfigNode {
        ConfigNode::mapping([
            ("platform", ConfigNode::from("sd_mmc")),
            ("id", ConfigNode::from(id)),
            ("path_prefix", ConfigNode::from(prefix)),
            ("sd_mmc_id", ConfigNode::from("card0")),
        ])
    }

    fn expand_storage(
        node: &ConfigNode,
        ids: &mut IdentifierRegistry,
    ) -> Result<Vec<ComponentDescriptor>, WiringError> {
        let catalog = SchemaCatalog::builtin();
        expand(ComponentKind::Storage, node, |p| catalog.for_platform(p), ids)
    }

    #[test]
    fn test_expand_preserves_declaration_order() {
        let mut ids = IdentifierRegistry::new();
        let list = ConfigNode::Sequence(vec![
            storage_entry("b", "/b"),
            storage_entry("a", "/a"),
            storage_entry("c", "/c"),
        ]);

        let descriptors = expand_storage(&list, &mut ids).unwrap();

        let order: Vec<&str> = descriptors.iter().map(|d| d.identifier().as_str()).collect();
        assert_eq!(order, vec!["b", "a", "c"]);
        assert_eq!(ids.len(), 3);
    }

    #[test]
    fn test_expand_duplicate_identifier_at_second_entry() {
        let mut ids = IdentifierRegistry::new();
        let list = ConfigNode::Sequence(vec![storage_entry("A", "/a"), storage_entry("A", "/b")]);

        let err = expand_storage(&list, &mut ids).unwrap_err();

        assert_eq!(
            err,
            WiringError::DuplicateIdentifier { identifier: id("A") }
                .in_entry(ComponentKind::Storage, 1)
        );
    }

    #[test]
    fn test_expand_fail_fast_reports_failing_position() {
        let mut ids = IdentifierRegistry::new();
        let bad = ConfigNode::mapping([
            ("platform", ConfigNode::from("sd_mmc")),
            ("path_prefix", ConfigNode::from("/bad")),
        ]);
        let list = ConfigNode::Sequence(vec![
            storage_entry("a", "/a"),
            storage_entry("b", "/b"),
            bad,
            storage_entry("d", "/d"),
        ]);

        let err = expand_storage(&list, &mut ids).unwrap_err();

        let WiringError::InEntry { index, ref source, .. } = err else {
            panic!("expected an entry error, got {err:?}");
        };
        assert_eq!(index, 2);
        assert!(matches!(**source, WiringError::MissingField { ref field, .. } if field == "sd_mmc_id"));
    }

    #[test]
    fn test_expand_failure_releases_earlier_claims() {
        let mut ids = IdentifierRegistry::new();
        ids.claim(id("outside")).unwrap();
        let bad = ConfigNode::mapping([
            ("platform", ConfigNode::from("sd_mmc")),
            ("id", ConfigNode::from("c")),
            ("path_prefix", ConfigNode::from("")),
            ("sd_mmc_id", ConfigNode::from("card0")),
        ]);
        let list = ConfigNode::Sequence(vec![
            storage_entry("a", "/a"),
            ConfigNode::mapping([
                ("platform", ConfigNode::from("sd_mmc")),
                ("path_prefix", ConfigNode::from("/gen")),
                ("sd_mmc_id", ConfigNode::from("card0")),
            ]),
            bad,
        ]);

        let err = expand_storage(&list, &mut ids).unwrap_err();
        assert!(matches!(err, WiringError::InEntry { index: 2, .. }));
        assert_eq!(ids.len(), 1);
        assert!(ids.is_claimed(&id("outside")));
        assert!(!ids.is_claimed(&id("a")));
        assert!(!ids.is_claimed(&id("sd_mmc_storage_id")));

        // The same ids are available to a corrected list
        let fixed = ConfigNode::Sequence(vec![
            storage_entry("a", "/a"),
            storage_entry("c", "/c"),
        ]);
        let descriptors = expand_storage(&fixed, &mut ids).unwrap();
        assert_eq!(descriptors.len(), 2);
        assert_eq!(ids.allocate(ComponentType::SdMmcStorage), id("sd_mmc_storage_id"));
    }

    #[test]
    fn test_expand_duplicate_does_not_release_first_owner() {
        let mut ids = IdentifierRegistry::new();
        ids.claim(id("A")).unwrap();

        let err = expand_storage(&storage_entry("A", "/a"), &mut ids).unwrap_err();
        assert_eq!(
            err.root_cause(),
            &WiringError::DuplicateIdentifier { identifier: id("A") }
        );
        assert!(ids.is_claimed(&id("A")));
    }

    #[test]
    fn test_expand_unknown_platform() {
        let mut ids = IdentifierRegistry::new();
        let list = ConfigNode::Sequence(vec![ConfigNode::mapping([
            ("platform", ConfigNode::from("littlefs")),
            ("path_prefix", ConfigNode::from("/a")),
        ])]);

        let err = expand_storage(&list, &mut ids).unwrap_err();

        assert!(matches!(
            err.root_cause(),
            WiringError::UnsupportedVariant { value, .. } if value == "littlefs"
        ));
        assert!(ids.is_empty());
    }

    #[test]
    fn test_expand_missing_platform() {
        let mut ids = IdentifierRegistry::new();
        let list = ConfigNode::Sequence(vec![ConfigNode::mapping([(
            "path_prefix",
            ConfigNode::from("/a"),
        )])]);

        let err = expand_storage(&list, &mut ids).unwrap_err();
        assert!(matches!(
            err.root_cause(),
            WiringError::MissingField { field, .. } if field == "platform"
        ));
    }

    #[test]
    fn test_expand_single_mapping_is_one_entry() {
        let mut ids = IdentifierRegistry::new();
        let descriptors = expand_storage(&storage_entry("sd", "sd"), &mut ids).unwrap();
        assert_eq!(descriptors.len(), 1);
    }

    #[test]
    fn test_expand_each_generates_distinct_ids() {
        let catalog = SchemaCatalog::builtin();
        let schema = catalog.get(ComponentType::SdMmcCard).unwrap();
        let mut ids = IdentifierRegistry::new();
        let list = ConfigNode::Sequence(vec![
            ConfigNode::Mapping(Vec::new()),
            ConfigNode::Mapping(Vec::new()),
        ]);

        let descriptors = expand_each(ComponentKind::SdMmcCard, &list, schema, &mut ids).unwrap();

        assert_eq!(descriptors[0].identifier(), &id("sd_mmc_card_id"));
        assert_eq!(descriptors[1].identifier(), &id("sd_mmc_card_id_2"));
    }

    #[test]
    fn test_expand_builtin_rejects_non_mapping_entry() {
        let catalog = SchemaCatalog::builtin();
        let mut ids = IdentifierRegistry::new();
        let list = ConfigNode::Sequence(vec![ConfigNode::from("host0")]);

        let err = expand_builtin(ComponentKind::SdmmcHost, &list, &catalog, &mut ids).unwrap_err();
        assert!(matches!(
            err.root_cause(),
            WiringError::InvalidValue { expected: ValueKind::Mapping, .. }
        ));
    }
}
