//! Whole-document compilation
//!
//! A document is a mapping from component family (`sdmmc_host`,
//! `sd_mmc_card`, `storage`) to one entry or a list of entries. Compiling it
//! runs five passes:
//!
//! 1. Reserve every explicit id, so generated ids never take a name that a
//!    later entry declares
//! 2. Validate and expand every entry, families in document order
//! 3. Check path prefixes against the `PrefixPolicy`
//! 4. Resolve the dependency graph
//! 5. Emit the initialization sequence
//!
//! Any failure aborts the document; no operations are produced for it.

use std::collections::HashMap;
use std::str::FromStr;
use tracing::{debug, info};

use crate::catalog::SchemaCatalog;
use crate::config::{CompileOptions, PrefixPolicy};
use crate::engine::emitter::{self, InitSequence};
use crate::error::WiringError;
use crate::identifier::{Identifier, IdentifierRegistry};
use crate::logic::coordinator;
use crate::logic::resolver::{self, ResolvedPlan};
use crate::node::ConfigNode;
use crate::registry::{ComponentRegistry, RegistryError};
use crate::schema::{self, ComponentDescriptor};
use crate::types::{ComponentKind, ValueKind};

/// Result of compiling one document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledDocument {
    plan: ResolvedPlan,
    operations: InitSequence,
}

impl CompiledDocument {
    /// Descriptors in instantiation order
    pub fn plan(&self) -> &ResolvedPlan {
        &self.plan
    }

    pub fn operations(&self) -> &InitSequence {
        &self.operations
    }

    /// Replay the operations into a fresh component registry
    pub fn instantiate(&self) -> Result<ComponentRegistry, RegistryError> {
        ComponentRegistry::from_sequence(&self.operations)
    }
}

/// Compile a document with the built-in schema catalog
pub fn compile(root: &ConfigNode, options: &CompileOptions) -> Result<CompiledDocument, WiringError> {
    compile_with(root, options, &SchemaCatalog::builtin())
}

/// Compile a document against `catalog`.
///
/// # Errors
///
/// - `InvalidValue` if the root is not a mapping
/// - `UnknownComponent` for a top-level key that names no family
/// - `DuplicatePathPrefix` when two front-ends share a prefix under
///   `PrefixPolicy::Unique`
/// - anything `expand` or `resolve` reports
pub fn compile_with(
    root: &ConfigNode,
    options: &CompileOptions,
    catalog: &SchemaCatalog,
) -> Result<CompiledDocument, WiringError> {
    let families = parse_families(root)?;

    let mut ids = IdentifierRegistry::new();
    for external in options.external_identifiers() {
        ids.claim(external)?;
    }
    reserve_explicit_ids(&families, &mut ids);

    let mut descriptors = Vec::new();
    for (kind, node) in &families {
        let expanded = coordinator::expand_builtin(*kind, node, catalog, &mut ids)?;
        debug!("Expanded {} {} entries", expanded.len(), kind);
        descriptors.extend(expanded);
    }

    if options.prefix_policy == PrefixPolicy::Unique {
        check_unique_prefixes(&descriptors)?;
    }

    let plan = resolver::resolve(descriptors)?;
    let operations = emitter::emit(&plan);

    info!(
        "Compiled {} components into {} operations",
        plan.len(),
        operations.len()
    );

    Ok(CompiledDocument { plan, operations })
}

fn parse_families(root: &ConfigNode) -> Result<Vec<(ComponentKind, &ConfigNode)>, WiringError> {
    let pairs = root.as_mapping().ok_or_else(|| WiringError::InvalidValue {
        field: "document".to_string(),
        value: root.to_string(),
        expected: ValueKind::Mapping,
    })?;

    pairs
        .iter()
        .map(|(key, node)| {
            ComponentKind::from_str(key)
                .map(|kind| (kind, node))
                .map_err(|_| WiringError::UnknownComponent { key: key.clone() })
        })
        .collect()
}

/// Malformed ids are skipped here; validation reports them in pass 2.
fn reserve_explicit_ids(families: &[(ComponentKind, &ConfigNode)], ids: &mut IdentifierRegistry) {
    for (_, node) in families {
        for entry in node.entries() {
            if let Ok(Some(id)) = schema::explicit_identifier(entry) {
                ids.reserve(id);
            }
        }
    }
}

fn check_unique_prefixes(descriptors: &[ComponentDescriptor]) -> Result<(), WiringError> {
    let mut mounted: HashMap<&str, &Identifier> = HashMap::new();
    for desc in descriptors {
        let Some(prefix) = desc.path_prefix() else {
            continue;
        };
        if let Some(first) = mounted.insert(prefix, desc.identifier()) {
            return Err(WiringError::DuplicatePathPrefix {
                prefix: prefix.to_string(),
                first: first.clone(),
                second: desc.identifier().clone(),
            });
        }
    }
    Ok(())
}
