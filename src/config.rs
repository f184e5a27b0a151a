//! Compile options and document loading.
//!
//! Options are stored as JSON and can be overridden from the command line.
//! Documents are JSON as well; `serde_json` is built with `preserve_order`
//! so mapping keys keep the order they were written in.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use strum::{Display, EnumString};

use crate::identifier::Identifier;
use crate::node::ConfigNode;

/// Whether two storage front-ends may share a path prefix
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[derive(Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PrefixPolicy {
    /// Every prefix is mounted by exactly one front-end
    #[default]
    Unique,
    /// Prefixes may repeat; the last front-end mounted under one wins
    Shared,
}

/// Options for one compilation run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    pub prefix_policy: PrefixPolicy,
    /// Identifiers already defined outside the document (e.g. by hand-written
    /// code). The document may not declare them and generated ids avoid them.
    pub external_ids: Vec<String>,
}

impl CompileOptions {
    /// Create options with the defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Save options to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json =
            serde_json::to_string_pretty(self).context("Failed to serialize options to JSON")?;

        fs::write(&path, json)
            .with_context(|| format!("Failed to write options to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Load options from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read options from {:?}", path.as_ref()))?;

        let options: Self =
            serde_json::from_str(&content).context("Failed to parse options JSON")?;

        Ok(options)
    }

    /// Validate the options
    pub fn validate(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for raw in &self.external_ids {
            if Identifier::new(raw.as_str()).is_none() {
                anyhow::bail!("External id '{}' is not a valid identifier", raw);
            }
            if !seen.insert(raw.as_str()) {
                anyhow::bail!("External id '{}' is listed more than once", raw);
            }
        }
        Ok(())
    }

    /// External ids as identifiers; invalid entries are skipped, call
    /// `validate` first to reject them
    pub fn external_identifiers(&self) -> Vec<Identifier> {
        self.external_ids
            .iter()
            .filter_map(|raw| Identifier::new(raw.as_str()))
            .collect()
    }
}

/// Load a configuration document from a JSON file
pub fn load_document<P: AsRef<Path>>(path: P) -> Result<ConfigNode> {
    let content = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read document from {:?}", path.as_ref()))?;

    let value: serde_json::Value =
        serde_json::from_str(&content).context("Failed to parse document JSON")?;

    Ok(ConfigNode::from(value))
}
