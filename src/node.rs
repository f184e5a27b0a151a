//! Already-parsed configuration tree
//!
//! Parsing human-authored syntax is someone else's job. This module only
//! describes the tree that parser hands over: mappings, sequences and
//! scalars. Mappings keep their keys in declaration order, which the
//! rest of the pipeline relies on for deterministic output.

use std::fmt;

/// One node of a parsed configuration document
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigNode {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Sequence(Vec<ConfigNode>),
    /// Key/value pairs in declaration order
    Mapping(Vec<(String, ConfigNode)>),
}

impl ConfigNode {
    /// Build a mapping node from key/value pairs, keeping their order
    pub fn mapping<K, I>(pairs: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, ConfigNode)>,
    {
        Self::Mapping(pairs.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Look up a key in a mapping node
    pub fn get(&self, key: &str) -> Option<&ConfigNode> {
        match self {
            Self::Mapping(pairs) => pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&[(String, ConfigNode)]> {
        match self {
            Self::Mapping(pairs) => Some(pairs),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// View a node as a list of entries: sequences as-is, anything else
    /// as a one-element list
    pub fn entries(&self) -> Vec<&ConfigNode> {
        match self {
            Self::Sequence(items) => items.iter().collect(),
            other => vec![other],
        }
    }
}

impl fmt::Display for ConfigNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Float(x) => write!(f, "{}", x),
            Self::String(s) => write!(f, "{}", s),
            Self::Sequence(items) => write!(f, "<sequence of {}>", items.len()),
            Self::Mapping(pairs) => write!(f, "<mapping of {}>", pairs.len()),
        }
    }
}

impl From<serde_json::Value> for ConfigNode {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Integer(i),
                None => Self::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => Self::String(s),
            Value::Array(items) => Self::Sequence(items.into_iter().map(Self::from).collect()),
            Value::Object(map) => {
                Self::Mapping(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

impl From<&str> for ConfigNode {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for ConfigNode {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for ConfigNode {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<bool> for ConfigNode {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}
