//! Name to expression tables projected from a manifest.
//!
//! Expressions are opaque text for an external evaluator; nothing here parses
//! or checks them against the field registry.

use indexmap::IndexMap;
use serde::Serialize;
use spice_manifest::PodManifest;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ExpressionTable(IndexMap<String, String>);

impl ExpressionTable {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// True when `name` is present with an empty body.
    pub fn is_noop(&self, name: &str) -> bool {
        self.get(name).is_some_and(str::is_empty)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &IndexMap<String, String> {
        &self.0
    }
}

impl From<IndexMap<String, String>> for ExpressionTable {
    fn from(map: IndexMap<String, String>) -> Self {
        Self(map)
    }
}

/// Reward and action tables for one pod.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExpressionTables {
    pub rewards: ExpressionTable,
    pub actions: ExpressionTable,
}

impl ExpressionTables {
    pub fn from_manifest(manifest: &PodManifest) -> Self {
        Self {
            rewards: manifest.rewards.clone().into(),
            actions: manifest.actions.clone().into(),
        }
    }
}
