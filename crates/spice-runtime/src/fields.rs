//! Ordered registry of canonical field names.

use std::collections::HashSet;

use spice_manifest::PodManifest;
use tracing::warn;

/// Canonical field names in declaration order: data-source groups first (each
/// group's fields in order), then root-declared `local.` fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldRegistry {
    ordered: Vec<String>,
    index: HashSet<String>,
}

impl FieldRegistry {
    pub fn from_manifest(manifest: &PodManifest) -> Self {
        let grouped = manifest
            .data_sources
            .iter()
            .flat_map(|group| group.qualified_field_names());
        let mut registry = Self::default();
        for name in grouped.chain(manifest.local_field_names()) {
            if !registry.push(name.clone()) {
                warn!(pod = %manifest.name, field = %name, "duplicate field declaration ignored");
            }
        }
        registry
    }

    /// Append a name; returns false if it was already present.
    fn push(&mut self, name: String) -> bool {
        if self.index.contains(&name) {
            return false;
        }
        self.index.insert(name.clone());
        self.ordered.push(name);
        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains(name)
    }

    pub fn names(&self) -> &[String] {
        &self.ordered
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ordered.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }
}

impl<'a> IntoIterator for &'a FieldRegistry {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.ordered.iter()
    }
}
