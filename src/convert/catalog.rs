//! Pre-materialised version lists
//!
//! The conversion engine never performs I/O. Every version list it needs
//! is fetched up front by the caller and handed over through a
//! [`VersionCatalog`].

use crate::domain::{normalize_name, Version};
use std::collections::BTreeMap;

/// Read-only lookup of an entity's known versions (ascending)
pub trait VersionCatalog {
    fn versions(&self, entity: &str) -> Option<&[Version]>;
}

/// In-memory catalog keyed by normalised entity name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticCatalog {
    entries: BTreeMap<String, Vec<Version>>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a version list; it is sorted and de-duplicated
    pub fn insert(&mut self, entity: &str, mut versions: Vec<Version>) {
        versions.sort();
        versions.dedup();
        self.entries.insert(normalize_name(entity), versions);
    }

    /// Builder-style insert
    pub fn with(mut self, entity: &str, versions: Vec<Version>) -> Self {
        self.insert(entity, versions);
        self
    }

    pub fn contains(&self, entity: &str) -> bool {
        self.entries.contains_key(&normalize_name(entity))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl VersionCatalog for StaticCatalog {
    fn versions(&self, entity: &str) -> Option<&[Version]> {
        self.entries
            .get(&normalize_name(entity))
            .map(|v| v.as_slice())
    }
}
