//! Aggregated output of one package conversion

use super::{recipe_name, Diagnostic, DependencyClass, TargetRange, Version, WhenCondition};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Source archive checksum
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Checksum {
    /// Hash algorithm, e.g. `sha256`
    pub algorithm: String,
    pub digest: String,
}

impl Checksum {
    pub fn sha256(digest: impl Into<String>) -> Self {
        Self {
            algorithm: "sha256".to_string(),
            digest: digest.into(),
        }
    }
}

/// A recipe version line
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct VersionChecksum {
    pub version: Version,
    pub checksum: Option<Checksum>,
}

/// Person listed in the manifest
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Person {
    pub name: Option<String>,
    pub email: Option<String>,
}

impl fmt::Display for Person {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.name, &self.email) {
            (Some(name), Some(email)) => write!(f, "{}, {}", name, email),
            (Some(name), None) => f.write_str(name),
            (None, Some(email)) => f.write_str(email),
            (None, None) => Ok(()),
        }
    }
}

/// Where the recipe downloads sources from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RecipeSource {
    /// `pypi = "name/name-1.0.tar.gz"`
    Pypi { path: String },
    /// Download URL plus repository
    Git { url: String, git: String },
}

/// One aggregated dependency line
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct DependencyEntry {
    /// Normalised index name of the dependency
    pub entity: String,
    pub range: TargetRange,
    pub extras: BTreeSet<String>,
    pub class: DependencyClass,
    pub when: WhenCondition,
    /// Warnings that concern only this entry
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

impl DependencyEntry {
    /// Dependency spec, e.g. `py-foo@1.2:+socks`
    pub fn spec(&self) -> String {
        let mut spec = recipe_name(&self.entity);
        if !self.range.is_any() {
            spec.push('@');
            spec.push_str(&self.range.to_string());
        }
        for extra in &self.extras {
            spec.push('+');
            spec.push_str(extra);
        }
        spec
    }

    pub fn is_runtime_itself(&self) -> bool {
        self.entity == "python"
    }
}

impl fmt::Display for DependencyEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.when.is_unconstrained() {
            write!(f, "\"{}\"", self.spec())
        } else {
            write!(f, "\"{}\" when=\"{}\"", self.spec(), self.when)
        }
    }
}

/// Two co-applicable entries that cannot both hold
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct ConflictRecord {
    pub first: DependencyEntry,
    pub second: DependencyEntry,
    /// Where both entries apply
    pub overlap: String,
}

impl fmt::Display for ConflictRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} and {} both apply for {}",
            self.first, self.second, self.overlap
        )
    }
}

/// Final, immutable conversion result for one package
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageRecipe {
    /// Normalised index name
    pub name: String,
    pub recipe_name: String,
    pub class_name: String,
    pub description: Option<String>,
    pub homepage: Option<String>,
    pub source: Option<RecipeSource>,
    pub authors: Vec<Person>,
    pub maintainers: Vec<Person>,
    pub license: Option<String>,
    /// Newest first
    pub versions: Vec<VersionChecksum>,
    pub variants: BTreeSet<String>,
    pub entries: BTreeMap<DependencyClass, Vec<DependencyEntry>>,
    pub conflicts: Vec<ConflictRecord>,
    pub diagnostics: Vec<Diagnostic>,
}

impl PackageRecipe {
    /// Whether a human should look at the recipe before using it
    pub fn needs_review(&self) -> bool {
        !self.diagnostics.is_empty()
            || !self.conflicts.is_empty()
            || self.all_entries().any(|e| !e.diagnostics.is_empty())
            || self.versions.iter().any(|v| v.checksum.is_none())
    }

    pub fn all_entries(&self) -> impl Iterator<Item = &DependencyEntry> {
        self.entries.values().flatten()
    }

    /// Dependency names (normalised) other than the interpreter
    pub fn dependency_names(&self) -> BTreeSet<String> {
        self.all_entries()
            .filter(|e| !e.is_runtime_itself())
            .map(|e| e.entity.clone())
            .collect()
    }
}
