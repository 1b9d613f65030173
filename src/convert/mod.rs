//! Dependency and version conversion engine
//!
//! Everything in this module is pure: inputs are fully materialised
//! manifests and version lists, outputs are values plus diagnostics.
//!
//! - `translator`: source constraints to target ranges
//! - `marker_eval`: markers to when-conditions
//! - `aggregator`: per-release requirements to grouped entries
//! - `conflict`: co-applicable entries with disjoint ranges
//! - `builder`: final recipe assembly

mod aggregator;
mod builder;
mod catalog;
mod conflict;
mod marker_eval;
mod translator;

pub use aggregator::{aggregate, ReleaseRequirements};
pub use builder::{convert_package, AnalyzedRelease, PackageInput};
pub use catalog::{StaticCatalog, VersionCatalog};
pub use conflict::detect_conflicts;
pub use marker_eval::expand_marker;
pub use translator::{condense, matching_subset, translate};

use crate::domain::Version;

/// Interpreter versions used to resolve `python_version` markers and
/// `requires-python`, one per minor series
pub const DEFAULT_RUNTIME_VERSIONS: &[&str] = &[
    "3.6.15", "3.7.17", "3.8.18", "3.9.18", "3.10.13", "3.11.7", "3.12.1", "3.13.0", "4.0.0",
];

/// Default number of newest releases analyzed per package
pub const DEFAULT_VERSIONS_PER_PACKAGE: usize = 10;

/// Parsed [`DEFAULT_RUNTIME_VERSIONS`]
pub fn default_runtime_versions() -> Vec<Version> {
    DEFAULT_RUNTIME_VERSIONS
        .iter()
        .filter_map(|s| Version::parse(s).ok())
        .collect()
}

/// Engine parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionConfig {
    /// Newest releases aggregated per package
    pub max_versions_per_package: usize,
    /// Known interpreter versions, ascending
    pub runtime_versions: Vec<Version>,
    /// Whether dependency ranges may be unions of intervals
    pub allow_unions: bool,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            max_versions_per_package: DEFAULT_VERSIONS_PER_PACKAGE,
            runtime_versions: default_runtime_versions(),
            allow_unions: true,
        }
    }
}
