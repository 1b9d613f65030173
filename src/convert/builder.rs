//! Recipe assembly for one package
//!
//! Takes the analyzed releases of a package, runs aggregation and conflict
//! detection, and assembles a [`PackageRecipe`] whose ordering depends only
//! on the set of inputs.

use super::aggregator::{aggregate, ReleaseRequirements};
use super::catalog::VersionCatalog;
use super::conflict::detect_conflicts;
use super::ConversionConfig;
use crate::domain::{
    class_name, normalize_name, recipe_name, Checksum, DependencyClass, DependencyEntry,
    Diagnostic, PackageRecipe, RecipeSource, Version, VersionChecksum,
};
use crate::error::ConversionError;
use crate::manifest::ReleaseManifest;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Build backends whose native build graph cannot be expressed declaratively
const COMPILED_BACKENDS: &[&str] = &["scikit_build_core.build", "mesonpy", "maturin"];

/// One release with its decoded manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzedRelease {
    pub version: Version,
    pub manifest: ReleaseManifest,
    pub checksum: Option<Checksum>,
}

/// Everything the engine needs to convert one package
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageInput {
    pub name: String,
    pub releases: Vec<AnalyzedRelease>,
    /// Every known version of the package, analyzed or not. Host ranges
    /// are condensed over this list plus the analyzed releases.
    pub host_versions: Vec<Version>,
    /// Releases that could not be fetched or decoded
    pub release_failures: Vec<Diagnostic>,
    pub source: Option<RecipeSource>,
}

/// Convert one package into its recipe.
///
/// Fails only when no release could be analyzed; every other problem is a
/// diagnostic on the returned recipe.
pub fn convert_package<C: VersionCatalog + ?Sized>(
    input: &PackageInput,
    catalog: &C,
    config: &ConversionConfig,
) -> Result<PackageRecipe, ConversionError> {
    let mut releases: Vec<&AnalyzedRelease> = input.releases.iter().collect();
    releases.sort_by(|a, b| b.version.cmp(&a.version).then_with(|| a.checksum.cmp(&b.checksum)));
    releases.dedup_by(|a, b| a.version == b.version);
    releases.truncate(config.max_versions_per_package.max(1));

    let Some(newest) = releases.first() else {
        return Err(ConversionError::NoReleases {
            package: input.name.clone(),
        });
    };

    let per_release: Vec<ReleaseRequirements> = releases
        .iter()
        .map(|release| {
            let (requirements, diagnostics) = release.manifest.requirements().into_parts();
            ReleaseRequirements {
                host_version: release.version.clone(),
                requirements,
                diagnostics,
            }
        })
        .collect();

    let (entries, mut diagnostics) =
        aggregate(&per_release, catalog, &input.host_versions, config).into_parts();
    let conflicts = detect_conflicts(&entries);

    diagnostics.extend(input.release_failures.iter().cloned());
    diagnostics.extend(compiled_backend_warnings(&releases));
    diagnostics.sort();
    diagnostics.dedup();

    let mut variants: BTreeSet<String> = releases
        .iter()
        .flat_map(|r| r.manifest.extras())
        .collect();
    variants.extend(
        entries
            .iter()
            .flat_map(|e| e.when.variants.keys().cloned()),
    );

    let mut by_class: BTreeMap<DependencyClass, Vec<DependencyEntry>> = BTreeMap::new();
    for entry in entries {
        by_class.entry(entry.class).or_default().push(entry);
    }
    for list in by_class.values_mut() {
        list.sort_by(recipe_order);
    }

    let versions = releases
        .iter()
        .map(|r| VersionChecksum {
            version: r.version.clone(),
            checksum: r.checksum.clone(),
        })
        .collect();

    let name = normalize_name(&input.name);
    let recipe_name = recipe_name(&name);
    let metadata = &newest.manifest;

    debug!(
        package = %name,
        releases = releases.len(),
        conflicts = conflicts.len(),
        diagnostics = diagnostics.len(),
        "assembled recipe"
    );

    Ok(PackageRecipe {
        class_name: class_name(&recipe_name),
        recipe_name,
        name,
        description: metadata.description.clone(),
        homepage: metadata.homepage.clone(),
        source: input.source.clone(),
        authors: metadata.authors.clone(),
        maintainers: metadata.maintainers.clone(),
        license: metadata.license.clone(),
        versions,
        variants,
        entries: by_class,
        conflicts,
        diagnostics,
    })
}

/// Interpreter first, then unconditional-on-variants entries, then by
/// entity, range and condition
fn recipe_order(a: &DependencyEntry, b: &DependencyEntry) -> Ordering {
    let key = |e: &DependencyEntry| (!e.is_runtime_itself(), e.when.enabled_variants().next().is_some());
    key(a)
        .cmp(&key(b))
        .then_with(|| a.entity.cmp(&b.entity))
        .then_with(|| a.range.cmp(&b.range))
        .then_with(|| a.when.cmp(&b.when))
        .then_with(|| a.cmp(b))
}

fn compiled_backend_warnings(releases: &[&AnalyzedRelease]) -> Vec<Diagnostic> {
    releases
        .iter()
        .filter_map(|release| {
            let backend = release.manifest.build_backend.as_deref()?;
            COMPILED_BACKENDS.contains(&backend).then(|| {
                Diagnostic::approximate(format!(
                    "build backend '{}' compiles native extensions; add their build dependencies manually",
                    backend
                ))
            })
        })
        .collect()
}
