//! Dependency aggregation across releases
//!
//! Every requirement of every analyzed release is converted into one
//! entry per marker branch. Entries that agree on entity, range, extras,
//! condition and class are merged, and the set of host releases they came
//! from is condensed into a host range on the entry's condition.

use super::catalog::VersionCatalog;
use super::marker_eval::expand_marker;
use super::translator::{condense, matching_subset, translate};
use super::ConversionConfig;
use crate::domain::{
    DependencyClass, DependencyEntry, DependencyRequirement, Diagnostic, Outcome, TargetRange,
    Version, WhenCondition,
};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Requirements declared by one analyzed host release
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseRequirements {
    pub host_version: Version,
    pub requirements: Vec<DependencyRequirement>,
    /// Problems found while decoding this release's manifest
    pub diagnostics: Vec<Diagnostic>,
}

impl ReleaseRequirements {
    pub fn new(host_version: Version, requirements: Vec<DependencyRequirement>) -> Self {
        Self {
            host_version,
            requirements,
            diagnostics: Vec::new(),
        }
    }
}

type BucketKey = (String, TargetRange, BTreeSet<String>, WhenCondition, DependencyClass);

#[derive(Default)]
struct Bucket {
    hosts: BTreeSet<Version>,
    diagnostics: BTreeSet<Diagnostic>,
}

/// Aggregate per-release requirements into grouped dependency entries.
///
/// `host_versions` is the host package's own known version list; the
/// releases' versions are added to it if missing. Per-requirement
/// failures are reported as diagnostics and the requirement is skipped.
pub fn aggregate<C: VersionCatalog + ?Sized>(
    releases: &[ReleaseRequirements],
    catalog: &C,
    host_versions: &[Version],
    config: &ConversionConfig,
) -> Outcome<Vec<DependencyEntry>> {
    let mut outcome = Outcome::new(Vec::new());
    let mut buckets: BTreeMap<BucketKey, Bucket> = BTreeMap::new();

    for release in releases {
        let host = &release.host_version;
        outcome.diagnostics.extend(release.diagnostics.iter().map(|d| {
            if d.host_version.is_none() {
                d.clone().with_host(host)
            } else {
                d.clone()
            }
        }));

        for requirement in &release.requirements {
            let text = requirement.to_string();
            let converted = convert_requirement(requirement, catalog, config);
            let (branches, diagnostics) = converted.into_parts();

            let Some((range, branches)) = branches else {
                outcome.diagnostics.extend(
                    diagnostics
                        .into_iter()
                        .map(|d| d.with_host(host).with_requirement(text.clone())),
                );
                continue;
            };

            if branches.is_empty() {
                debug!(requirement = %text, host = %host, "marker never holds, skipping");
            }

            for when in branches {
                let key = (
                    requirement.name.clone(),
                    range.clone(),
                    requirement.extras.clone(),
                    when,
                    requirement.class,
                );
                let bucket = buckets.entry(key).or_default();
                bucket.hosts.insert(host.clone());
                bucket.diagnostics.extend(
                    diagnostics
                        .iter()
                        .cloned()
                        .map(|d| d.with_requirement(text.clone())),
                );
            }
        }
    }

    let mut known_hosts: Vec<Version> = host_versions.to_vec();
    known_hosts.extend(releases.iter().map(|r| r.host_version.clone()));
    known_hosts.sort();
    known_hosts.dedup();

    for ((entity, range, extras, when, class), bucket) in buckets {
        let mut diagnostics: Vec<Diagnostic> = bucket.diagnostics.into_iter().collect();
        let host_range = condense(&bucket.hosts, &known_hosts);
        let (host_range, host_diagnostics) = host_range.into_parts();
        diagnostics.extend(host_diagnostics);
        let Some(host_range) = host_range else {
            continue;
        };

        outcome.value.push(DependencyEntry {
            entity,
            range,
            extras,
            class,
            when: when.with_host(host_range),
            diagnostics,
        });
    }

    outcome.value.sort();
    outcome.diagnostics.sort();
    outcome.diagnostics.dedup();
    debug!(
        entries = outcome.value.len(),
        diagnostics = outcome.diagnostics.len(),
        "aggregated dependencies"
    );
    outcome
}

/// Convert one requirement into its target range and marker branches.
/// `None` means the requirement must be dropped; the reason is in the
/// diagnostics.
fn convert_requirement<C: VersionCatalog + ?Sized>(
    requirement: &DependencyRequirement,
    catalog: &C,
    config: &ConversionConfig,
) -> Outcome<Option<(TargetRange, Vec<WhenCondition>)>> {
    let mut outcome = Outcome::new(None);

    let range = if requirement.constraint.is_empty() {
        TargetRange::Any
    } else {
        let versions = if requirement.is_runtime_itself() {
            Some(config.runtime_versions.as_slice())
        } else {
            catalog.versions(&requirement.name)
        };
        let Some(versions) = versions else {
            outcome.push(Diagnostic::unresolved(&requirement.name));
            return outcome;
        };

        let subset = matching_subset(&requirement.constraint, versions);
        let allow_unions = config.allow_unions || requirement.is_runtime_itself();
        match outcome.absorb(translate(&subset, versions, allow_unions)) {
            Some(range) => range,
            None => {
                for diagnostic in outcome.diagnostics.iter_mut() {
                    diagnostic.message = format!(
                        "no known version of '{}' satisfies '{}'",
                        requirement.name, requirement.constraint
                    );
                }
                return outcome;
            }
        }
    };

    let branches = match &requirement.marker {
        None => vec![WhenCondition::always()],
        Some(marker) => match expand_marker(marker, &config.runtime_versions) {
            Ok(expanded) => outcome.absorb(expanded),
            Err(err) => {
                outcome.push(Diagnostic::parse(err.to_string()));
                return outcome;
            }
        },
    };

    outcome.value = Some((range, branches));
    outcome
}
