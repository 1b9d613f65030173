//! Version set translation
//!
//! Source clauses and target ranges disagree on boundaries (`<=4.2`
//! excludes `4.2.1`, the range `:4.2` admits it), so constraints are never
//! translated clause by clause. Instead the matching subset of the known
//! versions is materialised and a range is synthesised from it:
//!
//! 1. Sort the known versions in recipe order, where `1.0.dev0` follows
//!    `1.0`, and split the list into maximal runs of matching versions
//! 2. Give every run the shortest lower and upper bound that keeps the
//!    neighbouring non-matching versions out
//! 3. Join the runs into a union
//!
//! The resulting range selects exactly the subset from the known list.
//! Releases published later are not covered by that guarantee. When the
//! recipe format cannot separate two neighbours (`1.0` selected, `1.0.dev0`
//! not) the closest range is returned with an approximate-translation
//! diagnostic naming the versions it gets wrong.

use crate::domain::{
    Diagnostic, Outcome, SourceConstraint, TargetRange, Version, VersionInterval,
};
use std::cmp::Ordering;
use std::collections::BTreeSet;

/// Versions from `versions` that satisfy `constraint`, in input order
pub fn matching_subset(constraint: &SourceConstraint, versions: &[Version]) -> Vec<Version> {
    versions
        .iter()
        .filter(|v| constraint.matches(v))
        .cloned()
        .collect()
}

/// Synthesise a range selecting exactly `subset` out of `versions`.
///
/// Returns `None` with an unsatisfiable diagnostic when nothing from
/// `versions` is selected, and [`TargetRange::Any`] when everything is.
/// A union of several intervals is always returned when needed; if
/// `allow_unions` is false an approximate-translation warning is attached.
pub fn translate(
    subset: &[Version],
    versions: &[Version],
    allow_unions: bool,
) -> Outcome<Option<TargetRange>> {
    let mut all: Vec<Version> = versions.to_vec();
    all.sort_by(|a, b| a.recipe_cmp(b).then_with(|| a.cmp(b)));
    all.dedup();
    let selected: BTreeSet<&Version> = subset.iter().collect();
    let included: Vec<bool> = all.iter().map(|v| selected.contains(v)).collect();

    let runs = runs(&included);
    if runs.is_empty() {
        return Outcome::with_diagnostics(
            None,
            vec![Diagnostic::unsatisfiable("no known version satisfies the constraint")],
        );
    }
    if runs.len() == 1 && runs[0] == (0, all.len() - 1) {
        return Outcome::new(Some(TargetRange::Any));
    }

    let mut outcome = Outcome::new(None);
    if runs.len() > 1 && !allow_unions {
        outcome.push(Diagnostic::approximate(format!(
            "matching versions form {} separate ranges",
            runs.len()
        )));
    }

    let intervals = runs
        .iter()
        .map(|&(start, end)| {
            let lower = (start > 0).then(|| lower_bound(&all[start - 1], &all[start]));
            let upper = (end + 1 < all.len()).then(|| upper_bound(&all[end], &all[end + 1]));
            VersionInterval::new(lower, upper)
        })
        .collect();
    let range = TargetRange::union(intervals);

    let mismatched: Vec<String> = all
        .iter()
        .zip(&included)
        .filter(|(v, inc)| range.contains(v) != **inc)
        .map(|(v, _)| v.to_string())
        .collect();
    if !mismatched.is_empty() {
        outcome.push(Diagnostic::approximate(format!(
            "range {} also selects or drops {}",
            range,
            mismatched.join(", ")
        )));
    }

    outcome.value = Some(range);
    outcome
}

/// Condense a set of versions (e.g. the host releases that declared a
/// dependency) into a range over `versions`
pub fn condense(subset: &BTreeSet<Version>, versions: &[Version]) -> Outcome<Option<TargetRange>> {
    let subset: Vec<Version> = subset.iter().cloned().collect();
    translate(&subset, versions, true)
}

/// Inclusive `(start, end)` index pairs of consecutive `true` values
fn runs(included: &[bool]) -> Vec<(usize, usize)> {
    let mut runs = Vec::new();
    let mut start = None;
    for (i, inc) in included.iter().enumerate() {
        match (start, *inc) {
            (None, true) => start = Some(i),
            (Some(s), false) => {
                runs.push((s, i - 1));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        runs.push((s, included.len() - 1));
    }
    runs
}

/// A candidate bound and its cost; lower cost wins
struct Candidate {
    version: Version,
    cost: (u8, usize, u8),
}

fn candidate(version: Version, rank: u8, exact: bool) -> Candidate {
    let len = version.release().len();
    Candidate {
        version,
        cost: (rank, len, u8::from(!exact)),
    }
}

/// Release-prefix candidates of `curr`, shortest first, plus `curr` itself
fn prefix_candidates(curr: &Version) -> Vec<Candidate> {
    let mut out: Vec<Candidate> = (1..=curr.release().len())
        .map(|k| curr.truncated(k))
        .filter(|t| t != curr)
        .map(|t| candidate(t, 0, false))
        .collect();
    out.push(candidate(curr.clone(), 0, true));
    out
}

fn cheapest(candidates: Vec<Candidate>, valid: impl Fn(&Version) -> bool) -> Option<Version> {
    candidates
        .into_iter()
        .filter(|c| valid(&c.version))
        .min_by(|a, b| a.cost.cmp(&b.cost))
        .map(|c| c.version)
}

/// Bound that admits `curr` but not `prev`
fn lower_bound(prev: &Version, curr: &Version) -> Version {
    cheapest(prefix_candidates(curr), |lo| {
        lo.recipe_cmp(prev) == Ordering::Greater && lo.recipe_cmp(curr) != Ordering::Greater
    })
    .unwrap_or_else(|| curr.clone())
}

/// Bound that admits `curr` but not `next`
fn upper_bound(curr: &Version, next: &Version) -> Version {
    let mut candidates = prefix_candidates(curr);
    if curr.is_release_only() {
        if next.release().len() > curr.release().len() {
            candidates.push(candidate(curr.zero_padded(next.release().len()), 0, false));
        }
        candidates.push(candidate(curr.dev_successor(), 1, false));
    }
    let single = |v: &Version| VersionInterval::new(None, Some(v.clone()));
    cheapest(candidates, |hi| {
        single(hi).contains(curr) && !single(hi).contains(next)
    })
    .unwrap_or_else(|| curr.clone())
}
