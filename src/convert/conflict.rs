//! Conflict detection between aggregated entries
//!
//! Two entries for the same entity conflict when some build satisfies
//! both of their conditions while their version ranges share no version.
//! Only entries of the same entity are compared.

use crate::domain::{ConflictRecord, DependencyEntry};
use std::collections::BTreeMap;

/// All conflicting pairs, each reported once with the smaller entry first
pub fn detect_conflicts(entries: &[DependencyEntry]) -> Vec<ConflictRecord> {
    let mut by_entity: BTreeMap<&str, Vec<&DependencyEntry>> = BTreeMap::new();
    for entry in entries {
        by_entity.entry(entry.entity.as_str()).or_default().push(entry);
    }

    let mut conflicts = Vec::new();
    for group in by_entity.values() {
        for (i, a) in group.iter().enumerate() {
            for b in &group[i + 1..] {
                if a == b || !a.when.intersects(&b.when) || a.range.intersects(&b.range) {
                    continue;
                }
                let (first, second) = if a <= b { (*a, *b) } else { (*b, *a) };
                conflicts.push(ConflictRecord {
                    first: first.clone(),
                    second: second.clone(),
                    overlap: describe_overlap(first, second),
                });
            }
        }
    }

    conflicts.sort();
    conflicts.dedup();
    conflicts
}

fn describe_overlap(first: &DependencyEntry, second: &DependencyEntry) -> String {
    let conditions: Vec<String> = [&first.when, &second.when]
        .iter()
        .filter(|w| !w.is_unconstrained())
        .map(|w| format!("\"{}\"", w))
        .collect();
    if conditions.is_empty() {
        "every build".to_string()
    } else {
        conditions.join(" and ")
    }
}
