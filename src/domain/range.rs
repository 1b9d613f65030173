//! Target-side version ranges
//!
//! Ranges use recipe semantics: bounds compare with
//! [`Version::recipe_cmp`], and an inclusive upper bound that is not a
//! pre-release also admits every version it prefixes, so `:4.2` contains
//! `4.2.1` and `4.2.dev0` while the source clause `<=4.2` contains neither.

use crate::domain::Version;
use crate::error::ParseError;
use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// One `lower:upper` interval; absent bounds are open
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VersionInterval {
    pub lower: Option<Version>,
    pub upper: Option<Version>,
}

impl VersionInterval {
    pub fn new(lower: Option<Version>, upper: Option<Version>) -> Self {
        Self { lower, upper }
    }

    /// Interval containing a single release (and whatever it prefixes)
    pub fn exact(version: Version) -> Self {
        Self {
            lower: Some(version.clone()),
            upper: Some(version),
        }
    }

    pub fn contains(&self, version: &Version) -> bool {
        self.lower
            .as_ref()
            .map_or(true, |lower| lower.recipe_cmp(version) != Ordering::Greater)
            && upper_admits(self.upper.as_ref(), version)
    }

    /// Symbolic intersection test. The set below an upper bound is
    /// downward closed, so two intervals meet iff the larger lower bound
    /// sits below both upper bounds.
    pub fn intersects(&self, other: &VersionInterval) -> bool {
        let lower = match (&self.lower, &other.lower) {
            (None, None) => return true,
            (Some(a), None) => a,
            (None, Some(b)) => b,
            (Some(a), Some(b)) => match a.recipe_cmp(b) {
                Ordering::Less => b,
                _ => a,
            },
        };
        upper_admits(self.upper.as_ref(), lower) && upper_admits(other.upper.as_ref(), lower)
    }
}

fn upper_admits(upper: Option<&Version>, version: &Version) -> bool {
    match upper {
        None => true,
        Some(upper) => {
            version.recipe_cmp(upper) != Ordering::Greater || upper.is_prefix_of(version)
        }
    }
}

impl fmt::Display for VersionInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.lower, &self.upper) {
            (Some(lo), Some(hi)) if lo == hi => write!(f, "{}", lo.target()),
            (Some(lo), Some(hi)) => write!(f, "{}:{}", lo.target(), hi.target()),
            (Some(lo), None) => write!(f, "{}:", lo.target()),
            (None, Some(hi)) => write!(f, ":{}", hi.target()),
            (None, None) => f.write_str(":"),
        }
    }
}

/// `Any` or a sorted union of intervals
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TargetRange {
    #[default]
    Any,
    Union(Vec<VersionInterval>),
}

impl TargetRange {
    /// Build a union; intervals are sorted so equal sets compare equal
    pub fn union(mut intervals: Vec<VersionInterval>) -> Self {
        intervals.sort();
        intervals.dedup();
        TargetRange::Union(intervals)
    }

    pub fn exact(version: Version) -> Self {
        TargetRange::Union(vec![VersionInterval::exact(version)])
    }

    pub fn is_any(&self) -> bool {
        matches!(self, TargetRange::Any)
    }

    pub fn intervals(&self) -> &[VersionInterval] {
        match self {
            TargetRange::Any => &[],
            TargetRange::Union(intervals) => intervals,
        }
    }

    pub fn contains(&self, version: &Version) -> bool {
        match self {
            TargetRange::Any => true,
            TargetRange::Union(intervals) => intervals.iter().any(|i| i.contains(version)),
        }
    }

    /// Whether some version could satisfy both ranges
    pub fn intersects(&self, other: &TargetRange) -> bool {
        match (self, other) {
            (TargetRange::Any, TargetRange::Any) => true,
            (TargetRange::Any, TargetRange::Union(u)) | (TargetRange::Union(u), TargetRange::Any) => {
                !u.is_empty()
            }
            (TargetRange::Union(a), TargetRange::Union(b)) => a
                .iter()
                .any(|left| b.iter().any(|right| left.intersects(right))),
        }
    }

    /// Members of `versions` admitted by this range, in input order
    pub fn filter<'a>(&self, versions: &'a [Version]) -> Vec<&'a Version> {
        versions.iter().filter(|v| self.contains(v)).collect()
    }
}

impl fmt::Display for TargetRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetRange::Any => Ok(()),
            TargetRange::Union(intervals) => {
                let rendered: Vec<String> = intervals.iter().map(|i| i.to_string()).collect();
                f.write_str(&rendered.join(","))
            }
        }
    }
}

impl FromStr for TargetRange {
    type Err = ParseError;

    /// Parse the recipe form (`1.0:2.0,3.1`, `:4`, `2:`); empty input is `Any`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Ok(TargetRange::Any);
        }
        let bound = |part: &str| -> Result<Option<Version>, ParseError> {
            let part = part.trim();
            if part.is_empty() {
                Ok(None)
            } else {
                Version::parse(part).map(Some)
            }
        };
        let intervals = s
            .split(',')
            .map(|piece| match piece.split_once(':') {
                Some((lo, hi)) => Ok(VersionInterval::new(bound(lo)?, bound(hi)?)),
                None => Version::parse(piece.trim()).map(VersionInterval::exact),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(TargetRange::union(intervals))
    }
}

impl Serialize for TargetRange {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
