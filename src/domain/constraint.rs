//! Source-side version constraints
//!
//! A [`SourceConstraint`] is the conjunction of the comma-separated clauses
//! of a PEP 440 specifier (`>=1.2,!=1.3.*,<2`). Matching is evaluated
//! against concrete, known releases, so pre-releases are always admitted
//! when a clause allows them.

use crate::domain::Version;
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;

/// Clause comparator
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Comparator {
    Less,
    LessEqual,
    Equal,
    NotEqual,
    GreaterEqual,
    Greater,
    /// `~=`
    Compatible,
    /// `===`
    Arbitrary,
}

impl Comparator {
    /// Operator spelling
    pub fn as_str(&self) -> &'static str {
        match self {
            Comparator::Less => "<",
            Comparator::LessEqual => "<=",
            Comparator::Equal => "==",
            Comparator::NotEqual => "!=",
            Comparator::GreaterEqual => ">=",
            Comparator::Greater => ">",
            Comparator::Compatible => "~=",
            Comparator::Arbitrary => "===",
        }
    }

    /// Parse an operator token
    pub fn from_operator(op: &str) -> Option<Self> {
        match op {
            "<" => Some(Comparator::Less),
            "<=" => Some(Comparator::LessEqual),
            "==" => Some(Comparator::Equal),
            "!=" => Some(Comparator::NotEqual),
            ">=" => Some(Comparator::GreaterEqual),
            ">" => Some(Comparator::Greater),
            "~=" => Some(Comparator::Compatible),
            "===" => Some(Comparator::Arbitrary),
            _ => None,
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `(comparator, boundary)` clause
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Clause {
    pub comparator: Comparator,
    pub version: Version,
    /// `==V.*` / `!=V.*`
    pub wildcard: bool,
    /// Boundary as written, used by `===`
    pub raw: String,
}

impl Clause {
    pub fn new(comparator: Comparator, version: Version) -> Self {
        let raw = version.to_string();
        Self {
            comparator,
            version,
            wildcard: false,
            raw,
        }
    }

    /// `==V.*` or `!=V.*`
    pub fn wildcard(comparator: Comparator, version: Version) -> Self {
        let raw = format!("{}.*", version);
        Self {
            comparator,
            version,
            wildcard: true,
            raw,
        }
    }

    /// Whether `candidate` satisfies this clause under PEP 440 rules
    pub fn matches(&self, candidate: &Version) -> bool {
        let spec = &self.version;
        let ord = candidate.pep440_cmp(spec);
        match self.comparator {
            Comparator::Equal if self.wildcard => wildcard_match(spec, candidate),
            Comparator::NotEqual if self.wildcard => !wildcard_match(spec, candidate),
            Comparator::Equal => ord == Ordering::Equal,
            Comparator::NotEqual => ord != Ordering::Equal,
            Comparator::LessEqual => ord != Ordering::Greater,
            Comparator::GreaterEqual => ord != Ordering::Less,
            Comparator::Less => {
                ord == Ordering::Less
                    && !(!spec.is_prerelease()
                        && candidate.is_prerelease()
                        && candidate.base().pep440_cmp(&spec.base()) == Ordering::Equal)
            }
            Comparator::Greater => {
                ord == Ordering::Greater
                    && !(!spec.is_postrelease()
                        && candidate.is_postrelease()
                        && candidate.base().pep440_cmp(&spec.base()) == Ordering::Equal)
            }
            Comparator::Compatible => {
                let prefix = spec.truncated(spec.release().len().saturating_sub(1));
                ord != Ordering::Less && wildcard_match(&prefix, candidate)
            }
            Comparator::Arbitrary => {
                candidate.to_string().eq_ignore_ascii_case(self.raw.trim())
                    || candidate.target().eq_ignore_ascii_case(self.raw.trim())
            }
        }
    }
}

/// `candidate` shares the release segments of `prefix` (candidate padded with zeros)
fn wildcard_match(prefix: &Version, candidate: &Version) -> bool {
    prefix.epoch() == candidate.epoch()
        && prefix
            .release()
            .iter()
            .enumerate()
            .all(|(i, seg)| candidate.release().get(i).copied().unwrap_or(0) == *seg)
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.comparator, self.raw)
    }
}

/// Conjunction of clauses; the empty constraint matches every version
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct SourceConstraint {
    clauses: Vec<Clause>,
}

impl SourceConstraint {
    pub fn new(clauses: Vec<Clause>) -> Self {
        Self { clauses }
    }

    /// Constraint that matches everything
    pub fn any() -> Self {
        Self::default()
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Whether every clause accepts `version`
    pub fn matches(&self, version: &Version) -> bool {
        self.clauses.iter().all(|clause| clause.matches(version))
    }

    /// Conjoin another constraint
    pub fn and(mut self, other: SourceConstraint) -> Self {
        self.clauses.extend(other.clauses);
        self
    }
}

impl fmt::Display for SourceConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.clauses.iter().map(|c| c.to_string()).collect();
        f.write_str(&rendered.join(","))
    }
}
