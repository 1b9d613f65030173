//! PEP 440 specifier parser
//!
//! Handles clause formats:
//! - Comparison: `>=1.2.3`, `>1.2.3`, `<=1.2.3`, `<1.2.3`, `!=1.2.3`
//! - Exact and wildcard: `==1.2.3`, `==1.2.*`, `!=1.2.*`
//! - Compatible release: `~=1.2.3`
//! - Arbitrary equality: `===foobar`
//! - Conjunction: `>=1.0, <2.0`

use crate::domain::{Clause, Comparator, SourceConstraint, Version};
use crate::error::ParseError;
use regex::Regex;
use std::sync::LazyLock;

static CLAUSE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(===|~=|==|!=|<=|>=|<|>)\s*(\S+)$").unwrap());

/// Parse a comma-separated specifier; the empty string matches everything
pub fn parse_constraint(input: &str) -> Result<SourceConstraint, ParseError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(SourceConstraint::any());
    }

    let clauses = trimmed
        .split(',')
        .map(|part| parse_clause(part.trim(), input))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(SourceConstraint::new(clauses))
}

fn parse_clause(clause: &str, input: &str) -> Result<Clause, ParseError> {
    let caps = CLAUSE_RE
        .captures(clause)
        .ok_or_else(|| ParseError::invalid_specifier(input, format!("bad clause '{}'", clause)))?;

    let op = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
    let boundary = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
    let comparator = Comparator::from_operator(op)
        .ok_or_else(|| ParseError::invalid_specifier(input, format!("unknown operator '{}'", op)))?;

    if comparator == Comparator::Arbitrary {
        let version = Version::parse(boundary).map_err(|_| {
            ParseError::invalid_specifier(input, "arbitrary equality needs a version-like value")
        })?;
        let mut parsed = Clause::new(comparator, version);
        parsed.raw = boundary.to_string();
        return Ok(parsed);
    }

    if let Some(prefix) = boundary.strip_suffix(".*") {
        if !matches!(comparator, Comparator::Equal | Comparator::NotEqual) {
            return Err(ParseError::invalid_specifier(
                input,
                format!("wildcard not allowed with '{}'", op),
            ));
        }
        let version = Version::parse(prefix)?;
        if !version.is_release_only() {
            return Err(ParseError::invalid_specifier(
                input,
                "wildcard prefix must be a plain release",
            ));
        }
        return Ok(Clause::wildcard(comparator, version));
    }

    let version = Version::parse(boundary)?;
    if comparator == Comparator::Compatible && version.release().len() < 2 {
        return Err(ParseError::invalid_specifier(
            input,
            "'~=' needs at least two release segments",
        ));
    }
    Ok(Clause::new(comparator, version))
}
