//! PEP 508 requirement parser
//!
//! Handles requirement formats:
//! - Bare name: `requests`
//! - Extras: `requests[socks,http2]`
//! - Specifier, optionally parenthesised: `requests>=2.0` or `requests (>=2.0)`
//! - Marker: `requests>=2.0; python_version < "3.8"`
//!
//! Direct URL references (`name @ https://...`) are rejected.

use super::{parse_constraint, parse_marker};
use crate::domain::{DependencyClass, DependencyRequirement};
use crate::error::ParseError;
use regex::Regex;
use std::sync::LazyLock;

static REQUIREMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([A-Za-z0-9](?:[A-Za-z0-9._-]*[A-Za-z0-9])?)\s*(?:\[([^\]]*)\])?\s*(.*?)\s*$")
        .unwrap()
});

/// Parse one requirement string into a [`DependencyRequirement`] of the given class
pub fn parse_requirement(
    input: &str,
    class: DependencyClass,
) -> Result<DependencyRequirement, ParseError> {
    let (head, marker) = match input.split_once(';') {
        Some((head, marker)) => (head, Some(marker.trim())),
        None => (input, None),
    };

    let caps = REQUIREMENT_RE
        .captures(head)
        .ok_or_else(|| ParseError::invalid_requirement(input, "missing package name"))?;

    let name = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
    let extras: Vec<&str> = caps
        .get(2)
        .map(|m| {
            m.as_str()
                .split(',')
                .map(str::trim)
                .filter(|e| !e.is_empty())
                .collect()
        })
        .unwrap_or_default();
    let rest = caps.get(3).map(|m| m.as_str()).unwrap_or_default();

    if rest.starts_with('@') {
        return Err(ParseError::invalid_requirement(
            input,
            "direct URL references are not supported",
        ));
    }

    let specifier = rest
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .unwrap_or(rest);
    let constraint = parse_constraint(specifier)?;

    let mut requirement = DependencyRequirement::new(name, constraint, class).with_extras(extras);
    if let Some(marker) = marker {
        if marker.is_empty() {
            return Err(ParseError::invalid_requirement(input, "empty marker"));
        }
        requirement = requirement.with_marker(parse_marker(marker)?);
    }

    Ok(requirement)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MarkerExpr, MarkerOp, MarkerVariable, Version};

    fn runtime(s: &str) -> Result<DependencyRequirement, ParseError> {
        parse_requirement(s, DependencyClass::Runtime)
    }

    #[test]
    fn test_parse_bare_name() {
        let req = runtime("Requests").unwrap();
        assert_eq!(req.name, "requests");
        assert!(req.constraint.is_empty());
        assert!(req.extras.is_empty());
        assert!(req.marker.is_none());
    }

    #[test]
    fn test_parse_with_specifier_and_extras() {
        let req = runtime("requests[socks, http2] >=2.0,<3").unwrap();
        assert_eq!(req.extras.len(), 2);
        assert!(req.extras.contains("socks"));
        assert!(req.constraint.matches(&Version::parse("2.5").unwrap()));
        assert!(!req.constraint.matches(&Version::parse("3.0").unwrap()));
    }

    #[test]
    fn test_parse_parenthesised_specifier() {
        let req = runtime("zope.interface (>=5.0)").unwrap();
        assert_eq!(req.name, "zope-interface");
        assert_eq!(req.constraint.to_string(), ">=5.0");
    }

    #[test]
    fn test_parse_with_marker() {
        let req = runtime("tomli>=1.1.0; python_version < \"3.11\"").unwrap();
        assert_eq!(
            req.marker,
            Some(MarkerExpr::compare(
                MarkerVariable::PythonVersion,
                MarkerOp::Less,
                "3.11"
            ))
        );
    }

    #[test]
    fn test_parse_keeps_class() {
        let req = parse_requirement("setuptools>=61", DependencyClass::Build).unwrap();
        assert_eq!(req.class, DependencyClass::Build);
    }

    #[test]
    fn test_parse_rejects_url() {
        let err = runtime("pkg @ https://example.org/pkg.zip").unwrap_err();
        assert!(err.to_string().contains("direct URL"));
    }

    #[test]
    fn test_parse_errors() {
        assert!(runtime("").is_err());
        assert!(runtime("foo >=").is_err());
        assert!(runtime("foo; ").is_err());
        assert!(matches!(
            runtime("foo; python_flavour == 'x'"),
            Err(ParseError::UndefinedMarkerVariable { .. })
        ));
    }
}
