//! Recoverable conversion problems
//!
//! Problems with a single requirement, entry or release never abort a
//! conversion. They are collected as [`Diagnostic`]s and travel next to
//! the partial result inside an [`Outcome`].

use super::Version;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// A requirement, version or field could not be parsed
    Parse,
    /// A dependency's version list could not be obtained
    UnresolvedEntity,
    /// A constraint matches no known version
    Unsatisfiable,
    /// A constraint or marker could only be approximated
    ApproximateTranslation,
    /// Two co-applicable entries cannot both be satisfied
    Conflict,
}

impl DiagnosticKind {
    pub fn label(&self) -> &'static str {
        match self {
            DiagnosticKind::Parse => "parse error",
            DiagnosticKind::UnresolvedEntity => "unresolved dependency",
            DiagnosticKind::Unsatisfiable => "unsatisfiable constraint",
            DiagnosticKind::ApproximateTranslation => "approximate translation",
            DiagnosticKind::Conflict => "conflict",
        }
    }
}

/// A single recorded problem
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    pub message: String,
    /// Host release the problem was found in
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_version: Option<Version>,
    /// Requirement text the problem concerns
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requirement: Option<String>,
}

impl Diagnostic {
    pub fn new(severity: Severity, kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            severity,
            kind,
            message: message.into(),
            host_version: None,
            requirement: None,
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, DiagnosticKind::Parse, message)
    }

    pub fn unresolved(entity: &str) -> Self {
        Self::new(
            Severity::Error,
            DiagnosticKind::UnresolvedEntity,
            format!("could not resolve versions of '{}'", entity),
        )
    }

    pub fn unsatisfiable(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, DiagnosticKind::Unsatisfiable, message)
    }

    pub fn approximate(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, DiagnosticKind::ApproximateTranslation, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, DiagnosticKind::Conflict, message)
    }

    /// Sets the host release (builder pattern)
    pub fn with_host(mut self, version: &Version) -> Self {
        self.host_version = Some(version.clone());
        self
    }

    /// Sets the requirement text (builder pattern)
    pub fn with_requirement(mut self, requirement: impl Into<String>) -> Self {
        self.requirement = Some(requirement.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.label(), self.message)?;
        if let Some(requirement) = &self.requirement {
            write!(f, " [{}]", requirement)?;
        }
        if let Some(version) = &self.host_version {
            write!(f, " (in {})", version)?;
        }
        Ok(())
    }
}

/// A value together with the diagnostics produced while computing it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome<T> {
    pub value: T,
    pub diagnostics: Vec<Diagnostic>,
}

impl<T> Outcome<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            diagnostics: Vec::new(),
        }
    }

    pub fn with_diagnostics(value: T, diagnostics: Vec<Diagnostic>) -> Self {
        Self { value, diagnostics }
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Move `other`'s diagnostics into this outcome and return its value
    pub fn absorb<U>(&mut self, other: Outcome<U>) -> U {
        self.diagnostics.extend(other.diagnostics);
        other.value
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        Outcome {
            value: f(self.value),
            diagnostics: self.diagnostics,
        }
    }

    pub fn into_parts(self) -> (T, Vec<Diagnostic>) {
        (self.value, self.diagnostics)
    }

    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_with_context() {
        let diag = Diagnostic::unsatisfiable("no version of 'foo' matches ==9.9.9")
            .with_requirement("foo==9.9.9")
            .with_host(&Version::parse("1.0").unwrap());
        assert_eq!(
            diag.to_string(),
            "unsatisfiable constraint: no version of 'foo' matches ==9.9.9 [foo==9.9.9] (in 1.0)"
        );
        assert!(diag.is_error());
    }

    #[test]
    fn test_approximate_is_warning() {
        let diag = Diagnostic::approximate("os_name is ignored");
        assert_eq!(diag.severity, Severity::Warning);
        assert_eq!(diag.kind, DiagnosticKind::ApproximateTranslation);
    }

    #[test]
    fn test_outcome_absorb() {
        let mut outer = Outcome::new(Vec::<u32>::new());
        let inner = Outcome::with_diagnostics(7, vec![Diagnostic::parse("bad")]);
        let value = outer.absorb(inner);
        outer.value.push(value);
        assert_eq!(outer.value, vec![7]);
        assert_eq!(outer.diagnostics.len(), 1);
        assert!(!outer.is_clean());
    }

    #[test]
    fn test_outcome_map() {
        let outcome = Outcome::with_diagnostics(2, vec![Diagnostic::parse("x")]).map(|n| n * 3);
        let (value, diags) = outcome.into_parts();
        assert_eq!(value, 6);
        assert_eq!(diags.len(), 1);
    }
}
