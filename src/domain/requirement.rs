//! Raw dependency declarations and entity names

use super::{MarkerExpr, SourceConstraint};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

/// Names that already start with `py-` but still get the recipe prefix
const DOUBLE_PREFIXED: &[&str] = &["py-cpuinfo", "py-tes", "py-spy"];

/// When a dependency is needed
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyClass {
    /// `build-system.requires`
    Build,
    /// `dependencies`, `optional-dependencies`, `requires-python`
    Runtime,
}

impl DependencyClass {
    /// Value of the recipe's `type=` argument
    pub fn recipe_types(&self) -> &'static str {
        match self {
            DependencyClass::Build => "\"build\"",
            DependencyClass::Runtime => "(\"build\", \"run\")",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DependencyClass::Build => "build",
            DependencyClass::Runtime => "runtime",
        }
    }
}

/// One dependency as declared by a single release
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyRequirement {
    /// Normalised entity name
    pub name: String,
    pub constraint: SourceConstraint,
    pub extras: BTreeSet<String>,
    pub marker: Option<MarkerExpr>,
    pub class: DependencyClass,
}

impl DependencyRequirement {
    pub fn new(name: &str, constraint: SourceConstraint, class: DependencyClass) -> Self {
        Self {
            name: normalize_name(name),
            constraint,
            extras: BTreeSet::new(),
            marker: None,
            class,
        }
    }

    /// Sets the extras (builder pattern)
    pub fn with_extras<I, S>(mut self, extras: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extras = extras
            .into_iter()
            .map(|e| normalize_name(e.as_ref()))
            .collect();
        self
    }

    /// Conjoins `marker` with any marker already present
    pub fn with_marker(mut self, marker: MarkerExpr) -> Self {
        self.marker = Some(match self.marker.take() {
            Some(existing) => existing.and(marker),
            None => marker,
        });
        self
    }

    /// Whether this requirement constrains the interpreter itself
    pub fn is_runtime_itself(&self) -> bool {
        self.name == "python"
    }
}

impl fmt::Display for DependencyRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if !self.extras.is_empty() {
            let extras: Vec<&str> = self.extras.iter().map(String::as_str).collect();
            write!(f, "[{}]", extras.join(","))?;
        }
        write!(f, "{}", self.constraint)?;
        if let Some(marker) = &self.marker {
            write!(f, "; {}", marker)?;
        }
        Ok(())
    }
}

/// PEP 503 normalisation: lowercase, runs of `-`, `_`, `.` become `-`
pub fn normalize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_separator = false;
    for ch in name.trim().chars() {
        if matches!(ch, '-' | '_' | '.') {
            if !in_separator {
                out.push('-');
            }
            in_separator = true;
        } else {
            out.push(ch.to_ascii_lowercase());
            in_separator = false;
        }
    }
    out
}

/// Recipe name for an index package (`requests` → `py-requests`)
pub fn recipe_name(name: &str) -> String {
    let name = normalize_name(name);
    if name == "python" {
        return name;
    }
    if name.starts_with("py-") && !DOUBLE_PREFIXED.contains(&name.as_str()) {
        return name;
    }
    format!("py-{}", name)
}

/// Recipe class name (`py-foo-bar` → `PyFooBar`)
pub fn class_name(recipe_name: &str) -> String {
    let name: String = recipe_name
        .split(['-', '_'])
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect();
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        format!("_{}", name)
    } else {
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MarkerOp, MarkerVariable};

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("Foo.Bar__baz"), "foo-bar-baz");
        assert_eq!(normalize_name("zope.interface"), "zope-interface");
        assert_eq!(normalize_name("  Django "), "django");
    }

    #[test]
    fn test_recipe_name() {
        assert_eq!(recipe_name("requests"), "py-requests");
        assert_eq!(recipe_name("python"), "python");
        assert_eq!(recipe_name("py-cpuinfo"), "py-py-cpuinfo");
        assert_eq!(recipe_name("py_spy"), "py-py-spy");
        assert_eq!(recipe_name("py-ubjson"), "py-ubjson");
        assert_eq!(recipe_name("Typing_Extensions"), "py-typing-extensions");
    }

    #[test]
    fn test_class_name() {
        assert_eq!(class_name("py-foo-bar"), "PyFooBar");
        assert_eq!(class_name("python"), "Python");
        assert_eq!(class_name("3to2"), "_3to2");
    }

    #[test]
    fn test_requirement_display() {
        let req = DependencyRequirement::new("Foo_Bar", SourceConstraint::any(), DependencyClass::Runtime)
            .with_extras(["Socks", "http2"])
            .with_marker(MarkerExpr::compare(
                MarkerVariable::PythonVersion,
                MarkerOp::GreaterEqual,
                "3.8",
            ));
        assert_eq!(req.name, "foo-bar");
        assert_eq!(req.to_string(), r#"foo-bar[http2,socks]; python_version >= "3.8""#);
    }

    #[test]
    fn test_with_marker_conjoins() {
        let req = DependencyRequirement::new("foo", SourceConstraint::any(), DependencyClass::Runtime)
            .with_marker(MarkerExpr::compare(MarkerVariable::SysPlatform, MarkerOp::Equal, "linux"))
            .with_marker(MarkerExpr::compare(MarkerVariable::Extra, MarkerOp::Equal, "cli"));
        assert!(matches!(req.marker, Some(MarkerExpr::And(..))));
    }

    #[test]
    fn test_class_types() {
        assert_eq!(DependencyClass::Build.recipe_types(), "\"build\"");
        assert_eq!(DependencyClass::Runtime.recipe_types(), "(\"build\", \"run\")");
        assert!(DependencyClass::Build < DependencyClass::Runtime);
    }
}
