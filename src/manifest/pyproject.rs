//! pyproject.toml decoding
//!
//! Handles:
//! - project metadata (description, urls, authors, maintainers, license)
//! - project.requires-python
//! - project.dependencies and project.optional-dependencies (PEP 621)
//! - build-system.requires and build-system.build-backend (PEP 518)
//!
//! A missing `[project]` table fails the whole file. Problems with
//! individual fields are recorded as diagnostics on the manifest.

use crate::domain::{
    normalize_name, DependencyClass, DependencyRequirement, Diagnostic, MarkerExpr, MarkerOp,
    MarkerVariable, Outcome, Person, Version,
};
use crate::error::ManifestError;
use crate::parser::{parse_constraint, parse_requirement};
use std::collections::{BTreeMap, BTreeSet};
use toml::{Table, Value};

/// Longer license strings are full license texts, not identifiers
const LICENSE_IDENTIFIER_LEN: usize = 250;

/// `project.urls` keys tried for the homepage, in order
const HOMEPAGE_KEYS: &[&str] = &["homepage", "repository", "github", "wiki"];

/// Decoded manifest of one release
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseManifest {
    /// Normalised package name
    pub name: String,
    pub version: Option<Version>,
    pub description: Option<String>,
    pub homepage: Option<String>,
    pub authors: Vec<Person>,
    pub maintainers: Vec<Person>,
    pub license: Option<String>,
    pub requires_python: Option<String>,
    pub dependencies: Vec<String>,
    pub optional_dependencies: BTreeMap<String, Vec<String>>,
    pub build_requires: Vec<String>,
    pub build_backend: Option<String>,
    /// Field-level problems
    pub diagnostics: Vec<Diagnostic>,
}

impl ReleaseManifest {
    /// Names of the optional-dependency groups (recipe variants)
    pub fn extras(&self) -> BTreeSet<String> {
        self.optional_dependencies
            .keys()
            .map(|k| normalize_name(k))
            .collect()
    }

    /// Parse every requirement string of the manifest. Optional
    /// dependencies are conjoined with `extra == "<group>"` and
    /// `requires-python` becomes a requirement on `python`.
    pub fn requirements(&self) -> Outcome<Vec<DependencyRequirement>> {
        let mut outcome = Outcome::with_diagnostics(Vec::new(), self.diagnostics.clone());

        if let Some(requires_python) = &self.requires_python {
            match parse_constraint(requires_python) {
                Ok(constraint) if !constraint.is_empty() => outcome.value.push(
                    DependencyRequirement::new("python", constraint, DependencyClass::Runtime),
                ),
                Ok(_) => {}
                Err(err) => outcome.push(
                    Diagnostic::parse(err.to_string())
                        .with_requirement(format!("requires-python {}", requires_python)),
                ),
            }
        }

        let mut add = |text: &str, class: DependencyClass, extra: Option<&str>| {
            match parse_requirement(text, class) {
                Ok(requirement) => outcome.value.push(match extra {
                    Some(extra) => requirement.with_marker(MarkerExpr::compare(
                        MarkerVariable::Extra,
                        MarkerOp::Equal,
                        normalize_name(extra),
                    )),
                    None => requirement,
                }),
                Err(err) => outcome.diagnostics.push(
                    Diagnostic::parse(err.to_string()).with_requirement(text.to_string()),
                ),
            }
        };

        for text in &self.dependencies {
            add(text, DependencyClass::Runtime, None);
        }
        for (extra, texts) in &self.optional_dependencies {
            for text in texts {
                add(text, DependencyClass::Runtime, Some(extra));
            }
        }
        for text in &self.build_requires {
            add(text, DependencyClass::Build, None);
        }

        outcome
    }
}

/// Decode a pyproject.toml document of `name` at `version`
pub fn decode_pyproject(
    name: &str,
    version: Option<&Version>,
    content: &str,
) -> Result<ReleaseManifest, ManifestError> {
    let version_label = version.map(|v| v.to_string()).unwrap_or_default();
    let document: Table = content
        .parse()
        .map_err(|e: toml::de::Error| {
            ManifestError::toml_parse_error(name, &version_label, e.message())
        })?;

    let project = document
        .get("project")
        .and_then(Value::as_table)
        .ok_or_else(|| ManifestError::missing_project(name, &version_label))?;

    let mut fields = FieldReader {
        diagnostics: Vec::new(),
    };

    let mut manifest = ReleaseManifest {
        name: normalize_name(name),
        version: version.cloned(),
        ..ReleaseManifest::default()
    };

    manifest.description = fields.string(project, "project", "description");
    manifest.homepage = fields.homepage(project);
    manifest.authors = fields.people(project, "authors");
    manifest.maintainers = fields.people(project, "maintainers");
    manifest.license = fields.license(project);
    manifest.requires_python = fields.string(project, "project", "requires-python");
    manifest.dependencies = fields.string_list(project, "project", "dependencies");

    if let Some(groups) = project.get("optional-dependencies") {
        match groups.as_table() {
            Some(groups) => {
                for (extra, _) in groups {
                    let key = format!("project.optional-dependencies.{}", extra);
                    let list = fields.string_list(groups, &key, extra);
                    manifest.optional_dependencies.insert(extra.clone(), list);
                }
            }
            None => fields.error("project.optional-dependencies", "must be a table"),
        }
    }

    if let Some(build_system) = document.get("build-system") {
        match build_system.as_table() {
            Some(table) => {
                manifest.build_requires = fields.string_list(table, "build-system", "requires");
                manifest.build_backend = fields.string(table, "build-system", "build-backend");
            }
            None => fields.error("build-system", "must be a table"),
        }
    }

    manifest.diagnostics = fields.diagnostics;
    Ok(manifest)
}

/// Typed field access that records problems instead of failing
struct FieldReader {
    diagnostics: Vec<Diagnostic>,
}

impl FieldReader {
    fn error(&mut self, key: &str, message: &str) {
        self.diagnostics
            .push(Diagnostic::parse(format!("field '{}' {}", key, message)));
    }

    fn string(&mut self, table: &Table, prefix: &str, key: &str) -> Option<String> {
        match table.get(key)? {
            Value::String(s) => Some(s.trim().to_string()),
            _ => {
                self.error(&format!("{}.{}", prefix, key), "must be a string");
                None
            }
        }
    }

    fn string_list(&mut self, table: &Table, prefix: &str, key: &str) -> Vec<String> {
        let full_key = if prefix.ends_with(key) {
            prefix.to_string()
        } else {
            format!("{}.{}", prefix, key)
        };
        match table.get(key) {
            None => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| match item.as_str() {
                    Some(s) => Some(s.to_string()),
                    None => {
                        self.error(&full_key, "must only contain strings");
                        None
                    }
                })
                .collect(),
            Some(_) => {
                self.error(&full_key, "must be a list of strings");
                Vec::new()
            }
        }
    }

    fn homepage(&mut self, project: &Table) -> Option<String> {
        let urls = match project.get("urls")? {
            Value::Table(urls) => urls,
            _ => {
                self.error("project.urls", "must be a table");
                return None;
            }
        };
        HOMEPAGE_KEYS.iter().find_map(|wanted| {
            urls.iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(wanted))
                .and_then(|(_, value)| value.as_str())
                .map(str::to_string)
        })
    }

    fn people(&mut self, project: &Table, key: &str) -> Vec<Person> {
        let full_key = format!("project.{}", key);
        let entries = match project.get(key) {
            None => return Vec::new(),
            Some(Value::Array(entries)) => entries,
            Some(_) => {
                self.error(&full_key, "must be a list of tables");
                return Vec::new();
            }
        };

        entries
            .iter()
            .filter_map(|entry| {
                let table = entry.as_table()?;
                let person = Person {
                    name: table.get("name").and_then(Value::as_str).map(str::to_string),
                    email: table.get("email").and_then(Value::as_str).map(str::to_string),
                };
                (person.name.is_some() || person.email.is_some()).then_some(person)
            })
            .collect()
    }

    fn license(&mut self, project: &Table) -> Option<String> {
        let text = match project.get("license") {
            Some(Value::String(s)) => Some(s.trim().to_string()),
            Some(Value::Table(t)) => t
                .get("text")
                .and_then(Value::as_str)
                .map(|s| s.trim().to_string()),
            Some(_) => {
                self.error("project.license", "must be a string or a table");
                None
            }
            None => None,
        };

        match text {
            Some(text) if text.len() > LICENSE_IDENTIFIER_LEN => {
                self.error(
                    "project.license",
                    "appears to contain the full license text instead of an identifier",
                );
                license_from_classifiers(project)
            }
            Some(text) if !text.is_empty() => Some(text),
            _ => license_from_classifiers(project),
        }
    }
}

/// `License :: OSI Approved :: MIT License` → `MIT License`, joined with ` AND `
fn license_from_classifiers(project: &Table) -> Option<String> {
    let licenses: Vec<String> = project
        .get("classifiers")
        .and_then(Value::as_array)?
        .iter()
        .filter_map(Value::as_str)
        .filter(|c| c.starts_with("License"))
        .filter_map(|c| c.rsplit("::").next())
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .collect();
    (!licenses.is_empty()).then(|| licenses.join(" AND "))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[build-system]
requires = ["hatchling>=1.8", "hatch-vcs"]
build-backend = "hatchling.build"

[project]
name = "Sample_Pkg"
description = "A sample package"
requires-python = ">=3.8"
license = { text = "BSD-3-Clause" }
authors = [{ name = "Ada Lovelace", email = "ada@example.org" }, { email = "team@example.org" }]
dependencies = [
    "requests>=2.28",
    "tomli>=1.1.0; python_version < '3.11'",
]

[project.optional-dependencies]
CLI = ["click>=8"]

[project.urls]
Source = "https://example.org/src"
Repository = "https://example.org/repo"
"#;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn test_decode_fields() {
        let manifest = decode_pyproject("Sample_Pkg", Some(&v("1.0")), SAMPLE).unwrap();
        assert_eq!(manifest.name, "sample-pkg");
        assert_eq!(manifest.description.as_deref(), Some("A sample package"));
        assert_eq!(manifest.homepage.as_deref(), Some("https://example.org/repo"));
        assert_eq!(manifest.license.as_deref(), Some("BSD-3-Clause"));
        assert_eq!(manifest.requires_python.as_deref(), Some(">=3.8"));
        assert_eq!(manifest.authors.len(), 2);
        assert_eq!(manifest.authors[1].email.as_deref(), Some("team@example.org"));
        assert_eq!(manifest.dependencies.len(), 2);
        assert_eq!(manifest.build_requires, ["hatchling>=1.8", "hatch-vcs"]);
        assert_eq!(manifest.build_backend.as_deref(), Some("hatchling.build"));
        assert!(manifest.diagnostics.is_empty());
        assert_eq!(manifest.extras().into_iter().collect::<Vec<_>>(), ["cli"]);
    }

    #[test]
    fn test_requirements() {
        let manifest = decode_pyproject("sample", Some(&v("1.0")), SAMPLE).unwrap();
        let outcome = manifest.requirements();
        assert!(outcome.diagnostics.is_empty());
        let rendered: Vec<String> = outcome.value.iter().map(|r| r.to_string()).collect();
        assert_eq!(
            rendered,
            [
                "python>=3.8",
                "requests>=2.28",
                "tomli>=1.1.0; python_version < \"3.11\"",
                "click>=8; extra == \"cli\"",
                "hatchling>=1.8",
                "hatch-vcs",
            ]
        );
        assert_eq!(outcome.value[4].class, DependencyClass::Build);
    }

    #[test]
    fn test_bad_requirement_is_diagnostic() {
        let content = r#"
[project]
name = "x"
dependencies = ["ok>=1", "broken>=", "url @ https://example.org/x.zip"]
"#;
        let manifest = decode_pyproject("x", None, content).unwrap();
        let outcome = manifest.requirements();
        assert_eq!(outcome.value.len(), 1);
        assert_eq!(outcome.diagnostics.len(), 2);
        assert_eq!(outcome.diagnostics[0].requirement.as_deref(), Some("broken>="));
    }

    #[test]
    fn test_missing_project_section() {
        let err = decode_pyproject("x", Some(&v("1.0")), "[tool.black]\nline-length = 88\n")
            .unwrap_err();
        assert!(matches!(err, ManifestError::MissingProjectSection { .. }));
    }

    #[test]
    fn test_invalid_toml() {
        let err = decode_pyproject("x", Some(&v("1.0")), "[project\nname=").unwrap_err();
        assert!(matches!(err, ManifestError::TomlParseError { .. }));
    }

    #[test]
    fn test_wrong_field_types_are_diagnostics() {
        let content = r#"
[project]
name = "x"
description = 3
dependencies = "requests"
"#;
        let manifest = decode_pyproject("x", None, content).unwrap();
        assert_eq!(manifest.description, None);
        assert!(manifest.dependencies.is_empty());
        assert_eq!(manifest.diagnostics.len(), 2);
    }

    #[test]
    fn test_license_from_classifiers() {
        let content = r#"
[project]
name = "x"
classifiers = [
    "Programming Language :: Python",
    "License :: OSI Approved :: MIT License",
    "License :: OSI Approved :: Apache Software License",
]
"#;
        let manifest = decode_pyproject("x", None, content).unwrap();
        assert_eq!(
            manifest.license.as_deref(),
            Some("MIT License AND Apache Software License")
        );
    }

    #[test]
    fn test_overlong_license_is_rejected() {
        let content = format!("[project]\nname = \"x\"\nlicense = \"{}\"\n", "x".repeat(300));
        let manifest = decode_pyproject("x", None, &content).unwrap();
        assert_eq!(manifest.license, None);
        assert_eq!(manifest.diagnostics.len(), 1);
    }

    #[test]
    fn test_requires_python_parse_error() {
        let content = "[project]\nname = \"x\"\nrequires-python = \">=three\"\n";
        let manifest = decode_pyproject("x", None, content).unwrap();
        let outcome = manifest.requirements();
        assert!(outcome.value.is_empty());
        assert_eq!(outcome.diagnostics.len(), 1);
    }
}
