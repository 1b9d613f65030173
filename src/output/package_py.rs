//! `package.py` recipe renderer
//!
//! Produces a Spack `PythonPackage` recipe. Everything that needs a human
//! decision (missing checksums, unparsable requirements, conflicts, ...)
//! is rendered as a `FIXME` comment block next to the affected section.

use crate::domain::{
    DependencyClass, DependencyEntry, Diagnostic, DiagnosticKind, PackageRecipe, RecipeSource,
    Version,
};
use std::collections::BTreeMap;
use std::fmt::Write;

const COPYRIGHT: &str = "\
# Copyright 2013-2024 Lawrence Livermore National Security, LLC and other
# Spack Project Developers. See the top-level COPYRIGHT file for details.
#
# SPDX-License-Identifier: (Apache-2.0 OR MIT)
";

const INDENT: &str = "    ";

/// Diagnostic sections: heading and the kinds listed under it
const DIAGNOSTIC_SECTIONS: &[(&str, &[DiagnosticKind])] = &[
    (
        "the following requirements or manifest fields could not be parsed",
        &[DiagnosticKind::Parse],
    ),
    (
        "the following dependencies could be parsed but not converted",
        &[DiagnosticKind::UnresolvedEntity, DiagnosticKind::Unsatisfiable],
    ),
    (
        "the following parts were translated approximately",
        &[DiagnosticKind::ApproximateTranslation],
    ),
];

/// Render the recipe file for `recipe`
pub fn render_package_py(recipe: &PackageRecipe) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = write_recipe(&mut out, recipe);
    out
}

fn write_recipe(out: &mut String, recipe: &PackageRecipe) -> std::fmt::Result {
    writeln!(out, "{}", COPYRIGHT)?;
    writeln!(out, "from spack.package import *")?;
    writeln!(out)?;
    writeln!(out)?;
    writeln!(out, "class {}(PythonPackage):", recipe.class_name)?;

    match recipe.description.as_deref().filter(|d| !d.is_empty()) {
        Some(description) => writeln!(out, "{}\"\"\"{}\"\"\"", INDENT, docstring(description))?,
        None => writeln!(
            out,
            "{}\"\"\"FIXME: Put a proper description of your package here.\"\"\"",
            INDENT
        )?,
    }
    writeln!(out)?;

    write_source(out, recipe)?;
    writeln!(out)?;
    write_people(out, recipe)?;
    writeln!(out)?;
    write_versions(out, recipe)?;
    writeln!(out)?;

    if !recipe.variants.is_empty() {
        for variant in &recipe.variants {
            writeln!(out, "{}variant(\"{}\", default=False)", INDENT, variant)?;
        }
        writeln!(out)?;
    }

    write_diagnostics(out, &recipe.diagnostics)?;
    write_conflicts(out, recipe)?;

    for (class, entries) in &recipe.entries {
        write_dependencies(out, *class, entries)?;
    }

    Ok(())
}

fn docstring(text: &str) -> String {
    text.replace('\\', "\\\\").replace("\"\"\"", "\\\"\\\"\\\"")
}

fn write_source(out: &mut String, recipe: &PackageRecipe) -> std::fmt::Result {
    match &recipe.homepage {
        Some(homepage) => writeln!(out, "{}homepage = \"{}\"", INDENT, homepage)?,
        None => {
            writeln!(out, "{}# FIXME: add homepage", INDENT)?;
            writeln!(out, "{}# homepage = \"\"", INDENT)?;
        }
    }
    match &recipe.source {
        Some(RecipeSource::Pypi { path }) => writeln!(out, "{}pypi = \"{}\"", INDENT, path)?,
        Some(RecipeSource::Git { url, git }) => {
            writeln!(out, "{}url = \"{}\"", INDENT, url)?;
            writeln!(out, "{}git = \"{}\"", INDENT, git)?;
        }
        None => writeln!(out, "{}# FIXME: add download url", INDENT)?,
    }
    writeln!(out)?;

    match &recipe.license {
        Some(license) => {
            writeln!(out, "{}# FIXME: check license", INDENT)?;
            writeln!(out, "{}license(\"{}\")", INDENT, license)
        }
        None => writeln!(out, "{}# FIXME: add license", INDENT),
    }
}

fn write_people(out: &mut String, recipe: &PackageRecipe) -> std::fmt::Result {
    writeln!(out, "{}# FIXME: add github names for maintainers", INDENT)?;
    writeln!(out, "{}# maintainers(\"...\")", INDENT)?;
    for (title, people) in [("Authors", &recipe.authors), ("Maintainers", &recipe.maintainers)] {
        if people.is_empty() {
            continue;
        }
        writeln!(out, "{}# {}:", INDENT, title)?;
        for person in people {
            writeln!(out, "{}# {}", INDENT, person)?;
        }
    }
    Ok(())
}

fn write_versions(out: &mut String, recipe: &PackageRecipe) -> std::fmt::Result {
    let mut missing = Vec::new();
    for line in &recipe.versions {
        match &line.checksum {
            Some(checksum) => writeln!(
                out,
                "{}version(\"{}\", {}=\"{}\")",
                INDENT,
                line.version.target(),
                checksum.algorithm,
                checksum.digest
            )?,
            None => missing.push(&line.version),
        }
    }

    if !missing.is_empty() {
        writeln!(out)?;
        writeln!(
            out,
            "{}# FIXME: add hashes/checksums for the following versions",
            INDENT
        )?;
        for version in missing {
            writeln!(out, "{}version(\"{}\")", INDENT, version.target())?;
        }
    }
    Ok(())
}

fn write_diagnostics(out: &mut String, diagnostics: &[Diagnostic]) -> std::fmt::Result {
    for (heading, kinds) in DIAGNOSTIC_SECTIONS {
        let mut by_host: BTreeMap<Option<&Version>, Vec<&Diagnostic>> = BTreeMap::new();
        for diagnostic in diagnostics.iter().filter(|d| kinds.contains(&d.kind)) {
            by_host
                .entry(diagnostic.host_version.as_ref())
                .or_default()
                .push(diagnostic);
        }
        if by_host.is_empty() {
            continue;
        }

        writeln!(out, "{}# FIXME: {}", INDENT, heading)?;
        for (host, group) in by_host.iter().rev() {
            match host {
                Some(version) => writeln!(out, "{}# version {}:", INDENT, version.target())?,
                None => writeln!(out, "{}# all versions:", INDENT)?,
            }
            for diagnostic in group {
                match &diagnostic.requirement {
                    Some(requirement) => writeln!(
                        out,
                        "{}#    {} ({})",
                        INDENT, diagnostic.message, requirement
                    )?,
                    None => writeln!(out, "{}#    {}", INDENT, diagnostic.message)?,
                }
            }
        }
        writeln!(out)?;
    }
    Ok(())
}

fn write_conflicts(out: &mut String, recipe: &PackageRecipe) -> std::fmt::Result {
    if recipe.conflicts.is_empty() {
        return Ok(());
    }
    writeln!(
        out,
        "{0}# FIXME: the following dependency conflicts were found. A conflict arises if two dependencies\n\
         {0}# have intersecting 'when=...' conditions (both can be required at the same time),\n\
         {0}# but non-intersecting version ranges (e.g. 'pkg@4.2:' and 'pkg@:3.5')",
        INDENT
    )?;
    for conflict in &recipe.conflicts {
        writeln!(out, "{}# {}", INDENT, conflict)?;
    }
    writeln!(out)
}

fn write_dependencies(
    out: &mut String,
    class: DependencyClass,
    entries: &[DependencyEntry],
) -> std::fmt::Result {
    if entries.is_empty() {
        return Ok(());
    }
    writeln!(out, "{}with default_args(type={}):", INDENT, class.recipe_types())?;
    for entry in entries {
        for diagnostic in &entry.diagnostics {
            writeln!(out, "{0}{0}# FIXME: {1}", INDENT, diagnostic.message)?;
        }
        if entry.when.is_unconstrained() {
            writeln!(out, "{0}{0}depends_on(\"{1}\")", INDENT, entry.spec())?;
        } else {
            writeln!(
                out,
                "{0}{0}depends_on(\"{1}\", when=\"{2}\")",
                INDENT,
                entry.spec(),
                entry.when
            )?;
        }
    }
    writeln!(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        Checksum, ConflictRecord, Person, TargetRange, VersionChecksum, WhenCondition,
    };
    use std::collections::BTreeSet;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    fn entry(entity: &str, range: &str, host: &str) -> DependencyEntry {
        DependencyEntry {
            entity: entity.to_string(),
            range: range.parse().unwrap(),
            extras: BTreeSet::new(),
            class: DependencyClass::Runtime,
            when: WhenCondition::always().with_host(host.parse().unwrap()),
            diagnostics: Vec::new(),
        }
    }

    fn recipe() -> PackageRecipe {
        let mut entries = BTreeMap::new();
        entries.insert(
            DependencyClass::Runtime,
            vec![entry("python", "3.8:", ""), entry("foo", "2:", "1.1:")],
        );
        entries.insert(
            DependencyClass::Build,
            vec![entry("hatchling", "", "")],
        );
        PackageRecipe {
            name: "demo".to_string(),
            recipe_name: "py-demo".to_string(),
            class_name: "PyDemo".to_string(),
            description: Some("A demo package".to_string()),
            homepage: Some("https://example.org".to_string()),
            source: Some(RecipeSource::Pypi {
                path: "demo/demo-1.1.tar.gz".to_string(),
            }),
            authors: vec![Person {
                name: Some("Ada".to_string()),
                email: Some("ada@example.org".to_string()),
            }],
            maintainers: vec![],
            license: Some("MIT".to_string()),
            versions: vec![
                VersionChecksum {
                    version: v("1.1"),
                    checksum: Some(Checksum::sha256("abc")),
                },
                VersionChecksum {
                    version: v("1.0rc1"),
                    checksum: None,
                },
            ],
            variants: BTreeSet::from(["cli".to_string()]),
            entries,
            conflicts: vec![],
            diagnostics: vec![],
        }
    }

    #[test]
    fn test_render_header_and_metadata() {
        let text = render_package_py(&recipe());
        assert!(text.starts_with("# Copyright 2013-2024 Lawrence Livermore"));
        assert!(text.contains("from spack.package import *\n\n\nclass PyDemo(PythonPackage):\n"));
        assert!(text.contains("    \"\"\"A demo package\"\"\"\n"));
        assert!(text.contains("    homepage = \"https://example.org\"\n"));
        assert!(text.contains("    pypi = \"demo/demo-1.1.tar.gz\"\n"));
        assert!(text.contains("    license(\"MIT\")\n"));
        assert!(text.contains("    # Ada, ada@example.org\n"));
    }

    #[test]
    fn test_render_versions_and_variants() {
        let text = render_package_py(&recipe());
        assert!(text.contains("    version(\"1.1\", sha256=\"abc\")\n"));
        assert!(text.contains(
            "    # FIXME: add hashes/checksums for the following versions\n    version(\"1.0-rc1\")\n"
        ));
        assert!(text.contains("    variant(\"cli\", default=False)\n"));
    }

    #[test]
    fn test_render_dependency_blocks() {
        let text = render_package_py(&recipe());
        let build = text.find("with default_args(type=\"build\"):").unwrap();
        let run = text.find("with default_args(type=(\"build\", \"run\")):").unwrap();
        assert!(build < run);
        assert!(text.contains("        depends_on(\"py-hatchling\")\n"));
        assert!(text.contains("        depends_on(\"python@3.8:\")\n"));
        assert!(text.contains("        depends_on(\"py-foo@2:\", when=\"@1.1:\")\n"));
    }

    #[test]
    fn test_render_missing_metadata_fixmes() {
        let mut r = recipe();
        r.description = None;
        r.homepage = None;
        r.license = None;
        let text = render_package_py(&r);
        assert!(text.contains("FIXME: Put a proper description of your package here."));
        assert!(text.contains("# FIXME: add homepage"));
        assert!(text.contains("# FIXME: add license"));
    }

    #[test]
    fn test_render_diagnostics_grouped_by_version() {
        let mut r = recipe();
        r.diagnostics = vec![
            Diagnostic::parse("invalid requirement 'x>'").with_host(&v("1.0rc1")),
            Diagnostic::unresolved("ghost")
                .with_host(&v("1.1"))
                .with_requirement("ghost>=1"),
        ];
        let text = render_package_py(&r);
        assert!(text.contains(
            "    # FIXME: the following requirements or manifest fields could not be parsed\n    # version 1.0-rc1:\n"
        ));
        assert!(text.contains("could be parsed but not converted\n    # version 1.1:\n"));
        assert!(text.contains("(ghost>=1)\n"));
    }

    #[test]
    fn test_render_conflicts_and_entry_notes() {
        let mut r = recipe();
        let a = entry("bar", ":1", "");
        let b = entry("bar", "2:", "");
        r.conflicts = vec![ConflictRecord {
            first: a,
            second: b,
            overlap: "every build".to_string(),
        }];
        let mut noted = entry("baz", ":1,3:", "");
        noted.range = TargetRange::Any;
        noted.diagnostics = vec![Diagnostic::approximate("union of ranges collapsed")];
        r.entries.get_mut(&DependencyClass::Runtime).unwrap().push(noted);

        let text = render_package_py(&r);
        assert!(text.contains("# FIXME: the following dependency conflicts were found."));
        assert!(text.contains("both apply for every build"));
        assert!(text.contains(
            "        # FIXME: union of ranges collapsed\n        depends_on(\"py-baz\")\n"
        ));
    }

    #[test]
    fn test_render_is_deterministic() {
        assert_eq!(render_package_py(&recipe()), render_package_py(&recipe()));
    }
}
