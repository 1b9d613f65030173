//! Text output formatter for human-readable display
//!
//! This module provides:
//! - Recipes that were rendered but not written (dry-run, duplicates)
//! - Converted packages with a `[FIX DEP.]` mark where dependencies need review
//! - Packages left in the queue and packages that failed

use crate::orchestrator::{ConvertedPackage, RunReport};
use crate::output::{OutputFormatter, Verbosity};
use colored::{ColoredString, Colorize};
use std::io::Write;

/// Marker for packages whose dependencies need a manual fix
const FIX_DEP: &str = "[FIX DEP.]";

/// Text formatter for human-readable output
pub struct TextFormatter {
    verbosity: Verbosity,
    color: bool,
}

impl TextFormatter {
    /// Create a new text formatter with color option
    pub fn with_color(verbosity: Verbosity, color: bool) -> Self {
        Self { verbosity, color }
    }

    fn paint(&self, text: &str, style: fn(&str) -> ColoredString) -> String {
        if self.color {
            style(text).to_string()
        } else {
            text.to_string()
        }
    }

    fn format_recipes(&self, report: &RunReport, writer: &mut dyn Write) -> std::io::Result<()> {
        for package in report.converted.iter().filter(|p| p.path.is_none()) {
            let heading = format!("==> {}", package.recipe_name);
            writeln!(writer, "{}", self.paint(&heading, |s| s.bold()))?;
            write!(writer, "{}", package.rendered)?;
            writeln!(writer)?;
        }
        Ok(())
    }

    fn format_package(
        &self,
        package: &ConvertedPackage,
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        let versions = format!(
            "({} version{})",
            package.versions,
            if package.versions == 1 { "" } else { "s" }
        );
        let mut line = format!(
            "  - {} {}",
            self.paint(&package.name, |s| s.bright_white().bold()),
            self.paint(&versions, |s| s.dimmed())
        );
        if package.needs_review {
            line.push(' ');
            line.push_str(&self.paint(FIX_DEP, |s| s.yellow().bold()));
        }
        writeln!(writer, "{}", line)?;

        if self.verbosity == Verbosity::Verbose {
            if let Some(path) = &package.path {
                let path = format!("      {}", path.display());
                writeln!(writer, "{}", self.paint(&path, |s| s.dimmed()))?;
            }
            let recipe = &package.recipe;
            let notes = recipe.diagnostics.len()
                + recipe.conflicts.len()
                + recipe.all_entries().map(|e| e.diagnostics.len()).sum::<usize>();
            if notes > 0 {
                writeln!(writer, "      {} notes to review", notes)?;
            }
        }
        Ok(())
    }

    fn format_summary(&self, report: &RunReport, writer: &mut dyn Write) -> std::io::Result<()> {
        let heading = format!(
            "Converted {} package{}:",
            report.converted.len(),
            if report.converted.len() == 1 { "" } else { "s" }
        );
        writeln!(writer, "{}", self.paint(&heading, |s| s.bold()))?;
        for package in &report.converted {
            self.format_package(package, writer)?;
        }
        if report.needs_review_count() > 0 {
            writeln!(
                writer,
                "Dependency errors that require manual review are marked as {}.",
                FIX_DEP
            )?;
            writeln!(writer, "See the generated package.py files for details.")?;
        }
        writeln!(writer)?;

        if report.remaining.is_empty() {
            writeln!(writer, "No packages left.")?;
        } else {
            writeln!(
                writer,
                "Conversion limit reached, {} dependency package{} left:",
                report.remaining.len(),
                if report.remaining.len() == 1 { "" } else { "s" }
            )?;
            for name in &report.remaining {
                writeln!(writer, "  - {}", name)?;
            }
        }
        writeln!(writer)?;

        self.format_failures(report, writer)?;

        if !report.converted.is_empty() {
            writeln!(writer)?;
            writeln!(
                writer,
                "{}",
                self.paint(
                    "All generated package.py files should be reviewed manually.",
                    |s| s.cyan()
                )
            )?;
        }
        Ok(())
    }

    fn format_failures(&self, report: &RunReport, writer: &mut dyn Write) -> std::io::Result<()> {
        if report.failures.is_empty() {
            if self.verbosity != Verbosity::Quiet {
                writeln!(writer, "No conversion failures.")?;
            }
            return Ok(());
        }

        let heading = format!(
            "The following {} package{} could not be converted:",
            report.failures.len(),
            if report.failures.len() == 1 { "" } else { "s" }
        );
        writeln!(writer, "{}", self.paint(&heading, |s| s.red().bold()))?;
        for failure in &report.failures {
            writeln!(
                writer,
                "  - {}: {}",
                self.paint(&failure.name, |s| s.red()),
                failure.reason
            )?;
        }
        Ok(())
    }
}

impl OutputFormatter for TextFormatter {
    fn format(&self, report: &RunReport, writer: &mut dyn Write) -> std::io::Result<()> {
        self.format_recipes(report, writer)?;

        if self.verbosity == Verbosity::Quiet {
            return self.format_failures(report, writer);
        }
        self.format_summary(report, writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PackageRecipe;
    use crate::orchestrator::ConversionFailure;
    use std::collections::{BTreeMap, BTreeSet};
    use std::path::PathBuf;

    fn package(name: &str, needs_review: bool, path: Option<&str>) -> ConvertedPackage {
        ConvertedPackage {
            name: name.to_string(),
            recipe_name: format!("py-{}", name),
            versions: 2,
            needs_review,
            path: path.map(PathBuf::from),
            recipe: PackageRecipe {
                name: name.to_string(),
                recipe_name: format!("py-{}", name),
                class_name: "PyX".to_string(),
                description: None,
                homepage: None,
                source: None,
                authors: vec![],
                maintainers: vec![],
                license: None,
                versions: vec![],
                variants: BTreeSet::new(),
                entries: BTreeMap::new(),
                conflicts: vec![],
                diagnostics: vec![],
            },
            rendered: format!("class Py{}(PythonPackage):\n", name),
        }
    }

    fn format(verbosity: Verbosity, report: &RunReport) -> String {
        let mut output = Vec::new();
        TextFormatter::with_color(verbosity, false)
            .format(report, &mut output)
            .unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn test_format_summary() {
        let report = RunReport {
            dry_run: false,
            converted: vec![
                package("demo", true, Some("/repo/packages/py-demo/package.py")),
                package("dep", false, Some("/repo/packages/py-dep/package.py")),
            ],
            remaining: vec!["left".to_string()],
            failures: vec![ConversionFailure {
                name: "broken".to_string(),
                reason: "no usable release".to_string(),
            }],
        };
        let output = format(Verbosity::Normal, &report);

        assert!(output.contains("Converted 2 packages:"));
        assert!(output.contains("  - demo (2 versions) [FIX DEP.]\n"));
        assert!(output.contains("  - dep (2 versions)\n"));
        assert!(output.contains("marked as [FIX DEP.]"));
        assert!(output.contains("1 dependency package left:\n  - left\n"));
        assert!(output.contains("  - broken: no usable release"));
        assert!(!output.contains("class Py"));
    }

    #[test]
    fn test_format_dry_run_prints_recipes() {
        let report = RunReport {
            dry_run: true,
            converted: vec![package("demo", false, None)],
            ..RunReport::default()
        };
        let output = format(Verbosity::Normal, &report);

        assert!(output.starts_with("==> py-demo\nclass Pydemo(PythonPackage):\n"));
        assert!(output.contains("No packages left."));
        assert!(output.contains("No conversion failures."));
        assert!(!output.contains("FIX DEP."));
    }

    #[test]
    fn test_format_verbose_shows_paths() {
        let report = RunReport {
            converted: vec![package("demo", false, Some("/repo/packages/py-demo/package.py"))],
            ..RunReport::default()
        };
        let output = format(Verbosity::Verbose, &report);
        assert!(output.contains("      /repo/packages/py-demo/package.py\n"));
    }

    #[test]
    fn test_format_quiet() {
        let report = RunReport {
            converted: vec![package("demo", false, Some("/repo/packages/py-demo/package.py"))],
            ..RunReport::default()
        };
        assert_eq!(format(Verbosity::Quiet, &report), "");
    }
}
