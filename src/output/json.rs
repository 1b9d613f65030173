//! JSON output formatter for machine processing
//!
//! This module provides:
//! - JSON serialization of a single recipe
//! - JSON serialization of a whole run: converted packages, queue left, failures

use crate::domain::PackageRecipe;
use crate::orchestrator::{ConversionFailure, ConvertedPackage, RunReport};
use crate::output::{OutputFormatter, Verbosity};
use serde::Serialize;
use std::io::Write;

/// Serialize one recipe
pub fn render_json(recipe: &PackageRecipe) -> serde_json::Result<String> {
    serde_json::to_string_pretty(recipe)
}

/// JSON formatter for machine-readable output
pub struct JsonFormatter {
    /// Verbosity level affects detail in output
    verbosity: Verbosity,
}

impl JsonFormatter {
    /// Create a new JSON formatter
    pub fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }

    fn package_to_json<'a>(&self, package: &'a ConvertedPackage) -> JsonPackage<'a> {
        JsonPackage {
            name: &package.name,
            recipe_name: &package.recipe_name,
            versions: package.versions,
            needs_review: package.needs_review,
            path: package.path.as_ref().map(|p| p.display().to_string()),
            recipe: (self.verbosity != Verbosity::Quiet).then_some(&package.recipe),
            package_py: package
                .path
                .is_none()
                .then_some(package.rendered.as_str()),
        }
    }
}

/// JSON representation of the full run
#[derive(Serialize)]
struct JsonOutput<'a> {
    dry_run: bool,
    summary: JsonSummary,
    converted: Vec<JsonPackage<'a>>,
    remaining: &'a [String],
    failures: &'a [ConversionFailure],
}

/// JSON representation of summary statistics
#[derive(Serialize)]
struct JsonSummary {
    converted: usize,
    needs_review: usize,
    remaining: usize,
    failures: usize,
}

/// JSON representation of a converted package
#[derive(Serialize)]
struct JsonPackage<'a> {
    name: &'a str,
    recipe_name: &'a str,
    versions: usize,
    needs_review: bool,
    /// Where the recipe was written
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<String>,
    /// Structured recipe (omitted in quiet mode)
    #[serde(skip_serializing_if = "Option::is_none")]
    recipe: Option<&'a PackageRecipe>,
    /// Rendered recipe when it was not written to the repository
    #[serde(skip_serializing_if = "Option::is_none")]
    package_py: Option<&'a str>,
}

impl OutputFormatter for JsonFormatter {
    fn format(&self, report: &RunReport, writer: &mut dyn Write) -> std::io::Result<()> {
        let output = JsonOutput {
            dry_run: report.dry_run,
            summary: JsonSummary {
                converted: report.converted.len(),
                needs_review: report.needs_review_count(),
                remaining: report.remaining.len(),
                failures: report.failures.len(),
            },
            converted: report
                .converted
                .iter()
                .map(|p| self.package_to_json(p))
                .collect(),
            remaining: &report.remaining,
            failures: &report.failures,
        };

        let json = serde_json::to_string_pretty(&output).map_err(std::io::Error::other)?;

        writeln!(writer, "{}", json)?;

        Ok(())
    }
}
