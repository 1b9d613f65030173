//! Output formatting for recipes and run reports
//!
//! This module provides:
//! - `package.py` rendering of a converted recipe
//! - A colored text summary of a run
//! - A JSON report of a run, and of single recipes

mod json;
mod package_py;
mod text;

pub use json::{render_json, JsonFormatter};
pub use package_py::render_package_py;
pub use text::TextFormatter;

use crate::orchestrator::RunReport;
use std::io::{IsTerminal, Write};

/// How the run report is printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Amount of detail in the run report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Rendered recipes and failures only
    Quiet,
    #[default]
    Normal,
    /// Adds recipe paths and diagnostic counts
    Verbose,
}

impl Verbosity {
    /// `--quiet` takes precedence over `--verbose`
    pub fn from_flags(quiet: bool, verbose: bool) -> Self {
        match (quiet, verbose) {
            (true, _) => Verbosity::Quiet,
            (false, true) => Verbosity::Verbose,
            (false, false) => Verbosity::Normal,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub verbosity: Verbosity,
    pub color: bool,
}

impl OutputConfig {
    /// Build from `--json`, `--verbose` and `--quiet`. Colors are used
    /// only on a terminal and when `NO_COLOR` is unset.
    pub fn from_cli(json: bool, verbose: bool, quiet: bool) -> Self {
        Self {
            format: if json {
                OutputFormat::Json
            } else {
                OutputFormat::Text
            },
            verbosity: Verbosity::from_flags(quiet, verbose),
            color: std::env::var_os("NO_COLOR").is_none() && std::io::stdout().is_terminal(),
        }
    }
}

/// Writes a [`RunReport`] in one output format
pub trait OutputFormatter {
    fn format(&self, report: &RunReport, writer: &mut dyn Write) -> std::io::Result<()>;
}

pub fn create_formatter(config: OutputConfig) -> Box<dyn OutputFormatter> {
    match config.format {
        OutputFormat::Text => Box::new(TextFormatter::with_color(config.verbosity, config.color)),
        OutputFormat::Json => Box::new(JsonFormatter::new(config.verbosity)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_from_flags() {
        assert_eq!(Verbosity::from_flags(false, false), Verbosity::Normal);
        assert_eq!(Verbosity::from_flags(false, true), Verbosity::Verbose);
        assert_eq!(Verbosity::from_flags(true, true), Verbosity::Quiet);
    }

    #[test]
    fn test_json_config() {
        let config = OutputConfig::from_cli(true, false, false);
        assert_eq!(config.format, OutputFormat::Json);
        assert_eq!(config.verbosity, Verbosity::Normal);
    }

    #[test]
    fn test_json_formatter_is_selected() {
        let formatter = create_formatter(OutputConfig::from_cli(true, false, false));
        let mut out = Vec::new();
        formatter.format(&RunReport::default(), &mut out).unwrap();
        assert!(String::from_utf8(out).unwrap().contains("\"converted\""));
    }

    #[test]
    fn test_text_formatter_is_selected() {
        let config = OutputConfig {
            format: OutputFormat::Text,
            verbosity: Verbosity::Normal,
            color: false,
        };
        let mut out = Vec::new();
        create_formatter(config)
            .format(&RunReport::default(), &mut out)
            .unwrap();
        assert!(String::from_utf8(out).unwrap().contains("No packages left."));
    }
}
