//! CLI argument parsing module for spackify

use crate::convert::{ConversionConfig, DEFAULT_VERSIONS_PER_PACKAGE};
use crate::domain::normalize_name;
use crate::error::ConfigError;
use crate::orchestrator::{OrchestratorConfig, DEFAULT_CONCURRENCY, DEFAULT_MAX_CONVERSIONS};
use clap::{ArgAction, Parser};
use std::path::PathBuf;

/// Convert Python packages and their dependencies into Spack recipes
#[derive(Parser, Debug, Clone)]
#[command(
    name = "spackify",
    version,
    about = "Convert Python packages and their dependencies into Spack recipes"
)]
pub struct CliArgs {
    /// Package to convert: a PyPI name, `user/repo` or a GitHub repository URL
    pub package: String,

    // Traversal options
    /// Maximum number of packages to convert, -1 for no limit
    #[arg(long, default_value_t = DEFAULT_MAX_CONVERSIONS as i64, allow_negative_numbers = true)]
    pub max_conversions: i64,

    /// Number of newest releases converted per package
    #[arg(long, default_value_t = DEFAULT_VERSIONS_PER_PACKAGE)]
    pub versions_per_package: usize,

    /// Dependency that should not be converted (can be specified multiple times)
    #[arg(long, action = ArgAction::Append)]
    pub ignore: Vec<String>,

    /// Convert the package even if the repository already has it; the
    /// existing recipe is not overwritten and the new one is printed
    #[arg(long)]
    pub allow_duplicate: bool,

    /// Do not allow unions of ranges in dependency specs
    #[arg(long)]
    pub no_unions: bool,

    // Repository options
    /// Spack repository to write to (default: $SPACK_ROOT/var/spack/repos/builtin)
    #[arg(long)]
    pub repo: Option<PathBuf>,

    // General options
    /// Dry run mode - print recipes instead of writing them
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Enable verbose output
    #[arg(long)]
    pub verbose: bool,

    /// Enable quiet mode - minimal output
    #[arg(short, long)]
    pub quiet: bool,

    // Output options
    /// Output results in JSON format
    #[arg(long)]
    pub json: bool,
}

impl CliArgs {
    /// Conversion limit, `None` meaning unlimited
    pub fn max_conversions(&self) -> Result<Option<usize>, ConfigError> {
        match self.max_conversions {
            -1 => Ok(None),
            n if n >= 1 => Ok(Some(n as usize)),
            n => Err(ConfigError::InvalidValue {
                option: "--max-conversions".to_string(),
                value: n,
                message: "expected a positive number or -1".to_string(),
            }),
        }
    }

    /// Validate the arguments and build the orchestrator configuration
    pub fn orchestrator_config(&self) -> Result<OrchestratorConfig, ConfigError> {
        if self.versions_per_package == 0 {
            return Err(ConfigError::InvalidValue {
                option: "--versions-per-package".to_string(),
                value: 0,
                message: "at least one version is required".to_string(),
            });
        }
        if self.quiet && self.verbose {
            return Err(ConfigError::ConflictingOptions {
                message: "--quiet and --verbose".to_string(),
            });
        }

        Ok(OrchestratorConfig {
            max_conversions: self.max_conversions()?,
            ignore: self.ignore.iter().map(|name| normalize_name(name)).collect(),
            allow_duplicate: self.allow_duplicate,
            dry_run: self.dry_run,
            concurrency: DEFAULT_CONCURRENCY,
            conversion: ConversionConfig {
                max_versions_per_package: self.versions_per_package,
                allow_unions: !self.no_unions,
                ..ConversionConfig::default()
            },
        })
    }

    /// Whether progress output should be shown
    pub fn show_progress(&self) -> bool {
        !self.quiet && !self.json
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_default_args() {
        let args = CliArgs::parse_from(["spackify", "black"]);
        assert_eq!(args.package, "black");
        assert_eq!(args.max_conversions, 10);
        assert_eq!(args.versions_per_package, 10);
        assert!(args.ignore.is_empty());
        assert!(!args.allow_duplicate);
        assert!(!args.no_unions);
        assert!(args.repo.is_none());
        assert!(!args.dry_run);
        assert!(!args.verbose);
        assert!(!args.quiet);
        assert!(!args.json);
    }

    #[test]
    fn test_package_is_required() {
        assert!(CliArgs::try_parse_from(["spackify"]).is_err());
    }

    #[test]
    fn test_dry_run_short_flag() {
        let args = CliArgs::parse_from(["spackify", "black", "-n"]);
        assert!(args.dry_run);
    }

    #[test]
    fn test_ignore_multiple() {
        let args = CliArgs::parse_from(["spackify", "black", "--ignore", "Click", "--ignore", "tomli"]);
        assert_eq!(args.ignore, vec!["Click", "tomli"]);
        let config = args.orchestrator_config().unwrap();
        assert!(config.ignore.contains("click"));
        assert!(config.ignore.contains("tomli"));
    }

    #[test]
    fn test_unlimited_conversions() {
        let args = CliArgs::parse_from(["spackify", "black", "--max-conversions", "-1"]);
        assert_eq!(args.max_conversions().unwrap(), None);
    }

    #[test]
    fn test_invalid_max_conversions() {
        for value in ["0", "-5"] {
            let args = CliArgs::parse_from(["spackify", "black", "--max-conversions", value]);
            let err = args.max_conversions().unwrap_err();
            assert!(err.to_string().contains("--max-conversions"));
        }
    }

    #[test]
    fn test_invalid_versions_per_package() {
        let args = CliArgs::parse_from(["spackify", "black", "--versions-per-package", "0"]);
        assert!(matches!(
            args.orchestrator_config(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        let args = CliArgs::parse_from(["spackify", "black", "--quiet", "--verbose"]);
        assert!(matches!(
            args.orchestrator_config(),
            Err(ConfigError::ConflictingOptions { .. })
        ));
    }

    #[test]
    fn test_orchestrator_config() {
        let args = CliArgs::parse_from([
            "spackify",
            "psf/black",
            "--max-conversions",
            "3",
            "--versions-per-package",
            "4",
            "--no-unions",
            "--allow-duplicate",
            "-n",
        ]);
        let config = args.orchestrator_config().unwrap();
        assert_eq!(config.max_conversions, Some(3));
        assert_eq!(config.conversion.max_versions_per_package, 4);
        assert!(!config.conversion.allow_unions);
        assert!(config.allow_duplicate);
        assert!(config.dry_run);
    }

    #[test]
    fn test_show_progress() {
        assert!(CliArgs::parse_from(["spackify", "black"]).show_progress());
        assert!(!CliArgs::parse_from(["spackify", "black", "--json"]).show_progress());
        assert!(!CliArgs::parse_from(["spackify", "black", "-q"]).show_progress());
    }

    #[test]
    fn test_repo_path() {
        let args = CliArgs::parse_from(["spackify", "black", "--repo", "/spack/repo"]);
        assert_eq!(args.repo, Some(PathBuf::from("/spack/repo")));
    }
}
