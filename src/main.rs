//! spackify - convert Python packages into Spack recipes
//!
//! Converts a package from PyPI or GitHub, and the dependencies the Spack
//! repository does not have yet, into `package.py` recipes.

use clap::Parser;
use spackify::cli::CliArgs;
use spackify::error::ConfigError;
use spackify::orchestrator::Orchestrator;
use spackify::output::{create_formatter, OutputConfig};
use spackify::progress::Progress;
use spackify::registry::HttpClient;
use spackify::repository::SpackRepository;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();

    let default_filter = if args.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(io::stderr)
        .init();

    // Run the main logic and handle errors
    match run(args).await {
        Ok(exit_code) => exit_code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Main application logic
async fn run(args: CliArgs) -> anyhow::Result<ExitCode> {
    let config = args.orchestrator_config()?;
    let repository = open_repository(&args)?;
    match &repository {
        Some(repo) => info!(path = %repo.root().display(), "using Spack repository"),
        None => info!("no Spack repository, existing packages are not checked"),
    }

    let client = HttpClient::new()?;
    let orchestrator = Orchestrator::new(client, repository, config);
    let mut progress = Progress::new(args.show_progress());
    let report = orchestrator.run(&args.package, &mut progress).await;

    let formatter = create_formatter(OutputConfig::from_cli(args.json, args.verbose, args.quiet));
    let mut stdout = io::stdout().lock();
    formatter.format(&report, &mut stdout)?;
    stdout.flush()?;

    if report.is_clean() {
        Ok(ExitCode::SUCCESS)
    } else {
        // Finished, but with failures or recipes that need review
        Ok(ExitCode::from(2))
    }
}

/// `--repo`, else the builtin repository of `$SPACK_ROOT`, else the first
/// one `spack repo list` reports. A dry run works without one.
fn open_repository(args: &CliArgs) -> Result<Option<SpackRepository>, ConfigError> {
    let spack_root = std::env::var_os("SPACK_ROOT").map(PathBuf::from);
    match SpackRepository::discover(args.repo.as_deref(), spack_root.as_deref()) {
        Ok(repo) => Ok(Some(repo)),
        Err(ConfigError::RepositoryNotFound) if args.dry_run => Ok(None),
        Err(err) => Err(err),
    }
}
