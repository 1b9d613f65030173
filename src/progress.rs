//! Spinner shown while packages are converted
//!
//! Uses indicatif; hidden in quiet and JSON mode.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

const TICK_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// Progress reporter for one orchestrator run
pub struct Progress {
    enabled: bool,
    spinner: Option<ProgressBar>,
}

impl Progress {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            spinner: None,
        }
    }

    /// Reporter that never draws anything
    pub fn disabled() -> Self {
        Self::new(false)
    }

    /// Start the spinner for a run rooted at `root`
    pub fn start(&mut self, root: &str) {
        if !self.enabled {
            return;
        }

        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner()
            .tick_chars(TICK_CHARS)
            .template("{spinner:.cyan} {msg} [{elapsed}]")
        {
            spinner.set_style(style);
        }
        spinner.set_message(format!("Converting {}...", root));
        spinner.enable_steady_tick(Duration::from_millis(80));
        self.spinner = Some(spinner);
    }

    /// Show the package being converted and how far the run is
    pub fn converting(&self, package: &str, done: usize, limit: Option<usize>) {
        if let Some(spinner) = &self.spinner {
            spinner.set_message(converting_message(package, done, limit));
        }
    }

    /// Remove the spinner from the terminal
    pub fn finish(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::new(true)
    }
}

fn converting_message(package: &str, done: usize, limit: Option<usize>) -> String {
    match limit {
        Some(limit) => format!("Converting {} ({}/{})...", package, done + 1, limit),
        None => format!("Converting {} ({} converted)...", package, done),
    }
}
