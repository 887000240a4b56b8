//! Spinner progress, colored output, and result formatting.
//!
//! This module provides visual feedback while a sync runs and prints the
//! outcome of `sync` and `install` runs.

use crate::config::Config;
use crate::constants::PROGRESS_TICK_MS;
use crate::install::ProcessResult;
use crate::sync::{ReconcileOutcome, SyncCallbacks, SyncOutcome, SyncResult, SyncStep};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;

/// No-op callbacks for when progress tracking is not needed.
/// This is the null object pattern for SyncCallbacks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoOpCallbacks;

impl SyncCallbacks for NoOpCallbacks {
    fn on_step(&self, _step: &SyncStep) {}
    fn on_complete(&self, _result: &SyncResult) {}
}

/// Prints a repository header in verbose mode.
pub fn print_repo_header(config: &Config, repo_name: &str) {
    if !config.is_verbose() {
        return;
    }
    eprintln!("\n{}", format!("[{}]", repo_name).white().bold());
}

/// Prints a step progress message in verbose mode.
pub fn print_step(config: &Config, step: &SyncStep) {
    if !config.is_verbose() {
        return;
    }
    eprintln!("  {}...", step.to_string().dimmed());
}

/// Spinner shown while a sync runs.
/// `None` in quiet and verbose modes, where a spinner would only get in the way.
pub struct SyncProgress {
    spinner: Option<ProgressBar>,
}

impl SyncProgress {
    pub fn update(&self, step: &SyncStep) {
        if let Some(spinner) = &self.spinner {
            spinner.set_message(format!("{}...", step));
        }
    }

    pub fn clear(&self) {
        if let Some(spinner) = &self.spinner {
            spinner.finish_and_clear();
        }
    }
}

/// Console callbacks: spinner in normal mode, step lines in verbose mode.
pub struct ConsoleCallbacks {
    progress: SyncProgress,
    config: Config,
}

impl ConsoleCallbacks {
    pub fn new(config: &Config) -> Self {
        Self {
            progress: create_sync_progress(config),
            config: config.clone(),
        }
    }
}

impl SyncCallbacks for ConsoleCallbacks {
    fn on_sync_start(&self, repo_name: &str) {
        print_repo_header(&self.config, repo_name);
    }

    fn on_step(&self, step: &SyncStep) {
        self.progress.update(step);
    }

    fn on_step_execute(&self, step: &SyncStep) {
        print_step(&self.config, step);
    }

    fn on_complete(&self, _result: &SyncResult) {
        self.progress.clear();
    }
}

#[must_use]
pub fn create_sync_progress(config: &Config) -> SyncProgress {
    let spinner = if config.is_quiet() || config.is_verbose() {
        None
    } else {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner()
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
                .template("{spinner:.cyan} {msg}")
                .expect("spinner template is valid"),
        );
        spinner.enable_steady_tick(Duration::from_millis(PROGRESS_TICK_MS));
        Some(spinner)
    };

    SyncProgress { spinner }
}

pub fn print_working_dir(path: &Path, config: &Config) {
    if config.is_quiet() {
        return;
    }
    println!(
        "{} {}",
        "Working in:".cyan(),
        path.display().to_string().white().bold()
    )
}

/// Prints the outcome of a sync. Quiet mode prints failures only, to stderr.
pub fn print_sync_result(result: &SyncResult, config: &Config) {
    if config.is_quiet() {
        if let SyncOutcome::Failed(failure) = &result.outcome {
            eprintln!("error: {}: {}", result.path.display(), failure.error);
        }
        return;
    }
    println!("{}", format_sync_outcome(result));
}

fn format_sync_outcome(result: &SyncResult) -> String {
    let took = format_duration(result.duration).dimmed();
    match &result.outcome {
        SyncOutcome::Aborted => format!(
            "{} git not found, sync skipped",
            "SKIP".yellow().bold()
        ),
        SyncOutcome::AlreadyInitialized => format!(
            "{} repository already initialized",
            "OK".green().bold()
        ),
        SyncOutcome::Synced(success) => {
            let how = match &success.reconcile {
                ReconcileOutcome::FastForwarded => "".normal(),
                ReconcileOutcome::HardReset { .. } => " (hard reset to upstream)".yellow(),
            };
            format!(
                "{} synced {}{} in {}",
                "OK".green().bold(),
                success.branch.cyan(),
                how,
                took
            )
        }
        SyncOutcome::Failed(failure) => format!(
            "{} {} in {}",
            "FAIL".red().bold(),
            format!("at {}: {}", failure.step, failure.error).red(),
            took
        ),
    }
}

/// Echoes the child's output and a status line.
pub fn print_install_result(result: &ProcessResult, config: &Config) {
    if !result.stdout.is_empty() && !config.is_quiet() {
        println!("{}", result.stdout);
    }
    if !result.stderr.is_empty() {
        eprintln!("{}", result.stderr);
    }
    if config.is_quiet() {
        return;
    }
    let status = if result.success() {
        "OK".green().bold()
    } else {
        "FAIL".red().bold()
    };
    println!(
        "{} pid {} exited with {}",
        status,
        result.process_id,
        result.exit_code
    );
}

fn format_duration(duration: Duration) -> String {
    format!("{:.2}s", duration.as_secs_f32())
}
