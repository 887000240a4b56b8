//! Git command wrappers.
//!
//! This module provides a thin wrapper around git CLI commands,
//! handling command execution, timeouts, and error formatting.
//! Every wrapper runs exactly one git command.

use crate::config::Config;
use crate::constants::GIT_DIR;
use crate::process;
use crate::remote::redact;
use anyhow::Context;
use colored::Colorize;
use std::path::Path;
use std::process::Command;

/// Callback invoked with the arguments of each git command before it runs.
pub type GitLogger = fn(&[&str]);

/// Echoes the git command to stderr, with credentials masked.
pub fn verbose_logger(args: &[&str]) {
    eprintln!("    {}", redact(&format!("$ git {}", args.join(" "))).dimmed());
}

pub fn no_op_logger(_args: &[&str]) {}

/// Runs git in `repo` and returns its trimmed stdout.
///
/// Git never prompts: a missing or rejected credential fails the command.
pub fn run_git(repo: &Path, config: &Config, args: &[&str]) -> anyhow::Result<String> {
    let mut command = Command::new(&config.git_program);
    command
        .current_dir(repo)
        .args(args)
        .env("GIT_TERMINAL_PROMPT", "0")
        .env("LC_ALL", "C");

    let output = process::run(command, Some(config.git_timeout))
        .with_context(|| format!("Failed to execute git {}", redact(&args.join(" "))))?;

    if output.status.success() {
        let result = String::from_utf8_lossy(&output.stdout);
        Ok(result.as_ref().trim().to_string())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!(
            "git {} failed: {}",
            redact(&args.join(" ")),
            redact(stderr.trim())
        )
    }
}

fn run_logged(
    repo: &Path,
    config: &Config,
    args: &[&str],
    logger: GitLogger,
) -> anyhow::Result<String> {
    logger(args);
    run_git(repo, config, args)
}

fn validate_branch_name(branch: &str) -> anyhow::Result<()> {
    if branch.contains('\0') || branch.contains('\n') || branch.is_empty() || branch.starts_with('-')
    {
        anyhow::bail!("Invalid branch name: {:?}", branch);
    }
    Ok(())
}

/// Whether the configured git program can be found on PATH.
#[must_use]
pub fn is_available(config: &Config) -> bool {
    which::which(&config.git_program).is_ok()
}

/// Whether `path` itself holds a valid repository.
///
/// Parent directories are not searched: a checkout nested inside another
/// repository without its own metadata is not a repository here.
pub fn is_repository(path: &Path, config: &Config, logger: GitLogger) -> bool {
    path.join(GIT_DIR).exists()
        && run_logged(
            path,
            config,
            &["--git-dir", GIT_DIR, "rev-parse", "--git-dir"],
            logger,
        )
        .is_ok()
}

pub fn init(repo: &Path, config: &Config, logger: GitLogger) -> anyhow::Result<()> {
    run_logged(repo, config, &["init"], logger).context("Failed to initialize repository")?;
    Ok(())
}

pub fn remote_exists(
    repo: &Path,
    config: &Config,
    name: &str,
    logger: GitLogger,
) -> anyhow::Result<bool> {
    run_logged(repo, config, &["remote"], logger)
        .map(|output| output.lines().any(|line| line.trim() == name))
        .context("Failed to list remotes")
}

pub fn add_remote(
    repo: &Path,
    config: &Config,
    name: &str,
    url: &str,
    logger: GitLogger,
) -> anyhow::Result<()> {
    run_logged(repo, config, &["remote", "add", name, url], logger)
        .with_context(|| format!("Failed to add remote '{}'", name))?;
    Ok(())
}

pub fn set_remote_url(
    repo: &Path,
    config: &Config,
    name: &str,
    url: &str,
    logger: GitLogger,
) -> anyhow::Result<()> {
    run_logged(repo, config, &["remote", "set-url", name, url], logger)
        .with_context(|| format!("Failed to set URL of remote '{}'", name))?;
    Ok(())
}

pub fn fetch(repo: &Path, config: &Config, remote: &str, logger: GitLogger) -> anyhow::Result<()> {
    run_logged(repo, config, &["fetch", remote], logger)
        .with_context(|| format!("Failed to fetch from '{}'", remote))?;
    Ok(())
}

/// Fetches a single branch; the result is also recorded in FETCH_HEAD.
pub fn fetch_branch(
    repo: &Path,
    config: &Config,
    remote: &str,
    branch: &str,
    logger: GitLogger,
) -> anyhow::Result<()> {
    validate_branch_name(branch)?;
    run_logged(repo, config, &["fetch", remote, branch], logger)
        .with_context(|| format!("Failed to fetch '{}' from '{}'", branch, remote))?;
    Ok(())
}

pub fn create_branch(
    repo: &Path,
    config: &Config,
    branch: &str,
    start_point: &str,
    logger: GitLogger,
) -> anyhow::Result<()> {
    validate_branch_name(branch)?;
    run_logged(
        repo,
        config,
        &["branch", "--no-track", branch, start_point],
        logger,
    )
    .with_context(|| format!("Failed to create branch '{}' at '{}'", branch, start_point))?;
    Ok(())
}

pub fn set_upstream(
    repo: &Path,
    config: &Config,
    branch: &str,
    upstream: &str,
    logger: GitLogger,
) -> anyhow::Result<()> {
    validate_branch_name(branch)?;
    run_logged(
        repo,
        config,
        &["branch", "--set-upstream-to", upstream, branch],
        logger,
    )
    .with_context(|| format!("Failed to set upstream of '{}' to '{}'", branch, upstream))?;
    Ok(())
}

/// Checks out `branch`, discarding local changes and overwriting untracked
/// files that are in the way.
pub fn checkout_force(
    repo: &Path,
    config: &Config,
    branch: &str,
    logger: GitLogger,
) -> anyhow::Result<()> {
    validate_branch_name(branch)?;
    run_logged(repo, config, &["checkout", "-f", branch], logger)
        .with_context(|| format!("Failed to checkout branch '{}'", branch))?;
    Ok(())
}

pub fn pull_ff_only(
    repo: &Path,
    config: &Config,
    remote: &str,
    branch: &str,
    logger: GitLogger,
) -> anyhow::Result<()> {
    validate_branch_name(branch)?;
    run_logged(repo, config, &["pull", "--ff-only", remote, branch], logger)
        .with_context(|| format!("Failed to pull '{}' from '{}'", branch, remote))?;
    Ok(())
}

pub fn reset_hard(
    repo: &Path,
    config: &Config,
    target: &str,
    logger: GitLogger,
) -> anyhow::Result<()> {
    run_logged(repo, config, &["reset", "--hard", target], logger)
        .with_context(|| format!("Failed to reset to '{}'", target))?;
    Ok(())
}
