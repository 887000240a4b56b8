//! Application-wide constants.
//!
//! Centralized names and defaults shared by the installer and the synchronizer.

use std::time::Duration;

/// Default timeout for individual git operations (in seconds).
/// Generous because the first fetch of an upstream can be large.
const DEFAULT_GIT_TIMEOUT_SECS: u64 = 120;

/// Environment variable overriding the git command timeout (in seconds).
pub const GIT_TIMEOUT_ENV: &str = "UPSTREAM_SYNC_TIMEOUT";

/// Returns the git command timeout.
///
/// Can be customized via the UPSTREAM_SYNC_TIMEOUT environment variable (in seconds).
/// Falls back to 120 seconds if not set or invalid.
///
/// Example: `UPSTREAM_SYNC_TIMEOUT=300 upstream-sync sync`
pub fn git_timeout() -> Duration {
    std::env::var(GIT_TIMEOUT_ENV)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(Duration::from_secs(DEFAULT_GIT_TIMEOUT_SECS))
}

/// Program name looked up on PATH for every git invocation.
pub const GIT_PROGRAM: &str = "git";

/// Git directory name used to detect repositories.
pub const GIT_DIR: &str = ".git";

/// Name of the remote the synchronizer manages.
pub const ORIGIN: &str = "origin";

/// Ref written by the most recent fetch; target of the hard reset.
pub const FETCH_HEAD: &str = "FETCH_HEAD";

/// Branch used when UPSTREAM_BRANCH is not configured.
pub const DEFAULT_UPSTREAM_BRANCH: &str = "master";

/// Command run by `install` when none is given.
pub const DEFAULT_INSTALL_COMMAND: &str = "pip3 install --no-cache-dir -r requirements.txt";

/// Progress spinner tick interval in milliseconds.
pub const PROGRESS_TICK_MS: u64 = 80;

/// Default name used when a repository name cannot be determined from its path.
pub const DEFAULT_REPO_NAME: &str = "repository";

/// Placeholder substituted for credentials in anything printed or logged.
pub const REDACTED: &str = "***";
