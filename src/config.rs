//! Configuration types for CLI verbosity, process limits, and the upstream repository.

use crate::constants::{DEFAULT_UPSTREAM_BRANCH, GIT_PROGRAM, REDACTED, git_timeout};
use crate::git::{self, GitLogger};
use std::fmt;
use std::time::Duration;

/// Runtime configuration derived from CLI arguments and the environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// Controls the verbosity level of CLI output.
    pub verbosity: Verbosity,
    /// Program invoked for git commands, resolved on PATH.
    pub git_program: String,
    /// Upper bound for a single git command.
    pub git_timeout: Duration,
    /// Upper bound for an install command; `None` waits indefinitely.
    pub install_timeout: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            verbosity: Verbosity::default(),
            git_program: GIT_PROGRAM.to_string(),
            git_timeout: git_timeout(),
            install_timeout: None,
        }
    }
}

impl Config {
    #[must_use]
    pub fn is_quiet(&self) -> bool {
        self.verbosity == Verbosity::Quiet
    }

    #[must_use]
    pub fn is_verbose(&self) -> bool {
        self.verbosity == Verbosity::Verbose
    }

    /// Returns the appropriate git logger based on verbosity settings.
    ///
    /// Config only picks which logger function to use; the loggers
    /// themselves live in the git module.
    #[must_use]
    pub fn git_logger(&self) -> GitLogger {
        if self.is_verbose() {
            git::verbose_logger
        } else {
            git::no_op_logger
        }
    }

    /// Default tracing filter directive for this verbosity.
    #[must_use]
    pub fn log_level(&self) -> &'static str {
        match self.verbosity {
            Verbosity::Quiet => "error",
            Verbosity::Normal => "info",
            Verbosity::Verbose => "debug",
        }
    }
}

/// Verbosity level for CLI output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    Quiet,
    #[default]
    Normal,
    Verbose,
}

/// Where the local checkout is synchronized from.
///
/// The token is a bearer credential. It is only ever placed into the
/// authenticated remote URL for the initial fetch, and `Debug` never shows it.
#[derive(Clone, PartialEq, Eq)]
pub struct RepoConfig {
    pub upstream_repo: String,
    pub upstream_branch: String,
    git_token: Option<String>,
}

impl RepoConfig {
    /// Builds a config. An empty or whitespace-only token counts as no token.
    pub fn new(
        upstream_repo: impl Into<String>,
        upstream_branch: impl Into<String>,
        git_token: Option<String>,
    ) -> Self {
        let upstream_branch = upstream_branch.into();
        let upstream_branch = if upstream_branch.trim().is_empty() {
            DEFAULT_UPSTREAM_BRANCH.to_string()
        } else {
            upstream_branch
        };
        Self {
            upstream_repo: upstream_repo.into(),
            upstream_branch,
            git_token: git_token.filter(|t| !t.trim().is_empty()),
        }
    }

    #[must_use]
    pub fn git_token(&self) -> Option<&str> {
        self.git_token.as_deref()
    }
}

impl fmt::Debug for RepoConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepoConfig")
            .field("upstream_repo", &self.upstream_repo)
            .field("upstream_branch", &self.upstream_branch)
            .field("git_token", &self.git_token.as_ref().map(|_| REDACTED))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git;

    #[test]
    fn test_config_quiet_and_verbose_flags() {
        let quiet = Config {
            verbosity: Verbosity::Quiet,
            ..Config::default()
        };
        assert!(quiet.is_quiet());
        assert!(!quiet.is_verbose());
        assert_eq!(quiet.log_level(), "error");

        let verbose = Config {
            verbosity: Verbosity::Verbose,
            ..Config::default()
        };
        assert!(!verbose.is_quiet());
        assert!(verbose.is_verbose());
        assert_eq!(verbose.log_level(), "debug");
    }

    #[test]
    fn test_git_logger_selects_verbose_or_no_op() {
        let verbose = Config {
            verbosity: Verbosity::Verbose,
            ..Config::default()
        };
        assert!(std::ptr::fn_addr_eq(
            verbose.git_logger() as GitLogger,
            git::verbose_logger as GitLogger
        ));

        let normal = Config::default();
        assert!(std::ptr::fn_addr_eq(
            normal.git_logger() as GitLogger,
            git::no_op_logger as GitLogger
        ));
    }

    #[test]
    fn test_empty_token_is_treated_as_absent() {
        let config = RepoConfig::new("https://github.com/o/r", "main", Some("  ".to_string()));
        assert_eq!(config.git_token(), None);

        let config = RepoConfig::new("https://github.com/o/r", "main", Some("tok".to_string()));
        assert_eq!(config.git_token(), Some("tok"));
    }

    #[test]
    fn test_empty_branch_falls_back_to_default() {
        let config = RepoConfig::new("https://github.com/o/r", "", None);
        assert_eq!(config.upstream_branch, DEFAULT_UPSTREAM_BRANCH);
    }

    #[test]
    fn test_debug_never_shows_token() {
        let config = RepoConfig::new(
            "https://github.com/o/r",
            "main",
            Some("ghp_secret".to_string()),
        );
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("ghp_secret"));
        assert!(rendered.contains(REDACTED));
    }
}
