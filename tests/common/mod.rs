//! Test infrastructure for upstream-sync integration tests.

#![allow(dead_code)]

use anyhow::Result;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tracing_subscriber::fmt::MakeWriter;
use upstream_sync::config::{Config, Verbosity};
use upstream_sync::git::run_git;
use upstream_sync::sync::{SyncCallbacks, SyncResult, SyncStep};

/// Quiet config with a short git timeout so a stuck test fails fast.
pub fn test_config() -> Config {
    Config {
        verbosity: Verbosity::Quiet,
        git_timeout: Duration::from_secs(60),
        ..Config::default()
    }
}

pub fn current_branch(path: &Path) -> Result<String> {
    run_git(path, &test_config(), &["rev-parse", "--abbrev-ref", "HEAD"])
}

/// Short name of the upstream tracked by `branch`, e.g. `origin/main`.
pub fn upstream_of(path: &Path, branch: &str) -> Result<String> {
    let rev = format!("{}@{{upstream}}", branch);
    run_git(path, &test_config(), &["rev-parse", "--abbrev-ref", &rev])
}

pub fn rev_parse(path: &Path, rev: &str) -> Result<String> {
    run_git(path, &test_config(), &["rev-parse", rev])
}

pub fn remote_url(path: &Path, name: &str) -> Result<String> {
    run_git(path, &test_config(), &["remote", "get-url", name])
}

pub fn remotes(path: &Path) -> Result<Vec<String>> {
    let output = run_git(path, &test_config(), &["remote"])?;
    Ok(output.lines().map(str::to_string).collect())
}

pub fn has_uncommitted_changes(path: &Path) -> Result<bool> {
    let output = run_git(path, &test_config(), &["status", "--porcelain"])?;
    Ok(!output.is_empty())
}

/// Commits everything in `path` with a fixed identity.
pub fn commit_all(path: &Path, message: &str) -> Result<()> {
    let config = test_config();
    run_git(path, &config, &["add", "-A"])?;
    run_git(
        path,
        &config,
        &[
            "-c",
            "user.name=Test User",
            "-c",
            "user.email=test@example.com",
            "commit",
            "-m",
            message,
        ],
    )?;
    Ok(())
}

/// A bare upstream repository plus the working copy used to push to it.
/// Automatically cleaned up when dropped.
pub struct TestUpstream {
    _bare_dir: TempDir,
    _seed_dir: TempDir,
    bare: PathBuf,
    seed: PathBuf,
    branch: String,
}

impl TestUpstream {
    /// Creates an upstream whose `branch` holds a single commit with README.md.
    pub fn new(branch: &str) -> Result<Self> {
        let config = test_config();
        let bare_dir = TempDir::new()?;
        let seed_dir = TempDir::new()?;
        let bare = bare_dir.path().to_path_buf();
        let seed = seed_dir.path().to_path_buf();

        run_git(&bare, &config, &["init", "--bare"])?;
        run_git(&seed, &config, &["init", "-b", branch])?;

        std::fs::write(seed.join("README.md"), "# Upstream\n")?;
        commit_all(&seed, "Initial commit")?;

        let upstream = Self {
            _bare_dir: bare_dir,
            _seed_dir: seed_dir,
            bare,
            seed,
            branch: branch.to_string(),
        };
        upstream.push()?;
        Ok(upstream)
    }

    /// Adds a commit writing `contents` to `file` and pushes it.
    pub fn commit_file(&self, file: &str, contents: &str) -> Result<()> {
        std::fs::write(self.seed.join(file), contents)?;
        commit_all(&self.seed, &format!("Update {}", file))?;
        self.push()
    }

    /// Commit id at the tip of the upstream branch.
    pub fn head(&self) -> Result<String> {
        run_git(&self.bare, &test_config(), &["rev-parse", &self.branch])
    }

    /// Plain URL (a filesystem path) for the upstream.
    pub fn url(&self) -> String {
        self.bare.to_string_lossy().into_owned()
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    fn push(&self) -> Result<()> {
        let url = self.url();
        run_git(&self.seed, &test_config(), &["push", &url, &self.branch])?;
        Ok(())
    }
}

/// Records every step a sync reports, in order.
#[derive(Default)]
pub struct RecordingCallbacks {
    steps: Mutex<Vec<SyncStep>>,
    completed: Mutex<usize>,
}

impl RecordingCallbacks {
    pub fn steps(&self) -> Vec<SyncStep> {
        self.steps.lock().unwrap().clone()
    }

    pub fn completed(&self) -> usize {
        *self.completed.lock().unwrap()
    }
}

impl SyncCallbacks for RecordingCallbacks {
    fn on_step(&self, step: &SyncStep) {
        self.steps.lock().unwrap().push(step.clone());
    }

    fn on_complete(&self, _result: &SyncResult) {
        *self.completed.lock().unwrap() += 1;
    }
}

/// In-memory sink for formatted log lines.
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub fn lines(&self) -> Vec<String> {
        let bytes = self.0.lock().unwrap();
        String::from_utf8_lossy(&bytes)
            .lines()
            .map(str::to_string)
            .collect()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Runs `f` with a thread-local subscriber and returns the `info`-and-above
/// lines it logged, e.g. ` WARN upstream_sync::sync: ...`.
pub fn capture_logs<T>(f: impl FnOnce() -> T) -> (T, Vec<String>) {
    let buffer = LogBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(buffer.clone())
        .with_ansi(false)
        .without_time()
        .with_max_level(tracing::Level::INFO)
        .finish();
    let value = tracing::subscriber::with_default(subscriber, f);
    (value, buffer.lines())
}

/// Level of a formatted log line.
pub fn level_of(line: &str) -> &str {
    line.split_whitespace().next().unwrap_or_default()
}
