// Repository synchronization: detection, first-time bootstrap, reconciliation, result types

use crate::config::{Config, RepoConfig};
use crate::constants::{DEFAULT_REPO_NAME, FETCH_HEAD, ORIGIN};
use crate::git::{self, GitLogger};
use crate::remote::{authenticated_url, scrub};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Serializes every synchronization in this process. Git metadata is not
/// safe for concurrent writers.
static SYNC_LOCK: Mutex<()> = Mutex::new(());

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncStep {
    Started,
    CheckingEnvironment,
    DetectingRepository,
    Initializing,
    ConfiguringRemote,
    FetchingOrigin,
    CreatingBranch { branch: String },
    TrackingBranch { branch: String },
    CheckingOut { branch: String },
    RestoringRemoteUrl,
    FetchingBranch { branch: String },
    Pulling { branch: String },
    ResettingHard,
    Completed,
}

impl fmt::Display for SyncStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncStep::Started => write!(f, "Starting sync"),
            SyncStep::CheckingEnvironment => write!(f, "Looking for git"),
            SyncStep::DetectingRepository => write!(f, "Detecting repository"),
            SyncStep::Initializing => write!(f, "Initializing repository"),
            SyncStep::ConfiguringRemote => write!(f, "Configuring remote '{}'", ORIGIN),
            SyncStep::FetchingOrigin => write!(f, "Fetching from {}", ORIGIN),
            SyncStep::CreatingBranch { branch } => write!(f, "Creating branch '{}'", branch),
            SyncStep::TrackingBranch { branch } => {
                write!(f, "Tracking {}/{}", ORIGIN, branch)
            }
            SyncStep::CheckingOut { branch } => write!(f, "Checking out '{}'", branch),
            SyncStep::RestoringRemoteUrl => write!(f, "Restoring plain remote URL"),
            SyncStep::FetchingBranch { branch } => {
                write!(f, "Fetching '{}' from {}", branch, ORIGIN)
            }
            SyncStep::Pulling { branch } => write!(f, "Pulling '{}'", branch),
            SyncStep::ResettingHard => write!(f, "Resetting to {}", FETCH_HEAD),
            SyncStep::Completed => write!(f, "Completed"),
        }
    }
}

/// Receives progress notifications during a sync.
pub trait SyncCallbacks {
    fn on_sync_start(&self, _repo_name: &str) {}
    fn on_step(&self, step: &SyncStep);
    /// Called right before the step's git commands run.
    fn on_step_execute(&self, _step: &SyncStep) {}
    fn on_complete(&self, result: &SyncResult);
}

#[derive(Debug)]
pub struct SyncResult {
    pub path: PathBuf,
    pub outcome: SyncOutcome,
    pub duration: Duration,
}

impl SyncResult {
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, SyncOutcome::Failed(_))
    }
}

/// Terminal state of one synchronization attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Git is not installed; nothing was touched.
    Aborted,
    /// A valid repository already exists; nothing was touched.
    AlreadyInitialized,
    Synced(SyncSuccess),
    Failed(SyncFailure),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSuccess {
    pub branch: String,
    pub reconcile: ReconcileOutcome,
    /// Whether a credential was used for the initial fetch.
    pub authenticated: bool,
}

/// How the local branch was brought level with upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    FastForwarded,
    /// The pull failed and local state was replaced by FETCH_HEAD.
    ///
    /// Any pull failure lands here, including transient network errors,
    /// not only diverged history. `reason` keeps the pull error.
    HardReset { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncFailure {
    pub kind: SyncErrorKind,
    pub step: SyncStep,
    /// Error chain with credentials scrubbed.
    pub error: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncErrorKind {
    /// First-time setup failed (remote, fetch, branch, checkout or the sync after it).
    Initialization,
    /// A git command failed while reconciling an existing checkout.
    Command,
}

#[derive(Debug)]
struct StepError {
    source: anyhow::Error,
    step: SyncStep,
}

fn at_step<T>(step: SyncStep, result: anyhow::Result<T>) -> Result<T, StepError> {
    result.map_err(|e| StepError { source: e, step })
}

fn begin<C>(callbacks: &C, step: SyncStep) -> SyncStep
where
    C: SyncCallbacks + ?Sized,
{
    callbacks.on_step(&step);
    callbacks.on_step_execute(&step);
    step
}

fn repo_name(path: &Path) -> &str {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(DEFAULT_REPO_NAME)
}

/// Makes sure the checkout at `path` follows `repo_config`'s upstream.
///
/// Without git on PATH this is a no-op. An existing valid repository is left
/// alone. Otherwise a repository is created, the upstream branch is fetched,
/// tracked and force-checked-out, and the branch is pulled (or hard reset to
/// FETCH_HEAD when the pull fails). Never panics or returns an error: every
/// failure is reported through [`SyncOutcome::Failed`] and logged.
pub fn sync_repository<C>(
    path: &Path,
    repo_config: &RepoConfig,
    callbacks: &C,
    config: &Config,
) -> SyncResult
where
    C: SyncCallbacks + ?Sized,
{
    let _guard = SYNC_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
    let started = Instant::now();
    callbacks.on_sync_start(repo_name(path));
    callbacks.on_step(&SyncStep::Started);

    let outcome = match detect(path, callbacks, config) {
        Some(outcome) => outcome,
        None => {
            tracing::debug!("No valid git repository found, initializing");
            match initialize(path, repo_config, callbacks, config) {
                Ok(success) => SyncOutcome::Synced(success),
                Err(err) => failed(SyncErrorKind::Initialization, err, repo_config.git_token()),
            }
        }
    };

    finish(path, outcome, started, callbacks)
}

/// Runs only the fetch / pull / reset stage against an existing checkout.
///
/// A missing git binary aborts as in [`sync_repository`]; a path that is
/// not a repository fails at the fetch.
pub fn reconcile<C>(path: &Path, branch: &str, callbacks: &C, config: &Config) -> SyncResult
where
    C: SyncCallbacks + ?Sized,
{
    let _guard = SYNC_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
    let started = Instant::now();
    callbacks.on_sync_start(repo_name(path));
    callbacks.on_step(&SyncStep::Started);

    begin(callbacks, SyncStep::CheckingEnvironment);
    let outcome = if !git::is_available(config) {
        SyncOutcome::Aborted
    } else {
        match reconcile_branch(path, branch, None, callbacks, config) {
            Ok(reconcile) => {
                callbacks.on_step(&SyncStep::Completed);
                SyncOutcome::Synced(SyncSuccess {
                    branch: branch.to_string(),
                    reconcile,
                    authenticated: false,
                })
            }
            Err(err) => failed(SyncErrorKind::Command, err, None),
        }
    };

    finish(path, outcome, started, callbacks)
}

/// Returns a terminal outcome if there is nothing to initialize.
fn detect<C>(path: &Path, callbacks: &C, config: &Config) -> Option<SyncOutcome>
where
    C: SyncCallbacks + ?Sized,
{
    begin(callbacks, SyncStep::CheckingEnvironment);
    if !git::is_available(config) {
        return Some(SyncOutcome::Aborted);
    }

    begin(callbacks, SyncStep::DetectingRepository);
    if git::is_repository(path, config, config.git_logger()) {
        return Some(SyncOutcome::AlreadyInitialized);
    }
    None
}

fn initialize<C>(
    path: &Path,
    repo_config: &RepoConfig,
    callbacks: &C,
    config: &Config,
) -> Result<SyncSuccess, StepError>
where
    C: SyncCallbacks + ?Sized,
{
    let logger = config.git_logger();

    let step = begin(callbacks, SyncStep::Initializing);
    at_step(step, git::init(path, config, logger))?;

    let step = begin(callbacks, SyncStep::ConfiguringRemote);
    let fetch_url = at_step(step.clone(), fetch_url(repo_config))?;
    at_step(step, ensure_origin(path, config, &fetch_url, logger))?;

    let reconciled = checkout_and_reconcile(path, repo_config, callbacks, config);

    // Runs whether or not the checkout worked, so the credential never
    // outlives this call in .git/config.
    begin(callbacks, SyncStep::RestoringRemoteUrl);
    if let Err(err) = git::set_remote_url(path, config, ORIGIN, &repo_config.upstream_repo, logger)
    {
        tracing::debug!(
            "Could not restore plain URL of {}: {}",
            ORIGIN,
            scrub(&format!("{:#}", err), repo_config.git_token())
        );
    }

    let reconcile = reconciled?;
    callbacks.on_step(&SyncStep::Completed);

    Ok(SyncSuccess {
        branch: repo_config.upstream_branch.clone(),
        reconcile,
        authenticated: repo_config.git_token().is_some(),
    })
}

/// URL used for the initial fetch: credentialed when a token is configured.
fn fetch_url(repo_config: &RepoConfig) -> anyhow::Result<String> {
    match repo_config.git_token() {
        Some(token) => authenticated_url(&repo_config.upstream_repo, token),
        None => Ok(repo_config.upstream_repo.clone()),
    }
}

/// Points `origin` at `url`, reusing the remote if it already exists.
fn ensure_origin(path: &Path, config: &Config, url: &str, logger: GitLogger) -> anyhow::Result<()> {
    if git::remote_exists(path, config, ORIGIN, logger)? {
        return git::set_remote_url(path, config, ORIGIN, url, logger);
    }
    if let Err(err) = git::add_remote(path, config, ORIGIN, url, logger) {
        // A duplicate is fine: the remote is there either way.
        if !git::remote_exists(path, config, ORIGIN, logger)? {
            return Err(err);
        }
        return git::set_remote_url(path, config, ORIGIN, url, logger);
    }
    Ok(())
}

fn checkout_and_reconcile<C>(
    path: &Path,
    repo_config: &RepoConfig,
    callbacks: &C,
    config: &Config,
) -> Result<ReconcileOutcome, StepError>
where
    C: SyncCallbacks + ?Sized,
{
    let logger = config.git_logger();
    let branch = repo_config.upstream_branch.as_str();
    let tracking_ref = format!("{}/{}", ORIGIN, branch);

    let step = begin(callbacks, SyncStep::FetchingOrigin);
    at_step(step, git::fetch(path, config, ORIGIN, logger))?;

    let step = begin(
        callbacks,
        SyncStep::CreatingBranch {
            branch: branch.to_string(),
        },
    );
    at_step(
        step,
        git::create_branch(path, config, branch, &tracking_ref, logger),
    )?;

    let step = begin(
        callbacks,
        SyncStep::TrackingBranch {
            branch: branch.to_string(),
        },
    );
    at_step(
        step,
        git::set_upstream(path, config, branch, &tracking_ref, logger),
    )?;

    let step = begin(
        callbacks,
        SyncStep::CheckingOut {
            branch: branch.to_string(),
        },
    );
    at_step(step, git::checkout_force(path, config, branch, logger))?;

    reconcile_branch(path, branch, repo_config.git_token(), callbacks, config)
}

fn reconcile_branch<C>(
    path: &Path,
    branch: &str,
    token: Option<&str>,
    callbacks: &C,
    config: &Config,
) -> Result<ReconcileOutcome, StepError>
where
    C: SyncCallbacks + ?Sized,
{
    let logger = config.git_logger();

    let step = begin(
        callbacks,
        SyncStep::FetchingBranch {
            branch: branch.to_string(),
        },
    );
    at_step(step, git::fetch_branch(path, config, ORIGIN, branch, logger))?;

    begin(
        callbacks,
        SyncStep::Pulling {
            branch: branch.to_string(),
        },
    );
    let pull_error = match git::pull_ff_only(path, config, ORIGIN, branch, logger) {
        Ok(()) => return Ok(ReconcileOutcome::FastForwarded),
        Err(err) => err,
    };

    // Upstream wins over whatever local history prevented the pull.
    let step = begin(callbacks, SyncStep::ResettingHard);
    at_step(step, git::reset_hard(path, config, FETCH_HEAD, logger))?;

    Ok(ReconcileOutcome::HardReset {
        reason: scrub(&format!("{:#}", pull_error), token),
    })
}

fn failed(kind: SyncErrorKind, err: StepError, token: Option<&str>) -> SyncOutcome {
    SyncOutcome::Failed(SyncFailure {
        kind,
        step: err.step,
        error: scrub(&format!("{:#}", err.source), token),
    })
}

fn finish<C>(path: &Path, outcome: SyncOutcome, started: Instant, callbacks: &C) -> SyncResult
where
    C: SyncCallbacks + ?Sized,
{
    let result = SyncResult {
        path: path.to_path_buf(),
        outcome,
        duration: started.elapsed(),
    };
    // Callbacks first so a live spinner is cleared before the log line.
    callbacks.on_complete(&result);
    log_outcome(path, &result.outcome);
    result
}

/// Emits the single log event for a terminal state.
fn log_outcome(path: &Path, outcome: &SyncOutcome) {
    match outcome {
        SyncOutcome::Aborted => {
            tracing::warn!("Git binary not found. Skipping repository sync.");
        }
        SyncOutcome::AlreadyInitialized => {
            tracing::info!(path = %path.display(), "Git repository found. Skipping init.");
        }
        SyncOutcome::Synced(success) => match &success.reconcile {
            ReconcileOutcome::FastForwarded => {
                tracing::info!(
                    branch = %success.branch,
                    "Fetched updates from upstream repository."
                );
            }
            ReconcileOutcome::HardReset { reason } => {
                tracing::info!(
                    branch = %success.branch,
                    hard_reset = true,
                    %reason,
                    "Fetched updates from upstream repository."
                );
            }
        },
        SyncOutcome::Failed(failure) => match failure.kind {
            SyncErrorKind::Initialization => {
                tracing::error!(step = %failure.step, "Git init failed: {}", failure.error);
            }
            SyncErrorKind::Command => {
                tracing::error!(step = %failure.step, "Git command error: {}", failure.error);
            }
        },
    }
}
