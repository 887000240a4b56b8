//! Startup self-update library.
//!
//! This crate keeps a local checkout in step with an upstream repository by:
//! - Skipping everything when git is not installed
//! - Leaving an existing repository untouched
//! - Bootstrapping a repository, optionally fetching with a token
//! - Tracking and force-checking-out the upstream branch
//! - Pulling, or hard resetting to FETCH_HEAD when the pull fails
//!
//! It also runs dependency install commands as child processes.

pub mod config;
pub mod constants;
pub mod git;
pub mod install;
pub mod output;
pub mod process;
pub mod remote;
pub mod sync;
