//! Dependency installation through an external package manager.

use crate::process::{self, ProcessError};
use anyhow::Context;
use std::process::Command;
use std::time::Duration;

/// Outcome of one installer run. Produced exactly once per invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub process_id: u32,
}

impl ProcessResult {
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs `cmd` and blocks until it exits.
///
/// The command line is split with shell word rules (quotes and escapes are
/// honored) and executed directly, never through a shell. Both streams are
/// decoded lossily as UTF-8 and trimmed. A non-zero exit code is reported,
/// not treated as an error.
pub fn install_req(cmd: &str) -> anyhow::Result<ProcessResult> {
    install_req_with_timeout(cmd, None)
}

/// Like [`install_req`], but kills the child once `timeout` elapses.
///
/// Expiry surfaces as a [`ProcessError::TimedOut`] in the error chain.
pub fn install_req_with_timeout(
    cmd: &str,
    timeout: Option<Duration>,
) -> anyhow::Result<ProcessResult> {
    let args = shell_words::split(cmd)
        .with_context(|| format!("Failed to parse command line: {}", cmd))?;
    let (program, rest) = args.split_first().ok_or(ProcessError::EmptyCommand)?;

    let mut command = Command::new(program);
    command.args(rest);

    let output = process::run(command, timeout)
        .with_context(|| format!("Failed to run install command '{}'", program))?;

    Ok(ProcessResult {
        stdout: decode(&output.stdout),
        stderr: decode(&output.stderr),
        exit_code: output.exit_code(),
        process_id: output.pid,
    })
}

fn decode(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).trim().to_string()
}
