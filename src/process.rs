//! Blocking child-process execution.
//!
//! Both output pipes are drained on their own reader threads while the
//! calling thread waits on the child, so a child that fills one pipe while
//! the parent is blocked on the other can never deadlock. Callers see a
//! plain blocking call.

use std::io::{self, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// How often a child with a deadline is polled for exit.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Raw result of a finished child process.
#[derive(Debug)]
pub struct ProcessOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub status: ExitStatus,
    pub pid: u32,
}

impl ProcessOutput {
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        exit_code(self.status)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("empty command line")]
    EmptyCommand,
    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("I/O error while running '{program}': {source}")]
    Io {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("'{program}' did not finish within {timeout:?} and was killed")]
    TimedOut { program: String, timeout: Duration },
}

/// Runs `command` to completion with stdout and stderr captured separately.
///
/// Stdin is closed. Without a timeout the call blocks until the child exits.
/// With one, the child is killed and reaped on expiry and
/// [`ProcessError::TimedOut`] is returned.
pub fn run(mut command: Command, timeout: Option<Duration>) -> Result<ProcessOutput, ProcessError> {
    let program = command.get_program().to_string_lossy().into_owned();
    let io_err = |source: io::Error| ProcessError::Io {
        program: program.clone(),
        source,
    };

    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = command.spawn().map_err(|source| ProcessError::Spawn {
        program: program.clone(),
        source,
    })?;
    let pid = child.id();

    let stdout_reader = spawn_reader(child.stdout.take());
    let stderr_reader = spawn_reader(child.stderr.take());

    let status = match wait(&mut child, timeout).map_err(io_err)? {
        Some(status) => status,
        None => {
            // Readers are detached: a grandchild may still hold the pipes open.
            return Err(ProcessError::TimedOut {
                program: program.clone(),
                timeout: timeout.unwrap_or_default(),
            });
        }
    };

    let stdout = join_reader(stdout_reader).map_err(io_err)?;
    let stderr = join_reader(stderr_reader).map_err(io_err)?;

    Ok(ProcessOutput {
        stdout,
        stderr,
        status,
        pid,
    })
}

/// Exit code of a finished process.
///
/// A process terminated by a signal reports the negated signal number.
#[must_use]
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return -signal;
        }
    }
    -1
}

fn spawn_reader<R>(pipe: Option<R>) -> JoinHandle<io::Result<Vec<u8>>>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            pipe.read_to_end(&mut buf)?;
        }
        Ok(buf)
    })
}

fn join_reader(handle: JoinHandle<io::Result<Vec<u8>>>) -> io::Result<Vec<u8>> {
    handle
        .join()
        .map_err(|_| io::Error::other("output reader thread panicked"))?
}

fn wait(child: &mut Child, timeout: Option<Duration>) -> io::Result<Option<ExitStatus>> {
    let Some(timeout) = timeout else {
        return child.wait().map(Some);
    };

    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        let now = Instant::now();
        if now >= deadline {
            // The child may have exited between try_wait and kill.
            let _ = child.kill();
            child.wait()?;
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL.min(deadline - now));
    }
}
