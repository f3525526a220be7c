//! External program execution.
//!
//! Every synchronous call carries a timeout; long-running helpers are
//! spawned as [`ChildProcess`] handles that are terminated explicitly
//! (SIGTERM, grace period, then SIGKILL).

use core::time::Duration;
use std::io::{self, Read};
use std::process::{Child, Command, Stdio};
use std::thread::JoinHandle;

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;

use crate::stop::StopFlag;
use crate::time::{BoundedWait, StdDelay, WaitError};

const EXIT_POLL: Duration = Duration::from_millis(20);

/// Captured result of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; `None` if killed by a signal.
    pub status: Option<i32>,
    /// Standard output, lossily decoded.
    pub stdout: String,
    /// Standard error, lossily decoded.
    pub stderr: String,
}

impl CommandOutput {
    /// Successful output with the given stdout.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            status: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Exit code 0.
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

/// Errors from running external programs.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// The program could not be started.
    #[error("failed to start {program}: {source}")]
    Spawn {
        /// Program name.
        program: String,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
    /// The program did not exit within its timeout and was killed.
    #[error("{program} did not finish within {timeout:?}")]
    TimedOut {
        /// Program name.
        program: String,
        /// Bound that was exceeded.
        timeout: Duration,
    },
    /// A stop request arrived while the program ran; it was killed.
    #[error("{program} interrupted by a stop request")]
    Interrupted {
        /// Program name.
        program: String,
    },
    /// The program exited unsuccessfully.
    #[error("{program} exited with {status:?}: {stderr}")]
    Failed {
        /// Program name.
        program: String,
        /// Exit code.
        status: Option<i32>,
        /// Captured standard error.
        stderr: String,
    },
    /// Waiting on or signalling the process failed.
    #[error("process control for {program} failed: {source}")]
    Io {
        /// Program name.
        program: String,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
}

/// Runs external programs.
pub trait CommandRunner {
    /// Run `program` to completion, killing it after `timeout`.
    fn run(
        &mut self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<CommandOutput, CommandError>;

    /// Start a long-running helper.
    fn spawn(&mut self, program: &str, args: &[&str])
        -> Result<Box<dyn ChildProcess>, CommandError>;

    /// [`CommandRunner::run`], turning a non-zero exit into [`CommandError::Failed`].
    fn run_checked(
        &mut self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<CommandOutput, CommandError> {
        let output = self.run(program, args, timeout)?;
        if output.success() {
            Ok(output)
        } else {
            Err(CommandError::Failed {
                program: program.to_owned(),
                status: output.status,
                stderr: output.stderr.trim().to_owned(),
            })
        }
    }
}

impl<R: CommandRunner + ?Sized> CommandRunner for &mut R {
    fn run(
        &mut self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<CommandOutput, CommandError> {
        (**self).run(program, args, timeout)
    }

    fn spawn(
        &mut self,
        program: &str,
        args: &[&str],
    ) -> Result<Box<dyn ChildProcess>, CommandError> {
        (**self).spawn(program, args)
    }
}

/// Handle to a spawned helper process.
pub trait ChildProcess: Send {
    /// Program name, for logs.
    fn program(&self) -> &str;

    /// OS process id.
    fn id(&self) -> u32;

    /// Whether the process is still alive.
    fn is_running(&mut self) -> Result<bool, CommandError>;

    /// SIGTERM, wait up to `grace`, then SIGKILL. Idempotent.
    fn terminate(&mut self, grace: Duration) -> Result<(), CommandError>;
}

// ---------------------------------------------------------------------------
// std::process implementation
// ---------------------------------------------------------------------------

/// [`CommandRunner`] backed by [`std::process::Command`].
///
/// Output is drained on reader threads while the exit is polled, so a
/// chatty program cannot block on a full pipe.
#[derive(Debug, Clone, Default)]
pub struct SystemRunner {
    stop: Option<StopFlag>,
}

impl SystemRunner {
    /// Runner whose synchronous calls are cut short by a stop request.
    pub fn with_stop(stop: StopFlag) -> Self {
        Self { stop: Some(stop) }
    }

    fn exit_wait(&self, timeout: Duration) -> BoundedWait {
        let wait = BoundedWait::new(EXIT_POLL, timeout);
        match &self.stop {
            Some(stop) => wait.with_stop(stop.clone()),
            None => wait,
        }
    }
}

/// Read a pipe to the end on its own thread.
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<Vec<u8>> {
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            // A read error only truncates the captured text.
            pipe.read_to_end(&mut buf).ok();
        }
        buf
    })
}

fn collect(reader: JoinHandle<Vec<u8>>) -> String {
    let bytes = reader.join().unwrap_or_default();
    String::from_utf8_lossy(&bytes).into_owned()
}

impl CommandRunner for SystemRunner {
    fn run(
        &mut self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<CommandOutput, CommandError> {
        tracing::debug!(program, ?args, "run");
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| CommandError::Spawn {
                program: program.to_owned(),
                source,
            })?;
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let mut status = None;
        let exited = self.exit_wait(timeout).run(&mut StdDelay, || {
            status = child.try_wait()?;
            Ok::<_, io::Error>(status.is_some())
        });
        let failure = match exited {
            Ok(_) => None,
            Err(WaitError::TimedOut { .. }) => Some(CommandError::TimedOut {
                program: program.to_owned(),
                timeout,
            }),
            Err(WaitError::Interrupted { .. }) => Some(CommandError::Interrupted {
                program: program.to_owned(),
            }),
            Err(WaitError::Check(source)) => Some(CommandError::Io {
                program: program.to_owned(),
                source,
            }),
        };
        if let Some(err) = failure {
            // Best effort: the child may exit between try_wait and kill.
            child.kill().ok();
            child.wait().ok();
            // Readers are left to finish on their own; a grandchild may
            // still hold the pipes.
            return Err(err);
        }

        Ok(CommandOutput {
            status: status.and_then(|s| s.code()),
            stdout: collect(stdout),
            stderr: collect(stderr),
        })
    }

    fn spawn(
        &mut self,
        program: &str,
        args: &[&str],
    ) -> Result<Box<dyn ChildProcess>, CommandError> {
        tracing::debug!(program, ?args, "spawn");
        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| CommandError::Spawn {
                program: program.to_owned(),
                source,
            })?;
        Ok(Box::new(SystemChild {
            program: program.to_owned(),
            child,
        }))
    }
}

/// A helper started by [`SystemRunner::spawn`].
///
/// Dropping a still-running handle kills the process.
#[derive(Debug)]
pub struct SystemChild {
    program: String,
    child: Child,
}

impl SystemChild {
    fn io_error(&self, source: io::Error) -> CommandError {
        CommandError::Io {
            program: self.program.clone(),
            source,
        }
    }
}

impl ChildProcess for SystemChild {
    fn program(&self) -> &str {
        &self.program
    }

    fn id(&self) -> u32 {
        self.child.id()
    }

    fn is_running(&mut self) -> Result<bool, CommandError> {
        match self.child.try_wait() {
            Ok(status) => Ok(status.is_none()),
            Err(e) => Err(self.io_error(e)),
        }
    }

    fn terminate(&mut self, grace: Duration) -> Result<(), CommandError> {
        if !self.is_running()? {
            return Ok(());
        }
        let pid = i32::try_from(self.child.id())
            .map_err(|e| self.io_error(io::Error::new(io::ErrorKind::InvalidInput, e)))?;
        if let Err(errno) = kill(Pid::from_raw(pid), Signal::SIGTERM) {
            return Err(self.io_error(io::Error::from(errno)));
        }

        let stopped = BoundedWait::new(EXIT_POLL, grace)
            .run(&mut StdDelay, || self.child.try_wait().map(|s| s.is_some()));
        match stopped {
            Ok(_) => Ok(()),
            Err(WaitError::TimedOut { .. } | WaitError::Interrupted { .. }) => {
                tracing::warn!(program = %self.program, pid, "no exit after SIGTERM, killing");
                self.child.kill().map_err(|e| self.io_error(e))?;
                self.child.wait().map_err(|e| self.io_error(e))?;
                Ok(())
            }
            Err(WaitError::Check(e)) => Err(self.io_error(e)),
        }
    }
}

impl Drop for SystemChild {
    fn drop(&mut self) {
        if let Ok(None) = self.child.try_wait() {
            tracing::warn!(program = %self.program, "helper dropped while running, killing");
            self.child.kill().ok();
            self.child.wait().ok();
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn run_captures_stdout_and_status() {
        let out = SystemRunner::default()
            .run("sh", &["-c", "echo hello; exit 3"], Duration::from_secs(5))
            .unwrap();
        assert_eq!(out.stdout.trim(), "hello");
        assert_eq!(out.status, Some(3));
        assert!(!out.success());
    }

    #[test]
    fn run_checked_reports_failure() {
        let err = SystemRunner::default()
            .run_checked("sh", &["-c", "echo oops >&2; exit 1"], Duration::from_secs(5))
            .unwrap_err();
        match err {
            CommandError::Failed { status, stderr, .. } => {
                assert_eq!(status, Some(1));
                assert_eq!(stderr, "oops");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn run_kills_on_timeout() {
        let start = std::time::Instant::now();
        let err = SystemRunner::default()
            .run("sleep", &["5"], Duration::from_millis(200))
            .unwrap_err();
        assert!(matches!(err, CommandError::TimedOut { .. }));
        assert!(start.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn missing_program_is_a_spawn_error() {
        let err = SystemRunner::default()
            .run("/nonexistent/etyper-helper", &[], Duration::from_secs(1))
            .unwrap_err();
        assert!(matches!(err, CommandError::Spawn { .. }));
    }

    #[test]
    fn terminate_stops_child_and_is_idempotent() {
        let mut child = SystemRunner::default().spawn("sleep", &["30"]).unwrap();
        assert!(child.is_running().unwrap());
        child.terminate(Duration::from_secs(2)).unwrap();
        assert!(!child.is_running().unwrap());
        child.terminate(Duration::from_secs(2)).unwrap();
    }

    #[test]
    fn run_drains_output_larger_than_a_pipe() {
        let start = std::time::Instant::now();
        let out = SystemRunner::default()
            .run(
                "sh",
                &["-c", "head -c 200000 /dev/zero | tr '\\0' a; echo done >&2"],
                Duration::from_secs(5),
            )
            .unwrap();
        assert!(out.success());
        assert_eq!(out.stdout.len(), 200_000);
        assert!(out.stdout.bytes().all(|b| b == b'a'));
        assert_eq!(out.stderr.trim(), "done");
        assert!(start.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn stop_request_kills_a_running_command() {
        let stop = StopFlag::new();
        let mut runner = SystemRunner::with_stop(stop.clone());
        let remote = stop.clone();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(100));
            remote.set();
        });
        let start = std::time::Instant::now();
        let err = runner.run("sleep", &["5"], Duration::from_secs(10)).unwrap_err();
        assert!(matches!(err, CommandError::Interrupted { .. }));
        assert!(start.elapsed() < Duration::from_secs(4));

        // Cleanup after the interrupt runs normally.
        let out = runner.run("sh", &["-c", "echo after"], Duration::from_secs(5)).unwrap();
        assert_eq!(out.stdout.trim(), "after");
    }
}
