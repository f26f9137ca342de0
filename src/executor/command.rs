//! Native host command execution.
//!
//! Runs a process with `tokio::process::Command` and reports its output as
//! a [`ProcessOutcome`]. A non-zero exit, a timeout or a cancellation is a
//! normal outcome; only a process that cannot be started is an error.

use super::ExecutionCommand;
use crate::action::ProcessOutcome;
use crate::error::{ActionError, Result};
use std::io;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// How long output readers may keep draining after the child has exited or
/// been killed. Grandchildren holding the pipes open would otherwise block
/// the result indefinitely.
const OUTPUT_DRAIN_GRACE: Duration = Duration::from_secs(2);

/// Executes commands directly on the host system
#[derive(Debug, Clone, Default)]
pub struct CommandHandler {
    default_timeout: Option<Duration>,
}

enum Termination {
    Exited(ExitStatus),
    TimedOut,
    Canceled,
}

impl CommandHandler {
    /// Create a new command handler
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `timeout` to commands that leave their own unset
    pub fn with_default_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Run a command to completion, timeout or cancellation.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::NotFound`] when the executable or working
    /// directory does not exist and [`ActionError::Io`] for any other spawn
    /// failure.
    pub async fn run(
        &self,
        cmd: &ExecutionCommand,
        cancel: &CancellationToken,
    ) -> Result<ProcessOutcome> {
        debug!("Executing command on host: {} {:?}", cmd.program, cmd.args);

        let start = Instant::now();

        let mut command = Command::new(&cmd.program);
        command
            .args(&cmd.args)
            .stdin(if cmd.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(ref dir) = cmd.working_dir {
            command.current_dir(dir);
        }

        for (key, value) in &cmd.env {
            command.env(key, value);
        }

        // spawn() reports a missing cwd as NotFound too; rule it out first
        if let Some(ref dir) = cmd.working_dir {
            check_working_dir(dir).await?;
        }

        let mut child = command.spawn().map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                ActionError::not_found_with(format!("Executable '{}'", cmd.program), e.to_string())
            } else {
                ActionError::io(format!("Failed to start '{}'", cmd.program), e)
            }
        })?;

        if let (Some(input), Some(mut pipe)) = (cmd.stdin.clone(), child.stdin.take()) {
            tokio::spawn(async move {
                if let Err(e) = pipe.write_all(input.as_bytes()).await {
                    debug!("Failed to write child stdin: {}", e);
                }
            });
        }

        let stdout = child.stdout.take().map(OutputCapture::spawn);
        let stderr = child.stderr.take().map(OutputCapture::spawn);

        let timeout = cmd.timeout.resolve(self.default_timeout);
        let deadline = async {
            match timeout {
                Some(limit) => tokio::time::sleep(limit).await,
                None => std::future::pending().await,
            }
        };

        let termination = tokio::select! {
            status = child.wait() => Termination::Exited(
                status.map_err(|e| ActionError::io(format!("Failed to wait for '{}'", cmd.program), e))?,
            ),
            _ = deadline => Termination::TimedOut,
            _ = cancel.cancelled() => Termination::Canceled,
        };

        if !matches!(termination, Termination::Exited(_)) {
            if let Err(e) = child.start_kill() {
                warn!("Failed to kill '{}': {}", cmd.program, e);
            }
            if let Err(e) = child.wait().await {
                warn!("Failed to reap '{}': {}", cmd.program, e);
            }
        }

        let stdout = match stdout {
            Some(capture) => capture.finish(OUTPUT_DRAIN_GRACE).await,
            None => String::new(),
        };
        let stderr = match stderr {
            Some(capture) => capture.finish(OUTPUT_DRAIN_GRACE).await,
            None => String::new(),
        };

        let (exit_code, failed, timed_out, canceled) = match termination {
            Termination::Exited(status) => (
                status.code().map(i64::from),
                !status.success(),
                false,
                false,
            ),
            Termination::TimedOut => {
                debug!("Command '{}' timed out after {:?}", cmd.program, timeout);
                (None, true, true, false)
            }
            Termination::Canceled => {
                debug!("Command '{}' canceled", cmd.program);
                (None, true, false, true)
            }
        };

        Ok(ProcessOutcome {
            command: cmd.command_line(),
            stdout,
            stderr,
            exit_code,
            failed,
            timed_out,
            canceled,
            duration_ms: u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
        })
    }
}

async fn check_working_dir(dir: &Path) -> Result<()> {
    match tokio::fs::metadata(dir).await {
        Ok(metadata) if metadata.is_dir() => Ok(()),
        Ok(_) => Err(ActionError::io(
            format!("Working directory {}", dir.display()),
            io::Error::new(io::ErrorKind::NotADirectory, "not a directory"),
        )),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Err(ActionError::not_found_with(
            format!("Working directory {}", dir.display()),
            e.to_string(),
        )),
        Err(e) => Err(ActionError::io(
            format!("Failed to access working directory {}", dir.display()),
            e,
        )),
    }
}

/// Incrementally captured child output; survives the reader being aborted.
struct OutputCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
    task: JoinHandle<()>,
}

impl OutputCapture {
    fn spawn<R>(mut reader: R) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let sink = buffer.clone();
        let task = tokio::spawn(async move {
            let mut chunk = [0u8; 8192];
            loop {
                match reader.read(&mut chunk).await {
                    Ok(0) => break,
                    Ok(n) => match sink.lock() {
                        Ok(mut buf) => buf.extend_from_slice(&chunk[..n]),
                        Err(poisoned) => poisoned.into_inner().extend_from_slice(&chunk[..n]),
                    },
                    Err(e) => {
                        debug!("Output reader stopped: {}", e);
                        break;
                    }
                }
            }
        });
        Self { buffer, task }
    }

    async fn finish(mut self, grace: Duration) -> String {
        if tokio::time::timeout(grace, &mut self.task).await.is_err() {
            debug!("Output still open after {:?}; abandoning reader", grace);
            self.task.abort();
        }
        let bytes = match self.buffer.lock() {
            Ok(buf) => buf.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        String::from_utf8_lossy(&bytes).into_owned()
    }
}
