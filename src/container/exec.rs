//! Container command execution.
//!
//! Creates an exec instance, collects its attached output stream until the
//! stream ends, then inspects the exec to learn the exit code, which the
//! stream itself never carries.

use crate::container::{ContainerError, Result};
use crate::env;
use crate::executor::ExecStreamMode;
use bollard::Docker;
use bollard::container::LogOutput;
use bollard::exec::{CreateExecOptions, StartExecResults};
use futures::stream::StreamExt;
use std::default::Default;
use tracing::debug;

/// Execution configuration builder.
pub struct ExecConfigBuilder {
    cmd: Vec<String>,
    env: Vec<String>,
    working_dir: Option<String>,
    user: Option<String>,
}

impl Default for ExecConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecConfigBuilder {
    /// Create a new execution configuration builder.
    pub fn new() -> Self {
        Self {
            cmd: Vec::new(),
            env: Vec::new(),
            working_dir: None,
            user: None,
        }
    }

    /// Set the command to execute.
    pub fn cmd<I, S>(mut self, cmd: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cmd = cmd.into_iter().map(|s| s.into()).collect();
        self
    }

    /// Add an environment variable.
    pub fn env<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.env.push(format!("{}={}", key.into(), value.into()));
        self
    }

    /// Set the working directory.
    pub fn working_dir<S: Into<String>>(mut self, dir: S) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Set the user to execute as.
    pub fn user<S: Into<String>>(mut self, user: S) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Build the execution configuration.
    pub fn build(mut self) -> ExecConfig {
        // Stable order keeps repeated execs byte-identical
        self.env.sort();
        ExecConfig {
            cmd: self.cmd,
            env: self.env,
            working_dir: self.working_dir,
            user: self.user,
        }
    }
}

/// Container execution configuration.
///
/// Output is always attached on stdout and stderr, without a TTY, so the
/// daemon frames each chunk with its source stream.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecConfig {
    cmd: Vec<String>,
    env: Vec<String>,
    working_dir: Option<String>,
    user: Option<String>,
}

impl ExecConfig {
    /// Create a new execution configuration builder.
    pub fn builder() -> ExecConfigBuilder {
        ExecConfigBuilder::new()
    }

    /// Get the command.
    pub fn cmd(&self) -> &[String] {
        &self.cmd
    }
}

/// Output from command execution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecOutput {
    /// Standard output
    pub stdout: String,
    /// Standard error
    pub stderr: String,
    /// Exit code (None if not available)
    pub exit_code: Option<i64>,
}

impl ExecOutput {
    /// Check if the command succeeded (exit code 0).
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Accumulates attached output frames.
#[derive(Debug, Default)]
struct StreamCollector {
    mode: ExecStreamMode,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
}

impl StreamCollector {
    fn new(mode: ExecStreamMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    fn push(&mut self, frame: LogOutput) {
        match (self.mode, frame) {
            (ExecStreamMode::Demultiplexed, LogOutput::StdErr { message }) => {
                self.stderr.extend_from_slice(&message)
            }
            (_, LogOutput::StdIn { .. }) => {}
            (_, frame) => self.stdout.extend_from_slice(&frame.into_bytes()),
        }
    }

    fn finish(self, exit_code: Option<i64>) -> ExecOutput {
        let stderr = match self.mode {
            ExecStreamMode::Demultiplexed => String::from_utf8_lossy(&self.stderr).into_owned(),
            ExecStreamMode::Combined if exit_code.is_some_and(|code| code != 0) => {
                env::container::COMBINED_STDERR_PLACEHOLDER.to_string()
            }
            ExecStreamMode::Combined => String::new(),
        };

        ExecOutput {
            stdout: String::from_utf8_lossy(&self.stdout).into_owned(),
            stderr,
            exit_code,
        }
    }
}

/// Execute a command in a running container.
///
/// # Errors
///
/// Returns error if execution fails or container not found.
pub async fn execute(
    docker: &Docker,
    container_id: &str,
    config: &ExecConfig,
    mode: ExecStreamMode,
) -> Result<ExecOutput> {
    debug!(
        "Executing command in container {}: {:?}",
        container_id, config.cmd
    );

    let exec_options = CreateExecOptions {
        cmd: Some(config.cmd.clone()),
        env: if config.env.is_empty() {
            None
        } else {
            Some(config.env.clone())
        },
        working_dir: config.working_dir.clone(),
        user: config.user.clone(),
        attach_stdin: Some(false),
        attach_stdout: Some(true),
        attach_stderr: Some(true),
        tty: Some(false),
        ..Default::default()
    };

    let exec = docker
        .create_exec(container_id, exec_options)
        .await
        .map_err(|e| match e {
            bollard::errors::Error::DockerResponseServerError {
                status_code: 404, ..
            } => ContainerError::NotFound(container_id.to_string()),
            e => ContainerError::ApiError(e),
        })?;

    let start_results = docker.start_exec(&exec.id, None).await?;

    let mut collector = StreamCollector::new(mode);

    match start_results {
        StartExecResults::Attached { mut output, .. } => {
            while let Some(result) = output.next().await {
                match result {
                    Ok(frame) => collector.push(frame),
                    Err(e) => {
                        return Err(ContainerError::ExecutionError(format!(
                            "Failed to read output: {}",
                            e
                        )));
                    }
                }
            }
        }
        StartExecResults::Detached => {
            return Err(ContainerError::ExecutionError(
                "Unexpected detached execution".to_string(),
            ));
        }
    }

    let inspect = docker.inspect_exec(&exec.id).await?;
    let exit_code = inspect.exit_code;

    debug!("Command executed with exit code: {:?}", exit_code);

    Ok(collector.finish(exit_code))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn frames() -> Vec<LogOutput> {
        vec![
            LogOutput::StdOut {
                message: Bytes::from_static(b"hello "),
            },
            LogOutput::StdErr {
                message: Bytes::from_static(b"warning\n"),
            },
            LogOutput::StdOut {
                message: Bytes::from_static(b"world\n"),
            },
        ]
    }

    #[test]
    fn test_exec_config_builder() {
        let config = ExecConfig::builder()
            .cmd(vec!["echo", "hello"])
            .env("ZED", "1")
            .env("FOO", "bar")
            .working_dir("/tmp")
            .user("root")
            .build();

        assert_eq!(config.cmd(), &["echo", "hello"]);
        assert_eq!(config.env, vec!["FOO=bar", "ZED=1"]);
        assert_eq!(config.working_dir, Some("/tmp".to_string()));
        assert_eq!(config.user, Some("root".to_string()));
    }

    #[test]
    fn test_demultiplexed_collection() {
        let mut collector = StreamCollector::new(ExecStreamMode::Demultiplexed);
        for frame in frames() {
            collector.push(frame);
        }
        let output = collector.finish(Some(0));

        assert_eq!(output.stdout, "hello world\n");
        assert_eq!(output.stderr, "warning\n");
        assert!(output.success());
    }

    #[test]
    fn test_combined_collection_uses_placeholder_on_failure() {
        let mut collector = StreamCollector::new(ExecStreamMode::Combined);
        for frame in frames() {
            collector.push(frame);
        }
        let output = collector.finish(Some(2));

        assert_eq!(output.stdout, "hello warning\nworld\n");
        assert_eq!(output.stderr, env::container::COMBINED_STDERR_PLACEHOLDER);
        assert!(!output.success());
    }

    #[test]
    fn test_combined_collection_success_has_empty_stderr() {
        let mut collector = StreamCollector::new(ExecStreamMode::Combined);
        collector.push(LogOutput::StdOut {
            message: Bytes::from_static(b"ok"),
        });
        let output = collector.finish(Some(0));
        assert_eq!(output.stderr, "");
    }

    #[test]
    fn test_multibyte_split_across_frames() {
        let mut collector = StreamCollector::new(ExecStreamMode::Demultiplexed);
        let snowman = "☃".as_bytes();
        collector.push(LogOutput::StdOut {
            message: Bytes::copy_from_slice(&snowman[..1]),
        });
        collector.push(LogOutput::StdOut {
            message: Bytes::copy_from_slice(&snowman[1..]),
        });
        assert_eq!(collector.finish(None).stdout, "☃");
    }
}
