//! # Action Dispatch
//!
//! [`ActionExecutor`] is the single entry point: it validates a
//! [`RawActionRequest`], routes the typed request to one of five backend
//! handlers, and folds whatever happens into one [`ActionResult`].
//!
//! ## Backends
//!
//! - **[`FilesystemHandler`]**: read, write, delete, list and existence checks
//! - **[`CommandHandler`]**: local processes with cwd, env, stdin and timeout
//! - **[`ScriptHandler`]**: inline or on-disk scripts through an interpreter
//! - **`ContainerHandler`**: list, inspect and exec against a container daemon
//!   (`containers` feature)
//! - **`RemoteShellHandler`**: one command over an authenticated SSH session
//!   (`ssh` feature)
//!
//! ## Execution Flow
//!
//! ```text
//! RawActionRequest
//!        ↓
//!  RequestValidator ──(invalid)──┐
//!        ↓                       │
//!  ActionRequest                 │
//!        ↓                       │
//!  ┌─────┬──────┬────────┬───────┴─┬────────┐
//!  fs   cmd   script  container  remote    │
//!  └─────┴──────┴────────┴─────────┴────────┘
//!        ↓
//!   ActionResult
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use action_executor::{ActionExecutor, ExecutorConfig, RawActionRequest};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() {
//!     let executor = ActionExecutor::new(ExecutorConfig::default());
//!
//!     let request = RawActionRequest::new(
//!         "command",
//!         json!({ "command": "echo", "args": ["Hello, World!"] }),
//!     );
//!
//!     let result = executor.execute(request).await;
//!     println!("{}", result);
//! }
//! ```

use crate::action::result::echo_parameters;
use crate::action::{
    ActionKind, ActionPayload, ActionRequest, ActionResult, RawActionRequest, RequestValidator,
};
use crate::error::{ActionError, Result};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Executor configuration types.
///
/// Defines [`ExecutorConfig`] and the per-backend settings it groups.
pub mod config;

/// Local filesystem actions.
pub mod filesystem;

/// Host process execution.
///
/// Implements [`CommandHandler`] on top of `tokio::process::Command`.
pub mod command;

/// Interpreter-driven scripts with staged temporary files.
pub mod script;

/// Container daemon actions (requires `containers` feature).
#[cfg(feature = "containers")]
pub mod container;

/// Remote shell actions over SSH (requires `ssh` feature).
#[cfg(feature = "ssh")]
pub mod remote_shell;

pub use command::CommandHandler;
pub use config::{
    CommandSettings, ContainerSettings, ExecStreamMode, ExecutorConfig, RemoteShellSettings,
    ScriptSettings,
};
pub use filesystem::FilesystemHandler;
pub use script::{ScriptHandler, TempScript};

#[cfg(feature = "containers")]
pub use container::ContainerHandler;

#[cfg(feature = "ssh")]
pub use remote_shell::RemoteShellHandler;

/// Time limit requested for a process
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Timeout {
    /// Not set by the request; the handler default applies
    #[default]
    Default,
    /// Explicitly unlimited
    Unlimited,
    After(Duration),
}

impl Timeout {
    /// Request field in milliseconds: absent keeps the default, `0` means
    /// unlimited.
    pub fn from_millis(timeout: Option<u64>) -> Self {
        match timeout {
            None => Self::Default,
            Some(0) => Self::Unlimited,
            Some(ms) => Self::After(Duration::from_millis(ms)),
        }
    }

    /// Effective limit given the handler default.
    pub fn resolve(self, default: Option<Duration>) -> Option<Duration> {
        match self {
            Self::Default => default,
            Self::Unlimited => None,
            Self::After(limit) => Some(limit),
        }
    }
}

/// Command to execute
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutionCommand {
    /// Program name or path to execute
    pub program: String,
    /// Command line arguments
    pub args: Vec<String>,
    /// Working directory for command execution
    pub working_dir: Option<PathBuf>,
    /// Environment variables to set
    pub env: HashMap<String, String>,
    /// Standard input to provide to the command
    pub stdin: Option<String>,
    /// Maximum execution time
    pub timeout: Timeout,
}

impl ExecutionCommand {
    /// Create a new command with just program and args
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            working_dir: None,
            env: HashMap::new(),
            stdin: None,
            timeout: Timeout::Default,
        }
    }

    /// Set the working directory
    pub fn with_working_dir(mut self, dir: PathBuf) -> Self {
        self.working_dir = Some(dir);
        self
    }

    /// Add an environment variable
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Set standard input
    pub fn with_stdin(mut self, stdin: impl Into<String>) -> Self {
        self.stdin = Some(stdin.into());
        self
    }

    /// Set execution timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Timeout::After(timeout);
        self
    }

    /// Run without any time limit, ignoring the handler default
    pub fn without_timeout(mut self) -> Self {
        self.timeout = Timeout::Unlimited;
        self
    }

    /// Program and arguments joined with spaces, for display
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Validates, dispatches and normalizes action requests.
///
/// Holds no per-invocation state: every call opens and tears down its own
/// processes and connections, so one executor can serve concurrent calls.
#[derive(Debug, Clone)]
pub struct ActionExecutor {
    config: ExecutorConfig,
    validator: RequestValidator,
    filesystem: FilesystemHandler,
    command: CommandHandler,
    script: ScriptHandler,
    #[cfg(feature = "containers")]
    container: ContainerHandler,
    #[cfg(feature = "ssh")]
    remote_shell: RemoteShellHandler,
}

impl Default for ActionExecutor {
    fn default() -> Self {
        Self::new(ExecutorConfig::default())
    }
}

impl ActionExecutor {
    pub fn new(config: ExecutorConfig) -> Self {
        let filesystem = FilesystemHandler::new();
        let command = CommandHandler::new().with_default_timeout(config.command.default_timeout());
        let script = ScriptHandler::new(config.script.clone(), filesystem, command.clone());

        Self {
            validator: RequestValidator::new(config.remote_shell.default_port),
            filesystem,
            command,
            script,
            #[cfg(feature = "containers")]
            container: ContainerHandler::new(config.container.clone()),
            #[cfg(feature = "ssh")]
            remote_shell: RemoteShellHandler::new(),
            config,
        }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Execute one request. Never fails: every problem is reported inside
    /// the returned [`ActionResult`].
    pub async fn execute(&self, request: RawActionRequest) -> ActionResult {
        self.execute_with_cancellation(request, CancellationToken::new())
            .await
    }

    /// Execute one request, killing local processes if `cancel` fires.
    ///
    /// Container and remote-shell actions run to completion regardless of
    /// the token.
    pub async fn execute_with_cancellation(
        &self,
        request: RawActionRequest,
        cancel: CancellationToken,
    ) -> ActionResult {
        let parameters = echo_parameters(request.parameters.as_ref());

        let validated = match self.validator.validate(&request) {
            Ok(validated) => validated,
            Err(e) => {
                warn!("Rejected {} request: {}", request.kind, e);
                return ActionResult::failure(request.kind, parameters, &e);
            }
        };

        let kind = validated.kind();
        debug!("Dispatching {} action", kind);

        let outcome = AssertUnwindSafe(self.dispatch(validated, &cancel))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned());
                Err(ActionError::backend(
                    format!("{kind} handler panicked"),
                    message,
                ))
            });

        match outcome {
            Ok(payload) => ActionResult::success(request.kind, parameters, payload),
            Err(e) => {
                warn!("{} action failed: {}", kind, e);
                ActionResult::failure(request.kind, parameters, &e)
            }
        }
    }

    /// Execute a request given as a JSON value of shape
    /// `{"kind": ..., "parameters": {...}}`.
    pub async fn execute_value(&self, value: serde_json::Value) -> ActionResult {
        match serde_json::from_value::<RawActionRequest>(value.clone()) {
            Ok(request) => self.execute(request).await,
            Err(e) => {
                let kind = value
                    .get("kind")
                    .and_then(|k| k.as_str())
                    .unwrap_or_default()
                    .to_string();
                let err = ActionError::validation(format!("Malformed action request: {e}"));
                ActionResult::failure(kind, echo_parameters(value.get("parameters")), &err)
            }
        }
    }

    /// Execute a request given as JSON text.
    pub async fn execute_json(&self, input: &str) -> ActionResult {
        match serde_json::from_str::<serde_json::Value>(input) {
            Ok(value) => self.execute_value(value).await,
            Err(e) => ActionResult::failure(
                String::new(),
                serde_json::Value::Null,
                &ActionError::validation(format!("Request is not valid JSON: {e}")),
            ),
        }
    }

    /// Route a validated request to its handler.
    pub async fn dispatch(
        &self,
        request: ActionRequest,
        cancel: &CancellationToken,
    ) -> Result<ActionPayload> {
        match request {
            ActionRequest::Filesystem(action) => self
                .filesystem
                .execute(&action)
                .await
                .map(ActionPayload::Filesystem),
            ActionRequest::Command(cmd) => self
                .command
                .run(&cmd, cancel)
                .await
                .map(ActionPayload::Process),
            ActionRequest::Script(action) => self
                .script
                .run(&action, cancel)
                .await
                .map(ActionPayload::Process),
            #[cfg(feature = "containers")]
            ActionRequest::Container(action) => self.container.execute(&action).await,
            #[cfg(not(feature = "containers"))]
            ActionRequest::Container(_) => Err(not_compiled(ActionKind::Container, "containers")),
            #[cfg(feature = "ssh")]
            ActionRequest::RemoteShell(action) => self
                .remote_shell
                .run(&action)
                .await
                .map(ActionPayload::Remote),
            #[cfg(not(feature = "ssh"))]
            ActionRequest::RemoteShell(_) => Err(not_compiled(ActionKind::RemoteShell, "ssh")),
        }
    }
}

#[allow(dead_code)]
fn not_compiled(kind: ActionKind, feature: &str) -> ActionError {
    ActionError::backend(
        format!("{kind} support not compiled in (enable the '{feature}' feature)"),
        None,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{ActionFailure, FilesystemOutcome};
    use crate::error::ErrorKind;
    use serde_json::json;
    use tempfile::TempDir;

    fn failure(result: &ActionResult) -> &ActionFailure {
        result.failure_payload().expect("expected an error payload")
    }

    #[test]
    fn test_timeout_resolution() {
        let default = Some(Duration::from_millis(200));
        assert_eq!(Timeout::from_millis(None).resolve(default), default);
        assert_eq!(Timeout::from_millis(Some(0)).resolve(default), None);
        assert_eq!(
            Timeout::from_millis(Some(50)).resolve(default),
            Some(Duration::from_millis(50))
        );
        assert_eq!(
            ExecutionCommand::new("true", vec![]).without_timeout().timeout,
            Timeout::Unlimited
        );
    }

    #[tokio::test]
    async fn test_zero_timeout_overrides_configured_default() {
        let mut config = ExecutorConfig::default();
        config.command.default_timeout_ms = Some(200);
        let executor = ActionExecutor::new(config);

        let result = executor
            .execute(RawActionRequest::new(
                "command",
                json!({"command": "sleep", "args": ["1"], "options": {"timeout": 0}}),
            ))
            .await;

        let outcome = result.process().unwrap();
        assert!(!outcome.timed_out);
        assert!(!outcome.failed);
        assert_eq!(outcome.exit_code, Some(0));
    }

    #[test]
    fn test_command_line() {
        let cmd = ExecutionCommand::new("ls", vec!["-la".to_string(), "/tmp".to_string()]);
        assert_eq!(cmd.command_line(), "ls -la /tmp");
        assert_eq!(ExecutionCommand::new("true", vec![]).command_line(), "true");
    }

    #[tokio::test]
    async fn test_unknown_kind_returns_result() {
        let executor = ActionExecutor::default();
        let result = executor
            .execute(RawActionRequest::new("teleport", json!({"to": "mars"})))
            .await;

        assert_eq!(result.kind, "teleport");
        assert_eq!(failure(&result).error_kind, ErrorKind::Validation);
        assert_eq!(result.parameters, json!({"to": "mars"}));
    }

    #[tokio::test]
    async fn test_filesystem_dispatch() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("x.txt");
        let executor = ActionExecutor::default();

        let result = executor
            .execute(RawActionRequest::new(
                "filesystem",
                json!({"operation": "writeFile", "path": path, "content": "abc"}),
            ))
            .await;
        assert!(matches!(
            result.payload(),
            Some(ActionPayload::Filesystem(FilesystemOutcome::Written { .. }))
        ));
        assert_eq!(result.kind, "filesystem");
    }

    #[tokio::test]
    async fn test_command_dispatch_reports_failure_as_data() {
        let executor = ActionExecutor::default();
        let result = executor
            .execute(RawActionRequest::new(
                "command",
                json!({"command": "sh", "args": ["-c", "exit 1"]}),
            ))
            .await;

        assert!(result.is_success());
        let outcome = result.process().unwrap();
        assert!(outcome.failed);
        assert_eq!(outcome.exit_code, Some(1));
    }

    #[tokio::test]
    async fn test_execute_json_malformed_input() {
        let executor = ActionExecutor::default();

        let result = executor.execute_json("{not json").await;
        assert_eq!(failure(&result).error_kind, ErrorKind::Validation);

        let result = executor.execute_json(r#"{"parameters": {}}"#).await;
        assert_eq!(failure(&result).error_kind, ErrorKind::Validation);

        let result = executor.execute_json(r#"{"kind": 5}"#).await;
        assert_eq!(failure(&result).error_kind, ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_cancellation_token_reaches_command() {
        let executor = ActionExecutor::default();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = executor
            .execute_with_cancellation(
                RawActionRequest::new("command", json!({"command": "sleep", "args": ["5"]})),
                cancel,
            )
            .await;
        assert!(result.process().unwrap().canceled);
    }
}
