//! Request validation.
//!
//! Checks the action kind against the closed set, then decodes `parameters`
//! into the typed shape that kind requires. Nothing here touches the
//! filesystem, spawns a process or opens a connection.

use super::{
    ActionKind, ActionRequest, CommandParams, ContainerAction, ContainerOperation,
    ContainerParams, FilesystemAction, FilesystemOperation, FilesystemParams, RawActionRequest,
    RemoteCredentials, RemoteShellAction, RemoteShellParams, ScriptAction, ScriptParams,
    ScriptSource,
};
use crate::env;
use crate::error::{ActionError, Result};
use crate::executor::{ExecutionCommand, Timeout};
use serde::de::DeserializeOwned;
use tracing::debug;

/// Validates raw requests into typed [`ActionRequest`]s.
#[derive(Debug, Clone)]
pub struct RequestValidator {
    default_ssh_port: u16,
}

impl Default for RequestValidator {
    fn default() -> Self {
        Self::new(env::remote_shell::DEFAULT_PORT)
    }
}

impl RequestValidator {
    pub fn new(default_ssh_port: u16) -> Self {
        Self { default_ssh_port }
    }

    /// Validate the kind and decode the parameters for that kind.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::Validation`] for an unknown kind, missing or
    /// non-object parameters, unknown fields, or missing required fields.
    pub fn validate(&self, raw: &RawActionRequest) -> Result<ActionRequest> {
        let kind = Self::validate_kind(&raw.kind)?;

        let parameters = match &raw.parameters {
            Some(value @ serde_json::Value::Object(_)) => value.clone(),
            Some(serde_json::Value::Null) | None => {
                return Err(ActionError::validation(format!(
                    "Missing parameters for '{kind}' action"
                )));
            }
            Some(other) => {
                return Err(ActionError::invalid_value(
                    format!("Parameters for '{kind}' action must be an object"),
                    other.to_string(),
                ));
            }
        };

        debug!("Validating {} request", kind);

        let request = match kind {
            ActionKind::Filesystem => ActionRequest::Filesystem(Self::filesystem(decode(
                kind, parameters,
            )?)?),
            ActionKind::Command => ActionRequest::Command(Self::command(decode(kind, parameters)?)?),
            ActionKind::Container => {
                ActionRequest::Container(Self::container(decode(kind, parameters)?)?)
            }
            ActionKind::RemoteShell => {
                ActionRequest::RemoteShell(self.remote_shell(decode(kind, parameters)?)?)
            }
            ActionKind::Script => ActionRequest::Script(Self::script(decode(kind, parameters)?)?),
        };

        Ok(request)
    }

    /// Check a kind string against the closed set of action kinds.
    pub fn validate_kind(kind: &str) -> Result<ActionKind> {
        ActionKind::parse(kind).ok_or_else(|| {
            let expected: Vec<&str> = ActionKind::ALL.iter().map(|k| k.as_str()).collect();
            ActionError::invalid_value(
                format!(
                    "Unknown action kind '{}'; expected one of: {}",
                    kind,
                    expected.join(", ")
                ),
                kind,
            )
        })
    }

    fn filesystem(params: FilesystemParams) -> Result<FilesystemAction> {
        if params.path.as_os_str().is_empty() {
            return Err(ActionError::validation("Filesystem action requires a non-empty 'path'"));
        }

        let path = params.path;
        let encoding = params.encoding.unwrap_or_default();

        Ok(match params.operation {
            FilesystemOperation::ReadFile => FilesystemAction::ReadFile { path, encoding },
            FilesystemOperation::WriteFile => {
                let content = params.content.ok_or_else(|| {
                    ActionError::validation("writeFile requires 'content' (an empty string is allowed)")
                })?;
                FilesystemAction::WriteFile {
                    path,
                    content,
                    encoding,
                }
            }
            FilesystemOperation::DeleteFile => FilesystemAction::DeleteFile { path },
            FilesystemOperation::ListDir => FilesystemAction::ListDir { path },
            FilesystemOperation::PathExists => FilesystemAction::PathExists { path },
        })
    }

    fn command(params: CommandParams) -> Result<ExecutionCommand> {
        if params.command.trim().is_empty() {
            return Err(ActionError::validation("Command action requires a non-empty 'command'"));
        }

        let options = params.options;
        let mut command = ExecutionCommand::new(params.command, params.args);
        command.working_dir = options.cwd;
        command.env = options.env;
        command.stdin = options.stdin;
        command.timeout = Timeout::from_millis(options.timeout);
        Ok(command)
    }

    fn container(params: ContainerParams) -> Result<ContainerAction> {
        let container_id = |operation: &str| {
            params
                .container_id
                .clone()
                .filter(|id| !id.trim().is_empty())
                .ok_or_else(|| {
                    ActionError::validation(format!("{operation} requires 'containerId'"))
                })
        };

        Ok(match params.operation {
            ContainerOperation::ListContainers => ContainerAction::List {
                include_stopped: params.include_stopped.unwrap_or(false),
            },
            ContainerOperation::InspectContainer => ContainerAction::Inspect {
                container_id: container_id("inspectContainer")?,
            },
            ContainerOperation::ExecInContainer => {
                let container_id = container_id("execInContainer")?;
                let cmd = params
                    .command
                    .clone()
                    .map(|line| line.into_argv())
                    .unwrap_or_default();
                if cmd.is_empty() {
                    return Err(ActionError::validation(
                        "execInContainer requires a non-empty 'command'",
                    ));
                }
                ContainerAction::Exec {
                    container_id,
                    cmd,
                    options: params.options.clone().unwrap_or_default(),
                }
            }
        })
    }

    fn remote_shell(&self, params: RemoteShellParams) -> Result<RemoteShellAction> {
        for (field, value) in [
            ("host", &params.host),
            ("username", &params.username),
            ("command", &params.command),
        ] {
            if value.trim().is_empty() {
                return Err(ActionError::validation(format!(
                    "Remote shell action requires a non-empty '{field}'"
                )));
            }
        }

        let credentials = RemoteCredentials {
            password: non_empty(params.password),
            private_key: non_empty(params.private_key),
            passphrase: non_empty(params.passphrase),
        };
        if credentials.password.is_none() && credentials.private_key.is_none() {
            return Err(ActionError::validation(
                "Remote shell action requires either 'password' or 'privateKey'",
            ));
        }

        let port = params.port.unwrap_or(self.default_ssh_port);
        if port == 0 {
            return Err(ActionError::invalid_value("Invalid SSH port", "0"));
        }

        Ok(RemoteShellAction {
            host: params.host,
            port,
            username: params.username,
            credentials,
            command: params.command,
        })
    }

    fn script(params: ScriptParams) -> Result<ScriptAction> {
        let source = match (non_empty(params.script_content), params.script_path) {
            (Some(content), _) => ScriptSource::Inline(content),
            (None, Some(path)) if !path.as_os_str().is_empty() => ScriptSource::Path(path),
            _ => {
                return Err(ActionError::validation(
                    "Script action requires either 'scriptContent' or 'scriptPath'",
                ));
            }
        };

        let options = params.options;
        Ok(ScriptAction {
            source,
            args: params.args,
            working_dir: options.cwd,
            env: options.env,
            timeout: Timeout::from_millis(options.timeout),
            interpreter: non_empty(options.interpreter),
        })
    }
}

fn decode<T: DeserializeOwned>(kind: ActionKind, parameters: serde_json::Value) -> Result<T> {
    serde_json::from_value(parameters)
        .map_err(|e| ActionError::validation(format!("Invalid {kind} parameters: {e}")))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
