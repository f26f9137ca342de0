//! The normalized result envelope.
//!
//! Serialized key order is stable: payload or error fields first, then
//! `kind`, then the echoed `parameters`.

use crate::env;
use crate::error::{ActionError, ErrorKind};
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Outcome of one action invocation
#[derive(Serialize, Clone, Debug)]
pub struct ActionResult {
    #[serde(flatten)]
    pub outcome: ActionOutcome,
    /// Action kind as it was requested
    pub kind: String,
    /// Request parameters, with secrets redacted
    pub parameters: Value,
}

/// Exactly one of a success payload or an error payload
#[derive(Serialize, Clone, Debug)]
#[serde(untagged)]
pub enum ActionOutcome {
    Success(ActionPayload),
    Failure(ActionFailure),
}

/// Backend-specific success payloads
#[derive(Serialize, Clone, Debug)]
#[serde(untagged)]
pub enum ActionPayload {
    Filesystem(FilesystemOutcome),
    Process(ProcessOutcome),
    Containers {
        success: bool,
        containers: Vec<ContainerSummary>,
    },
    Container {
        success: bool,
        container: Value,
    },
    Remote(RemoteOutcome),
}

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum FilesystemOutcome {
    Content {
        success: bool,
        path: String,
        content: String,
    },
    Written {
        success: bool,
        path: String,
    },
    Deleted {
        success: bool,
        path: String,
        existed: bool,
    },
    Listing {
        success: bool,
        path: String,
        entries: Vec<String>,
    },
    Existence {
        success: bool,
        path: String,
        exists: bool,
    },
}

/// Output of a process-like backend; non-zero exit, timeout and
/// cancellation are reported here rather than as errors.
#[derive(Serialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProcessOutcome {
    /// Command line as executed
    pub command: String,
    pub stdout: String,
    pub stderr: String,
    /// Absent when the process was killed or the backend did not report one
    pub exit_code: Option<i64>,
    pub failed: bool,
    pub timed_out: bool,
    pub canceled: bool,
    pub duration_ms: u64,
}

impl ProcessOutcome {
    /// Exit code 0 and neither timed out nor canceled.
    pub fn success(&self) -> bool {
        !self.failed
    }
}

/// Output of a remote shell command
#[derive(Serialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RemoteOutcome {
    pub output: String,
    pub stderr: String,
    pub exit_code: Option<i64>,
    /// Signal name when the remote command was killed by a signal
    pub signal: Option<String>,
}

/// Summary row for a container listing
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct ContainerSummary {
    pub id: String,
    pub names: Vec<String>,
    pub image: String,
    pub state: String,
    pub status: String,
    pub created: Option<i64>,
}

/// Error payload
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActionFailure {
    pub error: String,
    pub error_kind: ErrorKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl From<&ActionError> for ActionFailure {
    fn from(err: &ActionError) -> Self {
        Self {
            error: err.to_string(),
            error_kind: err.kind(),
            details: err.details(),
        }
    }
}

impl ActionResult {
    pub fn success(kind: impl Into<String>, parameters: Value, payload: ActionPayload) -> Self {
        Self {
            outcome: ActionOutcome::Success(payload),
            kind: kind.into(),
            parameters,
        }
    }

    pub fn failure(kind: impl Into<String>, parameters: Value, error: &ActionError) -> Self {
        Self {
            outcome: ActionOutcome::Failure(error.into()),
            kind: kind.into(),
            parameters,
        }
    }

    /// True when the result carries a success payload. A process that ran
    /// and exited non-zero still counts as a success payload.
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ActionOutcome::Success(_))
    }

    pub fn payload(&self) -> Option<&ActionPayload> {
        match &self.outcome {
            ActionOutcome::Success(payload) => Some(payload),
            ActionOutcome::Failure(_) => None,
        }
    }

    pub fn failure_payload(&self) -> Option<&ActionFailure> {
        match &self.outcome {
            ActionOutcome::Success(_) => None,
            ActionOutcome::Failure(failure) => Some(failure),
        }
    }

    pub fn process(&self) -> Option<&ProcessOutcome> {
        match self.payload() {
            Some(ActionPayload::Process(outcome)) => Some(outcome),
            _ => None,
        }
    }

    /// JSON value of the whole envelope.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|e| {
            serde_json::json!({
                "error": format!("Failed to serialize result: {e}"),
                "errorKind": ErrorKind::Io,
                "kind": self.kind,
            })
        })
    }

    /// Formatted text block for humans and automated callers alike.
    pub fn to_pretty_string(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| {
            format!(
                "{{\n  \"error\": \"Failed to serialize result: {}\",\n  \"kind\": \"{}\"\n}}",
                e, self.kind
            )
        })
    }
}

impl fmt::Display for ActionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_pretty_string())
    }
}

const SECRET_FIELDS: [&str; 3] = ["password", "privateKey", "passphrase"];

/// Copy of request parameters suitable for echoing back to the caller.
pub fn echo_parameters(parameters: Option<&Value>) -> Value {
    let mut echoed = parameters.cloned().unwrap_or(Value::Null);
    if let Value::Object(ref mut map) = echoed {
        for field in SECRET_FIELDS {
            if let Some(value) = map.get_mut(field) {
                if !value.is_null() {
                    *value = Value::String(env::REDACTED.to_string());
                }
            }
        }
    }
    echoed
}
