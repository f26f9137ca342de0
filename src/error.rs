//! Error taxonomy shared by the validator and every backend handler.
//!
//! A command that runs and exits non-zero, times out, or is canceled is not
//! an error; it is reported as data in a
//! [`ProcessOutcome`](crate::action::ProcessOutcome). Only failures that
//! prevent a backend from producing its result end up here.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Errors produced while validating or executing an action.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    /// Malformed or incomplete request, raised before any external call
    #[error("{message}")]
    Validation {
        message: String,
        /// The offending value, when there is one
        value: Option<String>,
    },

    /// Referenced file, directory or container does not exist
    #[error("Not found: {target}")]
    NotFound {
        target: String,
        details: Option<String>,
    },

    /// Local filesystem or process I/O failure
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Failure reported by a backend daemon or library that is not a
    /// connectivity problem
    #[error("{message}")]
    Backend {
        message: String,
        details: Option<String>,
    },

    /// Remote host or daemon unreachable, or authentication rejected
    #[error("Connection error: {message}")]
    Connection {
        message: String,
        details: Option<String>,
    },
}

impl ActionError {
    /// Validation failure without an offending value.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            value: None,
        }
    }

    /// Validation failure naming the rejected value.
    pub fn invalid_value(message: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            value: Some(value.into()),
        }
    }

    /// Missing file, directory, executable or container.
    pub fn not_found(target: impl Into<String>) -> Self {
        Self::NotFound {
            target: target.into(),
            details: None,
        }
    }

    /// Missing resource, keeping the lower-level error as detail.
    pub fn not_found_with(target: impl Into<String>, details: impl Into<String>) -> Self {
        Self::NotFound {
            target: target.into(),
            details: Some(details.into()),
        }
    }

    /// I/O failure with a description of what was being attempted.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Connection failure with optional lower-level detail.
    pub fn connection(message: impl Into<String>, details: Option<String>) -> Self {
        Self::Connection {
            message: message.into(),
            details,
        }
    }

    /// Backend failure with optional lower-level detail.
    pub fn backend(message: impl Into<String>, details: Option<String>) -> Self {
        Self::Backend {
            message: message.into(),
            details,
        }
    }

    /// Taxonomy bucket of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Io { .. } | Self::Backend { .. } => ErrorKind::Io,
            Self::Connection { .. } => ErrorKind::Connection,
        }
    }

    /// Diagnostic text that complements the display message.
    pub fn details(&self) -> Option<String> {
        match self {
            Self::Validation { value, .. } => value.as_ref().map(|v| format!("value: {v}")),
            Self::Io { source, .. } => Some(format!("{source:?}")),
            Self::NotFound { details, .. }
            | Self::Backend { details, .. }
            | Self::Connection { details, .. } => details.clone(),
        }
    }
}

/// Error taxonomy as exposed in result payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    #[serde(rename = "ValidationError")]
    Validation,
    #[serde(rename = "NotFoundError")]
    NotFound,
    #[serde(rename = "IOError")]
    Io,
    #[serde(rename = "ConnectionError")]
    Connection,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Validation => "ValidationError",
            Self::NotFound => "NotFoundError",
            Self::Io => "IOError",
            Self::Connection => "ConnectionError",
        };
        f.write_str(name)
    }
}

/// Result type for action operations.
pub type Result<T> = std::result::Result<T, ActionError>;
