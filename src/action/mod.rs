//! Action requests and results.
//!
//! A request arrives as a [`RawActionRequest`]: an action kind string plus a
//! loosely typed `parameters` object. The [`RequestValidator`] turns it into
//! an [`ActionRequest`], a closed sum type with one fully typed variant per
//! kind, which is what the dispatcher matches on. Every invocation ends in
//! exactly one [`ActionResult`].

use crate::executor::{ExecutionCommand, Timeout};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

pub mod params;
pub mod result;
pub mod validate;

pub use params::{
    CommandLine, CommandParams, ContainerExecOptions, ContainerOperation, ContainerParams,
    Encoding, FilesystemOperation, FilesystemParams, ProcessOptions, RemoteShellParams,
    ScriptOptions, ScriptParams,
};
pub use result::{
    ActionFailure, ActionOutcome, ActionPayload, ActionResult, ContainerSummary,
    FilesystemOutcome, ProcessOutcome, RemoteOutcome,
};
pub use validate::RequestValidator;

/// Discriminator selecting the backend that handles a request
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum ActionKind {
    Filesystem,
    Command,
    Container,
    RemoteShell,
    Script,
}

impl ActionKind {
    pub const ALL: [ActionKind; 5] = [
        ActionKind::Filesystem,
        ActionKind::Command,
        ActionKind::Container,
        ActionKind::RemoteShell,
        ActionKind::Script,
    ];

    /// Wire name of the kind
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Filesystem => "filesystem",
            Self::Command => "command",
            Self::Container => "container",
            Self::RemoteShell => "remoteShell",
            Self::Script => "script",
        }
    }

    /// Parse a wire name; `None` for anything outside the closed set.
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == value)
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request as assembled by the host layer, before validation
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct RawActionRequest {
    pub kind: String,
    #[serde(default)]
    pub parameters: Option<serde_json::Value>,
}

impl RawActionRequest {
    pub fn new(kind: impl Into<String>, parameters: serde_json::Value) -> Self {
        Self {
            kind: kind.into(),
            parameters: Some(parameters),
        }
    }
}

/// Validated request, one variant per action kind
#[derive(Clone, Debug)]
pub enum ActionRequest {
    Filesystem(FilesystemAction),
    Command(ExecutionCommand),
    Container(ContainerAction),
    RemoteShell(RemoteShellAction),
    Script(ScriptAction),
}

impl ActionRequest {
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::Filesystem(_) => ActionKind::Filesystem,
            Self::Command(_) => ActionKind::Command,
            Self::Container(_) => ActionKind::Container,
            Self::RemoteShell(_) => ActionKind::RemoteShell,
            Self::Script(_) => ActionKind::Script,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum FilesystemAction {
    ReadFile {
        path: PathBuf,
        encoding: Encoding,
    },
    WriteFile {
        path: PathBuf,
        content: String,
        encoding: Encoding,
    },
    DeleteFile {
        path: PathBuf,
    },
    ListDir {
        path: PathBuf,
    },
    PathExists {
        path: PathBuf,
    },
}

impl FilesystemAction {
    pub fn path(&self) -> &PathBuf {
        match self {
            Self::ReadFile { path, .. }
            | Self::WriteFile { path, .. }
            | Self::DeleteFile { path }
            | Self::ListDir { path }
            | Self::PathExists { path } => path,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ContainerAction {
    List {
        include_stopped: bool,
    },
    Inspect {
        container_id: String,
    },
    Exec {
        container_id: String,
        cmd: Vec<String>,
        options: ContainerExecOptions,
    },
}

/// Credentials for a remote shell; at least one of password or key is set.
#[derive(Clone, PartialEq)]
pub struct RemoteCredentials {
    pub password: Option<String>,
    pub private_key: Option<String>,
    pub passphrase: Option<String>,
}

impl fmt::Debug for RemoteCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteCredentials")
            .field("password", &self.password.as_ref().map(|_| crate::env::REDACTED))
            .field(
                "private_key",
                &self.private_key.as_ref().map(|_| crate::env::REDACTED),
            )
            .field(
                "passphrase",
                &self.passphrase.as_ref().map(|_| crate::env::REDACTED),
            )
            .finish()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RemoteShellAction {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub credentials: RemoteCredentials,
    pub command: String,
}

/// Where a script comes from
#[derive(Clone, Debug, PartialEq)]
pub enum ScriptSource {
    /// Script text, staged to a temporary file for the run
    Inline(String),
    /// Existing script on disk
    Path(PathBuf),
}

#[derive(Clone, Debug, PartialEq)]
pub struct ScriptAction {
    pub source: ScriptSource,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub env: HashMap<String, String>,
    pub timeout: Timeout,
    pub interpreter: Option<String>,
}
