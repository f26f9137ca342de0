//! Wire shapes of the per-kind `parameters` object.
//!
//! These mirror the field groups the host layer collects for each action
//! kind. Unknown fields are rejected; the validator turns each shape into
//! its typed [`ActionRequest`](super::ActionRequest) variant.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Filesystem operations
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum FilesystemOperation {
    ReadFile,
    WriteFile,
    DeleteFile,
    ListDir,
    PathExists,
}

/// Text encodings accepted by `readFile` / `writeFile`
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Encoding {
    #[default]
    #[serde(rename = "utf8", alias = "utf-8", alias = "UTF-8", alias = "UTF8")]
    Utf8,
    #[serde(rename = "ascii")]
    Ascii,
    #[serde(rename = "latin1", alias = "binary")]
    Latin1,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FilesystemParams {
    pub operation: FilesystemOperation,
    pub path: PathBuf,
    pub content: Option<String>,
    pub encoding: Option<Encoding>,
}

/// Options for a local process
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProcessOptions {
    /// Working directory
    pub cwd: Option<PathBuf>,
    /// Extra environment variables, layered on the inherited environment
    #[serde(default)]
    pub env: HashMap<String, String>,
    /// Timeout in milliseconds; `0` means none
    pub timeout: Option<u64>,
    /// Text written to the child's standard input
    pub stdin: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CommandParams {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub options: ProcessOptions,
}

/// Container operations
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ContainerOperation {
    ListContainers,
    InspectContainer,
    ExecInContainer,
}

/// A command given either as one line or as an explicit argument vector
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum CommandLine {
    Line(String),
    Argv(Vec<String>),
}

impl CommandLine {
    /// Argument vector; a single line is split on whitespace.
    pub fn into_argv(self) -> Vec<String> {
        match self {
            Self::Line(line) => line.split_whitespace().map(str::to_string).collect(),
            Self::Argv(argv) => argv,
        }
    }
}

/// Options for a command run inside a container
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ContainerExecOptions {
    pub cwd: Option<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    pub user: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ContainerParams {
    pub operation: ContainerOperation,
    pub container_id: Option<String>,
    pub command: Option<CommandLine>,
    pub options: Option<ContainerExecOptions>,
    pub include_stopped: Option<bool>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RemoteShellParams {
    pub host: String,
    pub port: Option<u16>,
    pub username: String,
    pub password: Option<String>,
    pub private_key: Option<String>,
    /// Decrypts `private_key` when it is encrypted
    pub passphrase: Option<String>,
    pub command: String,
}

/// Options for a script run
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ScriptOptions {
    pub cwd: Option<PathBuf>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    /// Timeout in milliseconds; `0` means none
    pub timeout: Option<u64>,
    /// Interpreter overriding the configured one for this run
    pub interpreter: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ScriptParams {
    pub script_content: Option<String>,
    pub script_path: Option<PathBuf>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub options: ScriptOptions,
}
