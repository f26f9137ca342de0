//! Executor configuration types.
//!
//! Every setting a backend needs (daemon endpoint, interpreter, default
//! timeout) is an explicit field here. The one fallback to the process
//! environment is an unset `container.endpoint`: the client then uses
//! bollard's local defaults, which honor `DOCKER_HOST` before the platform
//! socket.

use crate::env;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level executor configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExecutorConfig {
    pub command: CommandSettings,
    pub script: ScriptSettings,
    pub container: ContainerSettings,
    pub remote_shell: RemoteShellSettings,
}

impl ExecutorConfig {
    /// Parse configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Serialize configuration as pretty TOML
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Load configuration from a TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_toml_str(&content)?)
    }

    /// Save configuration to a TOML file
    pub fn to_toml_file<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        std::fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }
}

/// Local command settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CommandSettings {
    /// Timeout applied when a request does not set one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_timeout_ms: Option<u64>,
}

impl CommandSettings {
    pub fn default_timeout(&self) -> Option<Duration> {
        self.default_timeout_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }
}

/// Script settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScriptSettings {
    /// Interpreter executable
    pub interpreter: String,
    /// Arguments placed before the script path
    pub interpreter_args: Vec<String>,
    /// Extension for staged script files, without the dot
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
    /// Directory for staged script files (default: system temp dir)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temp_dir: Option<PathBuf>,
}

impl Default for ScriptSettings {
    fn default() -> Self {
        Self {
            interpreter: env::script::DEFAULT_INTERPRETER.to_string(),
            interpreter_args: Vec::new(),
            extension: None,
            temp_dir: None,
        }
    }
}

impl ScriptSettings {
    pub fn with_interpreter(mut self, interpreter: impl Into<String>) -> Self {
        self.interpreter = interpreter.into();
        self
    }

    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    pub fn temp_dir(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

/// How the attached exec stream is turned into stdout/stderr
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExecStreamMode {
    /// Split frames by the daemon's stream framing into stdout and stderr
    #[default]
    Demultiplexed,
    /// Append every frame to stdout; stderr only carries a placeholder
    /// when the exit code is non-zero
    Combined,
}

/// Container daemon settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ContainerSettings {
    /// `unix://`, `tcp://` or `http://` endpoint; platform default when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Client timeout in seconds
    pub timeout_secs: u64,
    pub stream_mode: ExecStreamMode,
}

impl Default for ContainerSettings {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_secs: env::container::DEFAULT_TIMEOUT_SECS,
            stream_mode: ExecStreamMode::default(),
        }
    }
}

/// Remote shell settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RemoteShellSettings {
    pub default_port: u16,
}

impl Default for RemoteShellSettings {
    fn default() -> Self {
        Self {
            default_port: env::remote_shell::DEFAULT_PORT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = ExecutorConfig::default();
        assert_eq!(config.script.interpreter, "sh");
        assert_eq!(config.container.timeout_secs, 120);
        assert_eq!(config.container.stream_mode, ExecStreamMode::Demultiplexed);
        assert_eq!(config.remote_shell.default_port, 22);
        assert!(config.command.default_timeout().is_none());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config = ExecutorConfig::from_toml_str(
            r#"
            [container]
            endpoint = "tcp://127.0.0.1:2375"
            stream_mode = "combined"

            [command]
            default_timeout_ms = 2500
            "#,
        )
        .unwrap();

        assert_eq!(
            config.container.endpoint.as_deref(),
            Some("tcp://127.0.0.1:2375")
        );
        assert_eq!(config.container.stream_mode, ExecStreamMode::Combined);
        assert_eq!(config.container.timeout_secs, 120);
        assert_eq!(
            config.command.default_timeout(),
            Some(Duration::from_millis(2500))
        );
        assert_eq!(config.script, ScriptSettings::default());
    }

    #[test]
    fn test_zero_default_timeout_disabled() {
        let settings = CommandSettings {
            default_timeout_ms: Some(0),
        };
        assert!(settings.default_timeout().is_none());
    }

    #[test]
    fn test_toml_roundtrip() {
        let mut config = ExecutorConfig::default();
        config.script = ScriptSettings::default()
            .with_interpreter("python3")
            .with_temp_dir("/var/tmp");
        config.script.extension = Some("py".to_string());

        let toml = config.to_toml_string().unwrap();
        assert!(toml.contains("python3"));
        let parsed = ExecutorConfig::from_toml_str(&toml).unwrap();
        assert_eq!(parsed, config);
    }
}
