//! Environment constants and path utilities for the action executor.
//!
//! Centralizes the file names, directory names and built-in defaults used
//! by configuration discovery and the backend handlers.

use std::path::{Path, PathBuf};

/// Hidden per-project directory name
pub const ACTX_DIR_NAME: &str = ".actx";

/// Configuration file name inside [`ACTX_DIR_NAME`]
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Stand-alone configuration file name in a working directory
pub const LOCAL_CONFIG_FILE_NAME: &str = "actx.toml";

/// System-wide configuration file (Unix-like systems)
#[cfg(unix)]
pub const SYSTEM_CONFIG_FILE: &str = "/etc/actx/config.toml";

/// Default tracing filter for the binary
pub const DEFAULT_LOG_FILTER: &str = "action_executor=info";

/// Script execution defaults
pub mod script {
    /// Interpreter used when neither config nor request names one
    pub const DEFAULT_INTERPRETER: &str = "sh";

    /// Prefix for temporary script files
    pub const TEMP_FILE_PREFIX: &str = "actx-script-";
}

/// Container daemon defaults
pub mod container {
    /// Daemon client timeout in seconds
    pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

    /// Placeholder stored in `stderr` by the combined stream mode when the
    /// exec exits non-zero
    pub const COMBINED_STDERR_PLACEHOLDER: &str = "likely error, see combined output";
}

/// Remote shell defaults
pub mod remote_shell {
    /// Default SSH port
    pub const DEFAULT_PORT: u16 = 22;
}

/// Value substituted for secrets in echoed request parameters
pub const REDACTED: &str = "[REDACTED]";

/// Build the `.actx` directory path from a base directory
pub fn actx_dir_path(base: &Path) -> PathBuf {
    base.join(ACTX_DIR_NAME)
}

/// Build the config file path inside a base directory's `.actx` directory
pub fn config_file_path(base: &Path) -> PathBuf {
    actx_dir_path(base).join(CONFIG_FILE_NAME)
}

/// Build the stand-alone `actx.toml` path inside a directory
pub fn local_config_file_path(dir: &Path) -> PathBuf {
    dir.join(LOCAL_CONFIG_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_paths() {
        let base = Path::new("/home/user");
        assert_eq!(actx_dir_path(base), PathBuf::from("/home/user/.actx"));
        assert_eq!(
            config_file_path(base),
            PathBuf::from("/home/user/.actx/config.toml")
        );
        assert_eq!(
            local_config_file_path(base),
            PathBuf::from("/home/user/actx.toml")
        );
    }
}
