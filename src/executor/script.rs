//! Script execution.
//!
//! Inline script text is staged to a uniquely named file, handed to the
//! configured interpreter through [`CommandHandler`], and removed again on
//! every exit path.

use super::{CommandHandler, ExecutionCommand, FilesystemHandler, ScriptSettings};
use crate::action::{Encoding, ProcessOutcome, ScriptAction, ScriptSource};
use crate::env;
use crate::error::{ActionError, Result};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

/// Runs scripts through an interpreter
#[derive(Debug, Clone)]
pub struct ScriptHandler {
    settings: ScriptSettings,
    filesystem: FilesystemHandler,
    command: CommandHandler,
}

impl ScriptHandler {
    pub fn new(
        settings: ScriptSettings,
        filesystem: FilesystemHandler,
        command: CommandHandler,
    ) -> Self {
        Self {
            settings,
            filesystem,
            command,
        }
    }

    pub fn settings(&self) -> &ScriptSettings {
        &self.settings
    }

    /// Run a script and capture its outcome.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::NotFound`] for a missing script path or
    /// interpreter, and [`ActionError::Io`] when staging fails. A staged
    /// script is removed before any of these are returned.
    pub async fn run(
        &self,
        action: &ScriptAction,
        cancel: &CancellationToken,
    ) -> Result<ProcessOutcome> {
        match &action.source {
            ScriptSource::Inline(content) => {
                let script = TempScript::stage(
                    &self.filesystem,
                    &self.settings.temp_dir(),
                    self.settings.extension.as_deref(),
                    content,
                )
                .await?;

                let result = self.invoke(script.path(), action, cancel).await;
                script.release(&self.filesystem).await;
                result
            }
            ScriptSource::Path(path) => {
                if !self.filesystem.path_exists(path).await? {
                    return Err(ActionError::not_found(path.display().to_string()));
                }
                self.invoke(path, action, cancel).await
            }
        }
    }

    async fn invoke(
        &self,
        script: &Path,
        action: &ScriptAction,
        cancel: &CancellationToken,
    ) -> Result<ProcessOutcome> {
        let interpreter = action
            .interpreter
            .clone()
            .unwrap_or_else(|| self.settings.interpreter.clone());

        let mut args = self.settings.interpreter_args.clone();
        args.push(script.to_string_lossy().into_owned());
        args.extend(action.args.iter().cloned());

        let mut cmd = ExecutionCommand::new(interpreter, args);
        cmd.working_dir = action.working_dir.clone();
        cmd.env = action.env.clone();
        cmd.timeout = action.timeout;

        self.command.run(&cmd, cancel).await
    }
}

/// A staged script file owned by one invocation.
///
/// Call [`TempScript::release`] to remove it; if the guard is dropped
/// without being released (panic, dropped future) the file is removed
/// synchronously in `Drop`.
#[derive(Debug)]
pub struct TempScript {
    path: PathBuf,
    released: bool,
}

impl TempScript {
    /// Write `content` to a fresh uniquely named file under `dir`.
    pub async fn stage(
        filesystem: &FilesystemHandler,
        dir: &Path,
        extension: Option<&str>,
        content: &str,
    ) -> Result<Self> {
        let mut name = format!("{}{}", env::script::TEMP_FILE_PREFIX, Uuid::new_v4());
        if let Some(ext) = extension.filter(|ext| !ext.is_empty()) {
            name.push('.');
            name.push_str(ext.trim_start_matches('.'));
        }
        let path = dir.join(name);

        // Guard first so a partially written file is still removed.
        let guard = Self {
            path,
            released: false,
        };
        filesystem
            .write_file(&guard.path, content, Encoding::Utf8)
            .await?;
        debug!("Staged script at {}", guard.path.display());
        Ok(guard)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the staged file. Failures are logged, never returned, so
    /// they cannot mask the script's own result.
    pub async fn release(mut self, filesystem: &FilesystemHandler) {
        self.released = true;
        match filesystem.delete_file(&self.path).await {
            Ok(_) => debug!("Removed staged script {}", self.path.display()),
            Err(e) => warn!(
                "Failed to remove staged script {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}

impl Drop for TempScript {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed staged script {} on drop", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                "Failed to remove staged script {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::executor::Timeout;
    use std::collections::HashMap;
    use std::time::Duration;
    use tempfile::TempDir;

    fn handler(dir: &Path) -> ScriptHandler {
        ScriptHandler::new(
            ScriptSettings::default().with_temp_dir(dir),
            FilesystemHandler::new(),
            CommandHandler::new(),
        )
    }

    fn inline(content: &str) -> ScriptAction {
        ScriptAction {
            source: ScriptSource::Inline(content.to_string()),
            args: Vec::new(),
            working_dir: None,
            env: HashMap::new(),
            timeout: Timeout::Default,
            interpreter: None,
        }
    }

    fn dir_is_empty(dir: &Path) -> bool {
        std::fs::read_dir(dir).unwrap().next().is_none()
    }

    #[tokio::test]
    async fn test_inline_script_exists_during_run_and_is_removed() {
        let dir = TempDir::new().unwrap();
        let action = inline("test -f \"$0\" && echo present; echo \"$0\"");

        let outcome = handler(dir.path())
            .run(&action, &CancellationToken::new())
            .await
            .unwrap();

        assert!(outcome.success());
        assert!(outcome.stdout.contains("present"));
        let staged = PathBuf::from(outcome.stdout.lines().nth(1).unwrap().trim());
        assert!(staged.starts_with(dir.path()));
        assert!(!FilesystemHandler::new().path_exists(&staged).await.unwrap());
        assert!(dir_is_empty(dir.path()));
    }

    #[tokio::test]
    async fn test_failing_script_is_cleaned_up() {
        let dir = TempDir::new().unwrap();

        let outcome = handler(dir.path())
            .run(&inline("echo boom >&2; exit 3"), &CancellationToken::new())
            .await
            .unwrap();

        assert!(outcome.failed);
        assert_eq!(outcome.exit_code, Some(3));
        assert!(outcome.stderr.contains("boom"));
        assert!(dir_is_empty(dir.path()));
    }

    #[tokio::test]
    async fn test_missing_interpreter_is_cleaned_up() {
        let dir = TempDir::new().unwrap();
        let mut action = inline("echo never");
        action.interpreter = Some("no-such-interpreter-5f2a".to_string());

        let err = handler(dir.path())
            .run(&action, &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(dir_is_empty(dir.path()));
    }

    #[tokio::test]
    async fn test_timed_out_script_is_cleaned_up() {
        let dir = TempDir::new().unwrap();
        let mut action = inline("sleep 5");
        action.timeout = Timeout::After(Duration::from_millis(100));

        let outcome = handler(dir.path())
            .run(&action, &CancellationToken::new())
            .await
            .unwrap();

        assert!(outcome.timed_out);
        assert!(dir_is_empty(dir.path()));
    }

    #[tokio::test]
    async fn test_canceled_script_is_cleaned_up() {
        let dir = TempDir::new().unwrap();
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let outcome = handler(dir.path())
            .run(&inline("echo started; sleep 5"), &cancel)
            .await
            .unwrap();

        assert!(outcome.canceled);
        assert!(outcome.failed);
        assert!(!outcome.timed_out);
        assert_eq!(outcome.exit_code, None);
        assert!(dir_is_empty(dir.path()));
    }

    #[tokio::test]
    async fn test_missing_working_directory_is_cleaned_up() {
        let dir = TempDir::new().unwrap();
        let mut action = inline("echo never");
        action.working_dir = Some(dir.path().join("absent"));

        let err = handler(dir.path())
            .run(&action, &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(err.to_string().contains("Working directory"));
        assert!(dir_is_empty(dir.path()));
    }

    #[tokio::test]
    async fn test_script_args_passed_through() {
        let dir = TempDir::new().unwrap();
        let mut action = inline("echo \"$1-$2\"");
        action.args = vec!["a".to_string(), "b".to_string()];

        let outcome = handler(dir.path())
            .run(&action, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(outcome.stdout.trim(), "a-b");
    }

    #[tokio::test]
    async fn test_script_path_runs_existing_file() {
        let dir = TempDir::new().unwrap();
        let script = dir.path().join("existing.sh");
        std::fs::write(&script, "echo from-disk").unwrap();
        let mut action = inline("");
        action.source = ScriptSource::Path(script.clone());

        let outcome = handler(dir.path())
            .run(&action, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(outcome.stdout.trim(), "from-disk");
        assert!(script.exists());
    }

    #[tokio::test]
    async fn test_missing_script_path_is_not_found() {
        let dir = TempDir::new().unwrap();
        let mut action = inline("");
        action.source = ScriptSource::Path(dir.path().join("missing.sh"));

        let err = handler(dir.path())
            .run(&action, &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_temp_script_names_are_unique_with_extension() {
        let dir = TempDir::new().unwrap();
        let fs = FilesystemHandler::new();

        let a = TempScript::stage(&fs, dir.path(), Some("py"), "x").await.unwrap();
        let b = TempScript::stage(&fs, dir.path(), Some(".py"), "x").await.unwrap();
        assert_ne!(a.path(), b.path());
        assert_eq!(a.path().extension().unwrap(), "py");
        assert_eq!(b.path().extension().unwrap(), "py");

        a.release(&fs).await;
        drop(b);
        assert!(dir_is_empty(dir.path()));
    }
}
