//! Filesystem actions.
//!
//! Thin async wrappers over `tokio::fs` that map I/O failures onto the
//! action error taxonomy. Deleting a path that does not exist succeeds.

use crate::action::{Encoding, FilesystemAction, FilesystemOutcome};
use crate::error::{ActionError, Result};
use std::io;
use std::path::Path;
use tracing::debug;

/// Executes filesystem actions on the local host
#[derive(Debug, Clone, Copy, Default)]
pub struct FilesystemHandler;

impl FilesystemHandler {
    pub fn new() -> Self {
        Self
    }

    pub async fn execute(&self, action: &FilesystemAction) -> Result<FilesystemOutcome> {
        let path_text = action.path().display().to_string();
        debug!("Filesystem action on {}: {:?}", path_text, action);

        match action {
            FilesystemAction::ReadFile { path, encoding } => {
                let content = self.read_file(path, *encoding).await?;
                Ok(FilesystemOutcome::Content {
                    success: true,
                    path: path_text,
                    content,
                })
            }
            FilesystemAction::WriteFile {
                path,
                content,
                encoding,
            } => {
                self.write_file(path, content, *encoding).await?;
                Ok(FilesystemOutcome::Written {
                    success: true,
                    path: path_text,
                })
            }
            FilesystemAction::DeleteFile { path } => {
                let existed = self.delete_file(path).await?;
                Ok(FilesystemOutcome::Deleted {
                    success: true,
                    path: path_text,
                    existed,
                })
            }
            FilesystemAction::ListDir { path } => {
                let entries = self.list_dir(path).await?;
                Ok(FilesystemOutcome::Listing {
                    success: true,
                    path: path_text,
                    entries,
                })
            }
            FilesystemAction::PathExists { path } => {
                let exists = self.path_exists(path).await?;
                Ok(FilesystemOutcome::Existence {
                    success: true,
                    path: path_text,
                    exists,
                })
            }
        }
    }

    /// Read a file and decode it as text.
    pub async fn read_file(&self, path: &Path, encoding: Encoding) -> Result<String> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| map_io(path, "Failed to read", e))?;
        decode(&bytes, encoding).map_err(|e| map_io(path, "Failed to decode", e))
    }

    /// Write text to a file, creating or truncating it.
    pub async fn write_file(&self, path: &Path, content: &str, encoding: Encoding) -> Result<()> {
        let bytes = encode(content, encoding)?;
        tokio::fs::write(path, bytes)
            .await
            .map_err(|e| map_io(path, "Failed to write", e))
    }

    /// Remove a file, or a directory and everything below it.
    ///
    /// Returns whether anything existed at `path`. A missing path is not an
    /// error.
    pub async fn delete_file(&self, path: &Path) -> Result<bool> {
        let metadata = match tokio::fs::symlink_metadata(path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("Nothing to delete at {}", path.display());
                return Ok(false);
            }
            Err(e) => return Err(map_io(path, "Failed to stat", e)),
        };

        let removal = if metadata.is_dir() {
            tokio::fs::remove_dir_all(path).await
        } else {
            tokio::fs::remove_file(path).await
        };

        match removal {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(map_io(path, "Failed to delete", e)),
        }
    }

    /// Entry names of a directory, sorted.
    pub async fn list_dir(&self, path: &Path) -> Result<Vec<String>> {
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| map_io(path, "Failed to stat", e))?;
        if !metadata.is_dir() {
            return Err(ActionError::io(
                format!("Failed to list {}", path.display()),
                io::Error::new(io::ErrorKind::NotADirectory, "not a directory"),
            ));
        }

        let mut reader = tokio::fs::read_dir(path)
            .await
            .map_err(|e| map_io(path, "Failed to list", e))?;
        let mut entries = Vec::new();
        while let Some(entry) = reader
            .next_entry()
            .await
            .map_err(|e| map_io(path, "Failed to list", e))?
        {
            entries.push(entry.file_name().to_string_lossy().into_owned());
        }
        entries.sort();
        Ok(entries)
    }

    /// Whether anything exists at `path`.
    pub async fn path_exists(&self, path: &Path) -> Result<bool> {
        tokio::fs::try_exists(path)
            .await
            .map_err(|e| map_io(path, "Failed to check", e))
    }
}

fn map_io(path: &Path, action: &str, err: io::Error) -> ActionError {
    if err.kind() == io::ErrorKind::NotFound {
        ActionError::not_found(path.display().to_string())
    } else {
        ActionError::io(format!("{} {}", action, path.display()), err)
    }
}

fn decode(bytes: &[u8], encoding: Encoding) -> io::Result<String> {
    match encoding {
        Encoding::Utf8 => String::from_utf8(bytes.to_vec())
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e)),
        Encoding::Ascii => {
            if let Some(pos) = bytes.iter().position(|b| !b.is_ascii()) {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("non-ASCII byte at offset {pos}"),
                ));
            }
            Ok(bytes.iter().map(|b| char::from(*b)).collect())
        }
        Encoding::Latin1 => Ok(bytes.iter().map(|b| char::from(*b)).collect()),
    }
}

fn encode(content: &str, encoding: Encoding) -> Result<Vec<u8>> {
    match encoding {
        Encoding::Utf8 => Ok(content.as_bytes().to_vec()),
        Encoding::Ascii => {
            if !content.is_ascii() {
                return Err(ActionError::validation(
                    "Content contains non-ASCII characters but encoding is 'ascii'",
                ));
            }
            Ok(content.as_bytes().to_vec())
        }
        Encoding::Latin1 => content
            .chars()
            .map(|c| {
                u8::try_from(u32::from(c)).map_err(|_| {
                    ActionError::invalid_value(
                        "Content is not representable in 'latin1'",
                        c.to_string(),
                    )
                })
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_then_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hello.txt");
        let fs = FilesystemHandler::new();

        assert!(!fs.path_exists(&path).await.unwrap());
        fs.write_file(&path, "hello", Encoding::Utf8).await.unwrap();
        assert!(fs.path_exists(&path).await.unwrap());
        assert_eq!(fs.read_file(&path, Encoding::Utf8).await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn test_write_empty_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.txt");
        let fs = FilesystemHandler::new();

        fs.write_file(&path, "", Encoding::Utf8).await.unwrap();
        assert_eq!(fs.read_file(&path, Encoding::Utf8).await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_read_missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = FilesystemHandler::new()
            .read_file(&dir.path().join("missing"), Encoding::Utf8)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_write_into_missing_directory_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("no/such/dir/file.txt");
        let err = FilesystemHandler::new()
            .write_file(&path, "x", Encoding::Utf8)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_delete_missing_path_succeeds() {
        let dir = TempDir::new().unwrap();
        let existed = FilesystemHandler::new()
            .delete_file(&dir.path().join("ghost"))
            .await
            .unwrap();
        assert!(!existed);
    }

    #[tokio::test]
    async fn test_delete_directory_recursively() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a/b/c");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(nested.join("file.txt"), "data").unwrap();
        let fs = FilesystemHandler::new();

        assert!(fs.delete_file(&dir.path().join("a")).await.unwrap());
        assert!(!fs.path_exists(&dir.path().join("a")).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_dir_sorted_and_stable() {
        let dir = TempDir::new().unwrap();
        for name in ["zeta", "alpha", "mid"] {
            std::fs::write(dir.path().join(name), name).unwrap();
        }
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        let fs = FilesystemHandler::new();

        let first = fs.list_dir(dir.path()).await.unwrap();
        assert_eq!(first, vec!["alpha", "mid", "sub", "zeta"]);
        let second = fs.list_dir(dir.path()).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_list_dir_on_file_fails() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("plain.txt");
        std::fs::write(&file, "x").unwrap();

        let err = FilesystemHandler::new().list_dir(&file).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[tokio::test]
    async fn test_latin1_roundtrip_and_ascii_rejection() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("latin1.txt");
        let fs = FilesystemHandler::new();

        fs.write_file(&path, "café", Encoding::Latin1).await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap().len(), 4);
        assert_eq!(fs.read_file(&path, Encoding::Latin1).await.unwrap(), "café");

        let err = fs.read_file(&path, Encoding::Ascii).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);

        let err = fs
            .write_file(&path, "café", Encoding::Ascii)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_invalid_utf8_read_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bin");
        std::fs::write(&path, [0xff, 0xfe, 0x00]).unwrap();

        let err = FilesystemHandler::new()
            .read_file(&path, Encoding::Utf8)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[tokio::test]
    async fn test_execute_reports_existed_flag() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("f.txt");
        std::fs::write(&path, "x").unwrap();

        let outcome = FilesystemHandler::new()
            .execute(&FilesystemAction::DeleteFile { path: path.clone() })
            .await
            .unwrap();
        assert_eq!(
            outcome,
            FilesystemOutcome::Deleted {
                success: true,
                path: path.display().to_string(),
                existed: true,
            }
        );
    }
}
