use crate::core::error::TokenStoreError;
use crate::core::settings::WriteMode;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Single-slot durable storage for the current refresh token.
pub trait TokenStore: Send + Sync {
    fn read(&self) -> Result<String, TokenStoreError>;
    fn write(&self, token: &str) -> Result<(), TokenStoreError>;
}

/// Refresh token kept as the sole line of a plain text file.
pub struct FileTokenStore {
    path: PathBuf,
    mode: WriteMode,
    last_known: Mutex<Option<String>>,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>, mode: WriteMode) -> Self {
        Self {
            path: path.into(),
            mode,
            last_known: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Token most recently read from or written to the file by this process.
    pub fn last_known(&self) -> Option<String> {
        self.last_known.lock().ok().and_then(|guard| guard.clone())
    }

    fn remember(&self, token: &str) {
        if let Ok(mut guard) = self.last_known.lock() {
            *guard = Some(token.to_string());
        }
    }

    /// Reads the first line of the file without touching `last_known`.
    pub fn peek(&self) -> Result<String, TokenStoreError> {
        read_first_line(&self.path)
    }

    fn write_replace(&self, token: &str) -> Result<(), TokenStoreError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(source) => {
                return Err(TokenStoreError::Remove {
                    path: self.path.clone(),
                    source,
                })
            }
        }

        // Only write once the old file is really gone.
        if self.path.exists() {
            return Err(TokenStoreError::Remove {
                path: self.path.clone(),
                source: std::io::Error::new(
                    std::io::ErrorKind::AlreadyExists,
                    "file still present after delete",
                ),
            });
        }

        std::fs::write(&self.path, token).map_err(|source| TokenStoreError::Write {
            path: self.path.clone(),
            source,
        })
    }

    fn write_atomic(&self, token: &str) -> Result<(), TokenStoreError> {
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "refresh-token".to_string());
        let tmp = self.path.with_file_name(format!(".{file_name}.tmp"));

        std::fs::write(&tmp, token).map_err(|source| TokenStoreError::Write {
            path: tmp.clone(),
            source,
        })?;

        std::fs::rename(&tmp, &self.path).map_err(|source| {
            let _ = std::fs::remove_file(&tmp);
            TokenStoreError::Write {
                path: self.path.clone(),
                source,
            }
        })
    }
}

impl TokenStore for FileTokenStore {
    fn read(&self) -> Result<String, TokenStoreError> {
        let token = read_first_line(&self.path)?;
        self.remember(&token);
        Ok(token)
    }

    fn write(&self, token: &str) -> Result<(), TokenStoreError> {
        match self.mode {
            WriteMode::Replace => self.write_replace(token)?,
            WriteMode::Atomic => self.write_atomic(token)?,
        }
        self.remember(token);
        tracing::debug!(path = %self.path.display(), "Refresh token persisted");
        Ok(())
    }
}

fn read_first_line(path: &Path) -> Result<String, TokenStoreError> {
    let file = File::open(path).map_err(|source| TokenStoreError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let mut line = String::new();
    BufReader::new(file)
        .read_line(&mut line)
        .map_err(|source| TokenStoreError::Read {
            path: path.to_path_buf(),
            source,
        })?;

    let token = line.trim_end_matches(['\r', '\n']);
    if token.trim().is_empty() {
        return Err(TokenStoreError::Empty {
            path: path.to_path_buf(),
        });
    }
    Ok(token.to_string())
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_first_line_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("refreshToken.txt");
        std::fs::write(&path, "first-token\r\nsecond-line\n").unwrap();

        let store = FileTokenStore::new(&path, WriteMode::Replace);
        assert_eq!(store.read().unwrap(), "first-token");
        assert_eq!(store.last_known().as_deref(), Some("first-token"));
    }

    #[test]
    fn test_read_keeps_line_content_as_is() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("refreshToken.txt");
        std::fs::write(&path, " padded-token \r\n").unwrap();

        let store = FileTokenStore::new(&path, WriteMode::Replace);
        assert_eq!(store.read().unwrap(), " padded-token ");
    }

    #[test]
    fn test_read_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("absent.txt"), WriteMode::Replace);
        assert!(matches!(store.read(), Err(TokenStoreError::Read { .. })));
    }

    #[test]
    fn test_read_empty_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("refreshToken.txt");
        std::fs::write(&path, "\n").unwrap();

        let store = FileTokenStore::new(&path, WriteMode::Replace);
        assert!(matches!(store.read(), Err(TokenStoreError::Empty { .. })));
    }

    #[test]
    fn test_replace_write_overwrites_whole_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("refreshToken.txt");
        std::fs::write(&path, "old-token-that-is-much-longer\nextra").unwrap();

        let store = FileTokenStore::new(&path, WriteMode::Replace);
        store.write("new-token").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new-token");
        assert_eq!(store.read().unwrap(), "new-token");
    }

    #[test]
    fn test_replace_write_creates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("refreshToken.txt");

        let store = FileTokenStore::new(&path, WriteMode::Replace);
        store.write("fresh").unwrap();
        assert_eq!(store.read().unwrap(), "fresh");
    }

    #[test]
    fn test_replace_write_skipped_when_delete_fails() {
        let dir = tempfile::tempdir().unwrap();
        // A directory in the token's place cannot be removed with remove_file.
        let path = dir.path().join("refreshToken.txt");
        std::fs::create_dir(&path).unwrap();

        let store = FileTokenStore::new(&path, WriteMode::Replace);
        let err = store.write("new-token").unwrap_err();
        assert!(matches!(err, TokenStoreError::Remove { .. }));
        assert!(path.is_dir());
        assert_eq!(store.last_known(), None);
    }

    #[test]
    fn test_atomic_write_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("refreshToken.txt");
        std::fs::write(&path, "old").unwrap();

        let store = FileTokenStore::new(&path, WriteMode::Atomic);
        store.write("rotated").unwrap();

        assert_eq!(store.read().unwrap(), "rotated");
        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }
}
