//! File-based key-value store.
//!
//! [`FileKv`] stores each key as a single file under a root directory. The
//! key is the filename, the value is the file content. The root directory
//! is created lazily on first write, so constructing a [`FileKv`] against a
//! missing directory is cheap and infallible.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use crate::{KvError, KvStore, validate_key};

/// File-backed [`KvStore`] rooted at a directory on disk.
///
/// Directory layout:
/// ```text
/// {root}/
/// +-- doc_42                      # document
/// +-- auto_backup_1700000000000   # backup snapshot
/// +-- sb-access-token             # auth token
/// ```
#[derive(Debug)]
pub struct FileKv {
    root: PathBuf,
}

impl FileKv {
    /// Create a file store rooted at `root`.
    ///
    /// The directory is not created until the first write.
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, KvError> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }
}

impl KvStore for FileKv {
    fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(KvError::io(key, e)),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), KvError> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.root).map_err(|e| KvError::io(key, e))?;
        fs::write(&path, value).map_err(|e| KvError::io(key, e))
    }

    fn remove(&self, key: &str) -> Result<(), KvError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(KvError::io(key, e)),
        }
    }

    fn keys(&self) -> Result<Vec<String>, KvError> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            // No directory yet means no writes yet
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(KvError::io("", e)),
        };

        let mut keys = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| KvError::io("", e))?;
            if entry.file_type().is_ok_and(|t| t.is_file()) {
                keys.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        keys.sort();
        Ok(keys)
    }
}
