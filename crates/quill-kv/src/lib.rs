//! Key-value persistence for Quill.
//!
//! This crate provides a [`KvStore`] trait for small string-keyed values
//! (documents, backup snapshots, auth tokens) decoupled from the underlying
//! storage mechanism. This enables:
//!
//! - **Unit testing** without touching the real filesystem
//! - **Backend flexibility** (filesystem today, others later)
//! - **Clean separation** between persistence consumers and I/O
//!
//! # Implementations
//!
//! - [`FileKv`]: one file per key under a root directory
//! - [`MemoryKv`]: in-memory store for testing (behind `mock` feature flag)
//!
//! # Example
//!
//! ```ignore
//! use std::path::PathBuf;
//! use quill_kv::{FileKv, KvStore};
//!
//! let kv = FileKv::new(PathBuf::from(".quill/data"));
//! kv.set("doc_42", "{\"title\":\"Notes\"}")?;
//! let value = kv.get("doc_42")?;
//! ```

mod file;
#[cfg(feature = "mock")]
mod memory;

pub use file::FileKv;
#[cfg(feature = "mock")]
pub use memory::MemoryKv;

/// Error from key-value store operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum KvError {
    /// Underlying I/O failure for a key.
    #[error("I/O error for key {key:?}")]
    Io {
        /// Key being accessed when the error occurred.
        key: String,
        /// Original I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Key contains characters the backend cannot represent.
    #[error("invalid key {0:?}")]
    InvalidKey(String),
}

impl KvError {
    pub(crate) fn io(key: &str, source: std::io::Error) -> Self {
        Self::Io {
            key: key.to_owned(),
            source,
        }
    }
}

/// Validate that a key is safe for every backend.
///
/// Keys are restricted to a filename-safe alphabet so the file backend can
/// use them directly as filenames.
pub(crate) fn validate_key(key: &str) -> Result<(), KvError> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(KvError::InvalidKey(key.to_owned()))
    }
}

/// String key-value store.
///
/// Values are opaque strings (callers typically store JSON). Keys are
/// restricted to ASCII alphanumerics plus `-`, `_` and `.` so that every
/// backend can represent them.
pub trait KvStore: Send + Sync {
    /// Read the value for a key.
    ///
    /// Returns `Ok(None)` when the key does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`KvError`] on invalid key or backend failure.
    fn get(&self, key: &str) -> Result<Option<String>, KvError>;

    /// Write the value for a key, overwriting any existing value.
    ///
    /// # Errors
    ///
    /// Returns [`KvError`] on invalid key or backend failure.
    fn set(&self, key: &str, value: &str) -> Result<(), KvError>;

    /// Remove a key.
    ///
    /// Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`KvError`] on invalid key or backend failure.
    fn remove(&self, key: &str) -> Result<(), KvError>;

    /// List all keys, sorted lexicographically.
    ///
    /// # Errors
    ///
    /// Returns [`KvError`] on backend failure.
    fn keys(&self) -> Result<Vec<String>, KvError>;

    /// List keys starting with `prefix`, sorted lexicographically.
    ///
    /// # Errors
    ///
    /// Returns [`KvError`] on backend failure.
    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, KvError> {
        Ok(self
            .keys()?
            .into_iter()
            .filter(|k| k.starts_with(prefix))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_key_accepts_typical_keys() {
        assert!(validate_key("doc_42").is_ok());
        assert!(validate_key("auto_backup_1700000000000").is_ok());
        assert!(validate_key("sb-access-token").is_ok());
        assert!(validate_key("config.json").is_ok());
    }

    #[test]
    fn test_validate_key_rejects_empty() {
        assert!(matches!(validate_key(""), Err(KvError::InvalidKey(_))));
    }

    #[test]
    fn test_validate_key_rejects_path_separators() {
        assert!(matches!(
            validate_key("../escape"),
            Err(KvError::InvalidKey(_))
        ));
        assert!(matches!(
            validate_key("a/b"),
            Err(KvError::InvalidKey(_))
        ));
        assert!(matches!(
            validate_key("a\\b"),
            Err(KvError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_kv_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<KvError>();
    }

    #[test]
    fn test_kv_error_display() {
        let err = KvError::InvalidKey("a/b".to_owned());
        assert_eq!(err.to_string(), "invalid key \"a/b\"");
    }
}
