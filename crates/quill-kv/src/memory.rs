//! In-memory key-value store for testing.
//!
//! Provides [`MemoryKv`] for unit testing kv consumers without filesystem
//! access.

use std::collections::BTreeMap;
use std::sync::RwLock;

use crate::{KvError, KvStore, validate_key};

/// In-memory [`KvStore`] for testing.
///
/// Keys are held in a sorted map, so [`KvStore::keys`] ordering matches the
/// file backend for free. Use the builder method to preload test data.
///
/// # Example
///
/// ```ignore
/// use quill_kv::{KvStore, MemoryKv};
///
/// let kv = MemoryKv::new().with_entry("doc_1", "{}");
/// assert!(kv.get("doc_1").unwrap().is_some());
/// ```
#[derive(Debug, Default)]
pub struct MemoryKv {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryKv {
    /// Create a new empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Preload an entry.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_entry(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries
            .write()
            .unwrap()
            .insert(key.into(), value.into());
        self
    }

    /// Number of stored entries.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    /// True when no entries are stored.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().unwrap().is_empty()
    }
}

impl KvStore for MemoryKv {
    fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        validate_key(key)?;
        Ok(self.entries.read().unwrap().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), KvError> {
        validate_key(key)?;
        self.entries
            .write()
            .unwrap()
            .insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), KvError> {
        validate_key(key)?;
        self.entries.write().unwrap().remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, KvError> {
        Ok(self.entries.read().unwrap().keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_memory_kv_is_send_sync() {
        assert_send_sync::<MemoryKv>();
    }

    #[test]
    fn test_new_empty() {
        let kv = MemoryKv::new();
        assert!(kv.is_empty());
        assert!(kv.keys().unwrap().is_empty());
    }

    #[test]
    fn test_with_entry() {
        let kv = MemoryKv::new().with_entry("doc_1", "a").with_entry("doc_2", "b");

        assert_eq!(kv.len(), 2);
        assert_eq!(kv.get("doc_1").unwrap(), Some("a".to_owned()));
        assert_eq!(kv.get("doc_2").unwrap(), Some("b".to_owned()));
    }

    #[test]
    fn test_set_get_remove() {
        let kv = MemoryKv::new();

        kv.set("key", "value").unwrap();
        assert_eq!(kv.get("key").unwrap(), Some("value".to_owned()));

        kv.remove("key").unwrap();
        assert_eq!(kv.get("key").unwrap(), None);
    }

    #[test]
    fn test_keys_sorted() {
        let kv = MemoryKv::new()
            .with_entry("charlie", "3")
            .with_entry("alpha", "1")
            .with_entry("bravo", "2");

        assert_eq!(kv.keys().unwrap(), vec!["alpha", "bravo", "charlie"]);
    }

    #[test]
    fn test_keys_with_prefix() {
        let kv = MemoryKv::new()
            .with_entry("sb-access-token", "t")
            .with_entry("sb-refresh-token", "r")
            .with_entry("doc_1", "d");

        assert_eq!(
            kv.keys_with_prefix("sb-").unwrap(),
            vec!["sb-access-token", "sb-refresh-token"]
        );
    }

    #[test]
    fn test_invalid_key_rejected() {
        let kv = MemoryKv::new();
        assert!(matches!(kv.set("", "v"), Err(KvError::InvalidKey(_))));
    }
}
