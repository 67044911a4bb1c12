//! Document persistence over a key-value store.

use std::sync::Arc;

use quill_kv::KvStore;
use tracing::warn;

use crate::{Document, DocumentError};

/// Key prefix for persisted documents.
pub const DOC_KEY_PREFIX: &str = "doc_";

/// Document persistence over an injected [`KvStore`].
///
/// Each document is stored as JSON under `doc_<id>`. The store holds a
/// shared handle so backup and UI layers can operate on the same backend.
#[derive(Clone)]
pub struct DocumentStore {
    kv: Arc<dyn KvStore>,
}

impl DocumentStore {
    /// Create a document store over a key-value backend.
    #[must_use]
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    fn key_for(id: &str) -> String {
        format!("{DOC_KEY_PREFIX}{id}")
    }

    /// Persist a document, overwriting any existing document with the same id.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError`] on serialization or backend failure.
    pub fn save(&self, doc: &Document) -> Result<(), DocumentError> {
        let json = serde_json::to_string(doc)?;
        self.kv.set(&Self::key_for(&doc.id), &json)?;
        Ok(())
    }

    /// Load a document by id.
    ///
    /// Returns `Ok(None)` when no document with that id exists.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError`] on backend failure or if the stored value
    /// is not valid document JSON.
    pub fn get(&self, id: &str) -> Result<Option<Document>, DocumentError> {
        match self.kv.get(&Self::key_for(id))? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// List all stored documents.
    ///
    /// Entries that fail to parse are skipped with a warning rather than
    /// failing the whole listing.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError`] on backend failure.
    pub fn list(&self) -> Result<Vec<Document>, DocumentError> {
        let mut docs = Vec::new();
        for key in self.kv.keys_with_prefix(DOC_KEY_PREFIX)? {
            let Some(json) = self.kv.get(&key)? else {
                continue;
            };
            match serde_json::from_str(&json) {
                Ok(doc) => docs.push(doc),
                Err(e) => warn!("skipping unparsable document {key}: {e}"),
            }
        }
        Ok(docs)
    }

    /// List documents owned by `user_id`.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError`] on backend failure.
    pub fn list_for_user(&self, user_id: &str) -> Result<Vec<Document>, DocumentError> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|d| d.user_id == user_id)
            .collect())
    }

    /// Delete a document by id.
    ///
    /// Deleting a missing id is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError`] on backend failure.
    pub fn delete(&self, id: &str) -> Result<(), DocumentError> {
        self.kv.remove(&Self::key_for(id))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use quill_kv::MemoryKv;

    fn store() -> DocumentStore {
        DocumentStore::new(Arc::new(MemoryKv::new()))
    }

    #[test]
    fn test_save_and_get() {
        let store = store();
        let doc = Document::new("user-1", "Notes");

        store.save(&doc).unwrap();

        assert_eq!(store.get(&doc.id).unwrap(), Some(doc));
    }

    #[test]
    fn test_get_missing_returns_none() {
        let store = store();

        assert_eq!(store.get("missing").unwrap(), None);
    }

    #[test]
    fn test_save_overwrites_same_id() {
        let store = store();
        let mut doc = Document::new("user-1", "Draft");
        store.save(&doc).unwrap();

        doc.title = "Final".to_owned();
        store.save(&doc).unwrap();

        let loaded = store.get(&doc.id).unwrap().unwrap();
        assert_eq!(loaded.title, "Final");
    }

    #[test]
    fn test_list_returns_all_documents() {
        let store = store();
        store.save(&Document::new("user-1", "A")).unwrap();
        store.save(&Document::new("user-2", "B")).unwrap();

        assert_eq!(store.list().unwrap().len(), 2);
    }

    #[test]
    fn test_list_for_user_filters_by_owner() {
        let store = store();
        store.save(&Document::new("user-1", "Mine")).unwrap();
        store.save(&Document::new("user-2", "Theirs")).unwrap();

        let docs = store.list_for_user("user-1").unwrap();

        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].title, "Mine");
    }

    #[test]
    fn test_list_skips_unparsable_entries() {
        let kv = Arc::new(MemoryKv::new().with_entry("doc_bad", "not json"));
        let store = DocumentStore::new(kv);
        store.save(&Document::new("user-1", "Good")).unwrap();

        let docs = store.list().unwrap();

        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].title, "Good");
    }

    #[test]
    fn test_delete_then_get_returns_none() {
        let store = store();
        let doc = Document::new("user-1", "Gone");
        store.save(&doc).unwrap();

        store.delete(&doc.id).unwrap();

        assert_eq!(store.get(&doc.id).unwrap(), None);
    }

    #[test]
    fn test_delete_missing_is_ok() {
        let store = store();

        assert!(store.delete("missing").is_ok());
    }

    #[test]
    fn test_list_ignores_other_key_prefixes() {
        let kv = Arc::new(MemoryKv::new().with_entry("sb-access-token", "tok"));
        let store = DocumentStore::new(kv);
        store.save(&Document::new("user-1", "Only")).unwrap();

        assert_eq!(store.list().unwrap().len(), 1);
    }
}
