//! Document model and storage for Quill.
//!
//! A [`Document`] is a single authored page: title, description and
//! structured editor content, owned by exactly one user. Documents persist
//! as JSON values in a [`quill_kv::KvStore`] through [`DocumentStore`].
//!
//! No cross-document relationships are enforced at this layer.

mod store;

pub use store::{DOC_KEY_PREFIX, DocumentStore};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single authored document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Unique document id.
    pub id: String,
    /// Id of the owning user.
    pub user_id: String,
    /// Document title.
    pub title: String,
    /// Short description.
    #[serde(default)]
    pub description: String,
    /// Structured editor content.
    #[serde(default)]
    pub content: serde_json::Value,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// Create a new empty document owned by `user_id`.
    ///
    /// A fresh UUID id is generated and both timestamps are stamped with the
    /// current time.
    #[must_use]
    pub fn new(user_id: impl Into<String>, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            title: title.into(),
            description: String::new(),
            content: serde_json::Value::Null,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Error from document storage operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum DocumentError {
    /// Key-value backend failure.
    #[error("storage error")]
    Kv(#[from] quill_kv::KvError),

    /// Document (de)serialization failure.
    #[error("document serialization error")]
    Json(#[from] serde_json::Error),
}
