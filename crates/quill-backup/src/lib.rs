//! Document backup and restore for Quill.
//!
//! A [`BackupBundle`] is a portable snapshot of a user's documents: a format
//! version, a timestamp, and the documents themselves. Bundles are pure
//! values with no identity beyond their timestamp.
//!
//! [`BackupManager`] produces bundles from a [`quill_docs::DocumentStore`],
//! exports and imports them as JSON files, restores them with owner
//! filtering, and can run a single recurring snapshot timer that keeps a
//! bounded history in the key-value store.

mod auto;
mod manager;

pub use auto::AutoBackupHandle;
pub use manager::{
    AUTO_BACKUP_PREFIX, BackupManager, DEFAULT_AUTO_BACKUP_INTERVAL, MAX_AUTO_BACKUPS,
    default_export_filename, parse_bundle,
};

use chrono::{DateTime, Utc};
use quill_docs::Document;
use serde::{Deserialize, Serialize};

/// Current backup format version.
pub const BACKUP_VERSION: &str = "1.0";

/// A portable snapshot of documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupBundle {
    /// Backup format version.
    pub version: String,
    /// When the snapshot was taken.
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    /// Documents in the snapshot, in storage order.
    pub documents: Vec<Document>,
}

impl BackupBundle {
    /// Create a bundle of the current format version, stamped now.
    #[must_use]
    pub fn new(documents: Vec<Document>) -> Self {
        Self {
            version: BACKUP_VERSION.to_owned(),
            timestamp: Utc::now(),
            documents,
        }
    }
}

/// Error from backup operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum BackupError {
    /// Key-value backend failure.
    #[error("backup storage error")]
    Kv(#[from] quill_kv::KvError),

    /// Document store failure.
    #[error("document error")]
    Document(#[from] quill_docs::DocumentError),

    /// Backup file could not be read.
    #[error("failed to read backup file")]
    Read(#[source] std::io::Error),

    /// Backup file could not be written.
    #[error("failed to write backup file")]
    Write(#[source] std::io::Error),

    /// Input is not a valid backup bundle.
    #[error("malformed backup bundle: {0}")]
    Malformed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_bundle_uses_current_version() {
        let bundle = BackupBundle::new(Vec::new());

        assert_eq!(bundle.version, BACKUP_VERSION);
        assert!(bundle.documents.is_empty());
    }

    #[test]
    fn test_bundle_json_round_trip() {
        let bundle = BackupBundle::new(vec![Document::new("user-1", "Notes")]);

        let json = serde_json::to_string(&bundle).unwrap();
        let parsed: BackupBundle = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed, bundle);
    }

    #[test]
    fn test_bundle_timestamp_defaults_when_missing() {
        let json = r#"{"version": "1.0", "documents": []}"#;

        let bundle: BackupBundle = serde_json::from_str(json).unwrap();

        assert_eq!(bundle.version, "1.0");
        assert!(bundle.documents.is_empty());
    }
}
