//! Backup creation, export/import, restore and snapshot retention.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use quill_docs::DocumentStore;
use quill_kv::KvStore;
use tracing::{debug, warn};

use crate::auto::AutoBackupHandle;
use crate::{BackupBundle, BackupError};

/// Key prefix for auto-backup snapshots. Keys embed the epoch-millisecond
/// timestamp of the snapshot, so lexicographic key order matches insertion
/// order.
pub const AUTO_BACKUP_PREFIX: &str = "auto_backup_";

/// Maximum number of retained auto-backup snapshots.
pub const MAX_AUTO_BACKUPS: usize = 5;

/// Default auto-backup interval (10 minutes).
pub const DEFAULT_AUTO_BACKUP_INTERVAL: Duration = Duration::from_secs(600);

/// Parse and validate a backup bundle from JSON.
///
/// Validation is shape-minimal: the input must be a JSON object carrying a
/// `version` field and a `documents` array. Anything else is rejected with
/// a descriptive error.
///
/// # Errors
///
/// Returns [`BackupError::Malformed`] on invalid JSON or missing fields.
pub fn parse_bundle(json: &str) -> Result<BackupBundle, BackupError> {
    let value: serde_json::Value =
        serde_json::from_str(json).map_err(|e| BackupError::Malformed(e.to_string()))?;
    let obj = value
        .as_object()
        .ok_or_else(|| BackupError::Malformed("not a JSON object".to_owned()))?;
    if !obj.contains_key("version") {
        return Err(BackupError::Malformed("missing version field".to_owned()));
    }
    if !obj.get("documents").is_some_and(serde_json::Value::is_array) {
        return Err(BackupError::Malformed(
            "missing documents field".to_owned(),
        ));
    }
    serde_json::from_value(value).map_err(|e| BackupError::Malformed(e.to_string()))
}

/// Default filename for an exported backup, embedding today's date.
#[must_use]
pub fn default_export_filename() -> String {
    format!("quill-backup-{}.json", Utc::now().format("%Y-%m-%d"))
}

/// Write one snapshot and prune history down to [`MAX_AUTO_BACKUPS`].
///
/// Returns the key the snapshot was stored under.
fn write_snapshot(docs: &DocumentStore, kv: &Arc<dyn KvStore>) -> Result<String, BackupError> {
    let bundle = BackupBundle::new(docs.list()?);
    let json = serde_json::to_string(&bundle).map_err(|e| BackupError::Malformed(e.to_string()))?;

    // Bump the millisecond until the key is free so rapid snapshots never
    // overwrite each other
    let mut millis = Utc::now().timestamp_millis();
    let key = loop {
        let key = format!("{AUTO_BACKUP_PREFIX}{millis}");
        if kv.get(&key)?.is_none() {
            break key;
        }
        millis += 1;
    };
    kv.set(&key, &json)?;
    debug!("wrote auto backup {key} ({} documents)", bundle.documents.len());

    // Evict oldest-first until exactly MAX_AUTO_BACKUPS remain
    let snapshot_keys = kv.keys_with_prefix(AUTO_BACKUP_PREFIX)?;
    if snapshot_keys.len() > MAX_AUTO_BACKUPS {
        for old in &snapshot_keys[..snapshot_keys.len() - MAX_AUTO_BACKUPS] {
            kv.remove(old)?;
            debug!("evicted auto backup {old}");
        }
    }

    Ok(key)
}

/// Backup orchestration over a document store and a key-value store.
///
/// Holds at most one running auto-backup timer; starting a new one replaces
/// (and thereby stops) any previous timer.
pub struct BackupManager {
    docs: DocumentStore,
    kv: Arc<dyn KvStore>,
    auto: Mutex<Option<AutoBackupHandle>>,
}

impl BackupManager {
    /// Create a manager over the given stores.
    #[must_use]
    pub fn new(docs: DocumentStore, kv: Arc<dyn KvStore>) -> Self {
        Self {
            docs,
            kv,
            auto: Mutex::new(None),
        }
    }

    /// Snapshot all stored documents into a bundle.
    ///
    /// # Errors
    ///
    /// Returns [`BackupError`] on document store failure.
    pub fn create_backup(&self) -> Result<BackupBundle, BackupError> {
        Ok(BackupBundle::new(self.docs.list()?))
    }

    /// Export a fresh backup as pretty JSON to `path`.
    ///
    /// # Errors
    ///
    /// Returns [`BackupError::Write`] when the file cannot be written.
    pub fn export_backup(&self, path: &Path) -> Result<BackupBundle, BackupError> {
        let bundle = self.create_backup()?;
        let json =
            serde_json::to_string_pretty(&bundle).map_err(|e| BackupError::Malformed(e.to_string()))?;
        std::fs::write(path, json).map_err(BackupError::Write)?;
        Ok(bundle)
    }

    /// Read and validate a backup file.
    ///
    /// # Errors
    ///
    /// Returns [`BackupError::Read`] when the file cannot be read, or
    /// [`BackupError::Malformed`] when its content is not a valid bundle.
    pub fn import_backup(&self, path: &Path) -> Result<BackupBundle, BackupError> {
        let json = std::fs::read_to_string(path).map_err(BackupError::Read)?;
        parse_bundle(&json)
    }

    /// Restore documents from a bundle.
    ///
    /// Only documents owned by `user_id` are written; documents belonging
    /// to other users are skipped silently. Returns the number of documents
    /// written.
    ///
    /// # Errors
    ///
    /// Returns [`BackupError`] on document store failure.
    pub fn restore_backup(
        &self,
        bundle: &BackupBundle,
        user_id: &str,
    ) -> Result<usize, BackupError> {
        let mut written = 0;
        for doc in &bundle.documents {
            if doc.user_id == user_id {
                self.docs.save(doc)?;
                written += 1;
            }
        }
        debug!(
            "restored {written} of {} documents for user {user_id}",
            bundle.documents.len()
        );
        Ok(written)
    }

    /// Write one auto-backup snapshot immediately and prune history.
    ///
    /// Returns the storage key of the new snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`BackupError`] on storage failure.
    pub fn snapshot(&self) -> Result<String, BackupError> {
        write_snapshot(&self.docs, &self.kv)
    }

    /// Start the recurring snapshot timer.
    ///
    /// At most one timer runs per manager: any previously started timer is
    /// stopped before the new one begins. Snapshot failures inside the
    /// timer are logged, not propagated.
    pub fn start_auto_backup(&self, interval: Duration) {
        let docs = self.docs.clone();
        let kv = Arc::clone(&self.kv);
        let handle = AutoBackupHandle::spawn(interval, move || {
            if let Err(e) = write_snapshot(&docs, &kv) {
                warn!("auto backup failed: {e}");
            }
        });
        // Replacing the slot drops the previous handle, stopping its timer
        *self.auto.lock().unwrap() = Some(handle);
    }

    /// Stop the recurring snapshot timer, if one is running.
    pub fn stop_auto_backup(&self) {
        self.auto.lock().unwrap().take();
    }

    /// All retained snapshots, newest first.
    ///
    /// Entries that fail to parse are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns [`BackupError`] on storage failure.
    pub fn get_auto_backups(&self) -> Result<Vec<(String, BackupBundle)>, BackupError> {
        let mut snapshots = Vec::new();
        // Keys sort oldest-first; walk them backwards
        for key in self.kv.keys_with_prefix(AUTO_BACKUP_PREFIX)?.into_iter().rev() {
            let Some(json) = self.kv.get(&key)? else {
                continue;
            };
            match parse_bundle(&json) {
                Ok(bundle) => snapshots.push((key, bundle)),
                Err(e) => warn!("skipping unparsable auto backup {key}: {e}"),
            }
        }
        Ok(snapshots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use quill_docs::Document;
    use quill_kv::MemoryKv;

    fn manager() -> (Arc<MemoryKv>, BackupManager) {
        let kv = Arc::new(MemoryKv::new());
        let store_kv: Arc<dyn KvStore> = Arc::clone(&kv) as Arc<dyn KvStore>;
        let docs = DocumentStore::new(Arc::clone(&store_kv));
        (kv, BackupManager::new(docs, store_kv))
    }

    #[test]
    fn test_create_backup_contains_all_documents() {
        let (kv, manager) = manager();
        let docs_kv: Arc<dyn KvStore> = Arc::clone(&kv) as Arc<dyn KvStore>;
        let docs = DocumentStore::new(docs_kv);
        docs.save(&Document::new("user-1", "A")).unwrap();
        docs.save(&Document::new("user-2", "B")).unwrap();

        let bundle = manager.create_backup().unwrap();

        assert_eq!(bundle.version, crate::BACKUP_VERSION);
        assert_eq!(bundle.documents.len(), 2);
    }

    #[test]
    fn test_export_then_import_round_trips() {
        let (kv, manager) = manager();
        let docs_kv: Arc<dyn KvStore> = Arc::clone(&kv) as Arc<dyn KvStore>;
        let docs = DocumentStore::new(docs_kv);
        docs.save(&Document::new("user-1", "Notes")).unwrap();

        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join(default_export_filename());

        let exported = manager.export_backup(&path).unwrap();
        let imported = manager.import_backup(&path).unwrap();

        assert_eq!(imported, exported);
        assert_eq!(imported.documents[0].title, "Notes");
    }

    #[test]
    fn test_import_missing_file_is_read_error() {
        let (_kv, manager) = manager();

        let result = manager.import_backup(Path::new("/nonexistent/backup.json"));

        assert!(matches!(result, Err(BackupError::Read(_))));
    }

    #[test]
    fn test_parse_bundle_rejects_missing_version() {
        let result = parse_bundle(r#"{"documents": []}"#);

        assert!(
            matches!(result, Err(BackupError::Malformed(ref msg)) if msg.contains("version"))
        );
    }

    #[test]
    fn test_parse_bundle_rejects_missing_documents() {
        let result = parse_bundle(r#"{"version": "1.0"}"#);

        assert!(
            matches!(result, Err(BackupError::Malformed(ref msg)) if msg.contains("documents"))
        );
    }

    #[test]
    fn test_parse_bundle_rejects_non_object() {
        assert!(matches!(
            parse_bundle("[1, 2, 3]"),
            Err(BackupError::Malformed(_))
        ));
        assert!(matches!(
            parse_bundle("not json at all"),
            Err(BackupError::Malformed(_))
        ));
    }

    #[test]
    fn test_restore_writes_only_matching_owner() {
        let (kv, manager) = manager();
        let docs_kv: Arc<dyn KvStore> = Arc::clone(&kv) as Arc<dyn KvStore>;
        let docs = DocumentStore::new(docs_kv);

        let bundle = BackupBundle::new(vec![
            Document::new("user-1", "Mine"),
            Document::new("user-2", "Theirs"),
            Document::new("user-1", "Also mine"),
        ]);

        let written = manager.restore_backup(&bundle, "user-1").unwrap();

        assert_eq!(written, 2);
        let restored = docs.list().unwrap();
        assert_eq!(restored.len(), 2);
        assert!(restored.iter().all(|d| d.user_id == "user-1"));
    }

    #[test]
    fn test_snapshot_retention_keeps_five_most_recent() {
        let (kv, manager) = manager();

        let mut keys = Vec::new();
        for _ in 0..6 {
            keys.push(manager.snapshot().unwrap());
        }

        let remaining = kv.keys_with_prefix(AUTO_BACKUP_PREFIX).unwrap();
        assert_eq!(remaining.len(), MAX_AUTO_BACKUPS);
        // The first (oldest) snapshot is gone, the latest five remain
        assert_eq!(remaining, keys[1..].to_vec());
    }

    #[test]
    fn test_get_auto_backups_newest_first() {
        let (_kv, manager) = manager();

        let first = manager.snapshot().unwrap();
        let second = manager.snapshot().unwrap();

        let snapshots = manager.get_auto_backups().unwrap();

        assert_eq!(snapshots.len(), 2);
        assert_eq!(snapshots[0].0, second);
        assert_eq!(snapshots[1].0, first);
    }

    #[test]
    fn test_get_auto_backups_skips_unparsable_entries() {
        let (kv, manager) = manager();
        manager.snapshot().unwrap();
        kv.set("auto_backup_0000000000000", "garbage").unwrap();

        let snapshots = manager.get_auto_backups().unwrap();

        assert_eq!(snapshots.len(), 1);
    }

    #[test]
    fn test_auto_backup_timer_writes_snapshots() {
        let (kv, manager) = manager();

        manager.start_auto_backup(Duration::from_millis(10));
        std::thread::sleep(Duration::from_millis(100));
        manager.stop_auto_backup();

        let count = kv.keys_with_prefix(AUTO_BACKUP_PREFIX).unwrap().len();
        assert!(count >= 1);
        assert!(count <= MAX_AUTO_BACKUPS);
    }

    #[test]
    fn test_restart_replaces_previous_timer() {
        let (kv, manager) = manager();

        manager.start_auto_backup(Duration::from_secs(60));
        // Restarting must not leave the first timer running alongside
        manager.start_auto_backup(Duration::from_millis(10));
        std::thread::sleep(Duration::from_millis(50));
        manager.stop_auto_backup();
        std::thread::sleep(Duration::from_millis(30));
        let after_stop = kv.keys_with_prefix(AUTO_BACKUP_PREFIX).unwrap().len();
        std::thread::sleep(Duration::from_millis(50));

        // No snapshots written after stop
        assert_eq!(
            kv.keys_with_prefix(AUTO_BACKUP_PREFIX).unwrap().len(),
            after_stop
        );
    }

    #[test]
    fn test_default_interval_is_ten_minutes() {
        assert_eq!(DEFAULT_AUTO_BACKUP_INTERVAL, Duration::from_secs(600));
    }
}
