//! SQLite-backed asset store.

use std::collections::HashMap;
use std::io::Write as _;
use std::path::Path;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tempfile::NamedTempFile;
use tracing::debug;
use uuid::Uuid;

use crate::AssetError;
use crate::data_url::encode_data_url;

/// Single-table schema. Identity is the asset id; uniqueness is enforced by
/// the primary key.
const SCHEMA: &str = "\
CREATE TABLE IF NOT EXISTS assets (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    mime_type TEXT NOT NULL,
    size INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    data BLOB NOT NULL
)";

/// Columns shared by metadata queries. Never includes the payload.
const META_COLUMNS: &str = "id, name, mime_type, size, created_at, updated_at";

/// Payload length as the stored size, rejecting lengths the size column
/// cannot represent.
fn payload_size(len: usize) -> Result<i64, AssetError> {
    i64::try_from(len).map_err(|_| AssetError::PayloadTooLarge(len))
}

/// Asset metadata without the binary payload.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct AssetMetadata {
    /// Unique asset id.
    pub id: String,
    /// Original filename.
    pub name: String,
    /// MIME type of the payload.
    pub mime_type: String,
    /// Payload size in bytes.
    pub size: i64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last write timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Full asset record including the binary payload.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct AssetRecord {
    /// Unique asset id.
    pub id: String,
    /// Original filename.
    pub name: String,
    /// MIME type of the payload.
    pub mime_type: String,
    /// Payload size in bytes.
    pub size: i64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last write timestamp.
    pub updated_at: DateTime<Utc>,
    /// Binary payload.
    pub data: Vec<u8>,
}

impl AssetRecord {
    /// Metadata view of this record.
    #[must_use]
    pub fn metadata(&self) -> AssetMetadata {
        AssetMetadata {
            id: self.id.clone(),
            name: self.name.clone(),
            mime_type: self.mime_type.clone(),
            size: self.size,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Options for [`AssetStore::save`].
///
/// All fields are optional. A missing id generates a fresh UUID; a missing
/// name or MIME type falls back to a generic default.
#[derive(Debug, Default, Clone)]
pub struct SaveOptions {
    id: Option<String>,
    name: Option<String>,
    mime_type: Option<String>,
    created_at: Option<DateTime<Utc>>,
}

impl SaveOptions {
    /// Create empty options (generated id, default name and MIME type).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a caller-supplied id. Saving to an existing id overwrites it.
    #[must_use]
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the asset filename.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the payload MIME type.
    #[must_use]
    pub fn mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Override the creation timestamp.
    ///
    /// Without this, saving over an existing id preserves its original
    /// `created_at`, and a brand-new id is stamped with the current time.
    #[must_use]
    pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }
}

/// Binary asset store over a single-table `SQLite` database.
///
/// The store is an owned handle: construct it once and pass it (or clone it,
/// the pool is shared) to whoever needs asset access. Every operation runs
/// in its own transaction and returns only after the transaction completes,
/// so callers observing success are guaranteed the write is committed.
#[derive(Clone)]
pub struct AssetStore {
    pool: SqlitePool,
}

impl AssetStore {
    /// Open or create the asset database at `path`.
    ///
    /// The schema is created on first open. Open failures are returned to
    /// the caller and are not retried; the caller decides whether to
    /// construct a new store.
    ///
    /// # Errors
    ///
    /// Returns [`AssetError::Database`] when the database cannot be opened
    /// or the schema cannot be created.
    pub async fn open(path: &Path) -> Result<Self, AssetError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        debug!("opened asset database at {}", path.display());
        Self::with_pool(pool).await
    }

    /// Open an isolated in-memory store.
    ///
    /// Each call creates an independent database, which is what tests want.
    ///
    /// # Errors
    ///
    /// Returns [`AssetError::Database`] when the database cannot be created.
    pub async fn open_in_memory() -> Result<Self, AssetError> {
        let options = SqliteConnectOptions::new().in_memory(true);
        // One connection, or each pooled connection would see its own
        // private in-memory database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self, AssetError> {
        sqlx::query(SCHEMA).execute(&pool).await?;
        Ok(Self { pool })
    }

    /// Save a binary payload, overwriting any existing asset with the same id.
    ///
    /// Last write wins on matching id. The existing `created_at` is
    /// preserved unless [`SaveOptions::created_at`] overrides it;
    /// `updated_at` is always refreshed. The returned metadata reflects the
    /// committed row.
    ///
    /// # Errors
    ///
    /// Returns [`AssetError::Database`] on any database failure; the
    /// transaction is rolled back and the original error is surfaced.
    /// Returns [`AssetError::PayloadTooLarge`] when the payload length
    /// cannot be represented in the size column.
    pub async fn save(
        &self,
        data: &[u8],
        options: SaveOptions,
    ) -> Result<AssetMetadata, AssetError> {
        let mut tx = self.pool.begin().await?;

        let id = options.id.unwrap_or_else(|| Uuid::new_v4().to_string());
        let now = Utc::now();

        let existing_created_at: Option<DateTime<Utc>> =
            sqlx::query_scalar("SELECT created_at FROM assets WHERE id = ?")
                .bind(&id)
                .fetch_optional(&mut *tx)
                .await?;

        // Explicit override wins, then the existing record, then now
        let created_at = options
            .created_at
            .or(existing_created_at)
            .unwrap_or(now);

        let metadata = AssetMetadata {
            id,
            name: options.name.unwrap_or_else(|| "untitled".to_owned()),
            mime_type: options
                .mime_type
                .unwrap_or_else(|| "application/octet-stream".to_owned()),
            size: payload_size(data.len())?,
            created_at,
            updated_at: now,
        };

        sqlx::query(
            "INSERT OR REPLACE INTO assets (id, name, mime_type, size, created_at, updated_at, data) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&metadata.id)
        .bind(&metadata.name)
        .bind(&metadata.mime_type)
        .bind(metadata.size)
        .bind(metadata.created_at)
        .bind(metadata.updated_at)
        .bind(data)
        .execute(&mut *tx)
        .await?;

        // Success is reported only once the commit is durable
        tx.commit().await?;

        debug!("saved asset {} ({} bytes)", metadata.id, metadata.size);
        Ok(metadata)
    }

    /// Fetch a full asset record by id.
    ///
    /// Returns `Ok(None)` when the id does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`AssetError::Database`] on database failure.
    pub async fn get(&self, id: &str) -> Result<Option<AssetRecord>, AssetError> {
        let record = sqlx::query_as::<_, AssetRecord>(
            "SELECT id, name, mime_type, size, created_at, updated_at, data \
             FROM assets WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    /// Fetch an asset payload encoded as a base64 data URL.
    ///
    /// Returns `Ok(None)` when the id does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`AssetError::Database`] on database failure.
    pub async fn get_as_data_url(&self, id: &str) -> Result<Option<String>, AssetError> {
        Ok(self
            .get(id)
            .await?
            .map(|r| encode_data_url(&r.mime_type, &r.data)))
    }

    /// Materialize an asset payload to a temporary file.
    ///
    /// The file lives as long as the returned handle; dropping it deletes
    /// the file. This is the handoff mechanism for consumers that need a
    /// real path (external viewers, uploads).
    ///
    /// Returns `Ok(None)` when the id does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`AssetError::Database`] on database failure or
    /// [`AssetError::Io`] if the temporary file cannot be written.
    pub async fn get_as_temp_file(&self, id: &str) -> Result<Option<NamedTempFile>, AssetError> {
        let Some(record) = self.get(id).await? else {
            return Ok(None);
        };
        let mut file = NamedTempFile::new()?;
        file.write_all(&record.data)?;
        file.flush()?;
        Ok(Some(file))
    }

    /// Delete an asset by id.
    ///
    /// Deleting a missing id is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`AssetError::Database`] on database failure.
    pub async fn delete(&self, id: &str) -> Result<(), AssetError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM assets WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    /// List metadata for all stored assets, oldest first.
    ///
    /// Never loads payload bytes.
    ///
    /// # Errors
    ///
    /// Returns [`AssetError::Database`] on database failure.
    pub async fn list(&self) -> Result<Vec<AssetMetadata>, AssetError> {
        let rows = sqlx::query_as::<_, AssetMetadata>(&format!(
            "SELECT {META_COLUMNS} FROM assets ORDER BY created_at, id"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Fetch several assets by id in one consistent snapshot.
    ///
    /// Missing ids are simply absent from the returned map.
    ///
    /// # Errors
    ///
    /// Returns [`AssetError::Database`] on database failure.
    pub async fn get_many(
        &self,
        ids: &[String],
    ) -> Result<HashMap<String, AssetRecord>, AssetError> {
        let mut tx = self.pool.begin().await?;
        let mut found = HashMap::new();
        for id in ids {
            let record = sqlx::query_as::<_, AssetRecord>(
                "SELECT id, name, mime_type, size, created_at, updated_at, data \
                 FROM assets WHERE id = ?",
            )
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
            if let Some(record) = record {
                found.insert(record.id.clone(), record);
            }
        }
        tx.commit().await?;
        Ok(found)
    }

    /// Remove every stored asset.
    ///
    /// # Errors
    ///
    /// Returns [`AssetError::Database`] on database failure.
    pub async fn clear(&self) -> Result<(), AssetError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM assets").execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(())
    }
}
