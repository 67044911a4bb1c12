//! Binary asset storage for Quill.
//!
//! Assets are binary files (images, attachments) associated with documents
//! but stored separately from document text, in a single-table `SQLite`
//! database keyed by asset id.
//!
//! # Architecture
//!
//! - [`AssetStore`]: explicitly constructed, owned database handle. There is
//!   no process-wide singleton; callers create a store and pass it where it
//!   is needed, which also allows multiple isolated instances in tests.
//! - [`encode_data_url`] / [`decode_data_url`]: binary-to-text interchange
//!   for contexts that cannot hold binary handles directly.
//!
//! # Durability
//!
//! Every write runs inside one transaction and the operation returns only
//! after the commit completes, so a successful result means the write is on
//! disk. Failures roll the transaction back and surface the original
//! database error, never a generic abort error.
//!
//! # Example
//!
//! ```ignore
//! use quill_assets::{AssetStore, SaveOptions};
//!
//! let store = AssetStore::open(Path::new(".quill/assets.db")).await?;
//! let meta = store.save(bytes, SaveOptions::new().name("logo.png").mime_type("image/png")).await?;
//! let record = store.get(&meta.id).await?;
//! ```

mod data_url;
mod store;

pub use data_url::{decode_data_url, encode_data_url};
pub use store::{AssetMetadata, AssetRecord, AssetStore, SaveOptions};

/// Error from asset store operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum AssetError {
    /// Database failure. Carries the original `sqlx` error so callers can
    /// inspect the underlying cause.
    #[error("asset database error")]
    Database(#[from] sqlx::Error),

    /// I/O failure while materializing an asset to a temporary file.
    #[error("asset I/O error")]
    Io(#[from] std::io::Error),

    /// Input is not a base64 data URL.
    #[error("invalid data URL")]
    InvalidDataUrl,

    /// Data URL payload is not valid base64.
    #[error("base64 decode error")]
    Base64(#[from] base64::DecodeError),

    /// Payload length does not fit the database size column.
    #[error("asset payload too large: {0} bytes")]
    PayloadTooLarge(usize),
}
