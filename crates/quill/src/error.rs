//! CLI error types.

use quill_assets::AssetError;
use quill_backup::BackupError;
use quill_config::ConfigError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Asset(#[from] AssetError),

    #[error("{0}")]
    Backup(#[from] BackupError),
}
