//! CLI command implementations.

pub(crate) mod assets;
pub(crate) mod backup;

pub(crate) use assets::AssetsCommand;
pub(crate) use backup::BackupCommand;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use quill_backup::BackupManager;
use quill_config::{CliSettings, Config};
use quill_docs::DocumentStore;
use quill_kv::{FileKv, KvStore};

use crate::error::CliError;

/// Arguments shared by all commands that touch the local data directory.
#[derive(Args)]
pub(crate) struct CommonArgs {
    /// Path to configuration file (default: auto-discover quill.toml).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Data directory (overrides config).
    #[arg(short, long)]
    pub data_dir: Option<PathBuf>,
}

impl CommonArgs {
    /// Load configuration with these arguments applied.
    pub(crate) fn load_config(&self) -> Result<Config, CliError> {
        let settings = CliSettings {
            data_dir: self.data_dir.clone(),
            ..CliSettings::default()
        };
        Ok(Config::load(self.config.as_deref(), Some(&settings))?)
    }
}

/// Build a backup manager over the configured data directory.
pub(crate) fn open_backup_manager(config: &Config) -> BackupManager {
    let kv: Arc<dyn KvStore> = Arc::new(FileKv::new(config.data_resolved.kv_dir()));
    let docs = DocumentStore::new(Arc::clone(&kv));
    BackupManager::new(docs, kv)
}
