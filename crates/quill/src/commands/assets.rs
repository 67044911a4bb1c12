//! `quill assets` command implementations.

use clap::{Args, Subcommand};
use quill_assets::AssetStore;

use crate::commands::CommonArgs;
use crate::error::CliError;
use crate::output::Output;

/// Asset store commands.
#[derive(Subcommand)]
pub(crate) enum AssetsCommand {
    /// List stored assets with their metadata.
    List(ListArgs),
}

impl AssetsCommand {
    /// Execute the assets subcommand.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or the asset store fails.
    pub(crate) async fn execute(self) -> Result<(), CliError> {
        match self {
            Self::List(args) => args.execute().await,
        }
    }
}

/// Arguments for the assets list command.
#[derive(Args)]
pub(crate) struct ListArgs {
    #[command(flatten)]
    common: CommonArgs,
}

impl ListArgs {
    async fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let config = self.common.load_config()?;

        let db_path = config.data_resolved.asset_db_path();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let store = AssetStore::open(&db_path).await?;

        let assets = store.list().await?;
        if assets.is_empty() {
            output.info("No assets stored");
            return Ok(());
        }

        output.info(&format!("{} assets:", assets.len()));
        for asset in assets {
            output.info(&format!(
                "  {}  {}  {}  {} bytes  {}",
                asset.id,
                asset.name,
                asset.mime_type,
                asset.size,
                asset.created_at.format("%Y-%m-%d %H:%M:%S UTC")
            ));
        }
        Ok(())
    }
}
