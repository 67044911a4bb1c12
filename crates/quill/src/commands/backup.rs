//! `quill backup` command implementations.

use std::path::PathBuf;

use clap::{Args, Subcommand};
use quill_backup::default_export_filename;

use crate::commands::{CommonArgs, open_backup_manager};
use crate::error::CliError;
use crate::output::Output;

/// Backup management commands.
#[derive(Subcommand)]
pub(crate) enum BackupCommand {
    /// Export all documents to a JSON backup file.
    Export(ExportArgs),
    /// Validate a backup file and restore its documents.
    Import(ImportArgs),
    /// List retained auto-backup snapshots.
    Snapshots(SnapshotsArgs),
}

impl BackupCommand {
    /// Execute the backup subcommand.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or the backup operation
    /// fails.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        match self {
            Self::Export(args) => args.execute(),
            Self::Import(args) => args.execute(),
            Self::Snapshots(args) => args.execute(),
        }
    }
}

/// Arguments for the backup export command.
#[derive(Args)]
pub(crate) struct ExportArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Output file (default: quill-backup-<date>.json).
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl ExportArgs {
    fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let config = self.common.load_config()?;
        let manager = open_backup_manager(&config);

        let path = self
            .output
            .unwrap_or_else(|| PathBuf::from(default_export_filename()));
        let bundle = manager.export_backup(&path)?;

        output.success(&format!(
            "Exported {} documents to {}",
            bundle.documents.len(),
            path.display()
        ));
        Ok(())
    }
}

/// Arguments for the backup import command.
#[derive(Args)]
pub(crate) struct ImportArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Backup file to import.
    file: PathBuf,

    /// Restore documents owned by this user id. Without it the file is
    /// only validated.
    #[arg(short, long)]
    user: Option<String>,
}

impl ImportArgs {
    fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let config = self.common.load_config()?;
        let manager = open_backup_manager(&config);

        let bundle = manager.import_backup(&self.file)?;
        output.info(&format!(
            "Backup version {} from {} with {} documents",
            bundle.version,
            bundle.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
            bundle.documents.len()
        ));

        match self.user {
            Some(user_id) => {
                let written = manager.restore_backup(&bundle, &user_id)?;
                let skipped = bundle.documents.len() - written;
                if skipped > 0 {
                    output.warning(&format!(
                        "Skipped {skipped} documents owned by other users"
                    ));
                }
                output.success(&format!("Restored {written} documents for {user_id}"));
            }
            None => output.success("Backup file is valid (pass --user to restore)"),
        }
        Ok(())
    }
}

/// Arguments for the backup snapshots command.
#[derive(Args)]
pub(crate) struct SnapshotsArgs {
    #[command(flatten)]
    common: CommonArgs,
}

impl SnapshotsArgs {
    fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let config = self.common.load_config()?;
        let manager = open_backup_manager(&config);

        let snapshots = manager.get_auto_backups()?;
        if snapshots.is_empty() {
            output.info("No auto-backup snapshots found");
            return Ok(());
        }

        output.info(&format!("{} snapshots (newest first):", snapshots.len()));
        for (key, bundle) in snapshots {
            output.info(&format!(
                "  {key}  {}  {} documents",
                bundle.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
                bundle.documents.len()
            ));
        }
        Ok(())
    }
}
