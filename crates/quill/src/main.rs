//! Quill CLI - Documentation persistence tooling.
//!
//! Provides commands for:
//! - `backup export`: Export all documents to a JSON backup file
//! - `backup import`: Validate a backup file and restore documents
//! - `backup snapshots`: List retained auto-backup snapshots
//! - `assets list`: List stored assets

mod commands;
mod error;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{AssetsCommand, BackupCommand};
use output::Output;

/// Quill - Documentation persistence tooling.
#[derive(Parser)]
#[command(name = "quill", version, about)]
struct Cli {
    /// Enable verbose output (show retry and storage logs).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Backup management commands.
    #[command(subcommand)]
    Backup(BackupCommand),
    /// Asset store commands.
    #[command(subcommand)]
    Assets(AssetsCommand),
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if cli.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let result = match cli.command {
        Commands::Backup(cmd) => cmd.execute(),
        Commands::Assets(cmd) => {
            let rt = tokio::runtime::Runtime::new().expect("Failed to create tokio runtime");
            rt.block_on(cmd.execute())
        }
    };

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}
