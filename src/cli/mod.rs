//! CLI command implementations.

pub mod download;
pub mod error;
pub mod fetch;
pub mod reconcile;

pub use download::DownloadArgs;
pub use error::CliError;
pub use fetch::FetchArgs;
pub use reconcile::ReconcileArgs;

use clap::{Parser, Subcommand};

/// Batch downloader for xeno-canto recording metadata and audio.
#[derive(Debug, Parser)]
#[command(name = "xenocanto-downloader", version, about)]
pub struct Cli {
    /// Command to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Fetch recording metadata for every species in the roster
    Fetch(FetchArgs),
    /// Download audio files for all cached metadata
    Download(DownloadArgs),
    /// Write availability results back into the roster
    Reconcile(ReconcileArgs),
}
