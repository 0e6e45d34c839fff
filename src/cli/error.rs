//! CLI error type.

use crate::downloader::DownloadError;
use crate::fetcher::FetchError;
use crate::output::OutputError;
use crate::roster::RosterError;

/// Errors surfaced by CLI commands.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Invalid or missing argument
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Metadata fetch failed
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Download setup failed
    #[error(transparent)]
    Download(#[from] DownloadError),

    /// Roster could not be read or written
    #[error(transparent)]
    Roster(#[from] RosterError),

    /// Summary output failed
    #[error(transparent)]
    Output(#[from] OutputError),

    /// Local filesystem failure
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
