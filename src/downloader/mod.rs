//! Audio download pipeline: size-bounded streaming downloads, durable
//! size-limit markers, and a per-species download ledger.

pub mod audio;
pub mod ledger;

pub use audio::AudioDownloader;
pub use ledger::{DownloadLedger, ItemStatus};

/// File extension of the zero-byte marker recording a permanent size-limit
/// rejection. Shares the stem of the file it refers to.
pub const MARKER_EXTENSION: &str = "size_limit_exceeded";

/// Terminal outcome of processing one recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// The file was fetched and stored in this run
    Downloaded,
    /// The target file already existed; no network call was made
    AlreadyPresent,
    /// The file exceeds the size ceiling, now or in a previous run
    SizeExceeded,
    /// The download failed; it will be attempted again next run
    Error,
}

/// Run-wide download counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DownloadTotals {
    /// Files fetched in this run
    pub downloaded: u64,
    /// Files skipped because they already existed
    pub already_present: u64,
    /// Files rejected for size, in this run or a previous one
    pub size_exceeded: u64,
    /// Failed downloads
    pub errors: u64,
}

impl DownloadTotals {
    /// Tally one outcome.
    pub fn record(&mut self, outcome: DownloadOutcome) {
        match outcome {
            DownloadOutcome::Downloaded => self.downloaded += 1,
            DownloadOutcome::AlreadyPresent => self.already_present += 1,
            DownloadOutcome::SizeExceeded => self.size_exceeded += 1,
            DownloadOutcome::Error => self.errors += 1,
        }
    }
}

/// Download errors (internal to the transfer; callers see [`DownloadOutcome`]).
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// Network-level failure or unexpected HTTP status
    #[error("network error: {0}")]
    Network(String),

    /// The file exceeds the configured size ceiling
    #[error("file exceeds size ceiling ({limit} bytes), declared length {declared:?}")]
    SizeExceeded {
        /// Configured ceiling in bytes
        limit: u64,
        /// Declared content-length, if the server sent one
        declared: Option<u64>,
    },

    /// The transfer finished but produced no data
    #[error("downloaded file is empty or missing")]
    EmptyFile,

    /// Local filesystem failure
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
