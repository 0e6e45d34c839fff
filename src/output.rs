//! Fetch summary output writer.

use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::{debug, info};

const DEFAULT_BUFFER_SIZE: usize = 8192;

/// Output errors.
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    /// Local filesystem failure
    #[error("io error: {0}")]
    Io(String),

    /// CSV serialization failure
    #[error("csv error: {0}")]
    Csv(String),
}

/// Result type for output operations.
pub type OutputResult<T> = Result<T, OutputError>;

/// One summary row: the per-species outcome of a fetch run.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SpeciesSummaryRow {
    /// Scientific name
    pub species: String,
    /// Recordings accumulated across cached and fetched pages
    pub recordings_fetched: usize,
    /// Pages fetched over the network
    pub pages_requested: u32,
}

/// CSV writer for the fetch summary, one row per species.
pub struct CsvSummaryWriter {
    writer: csv::Writer<BufWriter<File>>,
    rows_written: u64,
}

impl CsvSummaryWriter {
    /// Create the summary file, including any missing parent directories.
    pub fn new<P: AsRef<Path>>(path: P) -> OutputResult<Self> {
        let path = path.as_ref();
        info!("creating summary writer: {}", path.display());

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| OutputError::Io(format!("failed to create directory: {e}")))?;
            }
        }

        let file = File::create(path)
            .map_err(|e| OutputError::Io(format!("failed to create file: {e}")))?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(BufWriter::with_capacity(DEFAULT_BUFFER_SIZE, file));

        // Header goes out up front so even an empty run leaves a parseable file.
        writer
            .write_record(["species", "recordings_fetched", "pages_requested"])
            .map_err(|e| OutputError::Csv(format!("failed to write header: {e}")))?;

        Ok(Self {
            writer,
            rows_written: 0,
        })
    }

    /// Write one species row.
    pub fn write_row(&mut self, row: &SpeciesSummaryRow) -> OutputResult<()> {
        self.writer
            .serialize(row)
            .map_err(|e| OutputError::Csv(format!("failed to write summary row: {e}")))?;
        self.rows_written += 1;
        Ok(())
    }

    /// Rows written so far.
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Flush buffered rows to disk.
    pub fn flush(&mut self) -> OutputResult<()> {
        self.writer
            .flush()
            .map_err(|e| OutputError::Io(format!("failed to flush: {e}")))
    }

    /// Flush, sync and close the writer.
    pub fn close(mut self) -> OutputResult<()> {
        debug!("closing summary writer: {} rows", self.rows_written);
        self.flush()?;

        let buf_writer = self
            .writer
            .into_inner()
            .map_err(|e| OutputError::Io(format!("failed to get inner writer: {e}")))?;
        let file = buf_writer
            .into_inner()
            .map_err(|e| OutputError::Io(format!("failed to get file handle: {e}")))?;
        file.sync_all()
            .map_err(|e| OutputError::Io(format!("failed to sync file: {e}")))?;

        info!("summary written: {} rows", self.rows_written);
        Ok(())
    }
}
