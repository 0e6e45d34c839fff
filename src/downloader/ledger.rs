//! Per-species download ledger.
//!
//! Each species directory carries a `download_ledger.json` index mapping
//! recording id to its last known status. The filesystem stays the ground
//! truth - the presence of the media file or its size-limit marker decides
//! what happens next - and the ledger mirrors it so summaries are a map
//! lookup instead of a directory scan. [`sync_with_dir`](DownloadLedger::sync_with_dir)
//! drops entries the filesystem no longer backs.

use crate::downloader::{DownloadOutcome, MARKER_EXTENSION};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Ledger filename inside each species directory.
pub const LEDGER_FILE: &str = "download_ledger.json";

const SCHEMA_VERSION: u32 = 1;

/// Per-item status, mirroring [`DownloadOutcome`] plus a pre-attempt state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    /// Known from metadata but not yet attempted
    Pending,
    /// Fetched and stored
    Downloaded,
    /// Found on disk before any attempt
    AlreadyPresent,
    /// Permanently rejected for size
    SizeExceeded,
    /// Last attempt failed; will be retried next run
    Error,
}

impl From<DownloadOutcome> for ItemStatus {
    fn from(outcome: DownloadOutcome) -> Self {
        match outcome {
            DownloadOutcome::Downloaded => ItemStatus::Downloaded,
            DownloadOutcome::AlreadyPresent => ItemStatus::AlreadyPresent,
            DownloadOutcome::SizeExceeded => ItemStatus::SizeExceeded,
            DownloadOutcome::Error => ItemStatus::Error,
        }
    }
}

/// One ledger entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemRecord {
    /// Last known status
    pub status: ItemStatus,
    /// Target filename within the species directory
    pub filename: String,
    /// Last update, Unix milliseconds
    pub updated_at: i64,
}

#[derive(Debug, Serialize, Deserialize)]
struct LedgerFile {
    schema_version: u32,
    entries: BTreeMap<String, ItemRecord>,
}

/// Ledger errors.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Local filesystem failure
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Ledger could not be serialized
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Status index for one species directory.
#[derive(Debug)]
pub struct DownloadLedger {
    dir: PathBuf,
    entries: BTreeMap<String, ItemRecord>,
}

impl DownloadLedger {
    /// Load the ledger for a species directory, or start empty.
    ///
    /// A missing file is a fresh ledger; an unreadable or wrong-version file
    /// is logged and replaced (the filesystem is authoritative, so nothing
    /// is lost beyond the index).
    pub fn load_or_default(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let path = dir.join(LEDGER_FILE);
        let entries = match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<LedgerFile>(&contents) {
                Ok(file) if file.schema_version == SCHEMA_VERSION => file.entries,
                Ok(file) => {
                    warn!(
                        "ledger {} has schema version {}, starting fresh",
                        path.display(),
                        file.schema_version
                    );
                    BTreeMap::new()
                }
                Err(e) => {
                    warn!("unreadable ledger {}: {}", path.display(), e);
                    BTreeMap::new()
                }
            },
            Err(_) => BTreeMap::new(),
        };
        Self { dir, entries }
    }

    /// Drop entries the filesystem no longer backs.
    ///
    /// A `Downloaded`/`AlreadyPresent` entry whose file vanished, or a
    /// `SizeExceeded` entry whose marker vanished, is removed so the item is
    /// re-attempted next time it is seen.
    pub fn sync_with_dir(&mut self) {
        let dir = self.dir.clone();
        self.entries.retain(|id, record| {
            let target = dir.join(&record.filename);
            let backed = match record.status {
                ItemStatus::Downloaded | ItemStatus::AlreadyPresent => target.exists(),
                ItemStatus::SizeExceeded => {
                    target.with_extension(MARKER_EXTENSION).exists()
                }
                ItemStatus::Pending | ItemStatus::Error => true,
            };
            if !backed {
                debug!("ledger entry {} no longer backed by filesystem, dropping", id);
            }
            backed
        });
    }

    /// Record the latest status for a recording.
    pub fn record(&mut self, id: &str, filename: &str, status: ItemStatus) {
        self.entries.insert(
            id.to_string(),
            ItemRecord {
                status,
                filename: filename.to_string(),
                updated_at: chrono::Utc::now().timestamp_millis(),
            },
        );
    }

    /// Last known status for a recording.
    pub fn status(&self, id: &str) -> Option<ItemStatus> {
        self.entries.get(id).map(|record| record.status)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the ledger has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Count entries with the given status.
    pub fn count(&self, status: ItemStatus) -> usize {
        self.entries
            .values()
            .filter(|record| record.status == status)
            .count()
    }

    /// Persist the ledger atomically next to the files it describes.
    pub fn save(&self) -> Result<(), LedgerError> {
        let file = LedgerFile {
            schema_version: SCHEMA_VERSION,
            entries: self.entries.clone(),
        };
        let json = serde_json::to_string_pretty(&file)
            .map_err(|e| LedgerError::Serialization(e.to_string()))?;

        let mut temp = tempfile::NamedTempFile::new_in(&self.dir)?;
        temp.write_all(json.as_bytes())?;
        temp.flush()?;
        temp.persist(self.dir.join(LEDGER_FILE))
            .map_err(|e| LedgerError::Io(e.error))?;
        Ok(())
    }
}
