//! Species roster: CSV loading and reconciliation against the cache.
//!
//! The roster is the tabular list of species under study. Loading keeps only
//! the columns the pipeline needs; reconciliation writes availability results
//! back while preserving every other column untouched.

use crate::cache::PageCache;
use csv::StringRecord;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Roster column holding the unique id.
pub const COL_BIRD_ID: &str = "birdId";
/// Roster column holding the display name.
pub const COL_BIRD_NAME: &str = "birdName";
/// Roster column holding the scientific name.
pub const COL_SCIENTIFIC_NAME: &str = "scientificName";

/// Reconciliation column: was the species found on xeno-canto.
pub const COL_FOUND: &str = "found_in_xenocanto";
/// Reconciliation column: reported recording count.
pub const COL_RECORDINGS: &str = "xenocanto_recordings";

/// Roster errors.
#[derive(Debug, thiserror::Error)]
pub enum RosterError {
    /// Roster file could not be read or written
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Roster file is not valid CSV
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

/// One usable roster row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeciesEntry {
    /// Unique id from the roster
    pub bird_id: String,
    /// Display name
    pub bird_name: String,
    /// Scientific name used for API queries and cache keys
    pub scientific_name: String,
}

/// Load the roster, skipping rows without a scientific name.
///
/// Column order is irrelevant; columns are located by header name. Rows with
/// an empty or missing scientific name are logged and skipped - they cannot
/// be queried.
pub fn load_roster(path: &Path) -> Result<Vec<SpeciesEntry>, RosterError> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();
    let id_idx = column_index(&headers, COL_BIRD_ID);
    let name_idx = column_index(&headers, COL_BIRD_NAME);
    let sci_idx = column_index(&headers, COL_SCIENTIFIC_NAME);

    let mut entries = Vec::new();
    for (row_no, record) in reader.records().enumerate() {
        let record = record?;
        let scientific_name = field(&record, sci_idx);
        if scientific_name.is_empty() {
            warn!("skipping roster row {} with no scientific name", row_no + 1);
            continue;
        }
        entries.push(SpeciesEntry {
            bird_id: field(&record, id_idx),
            bird_name: field(&record, name_idx),
            scientific_name,
        });
    }

    info!("loaded {} species from {}", entries.len(), path.display());
    Ok(entries)
}

/// Reconciliation counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    /// Total roster rows
    pub total: usize,
    /// Species with cached recordings
    pub found: usize,
    /// Species searched but without recordings
    pub not_found: usize,
    /// Species with no cache entry at all
    pub not_searched: usize,
}

/// Update the roster with availability columns computed from the cache.
///
/// For each row: a cached recording count marks the species `Yes`; a page-1
/// cache entry with no recordings marks it `No`; no cache entry at all marks
/// it `Not searched`. All original columns pass through unchanged; the two
/// result columns are appended unless they already exist, in which case they
/// are overwritten in place.
pub fn reconcile_roster(
    input: &Path,
    output: &Path,
    cache: &PageCache,
) -> Result<ReconcileStats, RosterError> {
    let counts = cache.species_recording_counts();
    info!("found {} species with cached data", counts.len());

    let mut reader = csv::Reader::from_path(input)?;
    let mut headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let sci_idx = headers.iter().position(|h| h == COL_SCIENTIFIC_NAME);

    let found_idx = ensure_column(&mut headers, COL_FOUND);
    let recordings_idx = ensure_column(&mut headers, COL_RECORDINGS);

    let mut stats = ReconcileStats::default();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let mut row: Vec<String> = record.iter().map(str::to_string).collect();
        row.resize(headers.len(), String::new());

        let scientific_name = sci_idx
            .and_then(|idx| record.get(idx))
            .unwrap_or("")
            .to_string();

        let (found, recordings) = match counts.get(&scientific_name) {
            Some(count) => {
                stats.found += 1;
                ("Yes".to_string(), count.to_string())
            }
            // A page-1 cache entry proves the species was searched even
            // though nothing came back.
            None if !scientific_name.is_empty() && cache.contains(&scientific_name, 1) => {
                stats.not_found += 1;
                ("No".to_string(), "0".to_string())
            }
            None => {
                stats.not_searched += 1;
                ("Not searched".to_string(), String::new())
            }
        };
        row[found_idx] = found;
        row[recordings_idx] = recordings;

        stats.total += 1;
        rows.push(row);
    }

    // Everything is in memory now; release the reader so in-place updates
    // (output == input) do not truncate a file that is still open.
    drop(reader);

    let mut writer = csv::Writer::from_path(output)?;
    writer.write_record(&headers)?;
    for row in &rows {
        writer.write_record(row)?;
    }
    writer.flush()?;

    info!(
        "reconciled {} rows: {} found, {} not found, {} not searched -> {}",
        stats.total,
        stats.found,
        stats.not_found,
        stats.not_searched,
        output.display()
    );
    Ok(stats)
}

/// Copy the roster to a timestamped backup next to it, returning the backup
/// path. Used before in-place reconciliation.
pub fn backup_roster(path: &Path) -> Result<PathBuf, RosterError> {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("roster");
    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let backup_name = format!("{stem}_backup_{timestamp}.csv");
    let backup = match path.parent() {
        Some(parent) => parent.join(backup_name),
        None => PathBuf::from(backup_name),
    };
    std::fs::copy(path, &backup)?;
    info!("created backup: {}", backup.display());
    Ok(backup)
}

fn column_index(headers: &StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h == name)
}

fn field(record: &StringRecord, idx: Option<usize>) -> String {
    idx.and_then(|i| record.get(i)).unwrap_or("").to_string()
}

fn ensure_column(headers: &mut Vec<String>, name: &str) -> usize {
    match headers.iter().position(|h| h == name) {
        Some(idx) => idx,
        None => {
            headers.push(name.to_string());
            headers.len() - 1
        }
    }
}
