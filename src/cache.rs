//! On-disk cache of API responses, one file per (species, page).
//!
//! Cache files hold the raw JSON response body under a deterministic key:
//! `<sanitized species>_page<N>.json`. Entries are only ever written once;
//! a present key is always trusted over the network.

use crate::RecordingsPage;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Sanitize a species name for use in file and directory names.
///
/// Spaces become underscores and slashes become hyphens, matching the
/// layout the downloader and reconciler parse back.
pub fn safe_species(name: &str) -> String {
    name.replace(' ', "_").replace('/', "-")
}

/// Recover a species name from a cache file stem (`Genus_species_page3`).
///
/// Lossy inverse of [`safe_species`]: underscores map back to spaces.
/// Returns `None` when the stem has no `_page` component.
pub fn species_from_filename(stem: &str) -> Option<String> {
    let (species, _) = stem.split_once("_page")?;
    Some(species.replace('_', " "))
}

/// Keyed store of cached API pages.
#[derive(Debug, Clone)]
pub struct PageCache {
    dir: PathBuf,
}

impl PageCache {
    /// Create a cache rooted at `dir`. The directory is not created until
    /// [`ensure_dir`](Self::ensure_dir) is called.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Cache root directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the cache directory if it does not exist.
    pub fn ensure_dir(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.dir)
    }

    /// Path of the cache file for a (species, page) pair.
    pub fn page_path(&self, species: &str, page: u32) -> PathBuf {
        self.dir
            .join(format!("{}_page{}.json", safe_species(species), page))
    }

    /// Whether a cache entry exists for a (species, page) pair.
    pub fn contains(&self, species: &str, page: u32) -> bool {
        self.page_path(species, page).exists()
    }

    /// Look up a previously stored page. Never touches the network.
    ///
    /// Read or parse failures are logged and reported as a miss so the
    /// caller refetches the page.
    pub fn get(&self, species: &str, page: u32) -> Option<RecordingsPage> {
        let path = self.page_path(species, page);
        if !path.exists() {
            return None;
        }
        match read_page(&path) {
            Some(data) => {
                debug!("cache hit: {} page {}", species, page);
                Some(data)
            }
            None => {
                warn!("unreadable cache entry for {} page {}", species, page);
                None
            }
        }
    }

    /// Store the raw response body for a (species, page) pair.
    ///
    /// The write goes through a temp file in the cache directory and an
    /// atomic rename, so a killed run never leaves a torn entry. Write
    /// failures are logged and swallowed; the page is refetched next run.
    pub fn put(&self, species: &str, page: u32, body: &str) {
        let path = self.page_path(species, page);
        if let Err(e) = write_atomic(&self.dir, &path, body.as_bytes()) {
            warn!("failed to cache {} page {}: {}", species, page, e);
        } else {
            debug!("cached: {} page {}", species, page);
        }
    }

    /// All cache files, sorted by name.
    pub fn cached_files(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("cannot read cache directory {}: {}", self.dir.display(), e);
                return files;
            }
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                files.push(path);
            }
        }
        files.sort();
        files
    }

    /// Maximum reported recording count per species across all cached pages.
    ///
    /// Unreadable entries are skipped. Used by roster reconciliation to tell
    /// "searched, none found" apart from "not searched".
    pub fn species_recording_counts(&self) -> BTreeMap<String, u32> {
        let mut counts = BTreeMap::new();
        for path in self.cached_files() {
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let Some(species) = species_from_filename(stem) else {
                continue;
            };
            let Some(data) = read_page(&path) else {
                warn!("skipping unreadable cache file {}", path.display());
                continue;
            };
            let entry = counts.entry(species).or_insert(0);
            // Pages of one species all report the same total; keep the max
            // rather than summing.
            *entry = (*entry).max(data.num_recordings);
        }
        counts
    }
}

/// Read and parse one cache file. `None` on any read or parse failure.
pub fn read_page(path: &Path) -> Option<RecordingsPage> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) => {
            warn!("error reading {}: {}", path.display(), e);
            return None;
        }
    };
    match serde_json::from_str(&contents) {
        Ok(data) => Some(data),
        Err(e) => {
            warn!("error parsing {}: {}", path.display(), e);
            None
        }
    }
}

fn write_atomic(dir: &Path, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut temp = tempfile::NamedTempFile::new_in(dir)?;
    temp.write_all(bytes)?;
    temp.flush()?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
