//! Streaming audio downloads with a hard byte ceiling.
//!
//! The target filename (`<id>_<name>.mp3`) is the idempotency key: an
//! existing file means the recording is done, an existing marker means it was
//! permanently rejected for size. Both checks happen before any network
//! traffic, so re-runs replay the directory instead of the remote server.

use crate::config::DownloadConfig;
use crate::downloader::{
    DownloadError, DownloadLedger, DownloadOutcome, MARKER_EXTENSION,
};
use crate::Recording;
use futures_util::StreamExt;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Size-bounded audio downloader.
pub struct AudioDownloader {
    client: reqwest::Client,
    config: DownloadConfig,
}

impl AudioDownloader {
    /// Create a downloader with a bounded per-request timeout.
    pub fn new(config: DownloadConfig) -> Result<Self, DownloadError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| DownloadError::Network(e.to_string()))?;
        Ok(Self { client, config })
    }

    /// Downloader settings.
    pub fn config(&self) -> &DownloadConfig {
        &self.config
    }

    /// Derive the target filename for a recording: `<id>_<name>` with a
    /// forced `.mp3` suffix, `/` replaced by `-` across the whole name.
    /// A missing filename hint falls back to `<id>.mp3`.
    pub fn target_filename(recording: &Recording) -> String {
        let name = recording
            .file_name
            .clone()
            .unwrap_or_else(|| format!("{}.mp3", recording.id));
        let name = if name.ends_with(".mp3") {
            name
        } else {
            format!("{name}.mp3")
        };
        format!("{}_{}", recording.id, name).replace('/', "-")
    }

    /// Path of the size-limit marker for a target file.
    pub fn marker_path(target: &Path) -> PathBuf {
        target.with_extension(MARKER_EXTENSION)
    }

    /// Process one recording into `species_dir`, recording the outcome in
    /// the ledger. See the module docs for the decision order.
    pub async fn process_recording(
        &self,
        recording: &Recording,
        species_dir: &Path,
        ledger: &mut DownloadLedger,
    ) -> DownloadOutcome {
        let filename = Self::target_filename(recording);
        let target = species_dir.join(&filename);

        if target.exists() {
            debug!("already downloaded: {}", filename);
            ledger.record(
                &recording.id,
                &filename,
                DownloadOutcome::AlreadyPresent.into(),
            );
            return DownloadOutcome::AlreadyPresent;
        }

        if Self::marker_path(&target).exists() {
            debug!("skipping (size limit previously exceeded): {}", filename);
            ledger.record(
                &recording.id,
                &filename,
                DownloadOutcome::SizeExceeded.into(),
            );
            return DownloadOutcome::SizeExceeded;
        }

        let Some(url) = recording.file_url.as_deref() else {
            warn!("no file URL for recording {}", recording.id);
            ledger.record(&recording.id, &filename, DownloadOutcome::Error.into());
            return DownloadOutcome::Error;
        };

        info!("downloading: {}", filename);
        let outcome = match self.download_file(url, &target).await {
            Ok(()) => {
                info!(
                    "downloaded: {} (quality: {}, duration: {})",
                    filename,
                    recording.quality.as_deref().unwrap_or("unknown"),
                    recording.duration.as_deref().unwrap_or("unknown"),
                );
                DownloadOutcome::Downloaded
            }
            Err(DownloadError::SizeExceeded { limit, declared }) => {
                warn!(
                    "size limit exceeded for {} (limit {} bytes, declared {:?})",
                    filename, limit, declared
                );
                write_marker(&target);
                DownloadOutcome::SizeExceeded
            }
            Err(e) => {
                error!("download error for {}: {}", filename, e);
                DownloadOutcome::Error
            }
        };

        ledger.record(&recording.id, &filename, outcome.into());
        outcome
    }

    /// Stream `url` into `target` with the byte ceiling enforced both on the
    /// declared content-length (before any body transfer) and incrementally
    /// during streaming (servers omit or understate the header). The body
    /// streams into a `.part` sibling renamed into place only after the
    /// transfer completes and is non-empty, so a killed run never leaves a
    /// plausible-looking truncated file.
    async fn download_file(&self, url: &str, target: &Path) -> Result<(), DownloadError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DownloadError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::Network(format!("HTTP {status}")));
        }

        if let Some(declared) = response.content_length() {
            if declared > self.config.max_file_bytes {
                return Err(DownloadError::SizeExceeded {
                    limit: self.config.max_file_bytes,
                    declared: Some(declared),
                });
            }
        }

        let part = target.with_extension("part");
        let result = self.stream_to_file(response, &part).await;

        match result {
            Ok(()) => {
                std::fs::rename(&part, target)?;
                Ok(())
            }
            Err(e) => {
                remove_if_present(&part);
                Err(e)
            }
        }
    }

    async fn stream_to_file(
        &self,
        response: reqwest::Response,
        part: &Path,
    ) -> Result<(), DownloadError> {
        let mut file = File::create(part)?;
        let mut downloaded: u64 = 0;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| DownloadError::Network(e.to_string()))?;
            downloaded += chunk.len() as u64;
            if downloaded > self.config.max_file_bytes {
                return Err(DownloadError::SizeExceeded {
                    limit: self.config.max_file_bytes,
                    declared: None,
                });
            }
            file.write_all(&chunk)?;
        }

        file.flush()?;
        file.sync_all()?;

        if downloaded == 0 {
            return Err(DownloadError::EmptyFile);
        }
        Ok(())
    }
}

/// Create the zero-byte size-limit marker for a target file. Failure to
/// write it is logged; the oversized download is then merely re-attempted
/// and re-rejected next run.
fn write_marker(target: &Path) {
    let marker = AudioDownloader::marker_path(target);
    if let Err(e) = File::create(&marker) {
        warn!("failed to write marker {}: {}", marker.display(), e);
    } else {
        debug!("created size limit marker: {}", marker.display());
    }
}

fn remove_if_present(path: &Path) {
    if path.exists() {
        if let Err(e) = std::fs::remove_file(path) {
            warn!("failed to remove partial file {}: {}", path.display(), e);
        }
    }
}
