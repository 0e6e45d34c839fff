//! `download` command: fetch audio for every cached recording.

use crate::cache::{self, PageCache};
use crate::cli::CliError;
use crate::config::DownloadConfig;
use crate::downloader::{AudioDownloader, DownloadLedger, DownloadOutcome, DownloadTotals};
use clap::Args;
use std::path::PathBuf;
use std::time::Instant;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Arguments for the `download` command.
#[derive(Debug, Args)]
pub struct DownloadArgs {
    /// Directory of cached API responses
    #[arg(long, default_value = "xenocanto_cache")]
    pub cache_dir: PathBuf,

    /// Root directory for downloaded audio, one subdirectory per species
    #[arg(long, default_value = "xeno-raw")]
    pub audio_dir: PathBuf,

    /// Delay in milliseconds after each completed download
    #[arg(long, default_value_t = crate::config::REQUEST_DELAY_MS)]
    pub delay_ms: u64,
}

impl DownloadArgs {
    /// Walk all cached pages and download their recordings.
    pub async fn execute(&self) -> Result<(), CliError> {
        let cache = PageCache::new(&self.cache_dir);
        let cache_files = cache.cached_files();
        if cache_files.is_empty() {
            warn!(
                "no cached metadata in {} - run `fetch` first",
                self.cache_dir.display()
            );
            return Ok(());
        }

        info!("=== download started: {} cache files ===", cache_files.len());
        std::fs::create_dir_all(&self.audio_dir)?;

        let downloader = AudioDownloader::new(DownloadConfig {
            request_delay: std::time::Duration::from_millis(self.delay_ms),
            ..DownloadConfig::default()
        })?;
        let started = Instant::now();
        let mut totals = DownloadTotals::default();

        for cache_file in &cache_files {
            let Some(stem) = cache_file.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let Some(species) = cache::species_from_filename(stem) else {
                warn!("skipping unrecognized cache file {}", cache_file.display());
                continue;
            };
            // Unreadable entries were already logged; just move on.
            let Some(page) = cache::read_page(cache_file) else {
                continue;
            };
            if page.recordings.is_empty() {
                debug!("no recordings in {}", cache_file.display());
                continue;
            }

            info!(
                "processing species: {} ({} recordings)",
                species,
                page.recordings.len()
            );

            let species_dir = self.audio_dir.join(cache::safe_species(&species));
            std::fs::create_dir_all(&species_dir)?;

            let mut ledger = DownloadLedger::load_or_default(&species_dir);
            ledger.sync_with_dir();

            for (index, recording) in page.recordings.iter().enumerate() {
                debug!(
                    "[{}/{}] processing recording {}",
                    index + 1,
                    page.recordings.len(),
                    recording.id
                );
                let outcome = downloader
                    .process_recording(recording, &species_dir, &mut ledger)
                    .await;
                totals.record(outcome);

                // The delay bounds real network traffic; cache replay and
                // skips run at disk speed.
                if outcome == DownloadOutcome::Downloaded {
                    sleep(downloader.config().request_delay).await;
                }
            }

            if let Err(e) = ledger.save() {
                warn!("failed to save ledger for {}: {}", species, e);
            }

            info!(
                "progress: downloads: {}, skipped: {}, errors: {}",
                totals.downloaded, totals.already_present, totals.errors
            );
        }

        let elapsed = started.elapsed();
        info!("=== download summary ===");
        info!("total downloads: {}", totals.downloaded);
        info!(
            "total skipped (already downloaded): {}",
            totals.already_present
        );
        info!(
            "total skipped (size limit exceeded): {}",
            totals.size_exceeded
        );
        info!("total errors: {}", totals.errors);
        info!("total time: {:.1} minutes", elapsed.as_secs_f64() / 60.0);
        if totals.downloaded > 0 {
            info!(
                "average download time: {:.1}s per file",
                elapsed.as_secs_f64() / totals.downloaded as f64
            );
        }
        Ok(())
    }
}
