//! `fetch` command: walk the roster and cache recording metadata.

use crate::cache::PageCache;
use crate::cli::CliError;
use crate::config::{self, FetchConfig};
use crate::fetcher::client::XenoCantoClient;
use crate::fetcher::pagination::SpeciesPager;
use crate::fetcher::RecordingsApi;
use crate::output::{CsvSummaryWriter, SpeciesSummaryRow};
use crate::{roster, SpeciesQuery};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, warn};

/// Environment variable consulted when `--api-key` is not given.
pub const API_KEY_ENV: &str = "XENO_CANTO_API_KEY";

/// Arguments for the `fetch` command.
#[derive(Debug, Args)]
pub struct FetchArgs {
    /// Species roster CSV (columns: birdId, birdName, scientificName)
    #[arg(long, default_value = "labels.csv")]
    pub roster: PathBuf,

    /// Directory for cached API responses
    #[arg(long, default_value = "xenocanto_cache")]
    pub cache_dir: PathBuf,

    /// Per-run fetch summary CSV
    #[arg(long, default_value = "fetch_summary.csv")]
    pub summary: PathBuf,

    /// API key; falls back to the XENO_CANTO_API_KEY environment variable
    #[arg(long)]
    pub api_key: Option<String>,

    /// Base URL of the recordings endpoint
    #[arg(long, default_value = config::DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Delay in milliseconds before each network request
    #[arg(long, default_value_t = config::REQUEST_DELAY_MS)]
    pub delay_ms: u64,

    /// Country filter (ISO code); pass an empty string to disable
    #[arg(long, default_value = config::DEFAULT_COUNTRY)]
    pub country: String,

    /// Per-species recording cap (checked after each page, so totals may
    /// overshoot by up to one page)
    #[arg(long, default_value_t = config::MAX_RECORDINGS_PER_SPECIES)]
    pub max_recordings: usize,

    /// Network-call budget for the whole run
    #[arg(long, default_value_t = config::MAX_API_CALLS)]
    pub max_api_calls: u64,
}

impl FetchArgs {
    /// Run the fetch pipeline over the whole roster.
    pub async fn execute(&self) -> Result<(), CliError> {
        let mut config = FetchConfig::new(self.resolve_api_key()?);
        config.base_url = self.base_url.clone();
        config.request_delay = std::time::Duration::from_millis(self.delay_ms);
        let country = (!self.country.is_empty()).then(|| self.country.clone());

        let cache = PageCache::new(&self.cache_dir);
        cache.ensure_dir()?;

        let client = XenoCantoClient::new(config)?;
        let pager = SpeciesPager::new(&client, &cache, self.max_recordings);

        let species_list = roster::load_roster(&self.roster)?;
        let total = species_list.len();
        let started = Instant::now();

        info!("=== fetch started: {} species ===", total);

        let progress = ProgressBar::new(total as u64);
        progress.set_style(
            ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );

        let mut rows = Vec::with_capacity(total);
        for (index, entry) in species_list.iter().enumerate() {
            // Budget gate: stop the whole run, not just this species.
            if client.calls_made() >= self.max_api_calls {
                warn!(
                    "network call budget ({}) reached - stopping run",
                    self.max_api_calls
                );
                break;
            }

            info!(
                "[{}/{}] processing: {}",
                index + 1,
                total,
                entry.scientific_name
            );
            progress.set_message(entry.scientific_name.clone());

            let mut query = SpeciesQuery::new(entry.scientific_name.as_str());
            if let Some(code) = &country {
                query = query.with_country(code.as_str());
            }

            let summary = pager.fetch_species(&query).await?;
            rows.push(SpeciesSummaryRow {
                species: entry.scientific_name.clone(),
                recordings_fetched: summary.recordings_fetched,
                pages_requested: summary.pages_requested,
            });
            progress.inc(1);

            let elapsed_hours = started.elapsed().as_secs_f64() / 3600.0;
            let rate = if elapsed_hours > 0.0 {
                client.calls_made() as f64 / elapsed_hours
            } else {
                0.0
            };
            info!(
                "progress: {}/{} species, {} API calls, {:.1} calls/hour",
                index + 1,
                total,
                client.calls_made(),
                rate
            );
        }
        progress.finish_and_clear();

        let mut writer = CsvSummaryWriter::new(&self.summary)?;
        for row in &rows {
            writer.write_row(row)?;
        }
        writer.close()?;

        info!(
            "=== fetch complete: {} species processed, {} API calls, {:.1} minutes ===",
            rows.len(),
            client.calls_made(),
            started.elapsed().as_secs_f64() / 60.0
        );
        Ok(())
    }

    fn resolve_api_key(&self) -> Result<String, CliError> {
        if let Some(key) = &self.api_key {
            return Ok(key.clone());
        }
        std::env::var(API_KEY_ENV)
            .ok()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                CliError::InvalidArgument(format!(
                    "no API key: pass --api-key or set {API_KEY_ENV}"
                ))
            })
    }
}
