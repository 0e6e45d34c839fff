//! `reconcile` command: write availability results back into the roster.

use crate::cache::PageCache;
use crate::cli::CliError;
use crate::roster;
use clap::Args;
use std::path::PathBuf;
use tracing::info;

/// Arguments for the `reconcile` command.
#[derive(Debug, Args)]
pub struct ReconcileArgs {
    /// Species roster CSV to reconcile
    #[arg(long, default_value = "labels.csv")]
    pub roster: PathBuf,

    /// Directory of cached API responses
    #[arg(long, default_value = "xenocanto_cache")]
    pub cache_dir: PathBuf,

    /// Output CSV; ignored with --in-place
    #[arg(long, default_value = "labels_updated.csv", conflicts_with = "in_place")]
    pub output: PathBuf,

    /// Update the roster in place, taking a timestamped backup first
    #[arg(long)]
    pub in_place: bool,
}

impl ReconcileArgs {
    /// Reconcile the roster against the cache directory.
    pub fn execute(&self) -> Result<(), CliError> {
        let cache = PageCache::new(&self.cache_dir);

        let output = if self.in_place {
            roster::backup_roster(&self.roster)?;
            self.roster.clone()
        } else {
            self.output.clone()
        };

        let stats = roster::reconcile_roster(&self.roster, &output, &cache)?;

        info!("total species: {}", stats.total);
        info!("found in xeno-canto: {}", stats.found);
        info!("not found in xeno-canto: {}", stats.not_found);
        info!("not yet searched: {}", stats.not_searched);

        let mut top: Vec<_> = cache
            .species_recording_counts()
            .into_iter()
            .filter(|(_, count)| *count > 0)
            .collect();
        top.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        if !top.is_empty() {
            info!("top species by recording count:");
            for (species, count) in top.iter().take(10) {
                info!("  {}: {} recordings", species, count);
            }
        }
        Ok(())
    }
}
