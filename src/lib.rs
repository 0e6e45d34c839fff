//! # Xeno-canto Downloader Library
//!
//! A library for batch-downloading bird recording metadata and audio from the
//! [xeno-canto](https://xeno-canto.org) API (v3). Designed for assembling
//! bioacoustic datasets from a species roster.
//!
//! ## Features
//!
//! - **Paginated Metadata Fetch**: Walks the API page by page per species,
//!   honouring the service's reported page count and a per-species recording cap
//! - **On-Disk Response Cache**: Every API page is cached as raw JSON; re-runs
//!   replay the cache and make zero additional network calls
//! - **Rate Limiting**: Fixed inter-request delay, long cooldown on HTTP 429,
//!   linear backoff on transient errors, and a global call budget per run
//! - **Resumable Audio Downloads**: Size-bounded streaming downloads with
//!   durable markers for oversized files, safe to interrupt and re-run
//! - **Roster Reconciliation**: Writes availability and recording counts back
//!   into the species roster CSV
//!
//! ## Quick Start
//!
//! ```no_run
//! use xenocanto_downloader::cache::PageCache;
//! use xenocanto_downloader::config::FetchConfig;
//! use xenocanto_downloader::fetcher::client::XenoCantoClient;
//! use xenocanto_downloader::fetcher::pagination::SpeciesPager;
//! use xenocanto_downloader::SpeciesQuery;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = FetchConfig::new("your-api-key");
//! let cache = PageCache::new("xenocanto_cache");
//! cache.ensure_dir()?;
//!
//! let client = XenoCantoClient::new(config)?;
//! let pager = SpeciesPager::new(&client, &cache, 30);
//!
//! let query = SpeciesQuery::new("Turdus merula").with_country("ZA");
//! let summary = pager.fetch_species(&query).await?;
//! println!(
//!     "{} recordings over {} network pages",
//!     summary.recordings_fetched, summary.pages_requested
//! );
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`cache`] - On-disk page cache keyed by (species, page)
//! - [`fetcher`] - Rate-limited API client and species pagination driver
//! - [`downloader`] - Size-bounded audio downloads with a per-species ledger
//! - [`roster`] - Species roster loading and reconciliation
//! - [`output`] - Fetch summary CSV writer
//! - [`config`] - Tunables and rate-limit constants
//! - [`cli`] - Command implementations (`fetch`, `download`, `reconcile`)

#![warn(missing_docs)]
#![warn(clippy::all)]

use serde::{Deserialize, Serialize};

/// On-disk page cache
pub mod cache;

/// CLI command implementations
pub mod cli;

/// Configuration constants and tunables
pub mod config;

/// Audio download with size limits and the download ledger
pub mod downloader;

/// API client and pagination driver
pub mod fetcher;

/// Summary CSV output
pub mod output;

/// Species roster loading and reconciliation
pub mod roster;

// Re-export commonly used types
pub use fetcher::{FetchError, FetchResult};

/// Search query for one species, immutable for the duration of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeciesQuery {
    /// Scientific name, e.g. "Turdus merula"
    pub scientific_name: String,
    /// Optional ISO country code filter, e.g. "ZA"
    pub country: Option<String>,
}

impl SpeciesQuery {
    /// Create a query for a scientific name with no country filter.
    pub fn new(scientific_name: impl Into<String>) -> Self {
        Self {
            scientific_name: scientific_name.into(),
            country: None,
        }
    }

    /// Restrict the query to a country code.
    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    /// Build the API search tag, e.g. `sp:"Turdus merula"+cnt:ZA`.
    pub fn search_tag(&self) -> String {
        let mut tag = format!("sp:\"{}\"", self.scientific_name);
        if let Some(country) = self.country.as_deref() {
            if !country.is_empty() {
                tag.push_str(&format!("+cnt:{country}"));
            }
        }
        tag
    }
}

/// Metadata for a single recording as returned by the API.
///
/// Only the fields the pipeline consumes are modelled; the cache keeps the
/// raw response body, so nothing is lost by ignoring the rest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Recording {
    /// Stable recording identifier, used in the downloaded filename
    #[serde(
        default = "default_recording_id",
        deserialize_with = "de::string_or_number"
    )]
    pub id: String,
    /// Direct download URL for the audio file
    #[serde(rename = "file", default, skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
    /// Original filename hint from the API
    #[serde(rename = "file-name", default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    /// Quality rating ("A" through "E")
    #[serde(rename = "q", default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<String>,
    /// Recording length as reported, e.g. "0:34"
    #[serde(rename = "length", default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
}

fn default_recording_id() -> String {
    "unknown".to_string()
}

/// One page of the API response envelope.
///
/// `numRecordings` and `numPages` arrive as strings or numbers depending on
/// API version, so both are accepted.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RecordingsPage {
    /// Recordings on this page
    #[serde(default)]
    pub recordings: Vec<Recording>,
    /// Total recordings matching the query across all pages
    #[serde(default, deserialize_with = "de::count")]
    pub num_recordings: u32,
    /// Total pages available for the query
    #[serde(default, deserialize_with = "de::count")]
    pub num_pages: u32,
}

mod de {
    //! Lenient deserializers for fields the API serves as string or number.

    use serde::de::{self, Deserializer, Unexpected, Visitor};
    use std::fmt;

    struct CountVisitor;

    impl Visitor<'_> for CountVisitor {
        type Value = u32;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a non-negative integer or numeric string")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<u32, E> {
            u32::try_from(v).map_err(|_| E::invalid_value(Unexpected::Unsigned(v), &self))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<u32, E> {
            u32::try_from(v).map_err(|_| E::invalid_value(Unexpected::Signed(v), &self))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<u32, E> {
            v.trim()
                .parse()
                .map_err(|_| E::invalid_value(Unexpected::Str(v), &self))
        }
    }

    pub fn count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
        deserializer.deserialize_any(CountVisitor)
    }

    struct StringOrNumberVisitor;

    impl Visitor<'_> for StringOrNumberVisitor {
        type Value = String;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a string or number")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<String, E> {
            Ok(v.to_string())
        }
    }

    pub fn string_or_number<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<String, D::Error> {
        deserializer.deserialize_any(StringOrNumberVisitor)
    }
}
