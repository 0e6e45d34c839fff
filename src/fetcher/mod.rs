//! Metadata fetch: rate-limited API client and pagination driver.

use crate::{RecordingsPage, SpeciesQuery};
use async_trait::async_trait;

pub mod client;
pub mod pagination;

/// Fetch errors.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The API rejected the credential (HTTP 401). Fatal for the whole run.
    #[error("invalid API key (HTTP 401)")]
    InvalidApiKey,

    /// Rate limited (HTTP 429) on every attempt
    #[error("rate limit exceeded")]
    RateLimited,

    /// Network-level failure
    #[error("network error: {0}")]
    Network(String),

    /// Unexpected HTTP status
    #[error("HTTP {status}: {body}")]
    Http {
        /// Response status code
        status: u16,
        /// Response body, best effort
        body: String,
    },

    /// Response body did not parse as a recordings envelope
    #[error("parse error: {0}")]
    Parse(String),
}

impl FetchError {
    /// Whether this error must abort the entire run rather than skip a page.
    pub fn is_fatal(&self) -> bool {
        matches!(self, FetchError::InvalidApiKey)
    }
}

/// Result type for fetch operations.
pub type FetchResult<T> = Result<T, FetchError>;

/// A successfully fetched page: the raw body as received plus the parsed
/// envelope. The raw body is what goes into the cache.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Raw response body
    pub body: String,
    /// Parsed envelope
    pub page: RecordingsPage,
}

/// Source of recording pages. Implemented by the HTTP client; test doubles
/// implement it to drive the pagination loop without a network.
#[async_trait]
pub trait RecordingsApi: Send + Sync {
    /// Fetch one page of recordings for a species query.
    async fn fetch_page(&self, query: &SpeciesQuery, page: u32) -> FetchResult<FetchedPage>;

    /// Number of attempts that reached the network so far.
    fn calls_made(&self) -> u64;
}
