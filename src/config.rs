//! Configuration constants and tunables for fetch and download runs.

use std::time::Duration;

/// Default base URL of the recordings endpoint.
pub const DEFAULT_BASE_URL: &str = "https://xeno-canto.org/api/3/recordings";

/// Delay between successive requests that reach the network.
/// The service rate-limits aggressively; 1.5 s keeps a full run around
/// 800-900 calls per hour.
pub const REQUEST_DELAY_MS: u64 = 1500;

/// Maximum attempts per page request. All failure classes share this ceiling;
/// nothing is retried indefinitely.
pub const MAX_RETRIES: u32 = 3;

/// Cooldown applied after an HTTP 429 before the next attempt.
pub const RATE_LIMIT_COOLDOWN_SECS: u64 = 60;

/// Results requested per page (the API accepts 50-500).
pub const RESULTS_PER_PAGE: u32 = 100;

/// Per-species recording cap. Checked after each page is accumulated, so a
/// species may end up with up to one page more than this ("at least N").
pub const MAX_RECORDINGS_PER_SPECIES: usize = 30;

/// Global network-call budget per run. Checked before each species; the whole
/// run stops once exceeded.
pub const MAX_API_CALLS: u64 = 800;

/// Per-request timeout for both metadata and audio requests.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Audio files larger than this are never stored; a marker records the
/// rejection so the file is not re-attempted.
pub const MAX_AUDIO_BYTES: u64 = 50 * 1024 * 1024;

/// Default country filter (ISO code) applied to every species query.
pub const DEFAULT_COUNTRY: &str = "ZA";

/// Linear backoff before retry `attempt` (1-indexed): delay × attempt.
pub fn retry_backoff(attempt: u32) -> Duration {
    Duration::from_millis(REQUEST_DELAY_MS) * attempt
}

/// Settings for the metadata fetch pipeline.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Base URL of the recordings endpoint
    pub base_url: String,
    /// API credential sent with every request
    pub api_key: String,
    /// Results requested per page
    pub per_page: u32,
    /// Delay before every network attempt
    pub request_delay: Duration,
    /// Cooldown after an HTTP 429
    pub rate_limit_cooldown: Duration,
    /// Maximum attempts per page request
    pub max_retries: u32,
    /// Per-request timeout
    pub request_timeout: Duration,
}

impl FetchConfig {
    /// Create a config with the given API key and default tunables.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            per_page: RESULTS_PER_PAGE,
            request_delay: Duration::from_millis(REQUEST_DELAY_MS),
            rate_limit_cooldown: Duration::from_secs(RATE_LIMIT_COOLDOWN_SECS),
            max_retries: MAX_RETRIES,
            request_timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
        }
    }
}

/// Settings for the audio download pipeline.
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    /// Byte ceiling per audio file
    pub max_file_bytes: u64,
    /// Delay applied after each completed download
    pub request_delay: Duration,
    /// Per-request timeout
    pub request_timeout: Duration,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            max_file_bytes: MAX_AUDIO_BYTES,
            request_delay: Duration::from_millis(REQUEST_DELAY_MS),
            request_timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
        }
    }
}
