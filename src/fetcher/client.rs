//! HTTP client for the recordings endpoint.
//!
//! One request in flight at a time by design: the service enforces a global
//! rate limit that a concurrent client would trip immediately. Every attempt
//! sleeps the inter-request delay first, and every attempt that reaches the
//! network counts against the run's call budget.

use crate::config::FetchConfig;
use crate::fetcher::{FetchError, FetchResult, FetchedPage, RecordingsApi};
use crate::{RecordingsPage, SpeciesQuery};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::time::sleep;
use tracing::{debug, error, warn};

/// Rate-limited client for the xeno-canto recordings API.
pub struct XenoCantoClient {
    client: reqwest::Client,
    config: FetchConfig,
    calls: AtomicU64,
}

impl XenoCantoClient {
    /// Create a client with a bounded per-request timeout.
    pub fn new(config: FetchConfig) -> FetchResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;
        Ok(Self {
            client,
            config,
            calls: AtomicU64::new(0),
        })
    }

    async fn request_with_retry(
        &self,
        query: &SpeciesQuery,
        page: u32,
    ) -> FetchResult<FetchedPage> {
        let params = [
            ("query", query.search_tag()),
            ("key", self.config.api_key.clone()),
            ("per_page", self.config.per_page.to_string()),
            ("page", page.to_string()),
        ];

        let mut last_error = None;

        for attempt in 1..=self.config.max_retries {
            // Inter-request delay, charged to every attempt that goes out.
            sleep(self.config.request_delay).await;

            let response = match self
                .client
                .get(&self.config.base_url)
                .query(&params)
                .send()
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    warn!(
                        "network error on attempt {}/{}: {}",
                        attempt, self.config.max_retries, e
                    );
                    last_error = Some(FetchError::Network(e.to_string()));
                    if attempt < self.config.max_retries {
                        sleep(self.config.request_delay * attempt).await;
                    }
                    continue;
                }
            };

            // The request reached the server; count it against the budget.
            self.calls.fetch_add(1, Ordering::Relaxed);

            let status = response.status();

            if status == StatusCode::OK {
                let body = match response.text().await {
                    Ok(body) => body,
                    Err(e) => {
                        warn!(
                            "failed reading body on attempt {}/{}: {}",
                            attempt, self.config.max_retries, e
                        );
                        last_error = Some(FetchError::Network(e.to_string()));
                        if attempt < self.config.max_retries {
                            sleep(self.config.request_delay * attempt).await;
                        }
                        continue;
                    }
                };
                let parsed: RecordingsPage = serde_json::from_str(&body)
                    .map_err(|e| FetchError::Parse(e.to_string()))?;
                debug!("page {} fetched on attempt {}", page, attempt);
                return Ok(FetchedPage { body, page: parsed });
            }

            if status == StatusCode::UNAUTHORIZED {
                error!("invalid API key (HTTP 401)");
                return Err(FetchError::InvalidApiKey);
            }

            if status == StatusCode::TOO_MANY_REQUESTS {
                warn!(
                    "rate limit hit (HTTP 429) on attempt {}/{}, cooling down {:?}",
                    attempt, self.config.max_retries, self.config.rate_limit_cooldown
                );
                last_error = Some(FetchError::RateLimited);
                sleep(self.config.rate_limit_cooldown).await;
                continue;
            }

            let body = response.text().await.unwrap_or_default();
            warn!(
                "HTTP {} on attempt {}/{}: {}",
                status, attempt, self.config.max_retries, body
            );
            last_error = Some(FetchError::Http {
                status: status.as_u16(),
                body,
            });
            if attempt < self.config.max_retries {
                sleep(self.config.request_delay * attempt).await;
            }
        }

        // All attempts used up; report why the last one failed.
        Err(last_error
            .unwrap_or_else(|| FetchError::Network("all retries exhausted".to_string())))
    }
}

#[async_trait]
impl RecordingsApi for XenoCantoClient {
    async fn fetch_page(&self, query: &SpeciesQuery, page: u32) -> FetchResult<FetchedPage> {
        self.request_with_retry(query, page).await
    }

    fn calls_made(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }
}
