//! Pagination driver: walks the API pages for one species, cache first.

use crate::cache::PageCache;
use crate::fetcher::{FetchResult, RecordingsApi};
use crate::SpeciesQuery;
use tracing::{info, warn};

/// Per-species fetch result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpeciesFetchSummary {
    /// Recordings accumulated across all pages, cached or fetched
    pub recordings_fetched: usize,
    /// Pages that were fetched over the network (cache hits excluded)
    pub pages_requested: u32,
}

/// Walks pages for one species until the recording cap, the reported last
/// page, or an empty page is reached. The cache is consulted before every
/// network call.
pub struct SpeciesPager<'a, A: RecordingsApi> {
    api: &'a A,
    cache: &'a PageCache,
    max_recordings: usize,
}

impl<'a, A: RecordingsApi> SpeciesPager<'a, A> {
    /// Create a pager with a per-species recording cap.
    pub fn new(api: &'a A, cache: &'a PageCache, max_recordings: usize) -> Self {
        Self {
            api,
            cache,
            max_recordings,
        }
    }

    /// Fetch all pages for one species.
    ///
    /// Non-fatal fetch failures end the loop early and the partial result
    /// stands; only a fatal error (invalid credential) propagates. The cap is
    /// checked after each page is accumulated, so the total may overshoot the
    /// cap by up to one page - the cap means "at least N", not "exactly N".
    pub async fn fetch_species(&self, query: &SpeciesQuery) -> FetchResult<SpeciesFetchSummary> {
        let species = query.scientific_name.as_str();
        info!("fetching recordings for: {}", species);

        let mut summary = SpeciesFetchSummary::default();
        let mut page = 1u32;

        while summary.recordings_fetched < self.max_recordings {
            let page_data = match self.cache.get(species, page) {
                Some(data) => data,
                None => match self.api.fetch_page(query, page).await {
                    Ok(fetched) => {
                        self.cache.put(species, page, &fetched.body);
                        summary.pages_requested += 1;
                        fetched.page
                    }
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(e) => {
                        warn!("failed to fetch page {} for {}: {}", page, species, e);
                        break;
                    }
                },
            };

            if page_data.recordings.is_empty() {
                break;
            }

            summary.recordings_fetched += page_data.recordings.len();

            info!(
                "{}: page {}/{} - {} recordings (total: {})",
                species,
                page,
                page_data.num_pages,
                page_data.recordings.len(),
                summary.recordings_fetched
            );

            if page >= page_data.num_pages {
                break;
            }

            if summary.recordings_fetched >= self.max_recordings {
                info!("reached recording cap for {}", species);
                break;
            }

            page += 1;
        }

        Ok(summary)
    }
}
