use std::future::Future;

use ypcache_core::EnrichedListing;

use crate::directory::DirectoryScraper;
use crate::error::ScraperError;

/// Anything that can produce enriched listings for a keyword.
///
/// The resolver depends on this rather than on [`DirectoryScraper`] directly
/// so it can run against scripted sources.
pub trait ListingSource: Send + Sync + 'static {
    /// Returns at most `max_results` listings for `keyword`. An empty vector
    /// means the directory had nothing for the keyword (or every page fetch
    /// gave up).
    fn fetch_listings(
        &self,
        keyword: &str,
        max_results: usize,
    ) -> impl Future<Output = Result<Vec<EnrichedListing>, ScraperError>> + Send;
}

impl ListingSource for DirectoryScraper {
    async fn fetch_listings(
        &self,
        keyword: &str,
        max_results: usize,
    ) -> Result<Vec<EnrichedListing>, ScraperError> {
        self.scrape(keyword, max_results).await
    }
}
