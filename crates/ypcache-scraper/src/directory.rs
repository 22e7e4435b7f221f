use std::time::Duration;

use reqwest::Url;
use ypcache_core::{AppConfig, EnrichedListing, ListingStub};

use crate::crawl::crawl_listings;
use crate::detail::enrich_listing;
use crate::error::ScraperError;
use crate::fetch::{HttpSession, RetryPolicy};

/// Settings for one [`DirectoryScraper`].
#[derive(Debug, Clone)]
pub struct ScraperConfig {
    /// Directory origin, e.g. `https://yellowpages.com.eg`.
    pub base_url: String,
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            base_url: "https://yellowpages.com.eg".to_string(),
            request_timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }
}

impl ScraperConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            base_url: config.directory_base_url.clone(),
            request_timeout: Duration::from_secs(config.scraper_request_timeout_secs),
            retry: RetryPolicy {
                max_attempts: config.scraper_max_attempts,
                jitter_min: Duration::from_millis(config.scraper_jitter_min_ms),
                jitter_max: Duration::from_millis(config.scraper_jitter_max_ms),
            },
        }
    }
}

/// Crawl and enrich pipeline for the business directory.
///
/// Each call to [`DirectoryScraper::scrape`] opens its own [`HttpSession`],
/// so concurrent scrapes never share a client.
#[derive(Debug, Clone)]
pub struct DirectoryScraper {
    base_url: Url,
    request_timeout: Duration,
    retry: RetryPolicy,
}

impl DirectoryScraper {
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidUrl`] if `config.base_url` is not an
    /// absolute http(s) URL.
    pub fn new(config: ScraperConfig) -> Result<Self, ScraperError> {
        let base_url = Url::parse(&config.base_url).map_err(|e| ScraperError::InvalidUrl {
            url: config.base_url.clone(),
            reason: e.to_string(),
        })?;
        if base_url.cannot_be_a_base() || !matches!(base_url.scheme(), "http" | "https") {
            return Err(ScraperError::InvalidUrl {
                url: config.base_url,
                reason: "expected an absolute http(s) URL".to_string(),
            });
        }

        Ok(Self {
            base_url,
            request_timeout: config.request_timeout,
            retry: config.retry,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// First results page for `keyword`: `{base}/en/search/{keyword}`, with the
    /// keyword percent-encoded as a single path segment.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidUrl`] if the base URL cannot take path
    /// segments.
    pub fn search_url(&self, keyword: &str) -> Result<Url, ScraperError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ScraperError::InvalidUrl {
                url: self.base_url.to_string(),
                reason: "base URL cannot take path segments".to_string(),
            })?
            .clear()
            .extend(["en", "search", keyword]);
        Ok(url)
    }

    /// Opens a fresh session configured for this scraper.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the HTTP client cannot be built.
    pub fn session(&self) -> Result<HttpSession, ScraperError> {
        HttpSession::new(self.request_timeout, self.retry)
    }

    /// Collects up to `max_results` stubs for `keyword` without enriching them.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError`] only when the session or search URL cannot be
    /// built. Fetch failures end the crawl with partial results instead.
    pub async fn crawl(
        &self,
        keyword: &str,
        max_results: usize,
    ) -> Result<Vec<ListingStub>, ScraperError> {
        let start_url = self.search_url(keyword)?;
        let mut session = self.session()?;
        Ok(crawl_listings(&mut session, start_url, max_results).await)
    }

    /// Enriches each stub in order on one session.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the session cannot be built.
    pub async fn enrich(
        &self,
        stubs: Vec<ListingStub>,
    ) -> Result<Vec<EnrichedListing>, ScraperError> {
        let mut session = self.session()?;
        Ok(self.enrich_with(&mut session, stubs).await)
    }

    /// Crawls `keyword` and enriches every stub found, returning at most
    /// `max_results` listings in crawl order.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError`] only when the session or search URL cannot be
    /// built.
    pub async fn scrape(
        &self,
        keyword: &str,
        max_results: usize,
    ) -> Result<Vec<EnrichedListing>, ScraperError> {
        tracing::info!(keyword, max_results, "scraping directory");
        let start_url = self.search_url(keyword)?;
        let mut session = self.session()?;

        let stubs = crawl_listings(&mut session, start_url, max_results).await;
        let listings = self.enrich_with(&mut session, stubs).await;

        tracing::info!(
            keyword,
            count = listings.len(),
            rotations = session.rotations(),
            "scrape complete"
        );
        Ok(listings)
    }

    async fn enrich_with(
        &self,
        session: &mut HttpSession,
        stubs: Vec<ListingStub>,
    ) -> Vec<EnrichedListing> {
        let mut listings = Vec::with_capacity(stubs.len());
        for stub in stubs {
            listings.push(enrich_listing(session, &self.base_url, stub).await);
        }
        listings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scraper() -> DirectoryScraper {
        DirectoryScraper::new(ScraperConfig::default()).expect("default config is valid")
    }

    #[test]
    fn search_url_appends_keyword_segment() {
        let url = scraper().search_url("bakeries").expect("search url");
        assert_eq!(url.as_str(), "https://yellowpages.com.eg/en/search/bakeries");
    }

    #[test]
    fn search_url_percent_encodes_keyword() {
        let url = scraper().search_url("coffee shops/cafe").expect("search url");
        assert_eq!(
            url.as_str(),
            "https://yellowpages.com.eg/en/search/coffee%20shops%2Fcafe"
        );
    }

    #[test]
    fn base_url_path_is_replaced() {
        let scraper = DirectoryScraper::new(ScraperConfig {
            base_url: "http://127.0.0.1:9000/ignored/".to_string(),
            ..ScraperConfig::default()
        })
        .expect("valid config");
        let url = scraper.search_url("bakeries").expect("search url");
        assert_eq!(url.as_str(), "http://127.0.0.1:9000/en/search/bakeries");
    }

    #[test]
    fn rejects_non_http_base() {
        let err = DirectoryScraper::new(ScraperConfig {
            base_url: "mailto:someone@example.com".to_string(),
            ..ScraperConfig::default()
        })
        .expect_err("mailto is not a base");
        assert!(matches!(err, ScraperError::InvalidUrl { .. }));
    }

    #[test]
    fn rejects_unparseable_base() {
        let err = DirectoryScraper::new(ScraperConfig {
            base_url: "not a url".to_string(),
            ..ScraperConfig::default()
        })
        .expect_err("garbage base");
        assert!(matches!(err, ScraperError::InvalidUrl { .. }));
    }
}
