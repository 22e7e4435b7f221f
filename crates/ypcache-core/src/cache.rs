//! The cached search result document and its freshness rules.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::listing::EnrichedListing;

/// Entries younger than this are served from cache.
pub const FRESHNESS_WINDOW_HOURS: i64 = 24;

/// Search results for one keyword as stored in (and served from) the cache.
///
/// `size` always equals `results.len()`; use [`CachedResponse::new`] or
/// [`CachedResponse::truncated`] rather than building the struct by hand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedResponse {
    pub keyword: String,
    pub size: usize,
    /// When the scrape that produced `results` finished.
    pub date: DateTime<Utc>,
    /// Listings in scrape order.
    pub results: Vec<EnrichedListing>,
}

impl CachedResponse {
    /// Builds a response whose `size` is the number of `results`, whatever
    /// count was originally requested.
    #[must_use]
    pub fn new(keyword: impl Into<String>, results: Vec<EnrichedListing>, date: DateTime<Utc>) -> Self {
        Self {
            keyword: keyword.into(),
            size: results.len(),
            date,
            results,
        }
    }

    #[must_use]
    pub fn freshness_window() -> Duration {
        Duration::hours(FRESHNESS_WINDOW_HOURS)
    }

    /// Entries created before this instant are stale at `now`.
    #[must_use]
    pub fn expiry_cutoff(now: DateTime<Utc>) -> DateTime<Utc> {
        now - Self::freshness_window()
    }

    #[must_use]
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.date
    }

    /// `true` iff the entry is strictly younger than the freshness window.
    #[must_use]
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.age(now) < Self::freshness_window()
    }

    /// A copy holding only the first `limit` results. The receiver is untouched.
    #[must_use]
    pub fn truncated(&self, limit: usize) -> Self {
        let results: Vec<EnrichedListing> = self.results.iter().take(limit).cloned().collect();
        Self {
            keyword: self.keyword.clone(),
            size: results.len(),
            date: self.date,
            results,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listing::ListingStub;

    fn listings(n: usize) -> Vec<EnrichedListing> {
        (0..n)
            .map(|i| {
                EnrichedListing::from_stub(ListingStub {
                    name: format!("Listing {i}"),
                    ..ListingStub::default()
                })
            })
            .collect()
    }

    #[test]
    fn new_derives_size_from_results() {
        let response = CachedResponse::new("bakeries", listings(7), Utc::now());
        assert_eq!(response.size, 7);
        assert_eq!(response.size, response.results.len());
    }

    #[test]
    fn fresh_just_inside_window() {
        let now = Utc::now();
        let response = CachedResponse::new(
            "bakeries",
            listings(1),
            now - Duration::hours(24) + Duration::seconds(1),
        );
        assert!(response.is_fresh(now));
    }

    #[test]
    fn stale_at_exactly_window() {
        let now = Utc::now();
        let response = CachedResponse::new("bakeries", listings(1), now - Duration::hours(24));
        assert!(!response.is_fresh(now));
    }

    #[test]
    fn expiry_cutoff_is_one_window_back() {
        let now = Utc::now();
        assert_eq!(CachedResponse::expiry_cutoff(now), now - Duration::hours(24));
    }

    #[test]
    fn truncated_keeps_prefix_and_leaves_original_untouched() {
        let original = CachedResponse::new("bakeries", listings(50), Utc::now());
        let view = original.truncated(30);

        assert_eq!(view.size, 30);
        assert_eq!(view.results.len(), 30);
        assert_eq!(view.results[..], original.results[..30]);
        assert_eq!(view.date, original.date);
        assert_eq!(original.size, 50);
        assert_eq!(original.results.len(), 50);
    }

    #[test]
    fn truncated_beyond_length_keeps_everything() {
        let original = CachedResponse::new("bakeries", listings(3), Utc::now());
        let view = original.truncated(30);
        assert_eq!(view.size, 3);
    }
}
