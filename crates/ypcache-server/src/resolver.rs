//! Cache freshness resolution for `/search`.
//!
//! Given a keyword and a validated [`RequestedSize`], the [`Resolver`] decides
//! between serving a slice of a fresh cache entry and scraping anew:
//!
//! | Cache state                        | Action                                         |
//! |------------------------------------|------------------------------------------------|
//! | miss, stale, or unreadable         | scrape, store, return                          |
//! | fresh, `size >= requested`         | return the first `requested` results           |
//! | fresh, `size < requested`          | scrape, replace the entry, return              |
//!
//! A scrape that yields nothing is [`ResolveError::NoResults`] and leaves the
//! cache as it was. Each resolve runs to completion on its own spawned task,
//! even when the caller stops waiting. Resolves for the same keyword are
//! serialised, so a second caller waits for the first scrape and is then
//! answered from the cache when the new entry satisfies it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use thiserror::Error;
use tokio::sync::Mutex as KeywordLock;
use ypcache_core::CachedResponse;
use ypcache_db::{CacheStore, DbError};
use ypcache_scraper::{ListingSource, ScraperError};

pub const MIN_SIZE: usize = 30;
pub const MAX_SIZE: usize = 100;
pub const DEFAULT_SIZE: usize = 30;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("size must be between {MIN_SIZE} and {MAX_SIZE}, got {0}")]
    InvalidSize(String),

    #[error("no results found for keyword {0:?}")]
    NoResults(String),

    #[error("scrape could not start: {0}")]
    Scrape(#[from] ScraperError),

    #[error("cache store error: {0}")]
    Storage(#[from] DbError),

    #[error("scrape task failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

/// A result count inside `[MIN_SIZE, MAX_SIZE]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestedSize(usize);

impl RequestedSize {
    /// # Errors
    ///
    /// Returns [`ResolveError::InvalidSize`] when `size` is out of bounds.
    pub fn new(size: i64) -> Result<Self, ResolveError> {
        usize::try_from(size)
            .ok()
            .filter(|n| (MIN_SIZE..=MAX_SIZE).contains(n))
            .map(Self)
            .ok_or_else(|| ResolveError::InvalidSize(size.to_string()))
    }

    #[must_use]
    pub fn get(self) -> usize {
        self.0
    }
}

impl Default for RequestedSize {
    fn default() -> Self {
        Self(DEFAULT_SIZE)
    }
}

type InFlight = Arc<Mutex<HashMap<String, Arc<KeywordLock<()>>>>>;

pub struct Resolver<S, L> {
    store: Arc<S>,
    source: Arc<L>,
    in_flight: InFlight,
}

impl<S: CacheStore, L: ListingSource> Resolver<S, L> {
    #[must_use]
    pub fn new(store: Arc<S>, source: Arc<L>) -> Self {
        Self {
            store,
            source,
            in_flight: Arc::default(),
        }
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns results for `keyword`, from cache when a fresh entry is large
    /// enough and from a new scrape otherwise.
    ///
    /// The work runs on its own task. Dropping the returned future does not
    /// cancel it: the scrape still completes and is stored, and later callers
    /// for the same keyword wait for it.
    ///
    /// # Errors
    ///
    /// - [`ResolveError::NoResults`] when a scrape yields nothing.
    /// - [`ResolveError::Storage`] when the new entry cannot be stored.
    /// - [`ResolveError::Scrape`] / [`ResolveError::Worker`] when the scrape
    ///   cannot be started or its task dies.
    pub async fn resolve(
        &self,
        keyword: &str,
        size: RequestedSize,
    ) -> Result<CachedResponse, ResolveError> {
        let job = ResolveJob {
            store: Arc::clone(&self.store),
            source: Arc::clone(&self.source),
            keyword: keyword.to_string(),
            requested: size.get(),
            slot: KeywordSlot::claim(&self.in_flight, keyword),
        };
        tokio::spawn(job.run()).await?
    }

    #[cfg(test)]
    fn in_flight_len(&self) -> usize {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// A claim on the per-keyword lock. The map entry is removed when the last
/// claim for a keyword is dropped.
struct KeywordSlot {
    in_flight: InFlight,
    keyword: String,
    lock: Arc<KeywordLock<()>>,
}

impl KeywordSlot {
    fn claim(in_flight: &InFlight, keyword: &str) -> Self {
        let lock = {
            let mut map = in_flight.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(map.entry(keyword.to_string()).or_default())
        };
        Self {
            in_flight: Arc::clone(in_flight),
            keyword: keyword.to_string(),
            lock,
        }
    }
}

impl Drop for KeywordSlot {
    fn drop(&mut self) {
        let mut map = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // Held by the map and by this slot only.
        if map
            .get(&self.keyword)
            .is_some_and(|lock| Arc::ptr_eq(lock, &self.lock) && Arc::strong_count(lock) == 2)
        {
            map.remove(&self.keyword);
        }
    }
}

struct ResolveJob<S, L> {
    store: Arc<S>,
    source: Arc<L>,
    keyword: String,
    requested: usize,
    slot: KeywordSlot,
}

impl<S: CacheStore, L: ListingSource> ResolveJob<S, L> {
    async fn run(self) -> Result<CachedResponse, ResolveError> {
        let lock = Arc::clone(&self.slot.lock);
        let guard = lock.lock().await;
        let result = self.resolve_exclusive().await;
        drop(guard);
        drop(lock);
        drop(self);
        result
    }

    async fn resolve_exclusive(&self) -> Result<CachedResponse, ResolveError> {
        let keyword = self.keyword.as_str();
        let requested = self.requested;

        let cached = match self.store.find_by_keyword(keyword).await {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(keyword, error = %e, "cache read failed; treating as miss");
                None
            }
        };

        let now = Utc::now();
        let replaces_fresh_entry = match cached {
            Some(entry) if entry.is_fresh(now) && entry.size >= requested => {
                tracing::info!(keyword, cached = entry.size, requested, "cache hit");
                return Ok(entry.truncated(requested));
            }
            Some(entry) if entry.is_fresh(now) => {
                tracing::info!(
                    keyword,
                    cached = entry.size,
                    requested,
                    "cached entry too small; refreshing"
                );
                true
            }
            Some(entry) => {
                tracing::info!(keyword, date = %entry.date, "cached entry stale");
                false
            }
            None => {
                tracing::info!(keyword, "cache miss");
                false
            }
        };

        let mut results = self.source.fetch_listings(keyword, requested).await?;
        results.truncate(requested);
        if results.is_empty() {
            tracing::warn!(keyword, "scrape found no listings");
            return Err(ResolveError::NoResults(keyword.to_string()));
        }

        if replaces_fresh_entry {
            match self.store.delete_by_keyword(keyword).await {
                Ok(0) => tracing::warn!(keyword, "cached entry vanished before replacement"),
                Ok(_) => {}
                Err(e) => tracing::error!(keyword, error = %e, "failed to delete cached entry"),
            }
        }

        let response = CachedResponse::new(keyword, results, Utc::now());
        self.store.insert(&response).await?;
        tracing::info!(keyword, size = response.size, "cached new results");
        Ok(response)
    }
}

#[cfg(test)]
#[path = "resolver_test.rs"]
mod tests;
