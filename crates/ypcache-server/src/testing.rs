//! In-memory doubles for the cache store and the listing source.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use ypcache_core::{CachedResponse, EnrichedListing, ListingStub};
use ypcache_db::{CacheStore, DbError};
use ypcache_scraper::{ListingSource, ScraperError};

pub(crate) fn listings(keyword: &str, n: usize) -> Vec<EnrichedListing> {
    (0..n)
        .map(|i| {
            EnrichedListing::from_stub(ListingStub {
                link: format!("https://yellowpages.com.eg/en/profile/{keyword}-{i}/{}", 1000 + i),
                name: format!("{keyword} #{i}"),
                ..ListingStub::default()
            })
        })
        .collect()
}

fn unavailable() -> DbError {
    DbError::Sqlx(sqlx::Error::PoolTimedOut)
}

#[derive(Default)]
pub(crate) struct MemoryStore {
    entries: Mutex<HashMap<String, CachedResponse>>,
    pub fail_reads: AtomicBool,
    pub fail_writes: AtomicBool,
    pub fail_ping: AtomicBool,
    pub finds: AtomicUsize,
    pub deletes: AtomicUsize,
    pub inserts: AtomicUsize,
}

impl MemoryStore {
    pub(crate) fn with_entry(response: CachedResponse) -> Self {
        let store = Self::default();
        store.put(response);
        store
    }

    pub(crate) fn put(&self, response: CachedResponse) {
        self.entries
            .lock()
            .expect("store lock")
            .insert(response.keyword.clone(), response);
    }

    pub(crate) fn get(&self, keyword: &str) -> Option<CachedResponse> {
        self.entries.lock().expect("store lock").get(keyword).cloned()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.lock().expect("store lock").len()
    }

    pub(crate) fn activity(&self) -> usize {
        self.finds.load(Ordering::SeqCst)
            + self.deletes.load(Ordering::SeqCst)
            + self.inserts.load(Ordering::SeqCst)
    }
}

impl CacheStore for MemoryStore {
    async fn find_by_keyword(&self, keyword: &str) -> Result<Option<CachedResponse>, DbError> {
        self.finds.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        Ok(self.get(keyword))
    }

    async fn delete_by_keyword(&self, keyword: &str) -> Result<u64, DbError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        let removed = self.entries.lock().expect("store lock").remove(keyword);
        Ok(u64::from(removed.is_some()))
    }

    async fn insert(&self, response: &CachedResponse) -> Result<(), DbError> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        self.put(response.clone());
        Ok(())
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, DbError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        let mut entries = self.entries.lock().expect("store lock");
        let before = entries.len();
        entries.retain(|_, entry| entry.date >= cutoff);
        Ok(u64::try_from(before - entries.len()).expect("count fits"))
    }

    async fn ping(&self) -> Result<(), DbError> {
        if self.fail_ping.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        Ok(())
    }
}

/// Returns `available` listings for every keyword, ignoring the requested
/// maximum, and counts calls.
pub(crate) struct ScriptedSource {
    available: usize,
    delay: Duration,
    pub calls: AtomicUsize,
    pub last_requested: AtomicUsize,
}

impl ScriptedSource {
    pub(crate) fn with_results(available: usize) -> Self {
        Self {
            available,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            last_requested: AtomicUsize::new(0),
        }
    }

    pub(crate) fn slow(available: usize, delay: Duration) -> Self {
        Self {
            delay,
            ..Self::with_results(available)
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ListingSource for ScriptedSource {
    async fn fetch_listings(
        &self,
        keyword: &str,
        max_results: usize,
    ) -> Result<Vec<EnrichedListing>, ScraperError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.last_requested.store(max_results, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(listings(keyword, self.available))
    }
}
