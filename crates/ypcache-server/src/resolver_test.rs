use std::sync::atomic::Ordering;
use std::time::Duration;

use chrono::Duration as Age;

use super::*;
use crate::testing::{listings, MemoryStore, ScriptedSource};

fn size(n: i64) -> RequestedSize {
    RequestedSize::new(n).expect("valid size")
}

fn entry(keyword: &str, count: usize, age: Age) -> CachedResponse {
    CachedResponse::new(keyword, listings(keyword, count), Utc::now() - age)
}

fn resolver(
    store: MemoryStore,
    source: ScriptedSource,
) -> (Resolver<MemoryStore, ScriptedSource>, Arc<MemoryStore>, Arc<ScriptedSource>) {
    let store = Arc::new(store);
    let source = Arc::new(source);
    (
        Resolver::new(Arc::clone(&store), Arc::clone(&source)),
        store,
        source,
    )
}

// ---------------------------------------------------------------------------
// Size validation
// ---------------------------------------------------------------------------

#[test]
fn requested_size_accepts_inclusive_bounds() {
    assert_eq!(size(30).get(), 30);
    assert_eq!(size(100).get(), 100);
    assert_eq!(RequestedSize::default().get(), 30);
}

#[test]
fn requested_size_rejects_out_of_bounds() {
    for bad in [10, 29, 101, 0, -5] {
        assert!(
            matches!(RequestedSize::new(bad), Err(ResolveError::InvalidSize(ref n)) if *n == bad.to_string()),
            "{bad} should be rejected"
        );
    }
}

// ---------------------------------------------------------------------------
// Miss / stale
// ---------------------------------------------------------------------------

#[tokio::test]
async fn miss_scrapes_and_stores_requested_count() {
    // The source returns more than asked; only the requested count is kept.
    let (resolver, store, source) = resolver(MemoryStore::default(), ScriptedSource::with_results(45));

    let response = resolver.resolve("bakeries", size(30)).await.expect("resolve");

    assert_eq!(response.size, 30);
    assert_eq!(response.results.len(), 30);
    assert_eq!(source.calls(), 1);
    assert_eq!(source.last_requested.load(Ordering::SeqCst), 30);

    let stored = store.get("bakeries").expect("entry stored");
    assert_eq!(stored.size, 30);
    assert_eq!(stored.results, response.results);
}

#[tokio::test]
async fn miss_with_short_source_stores_actual_count() {
    let (resolver, store, _) = resolver(MemoryStore::default(), ScriptedSource::with_results(12));

    let response = resolver.resolve("florists", size(30)).await.expect("resolve");

    assert_eq!(response.size, 12);
    assert_eq!(store.get("florists").expect("stored").size, 12);
}

#[tokio::test]
async fn empty_scrape_is_no_results_and_caches_nothing() {
    let (resolver, store, _) = resolver(MemoryStore::default(), ScriptedSource::with_results(0));

    let err = resolver
        .resolve("xyzzyqqq", size(30))
        .await
        .expect_err("no results");

    assert!(matches!(err, ResolveError::NoResults(ref k) if k == "xyzzyqqq"));
    assert_eq!(store.len(), 0);
    assert_eq!(store.inserts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn stale_entry_is_treated_as_miss() {
    let stale = entry("bakeries", 80, Age::hours(24));
    let (resolver, store, source) =
        resolver(MemoryStore::with_entry(stale.clone()), ScriptedSource::with_results(40));

    let response = resolver.resolve("bakeries", size(30)).await.expect("resolve");

    assert_eq!(source.calls(), 1, "stale entries are never served");
    assert_eq!(response.size, 30);
    let stored = store.get("bakeries").expect("entry stored");
    assert!(stored.date > stale.date, "stale entry overwritten");
    assert_eq!(stored.size, 30);
}

#[tokio::test]
async fn cache_read_failure_degrades_to_miss() {
    let store = MemoryStore::with_entry(entry("bakeries", 50, Age::minutes(5)));
    store.fail_reads.store(true, Ordering::SeqCst);
    let (resolver, _, source) = resolver(store, ScriptedSource::with_results(30));

    let response = resolver.resolve("bakeries", size(30)).await.expect("resolve");

    assert_eq!(source.calls(), 1);
    assert_eq!(response.size, 30);
}

#[tokio::test]
async fn insert_failure_is_storage_error() {
    let store = MemoryStore::default();
    store.fail_writes.store(true, Ordering::SeqCst);
    let (resolver, _, _) = resolver(store, ScriptedSource::with_results(30));

    let err = resolver
        .resolve("bakeries", size(30))
        .await
        .expect_err("insert fails");
    assert!(matches!(err, ResolveError::Storage(_)));
}

// ---------------------------------------------------------------------------
// Fresh hits
// ---------------------------------------------------------------------------

#[tokio::test]
async fn fresh_larger_entry_is_sliced_without_mutation() {
    let cached = entry("bakeries", 50, Age::hours(1));
    let (resolver, store, source) =
        resolver(MemoryStore::with_entry(cached.clone()), ScriptedSource::with_results(99));

    let response = resolver.resolve("bakeries", size(30)).await.expect("resolve");

    assert_eq!(source.calls(), 0, "fresh hit must not scrape");
    assert_eq!(response.size, 30);
    assert_eq!(response.results, cached.results[..30].to_vec());
    assert_eq!(response.date, cached.date);

    assert_eq!(store.get("bakeries"), Some(cached), "persisted entry untouched");
    assert_eq!(store.deletes.load(Ordering::SeqCst), 0);
    assert_eq!(store.inserts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn fresh_exact_size_entry_is_served_whole() {
    let cached = entry("bakeries", 40, Age::hours(23));
    let (resolver, _, source) =
        resolver(MemoryStore::with_entry(cached.clone()), ScriptedSource::with_results(99));

    let response = resolver.resolve("bakeries", size(40)).await.expect("resolve");

    assert_eq!(source.calls(), 0);
    assert_eq!(response, cached);
}

#[tokio::test]
async fn fresh_smaller_entry_is_replaced_with_new_scrape() {
    let cached = entry("bakeries", 20, Age::hours(1));
    let (resolver, store, source) =
        resolver(MemoryStore::with_entry(cached), ScriptedSource::with_results(33));

    let response = resolver.resolve("bakeries", size(40)).await.expect("resolve");

    assert_eq!(source.calls(), 1);
    assert_eq!(source.last_requested.load(Ordering::SeqCst), 40);
    assert_eq!(response.size, 33, "size is what was actually scraped");
    assert_eq!(store.deletes.load(Ordering::SeqCst), 1);
    assert_eq!(store.get("bakeries").expect("entry stored").size, 33);
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn refresh_with_empty_scrape_keeps_old_entry() {
    let cached = entry("bakeries", 20, Age::hours(1));
    let (resolver, store, _) =
        resolver(MemoryStore::with_entry(cached.clone()), ScriptedSource::with_results(0));

    let err = resolver
        .resolve("bakeries", size(40))
        .await
        .expect_err("no results");

    assert!(matches!(err, ResolveError::NoResults(_)));
    assert_eq!(store.get("bakeries"), Some(cached));
}

// ---------------------------------------------------------------------------
// Single flight
// ---------------------------------------------------------------------------

#[tokio::test]
async fn concurrent_misses_for_one_keyword_scrape_once() {
    let (resolver, store, source) = resolver(
        MemoryStore::default(),
        ScriptedSource::slow(30, Duration::from_millis(50)),
    );
    let resolver = Arc::new(resolver);

    let first = {
        let resolver = Arc::clone(&resolver);
        tokio::spawn(async move { resolver.resolve("bakeries", size(30)).await })
    };
    let second = {
        let resolver = Arc::clone(&resolver);
        tokio::spawn(async move { resolver.resolve("bakeries", size(30)).await })
    };

    let first = first.await.expect("join").expect("resolve");
    let second = second.await.expect("join").expect("resolve");

    assert_eq!(source.calls(), 1, "second caller is served from the new entry");
    assert_eq!(first.results, second.results);
    assert_eq!(store.inserts.load(Ordering::SeqCst), 1);
    assert_eq!(resolver.in_flight_len(), 0, "idle keyword locks are dropped");
}

#[tokio::test]
async fn abandoned_resolve_still_stores_and_holds_the_keyword() {
    let (resolver, store, source) = resolver(
        MemoryStore::default(),
        ScriptedSource::slow(30, Duration::from_millis(200)),
    );

    let abandoned =
        tokio::time::timeout(Duration::from_millis(20), resolver.resolve("bakeries", size(30)))
            .await;
    assert!(abandoned.is_err(), "caller gave up before the scrape finished");

    let retried = resolver.resolve("bakeries", size(30)).await.expect("resolve");
    assert_eq!(retried.size, 30);
    assert_eq!(source.calls(), 1, "retry waits for the running scrape");
    assert_eq!(store.inserts.load(Ordering::SeqCst), 1);
    assert_eq!(resolver.in_flight_len(), 0);
}

#[tokio::test]
async fn abandoned_resolve_is_stored_and_releases_its_lock() {
    let (resolver, store, source) = resolver(
        MemoryStore::default(),
        ScriptedSource::slow(30, Duration::from_millis(100)),
    );

    let abandoned =
        tokio::time::timeout(Duration::from_millis(10), resolver.resolve("florists", size(30)))
            .await;
    assert!(abandoned.is_err());

    tokio::time::sleep(Duration::from_millis(400)).await;

    assert_eq!(source.calls(), 1);
    assert_eq!(store.get("florists").map(|entry| entry.size), Some(30));
    assert_eq!(resolver.in_flight_len(), 0, "no lock entry is left behind");
}

#[tokio::test]
async fn different_keywords_do_not_wait_on_each_other() {
    let (resolver, _, source) = resolver(
        MemoryStore::default(),
        ScriptedSource::slow(30, Duration::from_millis(50)),
    );
    let resolver = Arc::new(resolver);

    let a = {
        let resolver = Arc::clone(&resolver);
        tokio::spawn(async move { resolver.resolve("bakeries", size(30)).await })
    };
    let b = {
        let resolver = Arc::clone(&resolver);
        tokio::spawn(async move { resolver.resolve("florists", size(30)).await })
    };

    a.await.expect("join").expect("resolve");
    b.await.expect("join").expect("resolve");
    assert_eq!(source.calls(), 2);
}
