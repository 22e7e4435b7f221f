//! Multi-page listing discovery.

use reqwest::Url;
use ypcache_core::ListingStub;

use crate::fetch::HttpSession;
use crate::listing_page::parse_listing_page;

/// Upper bound on pages visited in one crawl. Guards against pagination
/// controls that loop back on themselves.
pub const MAX_PAGES: usize = 50;

/// Walks result pages from `start_url` until `max_results` stubs are collected
/// or there is nothing more to read.
///
/// Stops at the first of:
/// - `max_results` reached,
/// - a page without a next link,
/// - a page whose fetch exhausts its retry budget,
/// - [`MAX_PAGES`] pages visited.
///
/// Stubs gathered before the stop are always kept, so a short or empty result
/// is a normal outcome rather than an error. The returned vector never holds
/// more than `max_results` stubs.
pub async fn crawl_listings(
    session: &mut HttpSession,
    start_url: Url,
    max_results: usize,
) -> Vec<ListingStub> {
    let mut listings: Vec<ListingStub> = Vec::new();
    let mut next_url = Some(start_url);
    let mut page_count = 0usize;

    while listings.len() < max_results {
        let Some(url) = next_url.take() else {
            break;
        };

        if page_count >= MAX_PAGES {
            tracing::warn!(max_pages = MAX_PAGES, "page limit reached; stopping crawl");
            break;
        }
        page_count += 1;

        let Some(body) = session.fetch(url.as_str()).await else {
            tracing::warn!(
                url = %url,
                collected = listings.len(),
                "page fetch gave up; keeping listings collected so far"
            );
            break;
        };

        let page = parse_listing_page(&body, &url);
        tracing::debug!(
            url = %url,
            found = page.listings.len(),
            has_next = page.next_page.is_some(),
            "parsed results page"
        );

        listings.extend(page.listings);
        next_url = page.next_page.filter(|next| *next != url);
    }

    listings.truncate(max_results);
    tracing::info!(
        collected = listings.len(),
        pages = page_count,
        "listing crawl finished"
    );
    listings
}
