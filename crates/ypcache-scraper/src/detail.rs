//! Detail-page enrichment.
//!
//! [`extract_page_details`] reads a detail page into a [`ListingDetails`],
//! one independent extraction per field. [`enrich_listing`] drives the network
//! side: the detail page fetch and the phone lookup keyed by listing id. Both
//! calls can fail on their own without affecting the other, and neither
//! failure drops the listing.

use std::sync::LazyLock;

use reqwest::Url;
use scraper::{Html, Selector};
use serde_json::Value;
use ypcache_core::{EnrichedListing, ListingDetails, ListingStub};

use crate::extract::{
    attr, element_text, first_integer, international_number, join_non_empty, last_integer,
    selector,
};
use crate::fetch::HttpSession;

static ADDRESS_DETAILS: LazyLock<Selector> =
    LazyLock::new(|| selector("div.flex-column.main-details > div.company-address > span"));
static LOCATION: LazyLock<Selector> = LazyLock::new(|| selector("p > span.distance"));
static RATING: LazyLock<Selector> =
    LazyLock::new(|| selector("div.rating-div-details > p.rating-value"));
static REVIEW_TOTAL: LazyLock<Selector> =
    LazyLock::new(|| selector("div.rating-div-details > p.rating-total"));
static SOCIAL_LINKS: LazyLock<Selector> = LazyLock::new(|| {
    selector("#first-row > div.main-btns-div.company-details > div.social-links-div > a")
});
static KEYWORD_TAGS: LazyLock<Selector> =
    LazyLock::new(|| selector("div.header-div.header-div-keywords > div > a"));
static BRANCHES: LazyLock<Selector> = LazyLock::new(|| selector("#branches > a"));
static WHATSAPP: LazyLock<Selector> = LazyLock::new(|| {
    selector("div.action-btns-div.company-details > div.whatsapp-div > a")
});

/// Extracts every detail-page field from `html`.
///
/// `id` and `phone` are left empty: the id comes from the listing link and the
/// phone from a separate lookup.
#[must_use]
pub fn extract_page_details(html: &str) -> ListingDetails {
    let document = Html::parse_document(html);
    let (latitude, longitude) = coordinates(&document).unwrap_or_default();

    ListingDetails {
        address_details: address_details(&document).unwrap_or_default(),
        latitude,
        longitude,
        rating: rating(&document).unwrap_or_default(),
        review_count: review_count(&document),
        social_accounts: social_accounts(&document).unwrap_or_default(),
        key_words: key_words(&document).unwrap_or_default(),
        total_branches: branch_ids(&document).unwrap_or_default(),
        whatsapp: whatsapp(&document).unwrap_or_default(),
        ..ListingDetails::default()
    }
}

/// Numeric id of a listing: the last run of digits in its link.
#[must_use]
pub fn listing_id(link: &str) -> Option<String> {
    last_integer(link).map(str::to_string)
}

/// URL of the phone lookup for listing `id`.
#[must_use]
pub fn phone_lookup_url(base_url: &Url, id: &str) -> Option<Url> {
    base_url.join(&format!("/en/getPhones/{id}/false")).ok()
}

/// Enriches one stub. Never fails as a whole.
///
/// The detail page is fetched through the session's retry budget. The phone
/// lookup is a single attempt and runs whenever the link yields an id, even
/// when the detail page could not be fetched.
pub async fn enrich_listing(
    session: &mut HttpSession,
    base_url: &Url,
    stub: ListingStub,
) -> EnrichedListing {
    let Some(id) = listing_id(&stub.link) else {
        tracing::debug!(link = %stub.link, "listing link has no id; skipping enrichment");
        return EnrichedListing::from_stub(stub);
    };

    let page_details = match session.fetch(&stub.link).await {
        Some(body) => extract_page_details(&body),
        None => {
            tracing::warn!(link = %stub.link, "detail page unavailable; using defaults");
            ListingDetails::default()
        }
    };

    let phone = lookup_phone(session, base_url, &id)
        .await
        .unwrap_or_default();

    tracing::debug!(name = %stub.name, id = %id, "listing enriched");
    EnrichedListing::new(
        stub,
        ListingDetails {
            id,
            phone,
            ..page_details
        },
    )
}

async fn lookup_phone(session: &HttpSession, base_url: &Url, id: &str) -> Option<String> {
    let url = phone_lookup_url(base_url, id)?;
    match session.get_json::<Vec<Value>>(url.as_str()).await {
        Ok(phones) => phones.into_iter().next().and_then(phone_text),
        Err(e) => {
            tracing::debug!(id, error = %e, "phone lookup failed");
            None
        }
    }
}

fn phone_text(value: Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn address_details(document: &Html) -> Option<String> {
    document.select(&ADDRESS_DETAILS).next().and_then(element_text)
}

fn coordinates(document: &Html) -> Option<(String, String)> {
    let location = document.select(&LOCATION).next()?;
    Some((attr(location, "data-lat")?, attr(location, "data-lng")?))
}

fn rating(document: &Html) -> Option<String> {
    document.select(&RATING).next().and_then(element_text)
}

fn review_count(document: &Html) -> Option<u32> {
    let caption = document.select(&REVIEW_TOTAL).next().and_then(element_text)?;
    first_integer(&caption)
}

fn social_accounts(document: &Html) -> Option<String> {
    join_non_empty(document.select(&SOCIAL_LINKS).filter_map(|a| attr(a, "href")))
}

fn key_words(document: &Html) -> Option<String> {
    join_non_empty(document.select(&KEYWORD_TAGS).filter_map(element_text))
}

fn branch_ids(document: &Html) -> Option<String> {
    join_non_empty(
        document
            .select(&BRANCHES)
            .filter_map(|a| attr(a, "href"))
            .filter_map(|href| last_integer(&href).map(str::to_string)),
    )
}

fn whatsapp(document: &Html) -> Option<String> {
    let href = document.select(&WHATSAPP).next().and_then(|a| attr(a, "href"))?;
    international_number(&href).map(str::to_string)
}

#[cfg(test)]
#[path = "detail_test.rs"]
mod tests;
