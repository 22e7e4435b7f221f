//! Parser for one search-results page of the directory.
//!
//! ## Markup shape
//!
//! Result cards live under the first `.companyCards` container, one
//! `.item-row` per business. Sponsored cards carry the extra `search-ads`
//! class and are skipped. Pagination is a `.pagination` list whose forward
//! control is the anchor labelled `aria-label="Next"`.
//!
//! Each card field is extracted independently: a field whose element is
//! missing gets its default (`""`, or `[""]` for categories) and the card is
//! still emitted.

use std::sync::LazyLock;

use reqwest::Url;
use scraper::{ElementRef, Html, Selector};
use ypcache_core::ListingStub;

use crate::extract::{absolutize, attr, element_text, selector};

const AD_CLASS: &str = "search-ads";

static CARD_CONTAINER: LazyLock<Selector> = LazyLock::new(|| selector(".companyCards"));
static CARD: LazyLock<Selector> = LazyLock::new(|| selector(".item-row"));
static MORE_INFO: LazyLock<Selector> = LazyLock::new(|| selector(".more-info"));
static TITLE: LazyLock<Selector> = LazyLock::new(|| selector(".item-title"));
static ABOUT: LazyLock<Selector> = LazyLock::new(|| selector(".item-aboutUs"));
static ADDRESS: LazyLock<Selector> = LazyLock::new(|| selector(".address-text"));
static WEBSITE: LazyLock<Selector> = LazyLock::new(|| selector(".website"));
static CATEGORY: LazyLock<Selector> = LazyLock::new(|| selector(".category"));
static IMAGE: LazyLock<Selector> = LazyLock::new(|| selector("img.openDynamicSlider"));
static ANCHOR: LazyLock<Selector> = LazyLock::new(|| selector("a"));
static PAGINATION: LazyLock<Selector> = LazyLock::new(|| selector(".pagination"));
static NEXT_LINK: LazyLock<Selector> = LazyLock::new(|| selector(r#"a[aria-label="Next"]"#));

/// Everything one results page yields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingPage {
    pub listings: Vec<ListingStub>,
    /// Absolute URL of the following page, if the page links to one.
    pub next_page: Option<Url>,
}

impl ListingPage {
    /// A page with no cards and no forward link marks the end of results.
    #[must_use]
    pub fn is_end_of_results(&self) -> bool {
        self.listings.is_empty() && self.next_page.is_none()
    }
}

/// Parses a results page fetched from `page_url`.
///
/// Relative links in the markup are resolved against `page_url`.
#[must_use]
pub fn parse_listing_page(html: &str, page_url: &Url) -> ListingPage {
    let document = Html::parse_document(html);

    let listings = document
        .select(&CARD_CONTAINER)
        .next()
        .map(|container| {
            container
                .select(&CARD)
                .filter(|card| !is_advertisement(*card))
                .map(|card| parse_card(card, page_url))
                .collect()
        })
        .unwrap_or_default();

    let next_page = document
        .select(&PAGINATION)
        .next()
        .and_then(|pagination| pagination.select(&NEXT_LINK).next())
        .and_then(|link| attr(link, "href"))
        .and_then(|href| absolutize(page_url, &href));

    ListingPage {
        listings,
        next_page,
    }
}

fn is_advertisement(card: ElementRef<'_>) -> bool {
    card.value().classes().any(|class| class == AD_CLASS)
}

fn parse_card(card: ElementRef<'_>, page_url: &Url) -> ListingStub {
    ListingStub {
        link: card_link(card, page_url).unwrap_or_default(),
        name: card_name(card).unwrap_or_default(),
        description: card_description(card).unwrap_or_default(),
        address: card_address(card).unwrap_or_default(),
        website: card_website(card).unwrap_or_default(),
        categories: card_categories(card),
        image_url: card_image(card, page_url).unwrap_or_default(),
    }
}

fn card_link(card: ElementRef<'_>, page_url: &Url) -> Option<String> {
    let href = card.select(&MORE_INFO).next().and_then(|a| attr(a, "href"))?;
    absolutize(page_url, &href).map(String::from)
}

fn card_name(card: ElementRef<'_>) -> Option<String> {
    card.select(&TITLE).next().and_then(element_text)
}

fn card_description(card: ElementRef<'_>) -> Option<String> {
    card.select(&ABOUT)
        .next()
        .and_then(|about| about.select(&ANCHOR).next())
        .and_then(element_text)
}

fn card_address(card: ElementRef<'_>) -> Option<String> {
    card.select(&ADDRESS).next().and_then(element_text)
}

fn card_website(card: ElementRef<'_>) -> Option<String> {
    card.select(&WEBSITE).next().and_then(|a| attr(a, "href"))
}

fn card_categories(card: ElementRef<'_>) -> Vec<String> {
    let categories: Vec<String> = card
        .select(&CATEGORY)
        .filter_map(|category| category.select(&ANCHOR).next())
        .map(|a| element_text(a).unwrap_or_default())
        .collect();

    if categories.is_empty() {
        vec![String::new()]
    } else {
        categories
    }
}

fn card_image(card: ElementRef<'_>, page_url: &Url) -> Option<String> {
    let src = card.select(&IMAGE).next().and_then(|img| attr(img, "data-src"))?;
    absolutize(page_url, &src).map(String::from)
}

#[cfg(test)]
#[path = "listing_page_test.rs"]
mod tests;
