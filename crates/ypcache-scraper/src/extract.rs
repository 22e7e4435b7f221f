//! Small text and DOM helpers shared by the listing-page and detail parsers.
//!
//! Every helper returns `Option` so a field that cannot be found simply falls
//! back to its default at the call site.

use std::sync::LazyLock;

use regex::Regex;
use reqwest::Url;
use scraper::{ElementRef, Selector};

static DIGITS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("valid digits regex"));
static INTL_PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\+\d+").expect("valid phone regex"));

/// Separator used when several values are flattened into one field.
pub(crate) const JOIN_SEPARATOR: &str = " - ";

pub(crate) fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid selector {css:?}: {e}"))
}

/// Trimmed text content of an element, `None` when blank.
pub(crate) fn element_text(element: ElementRef<'_>) -> Option<String> {
    let text = element.text().collect::<String>();
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Trimmed attribute value, `None` when missing or blank.
pub(crate) fn attr(element: ElementRef<'_>, name: &str) -> Option<String> {
    element
        .value()
        .attr(name)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Resolves `href` against the page it was found on.
///
/// Handles absolute, protocol-relative (`//host/path`) and root-relative hrefs.
pub(crate) fn absolutize(base: &Url, href: &str) -> Option<Url> {
    base.join(href.trim()).ok()
}

/// The last run of ASCII digits in `s`.
pub(crate) fn last_integer(s: &str) -> Option<&str> {
    DIGITS_RE.find_iter(s).last().map(|m| m.as_str())
}

/// The first run of ASCII digits in `s`, parsed.
pub(crate) fn first_integer(s: &str) -> Option<u32> {
    DIGITS_RE.find(s).and_then(|m| m.as_str().parse().ok())
}

/// An international phone number (`+` followed by digits) inside `s`.
pub(crate) fn international_number(s: &str) -> Option<&str> {
    INTL_PHONE_RE.find(s).map(|m| m.as_str())
}

/// Joins non-empty parts with [`JOIN_SEPARATOR`]; `None` when nothing remains.
pub(crate) fn join_non_empty<I>(parts: I) -> Option<String>
where
    I: IntoIterator<Item = String>,
{
    let parts: Vec<String> = parts.into_iter().filter(|p| !p.is_empty()).collect();
    (!parts.is_empty()).then(|| parts.join(JOIN_SEPARATOR))
}
