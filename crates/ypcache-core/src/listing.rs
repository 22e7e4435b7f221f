//! Business listing records produced by the directory scraper.
//!
//! A [`ListingStub`] is what a search-results card yields. Enrichment from the
//! listing's detail page adds a [`ListingDetails`]; the two are flattened into
//! a single JSON object as [`EnrichedListing`], which is what the cache stores
//! and what `/search` returns.
//!
//! No field is ever `null` on the wire: missing strings are `""` and a missing
//! review count is `""` as well, matching the historical document shape.

use serde::{Deserialize, Serialize};

/// One search-result card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingStub {
    /// Absolute URL of the listing's detail page.
    pub link: String,
    pub name: String,
    pub description: String,
    pub address: String,
    pub website: String,
    /// Never empty; a card without categories carries a single `""`.
    pub categories: Vec<String>,
    pub image_url: String,
}

impl Default for ListingStub {
    fn default() -> Self {
        Self {
            link: String::new(),
            name: String::new(),
            description: String::new(),
            address: String::new(),
            website: String::new(),
            categories: vec![String::new()],
            image_url: String::new(),
        }
    }
}

/// Attributes extracted from a listing's detail page and the phone lookup.
///
/// Every field is independently optional; [`Default`] is the "nothing could be
/// extracted" record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingDetails {
    /// Numeric listing id: the last run of digits in the link.
    pub id: String,
    pub address_details: String,
    #[serde(rename = "lat")]
    pub latitude: String,
    #[serde(rename = "long")]
    pub longitude: String,
    #[serde(rename = "rate")]
    pub rating: String,
    #[serde(rename = "reviews", with = "count_or_empty")]
    pub review_count: Option<u32>,
    /// Profile URLs joined with `" - "`.
    pub social_accounts: String,
    /// Keyword tags joined with `" - "`.
    pub key_words: String,
    /// Branch listing ids joined with `" - "`.
    pub total_branches: String,
    pub phone: String,
    pub whatsapp: String,
}

/// A stub plus its detail-page attributes, serialised as one flat object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedListing {
    #[serde(flatten)]
    pub stub: ListingStub,
    #[serde(flatten)]
    pub details: ListingDetails,
}

impl EnrichedListing {
    #[must_use]
    pub fn new(stub: ListingStub, details: ListingDetails) -> Self {
        Self { stub, details }
    }

    /// A listing whose enrichment produced nothing beyond its stub.
    #[must_use]
    pub fn from_stub(stub: ListingStub) -> Self {
        Self::new(stub, ListingDetails::default())
    }
}

/// `reviews` is an integer when known and `""` otherwise.
mod count_or_empty {
    use serde::{Deserialize, Deserializer, Serializer};

    #[allow(clippy::ref_option)]
    pub(super) fn serialize<S: Serializer>(value: &Option<u32>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(n) => s.serialize_u32(*n),
            None => s.serialize_str(""),
        }
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u32>, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Count(u32),
            Text(String),
        }

        Ok(match Raw::deserialize(d)? {
            Raw::Count(n) => Some(n),
            Raw::Text(s) => s.trim().parse().ok(),
        })
    }
}
