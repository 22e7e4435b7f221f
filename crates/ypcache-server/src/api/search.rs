use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::Deserialize;
use ypcache_core::CachedResponse;
use ypcache_db::CacheStore;
use ypcache_scraper::ListingSource;

use crate::middleware::RequestId;
use crate::resolver::{RequestedSize, ResolveError};

use super::{ApiError, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct SearchQuery {
    pub keyword: Option<String>,
    /// Kept as text so a non-numeric size is reported like any other bad size.
    pub size: Option<String>,
}

pub(super) async fn search<S: CacheStore, L: ListingSource>(
    State(state): State<AppState<S, L>>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<CachedResponse>, ApiError> {
    let keyword = query
        .keyword
        .as_deref()
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .ok_or_else(|| ApiError::new(req_id.0.clone(), "validation_error", "keyword is required"))?;

    let size = parse_size(query.size.as_deref())
        .map_err(|e| map_resolve_error(req_id.0.clone(), &e))?;

    state
        .resolver
        .resolve(keyword, size)
        .await
        .map(Json)
        .map_err(|e| map_resolve_error(req_id.0, &e))
}

fn parse_size(raw: Option<&str>) -> Result<RequestedSize, ResolveError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(RequestedSize::default()),
        Some(text) => {
            let size = text
                .parse::<i64>()
                .map_err(|_| ResolveError::InvalidSize(text.to_string()))?;
            RequestedSize::new(size)
        }
    }
}

fn map_resolve_error(request_id: String, error: &ResolveError) -> ApiError {
    match error {
        ResolveError::InvalidSize(_) => {
            tracing::warn!(error = %error, "rejected search request");
            ApiError::new(request_id, "validation_error", "Size must be between 30 and 100")
        }
        ResolveError::NoResults(_) => ApiError::new(request_id, "not_found", "No results found."),
        ResolveError::Storage(_) => {
            tracing::error!(error = %error, "search failed");
            ApiError::new(request_id, "internal_error", "Failed to cache response")
        }
        ResolveError::Scrape(_) | ResolveError::Worker(_) => {
            tracing::error!(error = %error, "search failed");
            ApiError::new(request_id, "internal_error", "scrape failed")
        }
    }
}
