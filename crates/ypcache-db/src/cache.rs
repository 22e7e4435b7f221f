//! Database operations for the `cached_responses` table.
//!
//! One row per keyword. `results` holds the listing array as JSONB, so the
//! table is effectively a keyed, timestamped document cache.

use std::future::Future;

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use ypcache_core::{CachedResponse, EnrichedListing};

use crate::DbError;

// ---------------------------------------------------------------------------
// Row type
// ---------------------------------------------------------------------------

/// A row from the `cached_responses` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CachedResponseRow {
    pub keyword: String,
    pub size: i32,
    pub created_at: DateTime<Utc>,
    pub results: Json<Vec<EnrichedListing>>,
}

impl From<CachedResponseRow> for CachedResponse {
    fn from(row: CachedResponseRow) -> Self {
        let results = row.results.0;
        if usize::try_from(row.size).ok() != Some(results.len()) {
            tracing::warn!(
                keyword = %row.keyword,
                stored_size = row.size,
                actual = results.len(),
                "stored size disagrees with results; using result count"
            );
        }
        CachedResponse::new(row.keyword, results, row.created_at)
    }
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Returns the entry for `keyword`, fresh or not, or `None` if there is none.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails or the stored document does
/// not decode.
pub async fn find_cached_response(
    pool: &PgPool,
    keyword: &str,
) -> Result<Option<CachedResponse>, DbError> {
    let row = sqlx::query_as::<_, CachedResponseRow>(
        "SELECT keyword, size, created_at, results \
         FROM cached_responses \
         WHERE keyword = $1",
    )
    .bind(keyword)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(CachedResponse::from))
}

/// Deletes the entry for `keyword`. Returns the number of rows removed (0 or 1).
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn delete_cached_response(pool: &PgPool, keyword: &str) -> Result<u64, DbError> {
    let result = sqlx::query("DELETE FROM cached_responses WHERE keyword = $1")
        .bind(keyword)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

/// Stores `response`, replacing any existing entry for the same keyword.
///
/// The stored `size` is the number of results, whatever count was requested.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn insert_cached_response(
    pool: &PgPool,
    response: &CachedResponse,
) -> Result<(), DbError> {
    let size = i32::try_from(response.results.len()).unwrap_or(i32::MAX);

    sqlx::query(
        "INSERT INTO cached_responses (keyword, size, created_at, results) \
         VALUES ($1, $2, $3, $4) \
         ON CONFLICT (keyword) DO UPDATE \
         SET size = EXCLUDED.size, \
             created_at = EXCLUDED.created_at, \
             results = EXCLUDED.results",
    )
    .bind(&response.keyword)
    .bind(size)
    .bind(response.date)
    .bind(Json(&response.results))
    .execute(pool)
    .await?;

    Ok(())
}

/// Deletes every entry created strictly before `cutoff`. Returns the number of
/// rows removed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn delete_expired_responses(
    pool: &PgPool,
    cutoff: DateTime<Utc>,
) -> Result<u64, DbError> {
    let result = sqlx::query("DELETE FROM cached_responses WHERE created_at < $1")
        .bind(cutoff)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

// ---------------------------------------------------------------------------
// Store seam
// ---------------------------------------------------------------------------

/// Keyed persistence for cached search results.
pub trait CacheStore: Send + Sync + 'static {
    fn find_by_keyword(
        &self,
        keyword: &str,
    ) -> impl Future<Output = Result<Option<CachedResponse>, DbError>> + Send;

    fn delete_by_keyword(&self, keyword: &str)
        -> impl Future<Output = Result<u64, DbError>> + Send;

    fn insert(&self, response: &CachedResponse)
        -> impl Future<Output = Result<(), DbError>> + Send;

    /// Removes every entry whose `date` is strictly before `cutoff`.
    fn delete_older_than(
        &self,
        cutoff: DateTime<Utc>,
    ) -> impl Future<Output = Result<u64, DbError>> + Send;

    /// Cheap liveness probe used by `/health`.
    fn ping(&self) -> impl Future<Output = Result<(), DbError>> + Send;
}

/// [`CacheStore`] backed by the `cached_responses` table.
#[derive(Debug, Clone)]
pub struct PgCacheStore {
    pool: PgPool,
}

impl PgCacheStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl CacheStore for PgCacheStore {
    async fn find_by_keyword(&self, keyword: &str) -> Result<Option<CachedResponse>, DbError> {
        find_cached_response(&self.pool, keyword).await
    }

    async fn delete_by_keyword(&self, keyword: &str) -> Result<u64, DbError> {
        delete_cached_response(&self.pool, keyword).await
    }

    async fn insert(&self, response: &CachedResponse) -> Result<(), DbError> {
        insert_cached_response(&self.pool, response).await
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, DbError> {
        delete_expired_responses(&self.pool, cutoff).await
    }

    async fn ping(&self) -> Result<(), DbError> {
        crate::health_check(&self.pool).await
    }
}
