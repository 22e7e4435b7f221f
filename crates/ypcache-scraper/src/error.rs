use thiserror::Error;

/// Failures that abort a scrape outright.
///
/// Per-page and per-field problems are absorbed by the pipeline (retries,
/// partial results, default values) and never surface here.
#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },
}
