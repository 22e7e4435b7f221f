//! Single-URL fetching with a bounded retry budget.
//!
//! An [`HttpSession`] owns the current HTTP client and the [`RetryPolicy`].
//! [`HttpSession::fetch`] attempts a URL up to `max_attempts` times:
//!
//! | Outcome of an attempt      | Reaction                                               |
//! |----------------------------|--------------------------------------------------------|
//! | `200 OK`                   | body returned immediately                              |
//! | any other status           | sleep `jitter × (attempt + 1)`, keep the same client    |
//! | transport error            | replace the client with a fresh [`Identity`]           |
//!
//! Between attempts there is an additional `jitter` pause. Once the budget is
//! spent the fetch yields `None`; callers treat that as "no more data", not as
//! an error.

use std::time::Duration;

use rand::Rng;
use reqwest::{Client, StatusCode};

use crate::error::ScraperError;
use crate::identity::Identity;

/// Retry budget and jitter window for one URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first. Values below 1 are treated as 1.
    pub max_attempts: u32,
    /// Lower bound (inclusive) of the uniform jitter draw.
    pub jitter_min: Duration,
    /// Upper bound (exclusive) of the uniform jitter draw.
    pub jitter_max: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            jitter_min: Duration::from_secs(1),
            jitter_max: Duration::from_secs(3),
        }
    }
}

impl RetryPolicy {
    /// A policy with no delays at all. Useful against local test servers.
    #[must_use]
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            jitter_min: Duration::ZERO,
            jitter_max: Duration::ZERO,
        }
    }

    /// Uniform draw from `[jitter_min, jitter_max)`.
    #[must_use]
    pub fn jitter(&self) -> Duration {
        if self.jitter_max <= self.jitter_min {
            return self.jitter_min;
        }
        let secs = rand::rng()
            .random_range(self.jitter_min.as_secs_f64()..self.jitter_max.as_secs_f64());
        Duration::from_secs_f64(secs)
    }

    /// Wait after a non-200 answer on the zero-based `attempt`.
    #[must_use]
    pub fn status_backoff(&self, attempt: u32) -> Duration {
        self.jitter().saturating_mul(attempt.saturating_add(1))
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// The HTTP client a crawl runs with, plus the policy for retrying it.
#[derive(Debug)]
pub struct HttpSession {
    client: Client,
    timeout: Duration,
    policy: RetryPolicy,
    rotations: u32,
}

impl HttpSession {
    /// Builds a session presenting a freshly drawn [`Identity`].
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the HTTP client cannot be built.
    pub fn new(timeout: Duration, policy: RetryPolicy) -> Result<Self, ScraperError> {
        let identity = Identity::random();
        tracing::debug!(user_agent = identity.user_agent(), "created scraper session");
        Ok(Self {
            client: identity.build_client(timeout)?,
            timeout,
            policy,
            rotations: 0,
        })
    }

    #[must_use]
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// How many times the client has been replaced after transport failures.
    #[must_use]
    pub fn rotations(&self) -> u32 {
        self.rotations
    }

    /// Fetches `url` and returns its body, or `None` once the retry budget is
    /// exhausted.
    pub async fn fetch(&mut self, url: &str) -> Option<String> {
        let max_attempts = self.policy.attempts();

        for attempt in 0..max_attempts {
            match self.client.get(url).send().await {
                Ok(response) if response.status() == StatusCode::OK => {
                    match response.text().await {
                        Ok(body) => {
                            tracing::debug!(url, attempt, "fetch succeeded");
                            return Some(body);
                        }
                        Err(e) => {
                            tracing::warn!(url, attempt, error = %e, "failed reading response body");
                            self.rotate_identity();
                        }
                    }
                }
                Ok(response) => {
                    let wait = self.policy.status_backoff(attempt);
                    tracing::warn!(
                        url,
                        attempt,
                        status = response.status().as_u16(),
                        wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
                        "non-200 response; backing off"
                    );
                    tokio::time::sleep(wait).await;
                }
                Err(e) => {
                    tracing::warn!(url, attempt, error = %e, "request failed; rotating identity");
                    self.rotate_identity();
                }
            }

            if attempt + 1 < max_attempts {
                tokio::time::sleep(self.policy.jitter()).await;
            }
        }

        tracing::error!(url, max_attempts, "retry budget exhausted");
        None
    }

    /// One-shot JSON GET with no retries.
    ///
    /// # Errors
    ///
    /// Returns [`reqwest::Error`] on transport failure, a non-2xx status, or a
    /// body that does not deserialize into `T`.
    pub async fn get_json<T>(&self, url: &str) -> Result<T, reqwest::Error>
    where
        T: serde::de::DeserializeOwned,
    {
        self.client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json::<T>()
            .await
    }

    /// Replaces the client with one presenting a new identity. If building the
    /// replacement fails the current client is kept.
    fn rotate_identity(&mut self) {
        let identity = Identity::random();
        match identity.build_client(self.timeout) {
            Ok(client) => {
                self.client = client;
                self.rotations += 1;
                tracing::info!(user_agent = identity.user_agent(), "rotated scraper identity");
            }
            Err(e) => {
                tracing::error!(error = %e, "could not build replacement client; keeping current one");
            }
        }
    }
}
