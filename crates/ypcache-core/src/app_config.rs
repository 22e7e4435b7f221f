use std::net::SocketAddr;

use crate::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    /// Required by the server and the cache commands; a bare scrape runs
    /// without it.
    pub database_url: Option<String>,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    /// Origin of the business directory, e.g. `https://yellowpages.com.eg`.
    pub directory_base_url: String,
    pub scraper_request_timeout_secs: u64,
    /// Total fetch attempts per URL, including the first.
    pub scraper_max_attempts: u32,
    pub scraper_jitter_min_ms: u64,
    pub scraper_jitter_max_ms: u64,
    pub cache_sweep_interval_secs: u64,
}

impl AppConfig {
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnvVar`] when `DATABASE_URL` was not set.
    pub fn require_database_url(&self) -> Result<&str, ConfigError> {
        self.database_url
            .as_deref()
            .ok_or_else(|| ConfigError::MissingEnvVar("DATABASE_URL".to_string()))
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("directory_base_url", &self.directory_base_url)
            .field(
                "scraper_request_timeout_secs",
                &self.scraper_request_timeout_secs,
            )
            .field("scraper_max_attempts", &self.scraper_max_attempts)
            .field("scraper_jitter_min_ms", &self.scraper_jitter_min_ms)
            .field("scraper_jitter_max_ms", &self.scraper_jitter_max_ms)
            .field("cache_sweep_interval_secs", &self.cache_sweep_interval_secs)
            .finish()
    }
}
