pub mod app_config;
pub mod cache;
pub mod config;
pub mod listing;

pub use app_config::{AppConfig, Environment};
pub use cache::{CachedResponse, FRESHNESS_WINDOW_HOURS};
pub use config::{load_app_config, load_app_config_from_env};
pub use listing::{EnrichedListing, ListingDetails, ListingStub};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
