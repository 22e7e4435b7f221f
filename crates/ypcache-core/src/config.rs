use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Parsing and validation are decoupled from the process environment so the
/// rules can be exercised against a plain `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        or_default(var, default)
            .parse::<SocketAddr>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let database_url = lookup("DATABASE_URL")
        .ok()
        .filter(|url| !url.trim().is_empty());
    let env = parse_environment(&or_default("YPCACHE_ENV", "development"))?;

    let bind_addr = parse_addr("YPCACHE_BIND_ADDR", "0.0.0.0:8000")?;
    let log_level = or_default("YPCACHE_LOG_LEVEL", "info");

    let db_max_connections = parse_u32("YPCACHE_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("YPCACHE_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("YPCACHE_DB_ACQUIRE_TIMEOUT_SECS", "10")?;
    if db_min_connections > db_max_connections {
        return Err(invalid(
            "YPCACHE_DB_MIN_CONNECTIONS",
            format!("{db_min_connections} exceeds YPCACHE_DB_MAX_CONNECTIONS ({db_max_connections})"),
        ));
    }

    let directory_base_url = or_default("YPCACHE_DIRECTORY_BASE_URL", "https://yellowpages.com.eg")
        .trim_end_matches('/')
        .to_string();
    if !(directory_base_url.starts_with("https://") || directory_base_url.starts_with("http://"))
    {
        return Err(invalid(
            "YPCACHE_DIRECTORY_BASE_URL",
            "must be an absolute http(s) URL".to_string(),
        ));
    }

    let scraper_request_timeout_secs = parse_u64("YPCACHE_SCRAPER_REQUEST_TIMEOUT_SECS", "30")?;
    let scraper_max_attempts = parse_u32("YPCACHE_SCRAPER_MAX_ATTEMPTS", "4")?;
    if scraper_max_attempts == 0 {
        return Err(invalid(
            "YPCACHE_SCRAPER_MAX_ATTEMPTS",
            "must be at least 1".to_string(),
        ));
    }
    let scraper_jitter_min_ms = parse_u64("YPCACHE_SCRAPER_JITTER_MIN_MS", "1000")?;
    let scraper_jitter_max_ms = parse_u64("YPCACHE_SCRAPER_JITTER_MAX_MS", "3000")?;
    if scraper_jitter_min_ms > scraper_jitter_max_ms {
        return Err(invalid(
            "YPCACHE_SCRAPER_JITTER_MIN_MS",
            format!(
                "{scraper_jitter_min_ms} exceeds YPCACHE_SCRAPER_JITTER_MAX_MS ({scraper_jitter_max_ms})"
            ),
        ));
    }

    let cache_sweep_interval_secs = parse_u64("YPCACHE_CACHE_SWEEP_INTERVAL_SECS", "3600")?;
    if cache_sweep_interval_secs == 0 {
        return Err(invalid(
            "YPCACHE_CACHE_SWEEP_INTERVAL_SECS",
            "must be greater than zero".to_string(),
        ));
    }

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        directory_base_url,
        scraper_request_timeout_secs,
        scraper_max_attempts,
        scraper_jitter_min_ms,
        scraper_jitter_max_ms,
        cache_sweep_interval_secs,
    })
}

fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "YPCACHE_ENV".to_string(),
            reason: format!("unknown environment \"{other}\""),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
