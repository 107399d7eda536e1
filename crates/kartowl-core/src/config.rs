use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Desktop Chrome UA presented by every browser session.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

const DEFAULT_CORS_ORIGINS: &str = "http://localhost:5173,http://localhost:3000";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
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
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so tests can drive it with a map.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let or_default = |var: &str, default: &str| -> String {
        optional(var).unwrap_or_else(|| default.to_string())
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

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_bool = |var: &str, default: &str| -> Result<bool, ConfigError> {
        match or_default(var, default).to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            other => Err(invalid(var, format!("expected a boolean, got {other:?}"))),
        }
    };

    let database_url = optional("DATABASE_URL");
    let env = parse_environment(&or_default("KARTOWL_ENV", "development"))?;

    let bind_addr = parse_addr("KARTOWL_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = or_default("KARTOWL_LOG_LEVEL", "info");
    let cors_origins = parse_origins(&or_default("KARTOWL_CORS_ORIGINS", DEFAULT_CORS_ORIGINS));

    let db_max_connections = parse_u32("KARTOWL_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("KARTOWL_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("KARTOWL_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let cache_ttl_secs = parse_u64("KARTOWL_CACHE_TTL_SECS", "3600")?;
    let cache_max_entries = parse_u64("KARTOWL_CACHE_MAX_ENTRIES", "1000")?;

    let rate_limit_max_requests = parse_usize("KARTOWL_RATE_LIMIT_MAX_REQUESTS", "120")?;
    let rate_limit_window_secs = parse_u64("KARTOWL_RATE_LIMIT_WINDOW_SECS", "60")?;

    let browser_executable = optional("KARTOWL_BROWSER_EXECUTABLE").map(PathBuf::from);
    let browser_headless = parse_bool("KARTOWL_BROWSER_HEADLESS", "true")?;
    let browser_launch_timeout_secs = parse_u64("KARTOWL_BROWSER_LAUNCH_TIMEOUT_SECS", "30")?;

    let scraper_user_agent = or_default("KARTOWL_SCRAPER_USER_AGENT", DEFAULT_USER_AGENT);
    let scraper_jitter_min_ms = parse_u64("KARTOWL_SCRAPER_JITTER_MIN_MS", "500")?;
    let scraper_jitter_max_ms = parse_u64("KARTOWL_SCRAPER_JITTER_MAX_MS", "1500")?;
    if scraper_jitter_min_ms > scraper_jitter_max_ms {
        return Err(invalid(
            "KARTOWL_SCRAPER_JITTER_MIN_MS",
            format!("{scraper_jitter_min_ms} exceeds KARTOWL_SCRAPER_JITTER_MAX_MS ({scraper_jitter_max_ms})"),
        ));
    }

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        cors_origins,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        cache_ttl_secs,
        cache_max_entries,
        rate_limit_max_requests,
        rate_limit_window_secs,
        browser_executable,
        browser_headless,
        browser_launch_timeout_secs,
        scraper_user_agent,
        scraper_jitter_min_ms,
        scraper_jitter_max_ms,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "KARTOWL_ENV".to_string(),
            reason: format!("unknown environment {other:?}"),
        }),
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
