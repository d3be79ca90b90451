use crate::app_config::{AppConfig, Environment, ProviderKeys};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if values are invalid.
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
/// Returns `ConfigError` if values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so tests can use a plain `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let env = parse_environment(&or_default("EMBEDKIT_ENV", "development"))?;

    let bind_addr: SocketAddr =
        parse_as("EMBEDKIT_BIND_ADDR", &or_default("EMBEDKIT_BIND_ADDR", "0.0.0.0:3000"))?;
    let log_level = or_default("EMBEDKIT_LOG_LEVEL", "info");
    let settings_path = optional("EMBEDKIT_SETTINGS_PATH").map(PathBuf::from);
    let storage_path = PathBuf::from(or_default("EMBEDKIT_STORAGE_PATH", "./assets"));

    let cache_ttl_secs: u64 = parse_as(
        "EMBEDKIT_CACHE_TTL_SECS",
        &or_default("EMBEDKIT_CACHE_TTL_SECS", "300"),
    )?;
    let min_image_size: u32 = parse_as(
        "EMBEDKIT_MIN_IMAGE_SIZE",
        &or_default("EMBEDKIT_MIN_IMAGE_SIZE", "16"),
    )?;
    let max_file_name_length: usize = parse_as(
        "EMBEDKIT_MAX_FILE_NAME_LENGTH",
        &or_default("EMBEDKIT_MAX_FILE_NAME_LENGTH", "50"),
    )?;
    let max_asset_name_length: usize = parse_as(
        "EMBEDKIT_MAX_ASSET_NAME_LENGTH",
        &or_default("EMBEDKIT_MAX_ASSET_NAME_LENGTH", "50"),
    )?;
    if max_file_name_length == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "EMBEDKIT_MAX_FILE_NAME_LENGTH".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }

    let fetch_timeout_secs: u64 = parse_as(
        "EMBEDKIT_FETCH_TIMEOUT_SECS",
        &or_default("EMBEDKIT_FETCH_TIMEOUT_SECS", "15"),
    )?;
    let user_agent = or_default("EMBEDKIT_USER_AGENT", "embedkit/0.1 (+embed-metadata)");
    let fetch_max_retries: u32 = parse_as(
        "EMBEDKIT_FETCH_MAX_RETRIES",
        &or_default("EMBEDKIT_FETCH_MAX_RETRIES", "2"),
    )?;
    let fetch_retry_backoff_base_secs: u64 = parse_as(
        "EMBEDKIT_FETCH_RETRY_BACKOFF_BASE_SECS",
        &or_default("EMBEDKIT_FETCH_RETRY_BACKOFF_BASE_SECS", "1"),
    )?;

    let provider_keys = ProviderKeys {
        embedly: optional("EMBEDLY_KEY"),
        iframely: optional("IFRAMELY_KEY"),
        google: optional("GOOGLE_KEY"),
        soundcloud: optional("SOUNDCLOUD_KEY"),
        facebook: optional("FACEBOOK_KEY"),
    };

    Ok(AppConfig {
        env,
        bind_addr,
        log_level,
        settings_path,
        storage_path,
        cache_ttl_secs,
        min_image_size,
        max_file_name_length,
        max_asset_name_length,
        fetch_timeout_secs,
        user_agent,
        fetch_max_retries,
        fetch_retry_backoff_base_secs,
        provider_keys,
    })
}

fn parse_as<T>(var: &str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns `ConfigError::InvalidEnvVar` for anything but the three known names.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "EMBEDKIT_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
