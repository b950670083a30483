//! Configuration loader for the `codemetal-weatherflow` service.
//!
//! This module centralizes all runtime configuration values and their defaults,
//! loading from environment variables (with optional `.env` file support
//! provided by the caller). By consolidating configuration logic here, we
//! avoid scattering `env::var` calls throughout the codebase.
//!
use std::env;
use std::time::Duration;

use anyhow::{anyhow, Result};

use crate::gaps::DEFAULT_MAX_RANGE_HOURS;
use crate::provider::Location;

/// Parse an optional integer environment variable with a default value.
macro_rules! parse_env_u32 {
    ($var_name:expr, $default:expr) => {
        env::var($var_name)
            .ok()
            .map(|v| v.parse::<u32>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Parse an optional floating point environment variable with a default value.
macro_rules! parse_env_f64 {
    ($var_name:expr, $default:expr) => {
        env::var($var_name)
            .ok()
            .map(|v| v.parse::<f64>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Parse a required string environment variable.
macro_rules! require_env {
    ($var_name:expr) => {
        env::var($var_name)
            .map_err(|_| anyhow!("{} must be set in .env or environment", $var_name))?
    };
}

/// Read an optional string environment variable, treating empty as unset.
fn optional_env(var_name: &str) -> Option<String> {
    env::var(var_name).ok().filter(|v| !v.trim().is_empty())
}

/// Strongly typed application configuration.
///
/// All fields are immutable after loading, ensuring a consistent configuration
/// snapshot for the lifetime of the application.
#[derive(Debug, Clone)]
pub struct Config {
    // ---
    /// PostgreSQL connection string.
    pub db_url: String,

    /// Maximum number of database connections in the pool.
    pub db_pool_max: u32,

    /// HTTP listen port.
    pub http_port: u16,

    /// The single site every reading describes.
    pub location: Location,

    /// OpenWeather API key; without it the live weather provider is not used.
    pub openweather_api_key: Option<String>,

    /// OpenWeather API base URL.
    pub openweather_url: String,

    /// NASA POWER daily point endpoint.
    pub nasa_power_url: String,

    /// Network timeout applied to every provider request.
    pub provider_timeout: Duration,

    /// Number of recent days tried against the solar provider.
    pub solar_lookback_days: u32,

    /// Rows per backfill batch.
    pub backfill_batch_size: u32,

    /// Slots this many hours before "now" are backfilled via acquisition.
    pub live_window_hours: u32,

    /// Period of the ingestion job.
    pub ingest_interval: Duration,

    /// Widest backfill or coverage range accepted, in hours.
    pub max_range_hours: u32,
}

/// Load configuration from environment variables with defaults.
///
/// Required:
/// - `DATABASE_URL` – PostgreSQL connection string
///
/// Optional:
/// - `DB_POOL_MAX` – max DB connections (default: 5)
/// - `HTTP_PORT` – listen port (default: 8080)
/// - `SITE_LATITUDE` / `SITE_LONGITUDE` – site (default: Manila, 14.5995 / 120.9842)
/// - `OPENWEATHER_API_KEY` – enables the live weather provider
/// - `OPENWEATHER_URL` – (default: `https://api.openweathermap.org/data`)
/// - `NASA_POWER_URL` – (default: `https://power.larc.nasa.gov/api/temporal/daily/point`)
/// - `PROVIDER_TIMEOUT_SECS` – provider request timeout (default: 10)
/// - `SOLAR_LOOKBACK_DAYS` – solar provider attempts (default: 7)
/// - `BACKFILL_BATCH_SIZE` – rows per batch (default: 100)
/// - `LIVE_WINDOW_HOURS` – near-real-time window for backfill (default: 1)
/// - `INGEST_INTERVAL_SECS` – ingestion job period (default: 3600)
/// - `MAX_RANGE_HOURS` – widest backfill/coverage range (default: 43920, five years)
///
/// Returns an error if any required variable is missing or invalid.
pub fn load_from_env() -> Result<Config> {
    // ---
    let defaults = Config::with_defaults(require_env!("DATABASE_URL"));

    let db_pool_max = parse_env_u32!("DB_POOL_MAX", defaults.db_pool_max);

    let http_port = parse_env_u32!("HTTP_PORT", defaults.http_port.into());
    let http_port =
        u16::try_from(http_port).map_err(|_| anyhow!("Invalid HTTP_PORT: {}", http_port))?;

    let location = Location {
        latitude: parse_env_f64!("SITE_LATITUDE", defaults.location.latitude),
        longitude: parse_env_f64!("SITE_LONGITUDE", defaults.location.longitude),
    };
    if !(-90.0..=90.0).contains(&location.latitude)
        || !(-180.0..=180.0).contains(&location.longitude)
    {
        return Err(anyhow!("Invalid site coordinates: {:?}", location));
    }

    let timeout_secs = parse_env_u32!(
        "PROVIDER_TIMEOUT_SECS",
        defaults.provider_timeout.as_secs() as u32
    );
    let interval_secs = parse_env_u32!(
        "INGEST_INTERVAL_SECS",
        defaults.ingest_interval.as_secs() as u32
    );

    Ok(Config {
        db_pool_max,
        http_port,
        location,
        openweather_api_key: optional_env("OPENWEATHER_API_KEY"),
        openweather_url: optional_env("OPENWEATHER_URL").unwrap_or(defaults.openweather_url),
        nasa_power_url: optional_env("NASA_POWER_URL").unwrap_or(defaults.nasa_power_url),
        provider_timeout: Duration::from_secs(timeout_secs.max(1).into()),
        solar_lookback_days: parse_env_u32!("SOLAR_LOOKBACK_DAYS", defaults.solar_lookback_days),
        backfill_batch_size: parse_env_u32!("BACKFILL_BATCH_SIZE", defaults.backfill_batch_size)
            .max(1),
        live_window_hours: parse_env_u32!("LIVE_WINDOW_HOURS", defaults.live_window_hours),
        ingest_interval: Duration::from_secs(interval_secs.max(1).into()),
        max_range_hours: parse_env_u32!("MAX_RANGE_HOURS", defaults.max_range_hours).max(1),
        db_url: defaults.db_url,
    })
}

impl Config {
    /// Configuration with every optional value at its default.
    pub fn with_defaults(db_url: impl Into<String>) -> Self {
        // ---
        Config {
            db_url: db_url.into(),
            db_pool_max: 5,
            http_port: 8080,
            location: Location {
                latitude: 14.5995,
                longitude: 120.9842,
            },
            openweather_api_key: None,
            openweather_url: "https://api.openweathermap.org/data".to_string(),
            nasa_power_url: "https://power.larc.nasa.gov/api/temporal/daily/point".to_string(),
            provider_timeout: Duration::from_secs(10),
            solar_lookback_days: 7,
            backfill_batch_size: 100,
            live_window_hours: 1,
            ingest_interval: Duration::from_secs(3600),
            max_range_hours: DEFAULT_MAX_RANGE_HOURS,
        }
    }

    /// Log the loaded configuration for debugging purposes.
    ///
    /// Masks sensitive information like database passwords and the API key
    /// while showing all configuration values that were loaded.
    pub fn log_config(&self) {
        // ---
        tracing::info!("Configuration loaded:");
        tracing::info!("  DATABASE_URL          : {}", mask_db_url(&self.db_url));
        tracing::info!("  DB_POOL_MAX           : {}", self.db_pool_max);
        tracing::info!("  HTTP_PORT             : {}", self.http_port);
        tracing::info!(
            "  SITE                  : {}, {}",
            self.location.latitude,
            self.location.longitude
        );
        tracing::info!(
            "  OPENWEATHER_API_KEY   : {}",
            if self.openweather_api_key.is_some() { "****" } else { "(unset, live weather disabled)" }
        );
        tracing::info!("  OPENWEATHER_URL       : {}", self.openweather_url);
        tracing::info!("  NASA_POWER_URL        : {}", self.nasa_power_url);
        tracing::info!("  PROVIDER_TIMEOUT_SECS : {}", self.provider_timeout.as_secs());
        tracing::info!("  SOLAR_LOOKBACK_DAYS   : {}", self.solar_lookback_days);
        tracing::info!("  BACKFILL_BATCH_SIZE   : {}", self.backfill_batch_size);
        tracing::info!("  LIVE_WINDOW_HOURS     : {}", self.live_window_hours);
        tracing::info!("  INGEST_INTERVAL_SECS  : {}", self.ingest_interval.as_secs());
        tracing::info!("  MAX_RANGE_HOURS       : {}", self.max_range_hours);
    }
}

/// Mask the password in a database URL.
fn mask_db_url(db_url: &str) -> String {
    // ---
    if let Some(at_pos) = db_url.rfind('@') {
        if let Some(colon_pos) = db_url[..at_pos].rfind(':') {
            // only the scheme colon, no password
            if !db_url[..colon_pos].ends_with("postgres") && !db_url[..colon_pos].ends_with("postgresql") {
                return format!("{}:****{}", &db_url[..colon_pos], &db_url[at_pos..]);
            }
        }
    }
    db_url.to_string()
}
