//! Application entry point for the `codemetal-weatherflow` service.
//!
//! This binary orchestrates the full startup sequence:
//! - Loading configuration from environment variables or `.env`
//! - Initializing structured logging/tracing
//! - Establishing a PostgreSQL connection pool
//! - Creating the database schema if it does not exist
//! - Registering the live providers (solar always, weather when keyed)
//! - Mounting all API routes via the `routes` gateway (EMBP pattern)
//! - Binding the Axum HTTP server and serving requests
//!
//! # Environment Variables
//! - `DATABASE_URL` (**required**) – PostgreSQL connection string
//! - `WEATHERFLOW_LOG_LEVEL` (optional) – log verbosity (default: `debug`)
//! - `WEATHERFLOW_SPAN_EVENTS` (optional) – span event mode for tracing
//!
//! See `config.rs` for the remaining settings.
use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Result;
use axum::Router;
use dotenvy::dotenv;
use is_terminal::IsTerminal;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

use weatherflow::{config, routes, schema};
use weatherflow::{AppState, NasaPowerProvider, OpenWeatherProvider, PgStore, Provider};

// ---

#[tokio::main]
async fn main() -> Result<()> {
    // ---
    dotenv().ok();
    init_tracing();

    let cfg = config::load_from_env()?;
    cfg.log_config();

    tracing::info!("Attempting to connect to database");

    let store = PgStore::connect(&cfg.db_url, cfg.db_pool_max)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to connect to database: {}", e))?;

    tracing::info!("Successfully connected to database");

    schema::create_schema(store.pool()).await?;

    let providers = build_providers(&cfg)?;
    let store = Arc::new(store);
    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.http_port));

    // Build app from routes gateway (EMBP)
    let app: Router = routes::router(AppState::new(store, providers, cfg));

    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Live providers for this deployment. The weather provider needs an API
/// key; the solar provider is keyless.
fn build_providers(cfg: &config::Config) -> Result<Vec<Arc<dyn Provider>>> {
    // ---
    let mut providers: Vec<Arc<dyn Provider>> = vec![Arc::new(NasaPowerProvider::new(
        cfg.nasa_power_url.clone(),
        cfg.location,
        cfg.solar_lookback_days,
        cfg.provider_timeout,
    )?)];

    match &cfg.openweather_api_key {
        Some(key) => providers.push(Arc::new(OpenWeatherProvider::new(
            cfg.openweather_url.clone(),
            key.clone(),
            cfg.location,
            cfg.provider_timeout,
        )?)),
        None => tracing::warn!("OPENWEATHER_API_KEY not set, live_weather will be synthetic only"),
    }

    Ok(providers)
}

// ---

/// Initialize the global tracing subscriber for structured logging.
///
/// - Color output controlled by TTY detection and `FORCE_COLOR` env var:
///   - `FORCE_COLOR=1|true|yes`: force colors on
///   - `FORCE_COLOR=0|false|no`: force colors off
///   - unset or other values: auto-detect TTY
/// - Span event emission mode controlled by `WEATHERFLOW_SPAN_EVENTS`:
///   - `"full"`       : emit ENTER, EXIT, and CLOSE events with timing
///   - `"enter_exit"` : emit ENTER and EXIT only
///   - unset or other values: emit CLOSE events only (default)
/// - Log level from `RUST_LOG` when set, else `WEATHERFLOW_LOG_LEVEL`
///
/// Call once at startup before any logging macros are invoked.
fn init_tracing() {
    // ---
    let span_events = match env::var("WEATHERFLOW_SPAN_EVENTS").as_deref() {
        Ok("full") => FmtSpan::FULL,
        Ok("enter_exit") => FmtSpan::ENTER | FmtSpan::EXIT,
        _ => FmtSpan::CLOSE,
    };

    let use_color = match env::var("FORCE_COLOR").as_deref() {
        Ok("1") | Ok("true") | Ok("yes") => true,
        Ok("0") | Ok("false") | Ok("no") => false,
        _ => std::io::stdout().is_terminal(),
    };

    let env_filter = if env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match env::var("WEATHERFLOW_LOG_LEVEL").ok().as_deref() {
            Some("trace") => "trace",
            Some("debug") => "debug",
            Some("info") => "info",
            Some("warn") => "warn",
            Some("error") => "error",
            _ => "debug",
        };
        EnvFilter::new(format!("{level},sqlx::query=warn,hyper=info,reqwest=info"))
    };

    tracing_subscriber::fmt()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(span_events)
        .with_env_filter(env_filter)
        .with_ansi(use_color)
        .compact()
        .init();
}
