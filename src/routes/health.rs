// src/routes/health.rs
//! Liveness endpoint.
//!
//! Exports to the gateway (`mod.rs`) a subrouter containing `/health`. The
//! handler does not touch the store or the providers, so it answers even
//! while the database is down.

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use super::AppState;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    providers: Vec<&'static str>,
    ingestion_running: bool,
}

/// Handle `GET /health`.
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    // ---
    let ingestion_running = state
        .job
        .lock()
        .await
        .as_ref()
        .is_some_and(|job| job.is_running());

    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        providers: state.providers.iter().map(|p| p.source().as_str()).collect(),
        ingestion_running,
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}
