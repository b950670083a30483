//! Manual ingestion and control of the periodic ingestion job.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Local;
use serde::Serialize;
use tracing::info;

use super::{ApiError, AppState};
use crate::job::{ingest_once, IngestOutcome, IngestionJob, JobStatus};
use crate::synth::SeededNoise;

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new()
        .route("/ingest", post(ingest))
        .route("/ingestion/start", post(start))
        .route("/ingestion/stop", post(stop))
        .route("/ingestion/status", get(status))
}

#[derive(Debug, Serialize)]
struct IngestionStatus {
    running: bool,
    job: Option<JobStatus>,
}

/// One acquisition per provider, stored immediately.
async fn ingest(State(state): State<AppState>) -> Json<Vec<IngestOutcome>> {
    // ---
    let now = Local::now().naive_local();
    let mut noise = SeededNoise::from_entropy();
    let outcomes = ingest_once(state.store.as_ref(), &state.providers, now, &mut noise).await;
    Json(outcomes)
}

async fn start(State(state): State<AppState>) -> Result<(StatusCode, Json<JobStatus>), ApiError> {
    // ---
    let mut slot = state.job.lock().await;
    if let Some(job) = slot.as_ref() {
        if job.is_running() {
            return Err(ApiError::Conflict(format!(
                "ingestion job {} is already running",
                job.status().id
            )));
        }
    }

    let job = IngestionJob::start(
        state.store.clone(),
        state.providers.clone(),
        state.config.ingest_interval,
    );
    let status = job.status();
    info!(job = %status.id, "POST /ingestion/start");
    *slot = Some(job);

    Ok((StatusCode::ACCEPTED, Json(status)))
}

async fn stop(State(state): State<AppState>) -> Result<Json<JobStatus>, ApiError> {
    // ---
    let job = state
        .job
        .lock()
        .await
        .take()
        .ok_or_else(|| ApiError::Conflict("no ingestion job has been started".into()))?;

    let status = job.stop().await;
    info!(job = %status.id, ticks = status.ticks, "POST /ingestion/stop");
    Ok(Json(status))
}

async fn status(State(state): State<AppState>) -> Json<IngestionStatus> {
    // ---
    let job = state.job.lock().await.as_ref().map(IngestionJob::status);
    Json(IngestionStatus {
        running: job.as_ref().is_some_and(|s| s.running),
        job,
    })
}
