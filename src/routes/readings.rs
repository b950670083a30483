use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tracing::debug;

use super::{ApiError, AppState};
use crate::models::{Reading, Source};

const DEFAULT_LIMIT: u32 = 100;
const MAX_LIMIT: u32 = 1000;

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route("/readings", get(handler))
}

/// Query parameters for `GET /readings`.
#[derive(Debug, Deserialize)]
pub struct ReadingsQuery {
    source: Option<Source>,
    limit: Option<u32>,
}

/// Newest stored readings first.
async fn handler(
    Query(params): Query<ReadingsQuery>,
    State(state): State<AppState>,
) -> Result<Json<Vec<Reading>>, ApiError> {
    // ---
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    debug!("GET /readings - source={:?} limit={}", params.source, limit);

    let readings = state.store.recent(params.source, limit).await?;
    Ok(Json(readings))
}
