use axum::{extract::State, routing::post, Json, Router};
use chrono::{Duration, Local};
use tracing::info;

use super::{ApiError, AppState};
use crate::backfill::{BackfillRequest, BackfillSummary, Backfiller};
use crate::synth::SeededNoise;

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route("/backfill", post(handler))
}

/// Fill every missing hour of the requested source and range.
///
/// Slots inside the live window go through the source's provider when one is
/// registered; everything else comes from the synthetic model.
async fn handler(
    State(state): State<AppState>,
    Json(request): Json<BackfillRequest>,
) -> Result<Json<BackfillSummary>, ApiError> {
    // ---
    info!(
        "POST /backfill - source={} start={} end={}",
        request.source, request.start, request.end
    );

    let config = &state.config;
    let mut backfiller = Backfiller::new(state.store.clone())
        .batch_size(config.backfill_batch_size as usize)
        .max_range_hours(config.max_range_hours);

    if config.live_window_hours > 0 {
        if let Some(provider) = state.provider_for(request.source) {
            let now = Local::now().naive_local();
            let window = Duration::hours(config.live_window_hours.into());
            backfiller = backfiller.with_live(provider, now, window);
        }
    }

    let mut noise = SeededNoise::from_entropy();
    let summary = backfiller.run(&request, &mut noise).await?;
    Ok(Json(summary))
}
