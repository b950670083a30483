//! Read-only views of how complete each series is.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{ApiError, AppState};
use crate::gaps::{self, describe_run, validate_range, Coverage};
use crate::models::Source;

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new()
        .route("/coverage", get(coverage))
        .route("/sources", get(sources))
}

#[derive(Debug, Deserialize)]
pub struct CoverageQuery {
    source: Source,
    start: NaiveDateTime,
    end: NaiveDateTime,
}

/// Hourly coverage of one source over `[start, end]`.
async fn coverage(
    Query(params): Query<CoverageQuery>,
    State(state): State<AppState>,
) -> Result<Json<Coverage>, ApiError> {
    // ---
    let CoverageQuery { source, start, end } = params;
    validate_range(start, end, state.config.max_range_hours)?;

    let existing = state.store.existing_timestamps(source, start, end).await?;
    let report = gaps::coverage(source, start, end, &existing);

    info!(
        %source,
        expected = report.expected_hours,
        actual = report.actual_hours,
        "Coverage {:.1}%",
        report.coverage_percent
    );
    for run in &report.runs {
        debug!(%source, "Gap: {}", describe_run(run));
    }
    for day in report.incomplete_days() {
        debug!(%source, date = %day.date, "{}/{} hours present", day.present, day.expected);
    }

    Ok(Json(report))
}

#[derive(Debug, Serialize)]
pub struct SourceSummary {
    pub source: Source,
    pub count: u64,
    pub latest: Option<NaiveDateTime>,
}

/// Row count and newest timestamp for every known source.
async fn sources(State(state): State<AppState>) -> Result<Json<Vec<SourceSummary>>, ApiError> {
    // ---
    let counts = state.store.count_by_source().await?;

    let mut summaries = Vec::with_capacity(Source::ALL.len());
    for source in Source::ALL {
        summaries.push(SourceSummary {
            source,
            count: counts.get(&source).copied().unwrap_or(0),
            latest: state.store.latest_timestamp(source).await?,
        });
    }
    Ok(Json(summaries))
}
