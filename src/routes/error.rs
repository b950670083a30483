//! JSON error responses for the HTTP surface.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::error::{Error, StoreError};

// ---

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: &'static str,
    message: String,
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_type(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BadRequest",
            ApiError::Conflict(_) => "Conflict",
            ApiError::ServiceUnavailable(_) => "ServiceUnavailable",
            ApiError::InternalError(_) => "InternalServerError",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // ---
        match &self {
            ApiError::InternalError(_) => tracing::error!(error = %self, "API error occurred"),
            ApiError::ServiceUnavailable(_) => tracing::warn!(error = %self, "Service unavailable"),
            _ => tracing::debug!(error = %self, "Client error"),
        }

        let body = ErrorResponse {
            error: self.error_type(),
            message: self.to_string(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        if e.is_unreachable() {
            ApiError::ServiceUnavailable(e.to_string())
        } else {
            ApiError::InternalError(e.to_string())
        }
    }
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        // ---
        match e {
            Error::InvalidInput(msg) => ApiError::BadRequest(msg),
            Error::Store(store) => store.into(),
            failed @ Error::BackfillFailed { .. } => ApiError::ServiceUnavailable(failed.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::models::Source;

    #[test]
    fn test_engine_errors_map_to_status_codes() {
        // ---
        let bad: ApiError = Error::InvalidInput("start after end".into()).into();
        assert_eq!(bad.status_code(), StatusCode::BAD_REQUEST);

        let failed: ApiError = Error::BackfillFailed {
            series: Source::Sim,
            inserted: 3,
            skipped: 0,
            failed: 100,
            reason: "connection refused".into(),
        }
        .into();
        assert_eq!(failed.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(failed.to_string().contains("3 inserted"));

        let down: ApiError = StoreError::Unreachable("pool closed".into()).into();
        assert_eq!(down.status_code(), StatusCode::SERVICE_UNAVAILABLE);

        let rejected: ApiError = StoreError::WriteFailed("check violation".into()).into();
        assert_eq!(rejected.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(rejected.error_type(), "InternalServerError");
    }
}
