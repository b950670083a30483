//! Error kinds of the acquisition, backfill and persistence engine.
//!
//! Nothing here is fatal to the host process: provider errors are absorbed
//! by the fallback path, per-row store errors by the backfill loop. Only
//! `InvalidInput` and `BackfillFailed` reach callers.

use thiserror::Error;

use crate::models::Source;

// ---

/// Failure to obtain a usable reading from an external provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Network failure, timeout or non-2xx response.
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    /// Response arrived but carried a missing-value sentinel or an
    /// implausible value.
    #[error("invalid provider data: {0}")]
    InvalidData(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        ProviderError::Unavailable(e.to_string())
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unreachable: {0}")]
    Unreachable(String),

    #[error("store write failed: {0}")]
    WriteFailed(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    /// True when the failure means the store itself cannot be reached, as
    /// opposed to a single statement being rejected.
    pub fn is_unreachable(&self) -> bool {
        // ---
        match self {
            StoreError::Unreachable(_) => true,
            StoreError::WriteFailed(_) => false,
            StoreError::Database(e) => matches!(
                e,
                sqlx::Error::Io(_)
                    | sqlx::Error::Tls(_)
                    | sqlx::Error::PoolTimedOut
                    | sqlx::Error::PoolClosed
                    | sqlx::Error::WorkerCrashed
            ),
        }
    }

    /// Classifies a failed write. A statement the database rejected (check,
    /// foreign key or not-null violation) costs only its row; anything else
    /// keeps the transport error for `is_unreachable`.
    pub fn from_write(e: sqlx::Error) -> Self {
        // ---
        match e {
            sqlx::Error::Database(db) => StoreError::WriteFailed(db.message().to_string()),
            other => StoreError::Database(other),
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    /// Malformed range, negative wind speed, unknown source label.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// The store could not be used for a whole batch; counts cover the work
    /// committed before the failure.
    #[error("backfill of {series} failed after {inserted} inserted, {skipped} skipped, {failed} failed: {reason}")]
    BackfillFailed {
        series: Source,
        inserted: u64,
        skipped: u64,
        failed: u64,
        reason: String,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
