//! Idempotent persistence of readings keyed by `(timestamp, source)`.
//!
//! Gateway for the store implementations (EMBP): the engine only sees the
//! [`ReadingStore`] trait; `postgres` backs the service, `memory` backs
//! tests and dry runs.

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::Serialize;

use crate::error::StoreError;
use crate::gaps::next_hour;
use crate::models::{Reading, Source};
use crate::synth::truncate_to_hour;

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

// ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertOutcome {
    Inserted,
    /// A row for the same `(timestamp, source)` already existed; nothing
    /// was written.
    Skipped,
}

#[async_trait]
pub trait ReadingStore: Send + Sync {
    /// Insert-or-ignore. A duplicate key is a silent no-op reported as
    /// [`UpsertOutcome::Skipped`], never an error.
    async fn upsert(&self, reading: &Reading) -> Result<UpsertOutcome, StoreError>;

    /// Timestamps stored for `source` whose hour lies in `[start, end]`.
    async fn existing_timestamps(
        &self,
        source: Source,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<HashSet<NaiveDateTime>, StoreError>;

    /// Row count per source. Rows with unrecognised labels are left out.
    async fn count_by_source(&self) -> Result<BTreeMap<Source, u64>, StoreError>;

    async fn latest_timestamp(&self, source: Source) -> Result<Option<NaiveDateTime>, StoreError>;

    /// Newest readings first, optionally restricted to one source.
    async fn recent(&self, source: Option<Source>, limit: u32) -> Result<Vec<Reading>, StoreError>;
}

/// Half-open timestamp bounds covering every hour bucket of `[start, end]`.
/// The upper bound saturates at the last representable instant.
pub(crate) fn bucket_bounds(start: NaiveDateTime, end: NaiveDateTime) -> (NaiveDateTime, NaiveDateTime) {
    let hi = next_hour(truncate_to_hour(end)).unwrap_or(NaiveDateTime::MAX);
    (truncate_to_hour(start), hi)
}
