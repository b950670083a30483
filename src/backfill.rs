//! Backfill orchestration: find the hourly gaps of a source over a range and
//! fill them.
//!
//! Slots are processed oldest first in bounded batches. Each row is written
//! on its own, so a failure only loses that row; it stays missing and is
//! picked up again by the next run. Re-running over the same range is a
//! no-op once the range is complete.

use std::sync::Arc;

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::acquire::acquire_for;
use crate::error::{Error, Result};
use crate::gaps::{missing_slots, validate_range, DEFAULT_MAX_RANGE_HOURS};
use crate::models::{Provenance, Reading, Source};
use crate::provider::Provider;
use crate::store::{ReadingStore, UpsertOutcome};
use crate::synth::{synthesize_for, truncate_to_hour, Noise};

pub const DEFAULT_BATCH_SIZE: usize = 100;

// ---

#[derive(Debug, Clone, Deserialize)]
pub struct BackfillRequest {
    pub source: Source,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

/// Progress record written after every batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchCheckpoint {
    pub batch: usize,
    pub first: NaiveDateTime,
    pub last: NaiveDateTime,
    pub inserted: u64,
    pub skipped: u64,
    pub failed: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BackfillSummary {
    pub run_id: Uuid,
    pub source: Source,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    /// Slots found missing before the run.
    pub missing: usize,
    pub inserted: u64,
    pub skipped: u64,
    pub failed: u64,
    /// Rows that came from the live provider rather than the model.
    pub live: u64,
    pub batches: Vec<BatchCheckpoint>,
}

/// Live provider used for slots close to the present.
struct LiveWindow {
    provider: Arc<dyn Provider>,
    from: NaiveDateTime,
    now: NaiveDateTime,
}

pub struct Backfiller {
    store: Arc<dyn ReadingStore>,
    batch_size: usize,
    max_range_hours: u32,
    live: Option<LiveWindow>,
}

impl Backfiller {
    pub fn new(store: Arc<dyn ReadingStore>) -> Self {
        Self {
            store,
            batch_size: DEFAULT_BATCH_SIZE,
            max_range_hours: DEFAULT_MAX_RANGE_HOURS,
            live: None,
        }
    }

    pub fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.max(1);
        self
    }

    pub fn max_range_hours(mut self, hours: u32) -> Self {
        self.max_range_hours = hours.max(1);
        self
    }

    /// Fill slots within `window` of `now` through acquisition with
    /// fallback instead of pure synthesis. Only used when the provider feeds
    /// the series being backfilled.
    pub fn with_live(mut self, provider: Arc<dyn Provider>, now: NaiveDateTime, window: Duration) -> Self {
        // ---
        self.live = Some(LiveWindow {
            provider,
            from: truncate_to_hour(now)
                .checked_sub_signed(window)
                .unwrap_or(NaiveDateTime::MIN),
            now,
        });
        self
    }

    async fn candidate(
        &self,
        source: Source,
        slot: NaiveDateTime,
        noise: &mut dyn Noise,
    ) -> (Reading, Provenance) {
        // ---
        if let Some(live) = &self.live {
            if live.provider.source() == source && slot >= live.from && slot <= live.now {
                let acquired = acquire_for(live.provider.as_ref(), live.now, slot, noise).await;
                debug!(%source, %slot, provenance = ?acquired.provenance, "filled near-real-time slot");
                return (acquired.reading, acquired.provenance);
            }
        }
        (
            synthesize_for(source, slot, noise).into_reading(source),
            Provenance::Synthetic,
        )
    }

    /// Fill every missing hour of `request` for its source.
    ///
    /// Fails up front on an inverted range, and with
    /// [`Error::BackfillFailed`] when the store cannot be read or rejects a
    /// whole batch as unreachable. Individual row failures are logged and
    /// counted, not raised.
    pub async fn run(&self, request: &BackfillRequest, noise: &mut dyn Noise) -> Result<BackfillSummary> {
        // ---
        let BackfillRequest { source, start, end } = *request;
        validate_range(start, end, self.max_range_hours)?;

        let run_id = Uuid::new_v4();
        info!(%run_id, %source, %start, %end, "Starting backfill");

        let existing = self
            .store
            .existing_timestamps(source, start, end)
            .await
            .map_err(|e| Error::BackfillFailed {
                series: source,
                inserted: 0,
                skipped: 0,
                failed: 0,
                reason: format!("could not read existing timestamps: {e}"),
            })?;

        let missing = missing_slots(source, start, end, &existing);
        info!(%run_id, %source, existing = existing.len(), missing = missing.len(), "Gap detection done");

        let mut summary = BackfillSummary {
            run_id,
            source,
            start,
            end,
            missing: missing.len(),
            inserted: 0,
            skipped: 0,
            failed: 0,
            live: 0,
            batches: Vec::new(),
        };

        for (index, batch) in missing.chunks(self.batch_size).enumerate() {
            let mut checkpoint = BatchCheckpoint {
                batch: index + 1,
                first: batch[0],
                last: batch[batch.len() - 1],
                inserted: 0,
                skipped: 0,
                failed: 0,
            };
            let mut unreachable = 0usize;
            let mut last_error = None;

            for &slot in batch {
                let (reading, provenance) = self.candidate(source, slot, noise).await;

                match self.store.upsert(&reading).await {
                    Ok(UpsertOutcome::Inserted) => {
                        checkpoint.inserted += 1;
                        if provenance == Provenance::Live {
                            summary.live += 1;
                        }
                    }
                    Ok(UpsertOutcome::Skipped) => checkpoint.skipped += 1,
                    Err(e) => {
                        error!(%source, %slot, "Failed to store reading: {}", e);
                        checkpoint.failed += 1;
                        if e.is_unreachable() {
                            unreachable += 1;
                        }
                        last_error = Some(e);
                    }
                }
            }

            summary.inserted += checkpoint.inserted;
            summary.skipped += checkpoint.skipped;
            summary.failed += checkpoint.failed;

            info!(
                %run_id,
                batch = checkpoint.batch,
                first = %checkpoint.first,
                last = %checkpoint.last,
                inserted = checkpoint.inserted,
                skipped = checkpoint.skipped,
                failed = checkpoint.failed,
                "Backfill progress: {}/{} rows",
                summary.inserted + summary.skipped + summary.failed,
                summary.missing
            );
            summary.batches.push(checkpoint);

            if unreachable == batch.len() {
                let reason = last_error.map(|e| e.to_string()).unwrap_or_default();
                warn!(%run_id, %source, "Store unreachable for a whole batch, aborting");
                return Err(Error::BackfillFailed {
                    series: source,
                    inserted: summary.inserted,
                    skipped: summary.skipped,
                    failed: summary.failed,
                    reason,
                });
            }
        }

        info!(
            %run_id,
            %source,
            inserted = summary.inserted,
            skipped = summary.skipped,
            failed = summary.failed,
            live = summary.live,
            "Backfill complete"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::store::MemoryStore;
    use crate::synth::NoNoise;
    use chrono::NaiveDate;

    fn t(hour: i64) -> NaiveDateTime {
        // ---
        NaiveDate::from_ymd_opt(2026, 2, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            + Duration::hours(hour)
    }

    #[tokio::test]
    async fn test_batches_cover_missing_slots_in_order() {
        // ---
        let store = Arc::new(MemoryStore::new());
        let backfiller = Backfiller::new(store.clone()).batch_size(10);
        let request = BackfillRequest {
            source: Source::Sim,
            start: t(0),
            end: t(23),
        };

        let summary = backfiller.run(&request, &mut NoNoise).await.unwrap();

        assert_eq!(summary.missing, 24);
        assert_eq!(summary.inserted, 24);
        assert_eq!(summary.batches.len(), 3);
        assert_eq!(summary.batches[0].first, t(0));
        assert_eq!(summary.batches[2].last, t(23));
        assert_eq!(summary.batches[2].inserted, 4);
        assert_eq!(store.len().await, 24);
    }

    #[tokio::test]
    async fn test_inverted_range_rejected_before_any_work() {
        // ---
        let store = Arc::new(MemoryStore::new());
        let request = BackfillRequest {
            source: Source::Sim,
            start: t(5),
            end: t(1),
        };

        let result = Backfiller::new(store.clone()).run(&request, &mut NoNoise).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_range_wider_than_limit_rejected() {
        // ---
        let store = Arc::new(MemoryStore::new());
        let request = BackfillRequest {
            source: Source::Sim,
            start: t(0),
            end: t(48),
        };

        let result = Backfiller::new(store.clone())
            .max_range_hours(24)
            .run(&request, &mut NoNoise)
            .await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
        assert!(store.is_empty().await);
    }
}
