//! Periodic ingestion owned through an explicit handle.
//!
//! Each tick acquires a reading "now" from every registered provider (with
//! synthetic fallback) and upserts it. The caller holds the
//! [`IngestionJob`] and decides when it stops; there is no process-wide
//! flag.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDateTime};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::acquire::acquire;
use crate::models::{Provenance, Source};
use crate::provider::Provider;
use crate::store::{ReadingStore, UpsertOutcome};
use crate::synth::{truncate_to_hour, Noise, SeededNoise};

// ---

/// Result of ingesting one provider's reading.
#[derive(Debug, Clone, Serialize)]
pub struct IngestOutcome {
    pub source: Source,
    pub timestamp: NaiveDateTime,
    /// `None` when the hour already held a reading and nothing was acquired.
    pub provenance: Option<Provenance>,
    /// `None` when the write failed; see `error`.
    pub stored: Option<UpsertOutcome>,
    pub error: Option<String>,
}

/// One ingestion pass over `providers`. Acquisition never fails; store
/// errors are reported per source.
///
/// A source whose hour bucket already holds a reading is skipped without
/// calling its provider, so repeated passes within an hour store one row.
pub async fn ingest_once(
    store: &dyn ReadingStore,
    providers: &[Arc<dyn Provider>],
    now: NaiveDateTime,
    noise: &mut dyn Noise,
) -> Vec<IngestOutcome> {
    // ---
    let mut outcomes = Vec::with_capacity(providers.len());
    let hour = truncate_to_hour(now);

    for provider in providers {
        let source = provider.source();
        match store.existing_timestamps(source, hour, hour).await {
            Ok(existing) => {
                if let Some(&timestamp) = existing.iter().min() {
                    debug!(%source, %timestamp, "Hour already ingested");
                    outcomes.push(IngestOutcome {
                        source,
                        timestamp,
                        provenance: None,
                        stored: Some(UpsertOutcome::Skipped),
                        error: None,
                    });
                    continue;
                }
            }
            Err(e) => warn!(%source, "Could not check the current hour: {}", e),
        }

        let acquired = acquire(provider.as_ref(), now, noise).await;
        let reading = acquired.reading;

        let (stored, error) = match store.upsert(&reading).await {
            Ok(outcome) => (Some(outcome), None),
            Err(e) => {
                error!(source = %reading.source, "Failed to store ingested reading: {}", e);
                (None, Some(e.to_string()))
            }
        };

        info!(
            source = %reading.source,
            timestamp = %reading.timestamp,
            provenance = ?acquired.provenance,
            stored = ?stored,
            "Ingested reading"
        );

        outcomes.push(IngestOutcome {
            source: reading.source,
            timestamp: reading.timestamp,
            provenance: Some(acquired.provenance),
            stored,
            error,
        });
    }
    outcomes
}

#[derive(Debug, Clone, Serialize)]
pub struct JobStatus {
    pub id: Uuid,
    pub running: bool,
    pub started_at: NaiveDateTime,
    pub interval_secs: u64,
    pub ticks: u64,
}

/// Handle to a running ingestion loop.
pub struct IngestionJob {
    id: Uuid,
    started_at: NaiveDateTime,
    interval: Duration,
    ticks: Arc<AtomicU64>,
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl IngestionJob {
    /// Spawn the loop. The first pass runs immediately, then every
    /// `interval`.
    pub fn start(
        store: Arc<dyn ReadingStore>,
        providers: Vec<Arc<dyn Provider>>,
        interval: Duration,
    ) -> Self {
        // ---
        let id = Uuid::new_v4();
        let interval = interval.max(Duration::from_secs(1));
        let ticks = Arc::new(AtomicU64::new(0));
        let (stop_tx, mut stop_rx) = watch::channel(false);

        let tick_counter = ticks.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            let mut noise = SeededNoise::from_entropy();
            info!(job = %id, "Ingestion job started");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let now = Local::now().naive_local();
                        ingest_once(store.as_ref(), &providers, now, &mut noise).await;
                        tick_counter.fetch_add(1, Ordering::Relaxed);
                    }
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            info!(job = %id, "Ingestion job stopped");
        });

        Self {
            id,
            started_at: Local::now().naive_local(),
            interval,
            ticks,
            stop_tx,
            handle,
        }
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    pub fn status(&self) -> JobStatus {
        // ---
        JobStatus {
            id: self.id,
            running: self.is_running(),
            started_at: self.started_at,
            interval_secs: self.interval.as_secs(),
            ticks: self.ticks.load(Ordering::Relaxed),
        }
    }

    /// Signal the loop and wait for the in-flight pass, if any, to finish.
    pub async fn stop(self) -> JobStatus {
        // ---
        let _ = self.stop_tx.send(true);
        let mut status = self.status();
        if let Err(e) = self.handle.await {
            error!(job = %self.id, "Ingestion task ended abnormally: {}", e);
        }
        status.running = false;
        status.ticks = self.ticks.load(Ordering::Relaxed);
        status
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::error::ProviderError;
    use crate::provider::ProviderReading;
    use crate::store::MemoryStore;
    use crate::synth::NoNoise;
    use async_trait::async_trait;
    use chrono::{NaiveDate, Timelike};

    struct Offline(Source);

    #[async_trait]
    impl Provider for Offline {
        fn source(&self) -> Source {
            self.0
        }

        fn attempt_dates(&self, today: NaiveDate) -> Vec<NaiveDate> {
            vec![today]
        }

        async fn fetch(&self, _date: NaiveDate) -> Result<ProviderReading, ProviderError> {
            Err(ProviderError::Unavailable("offline".into()))
        }
    }

    fn providers() -> Vec<Arc<dyn Provider>> {
        vec![
            Arc::new(Offline(Source::LiveWeather)),
            Arc::new(Offline(Source::LiveSolar)),
        ]
    }

    #[tokio::test]
    async fn test_ingest_once_is_idempotent_per_hour() {
        // ---
        let store = MemoryStore::new();
        let now = NaiveDate::from_ymd_opt(2026, 5, 1)
            .unwrap()
            .and_hms_opt(13, 20, 0)
            .unwrap();

        let first = ingest_once(&store, &providers(), now, &mut NoNoise).await;
        assert_eq!(first.len(), 2);
        assert!(first.iter().all(|o| o.stored == Some(UpsertOutcome::Inserted)));
        assert!(first.iter().all(|o| o.provenance == Some(Provenance::Synthetic)));
        assert!(first.iter().all(|o| o.timestamp.minute() == 0));

        let second = ingest_once(&store, &providers(), now, &mut NoNoise).await;
        assert!(second.iter().all(|o| o.stored == Some(UpsertOutcome::Skipped)));
        assert_eq!(store.len().await, 2);
    }

    struct Reporting;

    #[async_trait]
    impl Provider for Reporting {
        fn source(&self) -> Source {
            Source::LiveWeather
        }

        fn attempt_dates(&self, today: NaiveDate) -> Vec<NaiveDate> {
            vec![today]
        }

        async fn fetch(&self, _date: NaiveDate) -> Result<ProviderReading, ProviderError> {
            Ok(ProviderReading {
                temperature: Some(30.1),
                irradiance: Some(420.0),
                ..Default::default()
            })
        }
    }

    #[tokio::test]
    async fn test_live_readings_stored_once_per_hour() {
        // ---
        use chrono::Duration;

        let store = MemoryStore::new();
        let providers: Vec<Arc<dyn Provider>> = vec![Arc::new(Reporting)];
        let hour = NaiveDate::from_ymd_opt(2026, 5, 1)
            .unwrap()
            .and_hms_opt(13, 0, 0)
            .unwrap();

        let first = ingest_once(&store, &providers, hour + Duration::minutes(5), &mut NoNoise).await;
        assert_eq!(first[0].provenance, Some(Provenance::Live));
        assert_eq!(first[0].timestamp, hour + Duration::minutes(5));

        let later = ingest_once(&store, &providers, hour + Duration::minutes(40), &mut NoNoise).await;
        assert_eq!(later[0].stored, Some(UpsertOutcome::Skipped));
        assert_eq!(later[0].provenance, None);
        assert_eq!(later[0].timestamp, first[0].timestamp);
        assert_eq!(store.len().await, 1);

        let next_hour = ingest_once(&store, &providers, hour + Duration::minutes(65), &mut NoNoise).await;
        assert_eq!(next_hour[0].stored, Some(UpsertOutcome::Inserted));
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_job_start_and_stop() {
        // ---
        let store = Arc::new(MemoryStore::new());
        let job = IngestionJob::start(store.clone(), providers(), Duration::from_secs(3600));
        assert!(job.is_running());

        // The first tick fires immediately.
        for _ in 0..50 {
            if job.status().ticks > 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        let status = job.stop().await;
        assert!(!status.running);
        assert_eq!(status.ticks, 1);
        assert_eq!(store.len().await, 2);
    }
}
