#![allow(dead_code)]

use std::collections::{BTreeMap, HashSet};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use axum::Router;
use chrono::{Duration, NaiveDate, NaiveDateTime};

use weatherflow::provider::ProviderReading;
use weatherflow::{
    MemoryStore, Provider, ProviderError, Reading, ReadingStore, Source, StoreError,
    UpsertOutcome,
};

/// Hour `h` after 2026-04-01 00:00.
pub fn at(h: i64) -> NaiveDateTime {
    // ---
    NaiveDate::from_ymd_opt(2026, 4, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        + Duration::hours(h)
}

/// Bind `app` to an ephemeral local port and serve it in the background.
pub async fn serve(app: Router) -> SocketAddr {
    // ---
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// Provider whose every call fails at the transport level.
pub struct Offline(pub Source);

#[async_trait]
impl Provider for Offline {
    fn source(&self) -> Source {
        self.0
    }

    fn attempt_dates(&self, today: NaiveDate) -> Vec<NaiveDate> {
        vec![today]
    }

    async fn fetch(&self, _date: NaiveDate) -> Result<ProviderReading, ProviderError> {
        Err(ProviderError::Unavailable("connection refused".into()))
    }
}

/// Provider that always answers with the same plausible conditions.
pub struct Steady(pub Source);

#[async_trait]
impl Provider for Steady {
    fn source(&self) -> Source {
        self.0
    }

    fn attempt_dates(&self, today: NaiveDate) -> Vec<NaiveDate> {
        vec![today]
    }

    async fn fetch(&self, _date: NaiveDate) -> Result<ProviderReading, ProviderError> {
        Ok(ProviderReading {
            temperature: Some(29.5),
            humidity: Some(71.0),
            wind_speed: Some(3.0),
            cloudiness: Some(40.0),
            uv_index: Some(6.0),
            irradiance: Some(750.0),
        })
    }
}

/// Provider that, like the solar service, reports irradiance only.
pub struct IrradianceOnly(pub Source, pub f64);

#[async_trait]
impl Provider for IrradianceOnly {
    fn source(&self) -> Source {
        self.0
    }

    fn attempt_dates(&self, today: NaiveDate) -> Vec<NaiveDate> {
        vec![today]
    }

    async fn fetch(&self, _date: NaiveDate) -> Result<ProviderReading, ProviderError> {
        Ok(ProviderReading {
            irradiance: Some(self.1),
            ..Default::default()
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Failure {
    /// Reject writes for the listed hours only.
    Rows,
    /// Every write fails as if the database were down.
    Down,
}

/// Memory store that fails writes on demand.
pub struct FlakyStore {
    pub inner: MemoryStore,
    failure: Failure,
    bad_hours: HashSet<NaiveDateTime>,
    pub attempts: AtomicU64,
}

impl FlakyStore {
    pub fn rejecting(bad_hours: impl IntoIterator<Item = NaiveDateTime>) -> Self {
        Self {
            inner: MemoryStore::new(),
            failure: Failure::Rows,
            bad_hours: bad_hours.into_iter().collect(),
            attempts: AtomicU64::new(0),
        }
    }

    pub fn down() -> Self {
        Self {
            inner: MemoryStore::new(),
            failure: Failure::Down,
            bad_hours: HashSet::new(),
            attempts: AtomicU64::new(0),
        }
    }
}

#[async_trait]
impl ReadingStore for FlakyStore {
    async fn upsert(&self, reading: &Reading) -> Result<UpsertOutcome, StoreError> {
        // ---
        self.attempts.fetch_add(1, Ordering::SeqCst);
        match self.failure {
            Failure::Down => Err(StoreError::Unreachable("connection refused".into())),
            Failure::Rows if self.bad_hours.contains(&reading.timestamp) => {
                Err(StoreError::WriteFailed("check constraint violated".into()))
            }
            Failure::Rows => self.inner.upsert(reading).await,
        }
    }

    async fn existing_timestamps(
        &self,
        source: Source,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<HashSet<NaiveDateTime>, StoreError> {
        self.inner.existing_timestamps(source, start, end).await
    }

    async fn count_by_source(&self) -> Result<BTreeMap<Source, u64>, StoreError> {
        self.inner.count_by_source().await
    }

    async fn latest_timestamp(&self, source: Source) -> Result<Option<NaiveDateTime>, StoreError> {
        self.inner.latest_timestamp(source).await
    }

    async fn recent(&self, source: Option<Source>, limit: u32) -> Result<Vec<Reading>, StoreError> {
        self.inner.recent(source, limit).await
    }
}
