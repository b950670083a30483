//! In-memory store with the same uniqueness semantics as the database.

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use chrono::NaiveDateTime;
use tokio::sync::RwLock;

use super::{bucket_bounds, ReadingStore, UpsertOutcome};
use crate::error::StoreError;
use crate::models::{Reading, Source};

// ---

#[derive(Default)]
pub struct MemoryStore {
    rows: RwLock<BTreeMap<(Source, NaiveDateTime), Reading>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }

    /// Stored reading for exactly this key, if any.
    pub async fn get(&self, source: Source, timestamp: NaiveDateTime) -> Option<Reading> {
        self.rows.read().await.get(&(source, timestamp)).cloned()
    }
}

#[async_trait]
impl ReadingStore for MemoryStore {
    async fn upsert(&self, reading: &Reading) -> Result<UpsertOutcome, StoreError> {
        // ---
        let mut rows = self.rows.write().await;
        let key = (reading.source, reading.timestamp);
        if rows.contains_key(&key) {
            return Ok(UpsertOutcome::Skipped);
        }
        rows.insert(key, reading.clone());
        Ok(UpsertOutcome::Inserted)
    }

    async fn existing_timestamps(
        &self,
        source: Source,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<HashSet<NaiveDateTime>, StoreError> {
        // ---
        let (lo, hi) = bucket_bounds(start, end);
        if lo >= hi {
            return Ok(HashSet::new());
        }
        let rows = self.rows.read().await;
        Ok(rows
            .range((source, lo)..(source, hi))
            .map(|((_, ts), _)| *ts)
            .collect())
    }

    async fn count_by_source(&self) -> Result<BTreeMap<Source, u64>, StoreError> {
        // ---
        let rows = self.rows.read().await;
        let mut counts = BTreeMap::new();
        for (source, _) in rows.keys() {
            *counts.entry(*source).or_insert(0) += 1;
        }
        Ok(counts)
    }

    async fn latest_timestamp(&self, source: Source) -> Result<Option<NaiveDateTime>, StoreError> {
        // ---
        let rows = self.rows.read().await;
        Ok(rows
            .keys()
            .filter(|(s, _)| *s == source)
            .map(|(_, ts)| *ts)
            .max())
    }

    async fn recent(&self, source: Option<Source>, limit: u32) -> Result<Vec<Reading>, StoreError> {
        // ---
        let rows = self.rows.read().await;
        let mut readings: Vec<Reading> = rows
            .values()
            .filter(|r| source.map_or(true, |s| r.source == s))
            .cloned()
            .collect();
        readings.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(a.source.cmp(&b.source)));
        readings.truncate(limit as usize);
        Ok(readings)
    }
}
