//! PostgreSQL-backed store over the `sensor_data` table.
//!
//! Uniqueness is enforced by the `(timestamp, source)` constraint created in
//! `schema`; `ON CONFLICT DO NOTHING` turns duplicates into skips. Each
//! upsert is its own statement, so every committed row survives a crash
//! mid-batch.

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use super::{bucket_bounds, ReadingStore, UpsertOutcome};
use crate::error::StoreError;
use crate::models::{Reading, ReadingRow, Source};

// ---

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        // ---
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(|e| StoreError::Unreachable(e.to_string()))?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl ReadingStore for PgStore {
    async fn upsert(&self, reading: &Reading) -> Result<UpsertOutcome, StoreError> {
        // ---
        let result = sqlx::query(
            r#"
            INSERT INTO sensor_data (
                timestamp, source, temperature, humidity,
                irradiance, wind_speed, wind_power_density, solar_energy_yield
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (timestamp, source) DO NOTHING
            "#,
        )
        .bind(reading.timestamp)
        .bind(reading.source.as_str())
        .bind(reading.temperature)
        .bind(reading.humidity)
        .bind(reading.irradiance)
        .bind(reading.wind_speed)
        .bind(reading.wind_power_density)
        .bind(reading.solar_energy_yield)
        .execute(&self.pool)
        .await
        .map_err(StoreError::from_write)?;

        Ok(if result.rows_affected() == 0 {
            UpsertOutcome::Skipped
        } else {
            UpsertOutcome::Inserted
        })
    }

    async fn existing_timestamps(
        &self,
        source: Source,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<HashSet<NaiveDateTime>, StoreError> {
        // ---
        let (lo, hi) = bucket_bounds(start, end);
        let rows: Vec<NaiveDateTime> = sqlx::query_scalar(
            r#"
            SELECT timestamp
            FROM sensor_data
            WHERE source = ANY($1)
              AND timestamp >= $2
              AND timestamp < $3
            "#,
        )
        .bind(source.labels())
        .bind(lo)
        .bind(hi)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().collect())
    }

    async fn count_by_source(&self) -> Result<BTreeMap<Source, u64>, StoreError> {
        // ---
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT source, COUNT(*) FROM sensor_data GROUP BY source")
                .fetch_all(&self.pool)
                .await?;

        let mut counts = BTreeMap::new();
        for (label, count) in rows {
            match label.parse::<Source>() {
                Ok(source) => *counts.entry(source).or_insert(0) += count.max(0) as u64,
                Err(_) => tracing::warn!("Ignoring {} rows with unknown source '{}'", count, label),
            }
        }
        Ok(counts)
    }

    async fn latest_timestamp(&self, source: Source) -> Result<Option<NaiveDateTime>, StoreError> {
        // ---
        let latest: Option<NaiveDateTime> =
            sqlx::query_scalar("SELECT MAX(timestamp) FROM sensor_data WHERE source = ANY($1)")
                .bind(source.labels())
                .fetch_one(&self.pool)
                .await?;
        Ok(latest)
    }

    async fn recent(&self, source: Option<Source>, limit: u32) -> Result<Vec<Reading>, StoreError> {
        // ---
        let labels: Option<&[&str]> = source.map(|s| s.labels());
        let rows: Vec<ReadingRow> = sqlx::query_as(
            r#"
            SELECT timestamp, source, temperature, humidity,
                   irradiance, wind_speed, wind_power_density, solar_energy_yield
            FROM sensor_data
            WHERE $1::text[] IS NULL OR source = ANY($1)
            ORDER BY timestamp DESC, source
            LIMIT $2
            "#,
        )
        .bind(labels)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| match Reading::try_from(row) {
                Ok(reading) => Some(reading),
                Err(e) => {
                    tracing::warn!("Skipping unreadable row: {}", e);
                    None
                }
            })
            .collect())
    }
}
