//! Database schema management for `codemetal-weatherflow`.
//!
//! Ensures the readings table, its composite uniqueness and indexes exist
//! before the service starts. Applied once on startup from `main.rs` (EMBP:
//! single gateway call).

use anyhow::Result;
use sqlx::PgPool;

// ---

/// Create the database schema (idempotent).
///
/// `sensor_data` holds one row per `(timestamp, source)`; several sources may
/// share a timestamp. Safe to call on every startup; no-op if objects
/// already exist.
///
/// Errors are propagated if any SQL execution fails.
pub async fn create_schema(pool: &PgPool) -> Result<()> {
    // ---
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sensor_data (
            id                 BIGSERIAL PRIMARY KEY,
            timestamp          TIMESTAMP        NOT NULL,
            source             TEXT             NOT NULL,
            temperature        DOUBLE PRECISION NOT NULL,
            humidity           DOUBLE PRECISION NOT NULL,
            irradiance         DOUBLE PRECISION NOT NULL,
            wind_speed         DOUBLE PRECISION NOT NULL,
            wind_power_density DOUBLE PRECISION,
            solar_energy_yield DOUBLE PRECISION,
            CONSTRAINT unique_timestamp_source UNIQUE (timestamp, source)
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    // Range scans by time across all sources
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_sensor_data_timestamp
            ON sensor_data (timestamp);
        "#,
    )
    .execute(&mut *tx)
    .await?;

    // Per-source gap detection and latest-timestamp lookups
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_sensor_data_source_timestamp
            ON sensor_data (source, timestamp);
        "#,
    )
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}
