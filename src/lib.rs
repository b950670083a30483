//! Hourly environmental time series for a single site.
//!
//! Readings come from three series (`sim`, `live_weather`, `live_solar`)
//! and are stored once per `(timestamp, source)`. Live providers are tried
//! first and a seasonal synthetic model stands in whenever they fail, so an
//! acquisition always yields a reading. Gap detection and backfill keep each
//! series complete at hourly granularity.
//!
//! This crate follows the Explicit Module Boundary Pattern (EMBP): every
//! directory module exposes its public surface through its `mod.rs` gateway
//! and the binary only talks to the items re-exported here.

pub mod acquire;
pub mod backfill;
pub mod config;
pub mod energy;
pub mod error;
pub mod gaps;
pub mod job;
pub mod models;
pub mod provider;
pub mod routes;
pub mod schema;
pub mod store;
pub mod synth;

pub use acquire::{acquire, acquire_for, Acquired};
pub use backfill::{BackfillRequest, BackfillSummary, Backfiller};
pub use config::Config;
pub use error::{Error, ProviderError, Result, StoreError};
pub use gaps::{coverage, missing_slots, Coverage, GapRun};
pub use job::{ingest_once, IngestionJob, JobStatus};
pub use models::{Provenance, Reading, Source};
pub use provider::{Location, NasaPowerProvider, OpenWeatherProvider, Provider};
pub use routes::AppState;
pub use store::{MemoryStore, PgStore, ReadingStore, UpsertOutcome};
pub use synth::{NoNoise, Noise, SeededNoise};
