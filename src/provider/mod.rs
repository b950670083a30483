//! Live data providers.
//!
//! A provider turns a target date into a raw current reading or a
//! [`ProviderError`]. Absent fields stay `None` so a missing value is never
//! confused with a measured zero; the acquisition layer decides what to do
//! with partial or invalid responses.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::energy;
use crate::error::ProviderError;
use crate::models::{round_to, Reading, Sample, Source};

mod nasa_power;
mod openweather;

pub use nasa_power::NasaPowerProvider;
pub use openweather::OpenWeatherProvider;

/// Values at or below this are provider "no data" markers (e.g. -999).
pub const MISSING_SENTINEL: f64 = -999.0;

// ---

/// The fixed site all readings describe.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

/// Raw values reported by a provider for one instant.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProviderReading {
    // ---
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub wind_speed: Option<f64>,
    pub cloudiness: Option<f64>,
    pub uv_index: Option<f64>,
    pub irradiance: Option<f64>,
}

#[async_trait]
pub trait Provider: Send + Sync {
    /// Series this provider's rows are stored under.
    fn source(&self) -> Source;

    /// Dates to try, in order, when asked for a reading "now". Providers
    /// that lag behind real time return a short lookback window.
    fn attempt_dates(&self, today: NaiveDate) -> Vec<NaiveDate>;

    async fn fetch(&self, date: NaiveDate) -> Result<ProviderReading, ProviderError>;
}

fn is_sentinel(value: f64) -> bool {
    !value.is_finite() || value <= MISSING_SENTINEL
}

impl ProviderReading {
    /// Accept only responses with a usable, positive irradiance and no
    /// missing-value markers in the fields that are present.
    pub fn validate(&self) -> Result<(), ProviderError> {
        // ---
        let fields = [
            ("temperature", self.temperature),
            ("humidity", self.humidity),
            ("wind_speed", self.wind_speed),
            ("cloudiness", self.cloudiness),
            ("uv_index", self.uv_index),
            ("irradiance", self.irradiance),
        ];
        for (name, value) in fields {
            if let Some(v) = value {
                if is_sentinel(v) {
                    return Err(ProviderError::InvalidData(format!(
                        "{name} carries missing-value marker {v}"
                    )));
                }
            }
        }

        match self.irradiance {
            None => {
                return Err(ProviderError::InvalidData("irradiance missing".into()));
            }
            Some(v) if v <= 0.0 => {
                return Err(ProviderError::InvalidData(format!(
                    "non-positive irradiance {v}"
                )));
            }
            Some(_) => {}
        }

        if let Some(h) = self.humidity {
            if !(0.0..=100.0).contains(&h) {
                return Err(ProviderError::InvalidData(format!("humidity {h} out of range")));
            }
        }
        if let Some(w) = self.wind_speed {
            if w < 0.0 {
                return Err(ProviderError::InvalidData(format!("negative wind speed {w}")));
            }
        }
        Ok(())
    }

    /// Build a stored reading, completing absent fields from `baseline`
    /// (the synthetic sample for the same hour) and recomputing the derived
    /// metrics from the merged values.
    pub fn into_reading(self, source: Source, timestamp: NaiveDateTime, baseline: &Sample) -> Reading {
        // ---
        let wind_speed = self.wind_speed.unwrap_or(baseline.wind_speed).max(0.0);
        let irradiance = self.irradiance.unwrap_or(baseline.irradiance).clamp(0.0, 1200.0);
        let cloudiness = self.cloudiness.unwrap_or(baseline.cloudiness).clamp(0.0, 100.0);
        let uv_index = self.uv_index.unwrap_or(baseline.uv_index).clamp(0.0, 11.0);

        Reading {
            timestamp,
            source,
            temperature: round_to(self.temperature.unwrap_or(baseline.temperature), 2),
            humidity: round_to(self.humidity.unwrap_or(baseline.humidity), 2),
            irradiance: round_to(irradiance, 2),
            wind_speed: round_to(wind_speed, 2),
            wind_power_density: energy::wind_power_density(wind_speed).ok(),
            solar_energy_yield: Some(energy::solar_energy_yield(
                irradiance,
                cloudiness,
                Some(uv_index),
            )),
        }
    }
}

/// Irradiance estimate for providers that only report cloud cover and UV.
pub fn estimate_irradiance(cloudiness: f64, uv_index: Option<f64>) -> f64 {
    // ---
    let base = (100.0 - cloudiness) * 10.0;
    let uv = uv_index.map_or(0.0, |uv| uv * 25.0);
    round_to(base + uv, 2)
}
