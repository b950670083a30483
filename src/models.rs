//! Data models for the hourly environmental series.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::Error;

// ---

/// Provenance tag of a row. Several sources may describe the same hour; a
/// single source never has two rows for the same timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Sim,
    #[serde(alias = "openweather")]
    LiveWeather,
    #[serde(alias = "nasa_power")]
    LiveSolar,
}

impl Source {
    pub const ALL: [Source; 3] = [Source::Sim, Source::LiveWeather, Source::LiveSolar];

    pub fn as_str(&self) -> &'static str {
        // ---
        match self {
            Source::Sim => "sim",
            Source::LiveWeather => "live_weather",
            Source::LiveSolar => "live_solar",
        }
    }

    /// Every label this source may be stored under, canonical first.
    pub fn labels(&self) -> &'static [&'static str] {
        // ---
        match self {
            Source::Sim => &["sim"],
            Source::LiveWeather => &["live_weather", "openweather"],
            Source::LiveSolar => &["live_solar", "nasa_power"],
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = Error;

    /// Accepts the canonical labels plus the legacy provider names still
    /// present in older tables.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // ---
        match s.trim().to_ascii_lowercase().as_str() {
            "sim" => Ok(Source::Sim),
            "live_weather" | "openweather" => Ok(Source::LiveWeather),
            "live_solar" | "nasa_power" => Ok(Source::LiveSolar),
            other => Err(Error::InvalidInput(format!("unknown source '{other}'"))),
        }
    }
}

/// Whether a reading came from a provider or from the synthetic model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    Live,
    Synthetic,
}

/// One hourly observation as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    // ---
    pub timestamp: NaiveDateTime,
    pub source: Source,
    pub temperature: f64,
    pub humidity: f64,
    pub irradiance: f64,
    pub wind_speed: f64,
    pub wind_power_density: Option<f64>,
    pub solar_energy_yield: Option<f64>,
}

/// Full output of the synthetic model, including the intermediate fields
/// that feed the derived metrics but are not persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample {
    // ---
    pub timestamp: NaiveDateTime,
    pub temperature: f64,
    pub humidity: f64,
    pub wind_speed: f64,
    pub cloudiness: f64,
    pub uv_index: f64,
    pub irradiance: f64,
    pub wind_power_density: f64,
    pub solar_energy_yield: f64,
}

impl Sample {
    pub fn into_reading(self, source: Source) -> Reading {
        // ---
        Reading {
            timestamp: self.timestamp,
            source,
            temperature: self.temperature,
            humidity: self.humidity,
            irradiance: self.irradiance,
            wind_speed: self.wind_speed,
            wind_power_density: Some(self.wind_power_density),
            solar_energy_yield: Some(self.solar_energy_yield),
        }
    }
}

/// Row shape of the `sensor_data` table.
#[derive(Debug, sqlx::FromRow)]
pub struct ReadingRow {
    // ---
    pub timestamp: NaiveDateTime,
    pub source: String,
    pub temperature: f64,
    pub humidity: f64,
    pub irradiance: f64,
    pub wind_speed: f64,
    pub wind_power_density: Option<f64>,
    pub solar_energy_yield: Option<f64>,
}

impl TryFrom<ReadingRow> for Reading {
    type Error = Error;

    fn try_from(row: ReadingRow) -> Result<Self, Self::Error> {
        // ---
        Ok(Reading {
            timestamp: row.timestamp,
            source: row.source.parse()?,
            temperature: row.temperature,
            humidity: row.humidity,
            irradiance: row.irradiance,
            wind_speed: row.wind_speed,
            wind_power_density: row.wind_power_density,
            solar_energy_yield: row.solar_energy_yield,
        })
    }
}

/// Round half away from zero to `places` decimals.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use chrono::NaiveDate;

    fn row(source: &str) -> ReadingRow {
        // ---
        ReadingRow {
            timestamp: NaiveDate::from_ymd_opt(2026, 1, 5)
                .unwrap()
                .and_hms_opt(13, 0, 0)
                .unwrap(),
            source: source.to_string(),
            temperature: 28.4,
            humidity: 66.0,
            irradiance: 512.5,
            wind_speed: 4.0,
            wind_power_density: Some(39.2),
            solar_energy_yield: None,
        }
    }

    #[test]
    fn test_source_labels() {
        // ---
        for source in Source::ALL {
            assert_eq!(source.as_str().parse::<Source>().unwrap(), source);
        }
        assert_eq!(Source::LiveWeather.to_string(), "live_weather");
    }

    #[test]
    fn test_every_label_parses_back() {
        // ---
        for source in Source::ALL {
            assert_eq!(source.labels()[0], source.as_str());
            for label in source.labels() {
                assert_eq!(label.parse::<Source>().unwrap(), source);
            }
        }
    }

    #[test]
    fn test_legacy_labels_map_to_live_sources() {
        // ---
        assert_eq!("openweather".parse::<Source>().unwrap(), Source::LiveWeather);
        assert_eq!("NASA_POWER".parse::<Source>().unwrap(), Source::LiveSolar);
        assert!("csv".parse::<Source>().is_err());
    }

    #[test]
    fn test_row_conversion() {
        // ---
        let reading = Reading::try_from(row("nasa_power")).unwrap();
        assert_eq!(reading.source, Source::LiveSolar);
        assert_eq!(reading.wind_power_density, Some(39.2));
        assert_eq!(reading.solar_energy_yield, None);

        assert!(Reading::try_from(row("unknown")).is_err());
    }

    #[test]
    fn test_source_serializes_canonically() {
        // ---
        let json = serde_json::to_string(&Source::LiveSolar).unwrap();
        assert_eq!(json, "\"live_solar\"");
    }

    #[test]
    fn test_round_to() {
        // ---
        assert_eq!(round_to(39.199999, 2), 39.2);
        assert_eq!(round_to(1.23456, 3), 1.235);
        assert_eq!(round_to(-0.04, 1), -0.0);
    }
}
