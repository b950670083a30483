//! Synthetic weather and solar model.
//!
//! Maps an hour to a physically plausible tropical reading: seasonal base
//! temperature with a diurnal swing, humidity inversely coupled to the
//! warm part of the day, midday wind, daylight-only UV and a noon-peaked
//! irradiance profile attenuated by cloud cover. All randomness comes from
//! an injected [`Noise`] so the model is reproducible under a fixed seed and
//! fully deterministic under [`NoNoise`].

use chrono::{Datelike, NaiveDateTime, Timelike};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::energy;
use crate::models::{round_to, Sample, Source};

pub const HUMIDITY_RANGE: (f64, f64) = (40.0, 95.0);
pub const IRRADIANCE_MAX: f64 = 1200.0;
pub const SOLAR_IRRADIANCE_MAX: f64 = 1100.0;
pub const UV_MAX: f64 = 11.0;
pub const WIND_FLOOR: f64 = 0.5;

const SUNRISE_HOUR: u32 = 6;
const SUNSET_HOUR: u32 = 18;

// ---

/// Source of bounded jitter for the model.
pub trait Noise: Send {
    /// A value in `[low, high)`; `low` when the range is empty.
    fn uniform(&mut self, low: f64, high: f64) -> f64;
}

/// Pseudo-random jitter, reproducible when seeded.
pub struct SeededNoise(StdRng);

impl SeededNoise {
    pub fn new(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        Self(StdRng::from_entropy())
    }
}

impl Noise for SeededNoise {
    fn uniform(&mut self, low: f64, high: f64) -> f64 {
        if high <= low {
            return low;
        }
        self.0.gen_range(low..high)
    }
}

/// Jitter disabled: every draw is the midpoint of its range.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoNoise;

impl Noise for NoNoise {
    fn uniform(&mut self, low: f64, high: f64) -> f64 {
        (low + high) / 2.0
    }
}

/// Month bands with their base temperature and diurnal swing (°C).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Season {
    /// January and February.
    Cool,
    /// March to May.
    Hot,
    /// June to November.
    Rainy,
    /// December, between the rainy and cool bands.
    Transition,
}

impl Season {
    fn of_month(month: u32) -> Self {
        // ---
        match month {
            1 | 2 => Season::Cool,
            3..=5 => Season::Hot,
            6..=11 => Season::Rainy,
            _ => Season::Transition,
        }
    }

    fn base_and_swing(self) -> (f64, f64) {
        // ---
        match self {
            Season::Cool => (26.0, 4.0),
            Season::Hot => (30.0, 5.0),
            Season::Rainy => (28.0, 3.0),
            Season::Transition => (27.0, 4.0),
        }
    }
}

fn temperature_factor(hour: u32) -> f64 {
    // ---
    match hour {
        0..=5 => -0.3,
        6..=9 => 0.0,
        10..=14 => 0.4,
        15..=18 => 0.2,
        _ => -0.1,
    }
}

fn humidity_offset(hour: u32) -> f64 {
    // ---
    match hour {
        0..=5 => 15.0,
        6..=9 => 10.0,
        10..=14 => -10.0,
        _ => 0.0,
    }
}

fn wind_offset(hour: u32) -> f64 {
    // ---
    match hour {
        10..=15 => 2.0,
        0..=5 => -1.0,
        _ => 0.5,
    }
}

fn is_daylight(hour: u32) -> bool {
    (SUNRISE_HOUR..SUNSET_HOUR).contains(&hour)
}

/// 1 at noon, 0 at sunrise and sunset.
fn peak_factor(hour: u32) -> f64 {
    1.0 - (12.0 - hour as f64).abs() / 6.0
}

/// Synthesize a full reading for the hour containing `timestamp`.
///
/// The returned sample is stamped with `timestamp` truncated to the hour.
/// Values are rounded the way they are stored: 2 decimals for physical
/// quantities, 1 for the UV index.
pub fn synthesize(timestamp: NaiveDateTime, noise: &mut dyn Noise) -> Sample {
    // ---
    let hour = timestamp.hour();
    let (base, swing) = Season::of_month(timestamp.month()).base_and_swing();

    let temperature = base + swing * temperature_factor(hour) + noise.uniform(-0.5, 0.5);

    let humidity = (75.0 + humidity_offset(hour) + noise.uniform(-5.0, 5.0))
        .clamp(HUMIDITY_RANGE.0, HUMIDITY_RANGE.1);

    let wind_speed = (3.0 + wind_offset(hour) + noise.uniform(-1.0, 1.0)).max(WIND_FLOOR);

    let cloudiness = if is_daylight(hour) {
        noise.uniform(20.0, 80.0)
    } else {
        noise.uniform(10.0, 50.0)
    };

    let uv_index = if is_daylight(hour) {
        ((hour - SUNRISE_HOUR) as f64 * 1.2 + noise.uniform(-1.0, 1.0)).clamp(0.0, UV_MAX)
    } else {
        0.0
    };

    let irradiance = if is_daylight(hour) {
        let clear_sky = 800.0 * peak_factor(hour);
        let cloud_adjustment = (100.0 - cloudiness) / 100.0;
        (clear_sky * cloud_adjustment + uv_index * 25.0 + noise.uniform(-30.0, 30.0))
            .clamp(0.0, IRRADIANCE_MAX)
    } else {
        noise.uniform(0.0, 20.0)
    };

    build_sample(
        truncate_to_hour(timestamp),
        temperature,
        humidity,
        wind_speed,
        cloudiness,
        uv_index,
        irradiance,
    )
}

/// Irradiance-only profile used for the solar provider's series.
pub fn solar_irradiance(hour: u32, noise: &mut dyn Noise) -> f64 {
    // ---
    if is_daylight(hour) {
        (850.0 * peak_factor(hour) + noise.uniform(-50.0, 50.0)).clamp(0.0, SOLAR_IRRADIANCE_MAX)
    } else {
        noise.uniform(0.0, 15.0)
    }
}

/// Synthesize the reading a given source would have recorded.
///
/// `live_solar` keeps the weather fields of the main model but swaps in the
/// solar irradiance profile; the energy yield is recomputed accordingly.
pub fn synthesize_for(source: Source, timestamp: NaiveDateTime, noise: &mut dyn Noise) -> Sample {
    // ---
    let sample = synthesize(timestamp, noise);
    match source {
        Source::Sim | Source::LiveWeather => sample,
        Source::LiveSolar => {
            let irradiance = solar_irradiance(sample.timestamp.hour(), noise);
            build_sample(
                sample.timestamp,
                sample.temperature,
                sample.humidity,
                sample.wind_speed,
                sample.cloudiness,
                sample.uv_index,
                irradiance,
            )
        }
    }
}

fn build_sample(
    timestamp: NaiveDateTime,
    temperature: f64,
    humidity: f64,
    wind_speed: f64,
    cloudiness: f64,
    uv_index: f64,
    irradiance: f64,
) -> Sample {
    // ---
    let wind_speed = round_to(wind_speed, 2);
    let cloudiness = round_to(cloudiness, 2);
    let uv_index = round_to(uv_index, 1);
    let irradiance = round_to(irradiance, 2);

    Sample {
        timestamp,
        temperature: round_to(temperature, 2),
        humidity: round_to(humidity, 2),
        wind_speed,
        cloudiness,
        uv_index,
        irradiance,
        // wind_speed is floored at WIND_FLOOR above, so this cannot fail
        wind_power_density: energy::wind_power_density(wind_speed).unwrap_or(0.0),
        solar_energy_yield: energy::solar_energy_yield(irradiance, cloudiness, Some(uv_index)),
    }
}

/// Zero minutes, seconds and sub-second precision.
pub fn truncate_to_hour(ts: NaiveDateTime) -> NaiveDateTime {
    // ---
    ts.date()
        .and_hms_opt(ts.hour(), 0, 0)
        .unwrap_or(ts)
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn at(month: u32, day: u32, hour: u32) -> NaiveDateTime {
        // ---
        NaiveDate::from_ymd_opt(2026, month, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_no_noise_is_deterministic() {
        // ---
        let ts = at(4, 10, 12);
        let a = synthesize(ts, &mut NoNoise);
        let b = synthesize(ts, &mut NoNoise);
        assert_eq!(a, b);

        // Hot season midday: 30 + 5 * 0.4
        assert_eq!(a.temperature, 32.0);
        // 75 - 10
        assert_eq!(a.humidity, 65.0);
        // 3 + 2
        assert_eq!(a.wind_speed, 5.0);
        assert_eq!(a.cloudiness, 50.0);
        // (12 - 6) * 1.2
        assert_eq!(a.uv_index, 7.2);
        // 800 * 1.0 * 0.5 + 7.2 * 25
        assert_eq!(a.irradiance, 580.0);
        assert_eq!(a.wind_power_density, 76.56);
    }

    #[test]
    fn test_same_seed_same_output() {
        // ---
        let ts = at(7, 3, 9);
        let a = synthesize(ts, &mut SeededNoise::new(42));
        let b = synthesize(ts, &mut SeededNoise::new(42));
        assert_eq!(a, b);
    }

    #[test]
    fn test_night_has_no_uv_and_little_light() {
        // ---
        let mut noise = SeededNoise::new(7);
        for hour in (0..6).chain(18..24) {
            let sample = synthesize(at(1, 15, hour), &mut noise);
            assert_eq!(sample.uv_index, 0.0);
            assert!(sample.irradiance <= 20.0, "hour {hour}: {}", sample.irradiance);
            assert!((10.0..=50.0).contains(&sample.cloudiness));
        }
    }

    #[test]
    fn test_seasonal_bands() {
        // ---
        let cool = synthesize(at(1, 10, 3), &mut NoNoise).temperature;
        let hot = synthesize(at(4, 10, 3), &mut NoNoise).temperature;
        let rainy = synthesize(at(8, 10, 3), &mut NoNoise).temperature;
        let december = synthesize(at(12, 10, 3), &mut NoNoise).temperature;

        assert!(hot > rainy && rainy > december && december > cool);
    }

    #[test]
    fn test_timestamp_truncated_to_hour() {
        // ---
        let ts = at(5, 5, 14) + Duration::minutes(37) + Duration::seconds(12);
        assert_eq!(synthesize(ts, &mut NoNoise).timestamp, at(5, 5, 14));
    }

    #[test]
    fn test_range_clamps_hold_everywhere() {
        // ---
        let mut noise = SeededNoise::new(2026);
        let start = at(1, 1, 0);
        for i in 0..10_000i64 {
            // Stride through every hour and month, with a jittered minute offset.
            let ts = start + Duration::minutes(i * 157 + (i % 60));
            let s = synthesize(ts, &mut noise);

            assert!((40.0..=95.0).contains(&s.humidity), "{ts}: humidity {}", s.humidity);
            assert!((0.0..=1200.0).contains(&s.irradiance), "{ts}: irradiance {}", s.irradiance);
            assert!(s.wind_speed >= 0.5, "{ts}: wind {}", s.wind_speed);
            assert!((0.0..=11.0).contains(&s.uv_index), "{ts}: uv {}", s.uv_index);
            assert!(s.wind_power_density >= 0.0);
            assert!(s.solar_energy_yield >= 0.0);
        }
    }

    #[test]
    fn test_solar_profile_for_live_solar() {
        // ---
        let sample = synthesize_for(Source::LiveSolar, at(3, 1, 12), &mut NoNoise);
        assert_eq!(sample.irradiance, 850.0);

        let night = synthesize_for(Source::LiveSolar, at(3, 1, 2), &mut NoNoise);
        assert_eq!(night.irradiance, 7.5);

        let mut noise = SeededNoise::new(5);
        for hour in 0..24 {
            let s = synthesize_for(Source::LiveSolar, at(9, 9, hour), &mut noise);
            assert!((0.0..=1100.0).contains(&s.irradiance));
        }
    }
}
