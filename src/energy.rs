//! Derived energy metrics: wind power density and daily solar energy yield.

use crate::error::{Error, Result};
use crate::models::round_to;

/// Sea-level air density, kg/m³.
pub const AIR_DENSITY: f64 = 1.225;

/// Peak sun hours assumed for a tropical site.
pub const PEAK_SUN_HOURS: f64 = 4.0;

// ---

/// Kinetic energy flux of wind per unit area, `0.5·ρ·v³`, in W/m² rounded to
/// 2 decimals.
///
/// Negative or non-finite speeds are rejected.
pub fn wind_power_density(speed: f64) -> Result<f64> {
    // ---
    if !speed.is_finite() || speed < 0.0 {
        return Err(Error::InvalidInput(format!(
            "wind speed must be a non-negative number, got {speed}"
        )));
    }
    Ok(round_to(0.5 * AIR_DENSITY * speed.powi(3), 2))
}

/// Estimated daily energy harvest in kWh/m²/day, rounded to 3 decimals.
///
/// `irradiance * PEAK_SUN_HOURS * cloud_factor * uv_factor / 1000`, where the
/// cloud factor is the clear-sky fraction and the UV factor is `uv / 6`
/// clamped to `[0.5, 2.0]` (1.0 when no UV index is known).
pub fn solar_energy_yield(irradiance: f64, cloudiness: f64, uv_index: Option<f64>) -> f64 {
    // ---
    let cloud_factor = (100.0 - cloudiness) / 100.0;
    let uv_factor = uv_index.map_or(1.0, |uv| (uv / 6.0).clamp(0.5, 2.0));

    round_to(irradiance * PEAK_SUN_HOURS * cloud_factor * uv_factor / 1000.0, 3)
}
