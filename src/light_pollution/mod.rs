//! # Light pollution estimator
//!
//! Converts satellite night-time radiance at a location into the Bortle dark-sky
//! class and the zenith sky brightness in mag/arcsec² (MPSAS).
//!
//! ## Overview
//!
//! ```text
//! (lat, lon) --geotransform--> pixel --nearest neighbour--> radiance (nW·cm⁻²·sr⁻¹)
//!     radiance --breakpoints--> Bortle 1..=9
//!     radiance --21.9 − 2.5·log10(r + 0.001), clamped to [16, 22]--> MPSAS
//! ```
//!
//! The radiance raster is loaded at most once per process ([`shared_raster`]) and is
//! read-only afterwards. Data problems never surface as errors: an unavailable
//! raster or a coordinate outside its coverage yields [`LightPollution::fallback`]
//! with `degraded = true`. Invalid coordinates are still rejected.
//!
//! ## See also
//! ------------
//! * [`raster::RadianceRaster`] – GeoTIFF loading and pixel lookup.
//! * [`crate::constants::BORTLE_BREAKPOINTS`] – Radiance calibration.

pub mod raster;

use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::config::SkyPlanConfig;
use crate::constants::{
    Degree, Radiance, BORTLE_BREAKPOINTS, FALLBACK_BORTLE, FALLBACK_MPSAS, MPSAS_MAX, MPSAS_MIN,
    MPSAS_RADIANCE_OFFSET, MPSAS_ZERO_POINT,
};
use crate::skyplan_errors::SkyPlanError;

pub use raster::{GeoTransform, RadianceRaster};

/// Description attached to the fallback estimate.
pub const FALLBACK_DESCRIPTION: &str = "Data unavailable - using estimated value";

/// Approximate raster pixels per kilometre (VIIRS pixels are ~500 m).
const PIXELS_PER_KM: f64 = 2.0;

static PROCESS_RASTER: OnceCell<Option<Arc<RadianceRaster>>> = OnceCell::new();

/// Light-pollution assessment of a location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightPollution {
    pub bortle_scale: u8,
    /// Radiance at the location, `None` when no data was available.
    pub radiance: Option<Radiance>,
    pub sky_brightness_mpsas: f64,
    pub description: String,
    /// `true` when the values are the documented fallback rather than a measurement.
    pub degraded: bool,
}

impl LightPollution {
    pub fn from_radiance(radiance: Radiance) -> Self {
        let radiance = radiance.max(0.0);
        let bortle = radiance_to_bortle(radiance);
        LightPollution {
            bortle_scale: bortle,
            radiance: Some(radiance),
            sky_brightness_mpsas: radiance_to_mpsas(radiance),
            description: bortle_description(bortle).to_string(),
            degraded: false,
        }
    }

    pub fn fallback() -> Self {
        LightPollution {
            bortle_scale: FALLBACK_BORTLE,
            radiance: None,
            sky_brightness_mpsas: FALLBACK_MPSAS,
            description: FALLBACK_DESCRIPTION.to_string(),
            degraded: true,
        }
    }
}

/// Radiance statistics in a square window around a location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DarknessStats {
    pub mean_radiance: Radiance,
    pub min_radiance: Radiance,
    pub max_radiance: Radiance,
    pub std_radiance: Radiance,
    pub darkest_bortle: u8,
    pub brightest_bortle: u8,
    pub radius_km: f64,
}

/// Bortle class for a radiance, using inclusive upper bounds.
///
/// Negative and NaN radiances are treated as zero.
pub fn radiance_to_bortle(radiance: Radiance) -> u8 {
    let r = if radiance.is_nan() { 0.0 } else { radiance };
    BORTLE_BREAKPOINTS
        .iter()
        .position(|&upper| r <= upper)
        .map_or(9, |i| i as u8 + 1)
}

/// Zenith sky brightness (mag/arcsec²) for a radiance, clamped to [16, 22].
pub fn radiance_to_mpsas(radiance: Radiance) -> f64 {
    if radiance.is_nan() || radiance <= 0.0 {
        return MPSAS_MAX;
    }
    (MPSAS_ZERO_POINT - 2.5 * (radiance + MPSAS_RADIANCE_OFFSET).log10()).clamp(MPSAS_MIN, MPSAS_MAX)
}

pub fn bortle_description(bortle: u8) -> &'static str {
    match bortle {
        1 => "Excellent dark sky site - Milky Way casts shadows",
        2 => "Typical truly dark site - Airglow visible",
        3 => "Rural sky - Some light pollution horizon",
        4 => "Rural/suburban transition - Milky Way still impressive",
        5 => "Suburban sky - Milky Way very weak",
        6 => "Bright suburban sky - Milky Way invisible",
        7 => "Suburban/urban transition - Sky strongly lit",
        8 => "City sky - Entire sky grayish white",
        9 => "Inner-city sky - Only brightest objects visible",
        _ => "Unknown",
    }
}

fn check_coordinates(latitude: Degree, longitude: Degree) -> Result<(), SkyPlanError> {
    SkyPlanError::check_range("latitude", latitude, -90.0, 90.0)?;
    SkyPlanError::check_range("longitude", longitude, -180.0, 180.0)
}

/// Process-wide raster, loaded on first use from `path`.
///
/// The first caller decides the outcome: later calls return the cached raster (or
/// the cached absence of one) whatever path they pass. A failed load is logged
/// once and remembered.
pub fn shared_raster(path: Option<&Utf8Path>) -> Option<Arc<RadianceRaster>> {
    PROCESS_RASTER
        .get_or_init(|| match path {
            None => {
                log::warn!("no radiance raster configured, light pollution uses fallback values");
                None
            }
            Some(path) => match RadianceRaster::from_geotiff(path) {
                Ok(raster) => Some(Arc::new(raster)),
                Err(err) => {
                    log::warn!("radiance raster {path} unavailable: {err}");
                    None
                }
            },
        })
        .clone()
}

/// Raster path from the default configuration lookup.
fn configured_raster_path() -> Option<Utf8PathBuf> {
    match SkyPlanConfig::from_default_location() {
        Ok(config) => config.light_pollution.raster_path,
        Err(err) => {
            log::warn!("configuration unreadable, no radiance raster: {err}");
            None
        }
    }
}

/// Estimates light pollution from an optional radiance raster.
#[derive(Debug, Clone, Default)]
pub struct LightPollutionEstimator {
    raster: Option<Arc<RadianceRaster>>,
}

impl LightPollutionEstimator {
    pub fn new(raster: Option<Arc<RadianceRaster>>) -> Self {
        LightPollutionEstimator { raster }
    }

    /// Estimator over the process-wide raster loaded from `path`.
    pub fn shared(path: Option<&Utf8Path>) -> Self {
        LightPollutionEstimator::new(shared_raster(path))
    }

    /// Whether estimates can be measured rather than fallback.
    pub fn has_data(&self) -> bool {
        self.raster.is_some()
    }

    /// Light pollution at a location.
    ///
    /// Arguments
    /// ---------
    /// * `latitude`, `longitude`: geographic coordinates in degrees.
    ///
    /// Return
    /// ------
    /// * The measured values, or [`LightPollution::fallback`] when there is no raster
    ///   or the location is outside of it.
    ///
    /// Errors
    /// ------
    /// * [`SkyPlanError::OutOfRange`] for invalid coordinates.
    pub fn estimate(&self, latitude: Degree, longitude: Degree) -> Result<LightPollution, SkyPlanError> {
        check_coordinates(latitude, longitude)?;

        let radiance = self
            .raster
            .as_deref()
            .and_then(|raster| raster.radiance_at(latitude, longitude));

        Ok(match radiance {
            Some(r) => LightPollution::from_radiance(r),
            None => {
                log::debug!("no radiance at ({latitude}, {longitude}), using fallback");
                LightPollution::fallback()
            }
        })
    }

    /// Radiance statistics within ≈`radius_km` of a location, to find darker sites
    /// nearby. `None` when there is no data around the location.
    pub fn nearby_darkness_stats(
        &self,
        latitude: Degree,
        longitude: Degree,
        radius_km: f64,
    ) -> Result<Option<DarknessStats>, SkyPlanError> {
        check_coordinates(latitude, longitude)?;
        SkyPlanError::check_range("radius_km", radius_km, 0.5, 1000.0)?;

        let Some(raster) = self.raster.as_deref() else {
            return Ok(None);
        };
        let radius_px = (radius_km * PIXELS_PER_KM) as usize;
        let values = match raster.window(latitude, longitude, radius_px) {
            Some(v) if !v.is_empty() => v,
            _ => return Ok(None),
        };

        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        Ok(Some(DarknessStats {
            mean_radiance: mean,
            min_radiance: min,
            max_radiance: max,
            std_radiance: variance.sqrt(),
            darkest_bortle: radiance_to_bortle(min),
            brightest_bortle: radiance_to_bortle(max),
            radius_km,
        }))
    }
}

/// Light pollution at a location, using the process-wide raster configured through
/// the default configuration (`SKYPLAN_VNL_PATH` or `light_pollution.raster_path`).
pub fn light_pollution(latitude: Degree, longitude: Degree) -> Result<LightPollution, SkyPlanError> {
    check_coordinates(latitude, longitude)?;
    let raster = PROCESS_RASTER
        .get()
        .cloned()
        .unwrap_or_else(|| shared_raster(configured_raster_path().as_deref()));
    LightPollutionEstimator::new(raster).estimate(latitude, longitude)
}
