//! # Constants and type definitions for skyplan
//!
//! This module centralizes the **physical constants**, **conversion factors**, the
//! **empirical calibrations** and the common type aliases used throughout the crate.
//!
//! ## Overview
//!
//! - Astronomical and geophysical constants
//! - Unit conversions (degrees ↔ radians, days ↔ seconds, AU ↔ km)
//! - Solar altitude thresholds for twilight, golden and blue hour
//! - The Bortle radiance breakpoints and the sky-brightness calibration
//!
//! The light-pollution constants are an empirical calibration carried over as-is.
//! They have no physical derivation behind them and must not be re-fitted without
//! new measurements.

// -------------------------------------------------------------------------------------------------
// Physical constants and unit conversions
// -------------------------------------------------------------------------------------------------

/// 2π, useful for trigonometric conversions
pub const DPI: f64 = 2. * std::f64::consts::PI;

/// Astronomical Unit in kilometers (IAU 2012)
pub const AU: f64 = 149_597_870.7;

/// MJD epoch of J2000.0 (2000-01-01 12:00:00 TT)
pub const T2000: f64 = 51544.5;

/// Julian Date of J2000.0
pub const JD2000: f64 = 2_451_545.0;

/// Days per Julian century
pub const DAYS_PER_CENTURY: f64 = 36_525.0;

/// Degrees → radians
pub const RADEG: f64 = std::f64::consts::PI / 180.0;

/// Arcseconds → radians
pub const RADSEC: f64 = std::f64::consts::PI / 648000.0;

/// Earth equatorial radius in meters (GRS1980/WGS84)
pub const EARTH_MAJOR_AXIS: f64 = 6_378_137.0;

/// Earth polar radius in meters (GRS1980/WGS84)
pub const EARTH_MINOR_AXIS: f64 = 6_356_752.3;

/// Earth equatorial radius in kilometers
pub const EARTH_RADIUS_KM: f64 = EARTH_MAJOR_AXIS / 1000.0;

/// Mean obliquity of the ecliptic at J2000.0, in degrees
pub const OBLIQUITY_J2000_DEG: f64 = 23.439_279_444;

// -------------------------------------------------------------------------------------------------
// Horizon and refraction
// -------------------------------------------------------------------------------------------------

/// Geometric altitude (degrees) below which no refraction correction is applied.
pub const REFRACTION_FLOOR_DEG: f64 = -1.0;

/// Default minimum altitude (degrees) for an object to count as visible.
pub const DEFAULT_MIN_ALTITUDE_DEG: f64 = 0.0;

// -------------------------------------------------------------------------------------------------
// Solar altitude thresholds (degrees)
// -------------------------------------------------------------------------------------------------

/// Sunrise / sunset
pub const HORIZON_DEG: f64 = 0.0;
/// Civil twilight boundary
pub const CIVIL_TWILIGHT_DEG: f64 = -6.0;
/// Nautical twilight boundary
pub const NAUTICAL_TWILIGHT_DEG: f64 = -12.0;
/// Astronomical twilight / night boundary
pub const ASTRONOMICAL_TWILIGHT_DEG: f64 = -18.0;
/// Upper bound of the golden hour
pub const GOLDEN_HOUR_UPPER_DEG: f64 = 6.0;
/// Golden hour / blue hour boundary
pub const GOLDEN_BLUE_BOUNDARY_DEG: f64 = -4.0;
/// Lower bound of the blue hour
pub const BLUE_HOUR_LOWER_DEG: f64 = -8.0;

// -------------------------------------------------------------------------------------------------
// Light pollution calibration
// -------------------------------------------------------------------------------------------------

/// Upper radiance bounds (nW·cm⁻²·sr⁻¹, inclusive) of Bortle classes 1 through 8.
/// Anything above the last bound is class 9.
pub const BORTLE_BREAKPOINTS: [f64; 8] = [0.171, 0.333, 0.630, 1.260, 2.520, 5.040, 10.08, 20.16];

/// Zero point of the radiance → MPSAS conversion.
pub const MPSAS_ZERO_POINT: f64 = 21.9;

/// Offset added to the radiance before taking the logarithm.
pub const MPSAS_RADIANCE_OFFSET: f64 = 0.001;

/// Brightest sky brightness reported (mag/arcsec²).
pub const MPSAS_MIN: f64 = 16.0;

/// Darkest sky brightness reported (mag/arcsec²).
pub const MPSAS_MAX: f64 = 22.0;

/// Bortle class reported when no radiance data is available.
pub const FALLBACK_BORTLE: u8 = 4;

/// Sky brightness reported when no radiance data is available.
pub const FALLBACK_MPSAS: f64 = 20.0;

// -------------------------------------------------------------------------------------------------
// Type aliases
// -------------------------------------------------------------------------------------------------

/// Angle in degrees
pub type Degree = f64;
/// Angle in arcseconds
pub type ArcSec = f64;
/// Angle in radians
pub type Radian = f64;
/// Distance in kilometers
pub type Kilometer = f64;
/// Distance in meters
pub type Meter = f64;
/// Modified Julian Date (days)
pub type MJD = f64;
/// Satellite night radiance in nW·cm⁻²·sr⁻¹
pub type Radiance = f64;
