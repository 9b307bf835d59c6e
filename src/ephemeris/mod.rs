//! # Ephemeris provider
//!
//! Positions of the Sun, the Moon and the planets Mercury through Neptune, and the
//! lunar phase, behind the [`Ephemeris`] trait.
//!
//! ## Overview
//!
//! The crate ships one implementation, [`AnalyticEphemeris`], built from three
//! low-precision analytic theories:
//!
//! | Body    | Theory                                    | Output frame                      |
//! |---------|-------------------------------------------|-----------------------------------|
//! | Sun     | mean elements + equation of the centre    | apparent, true equator of date    |
//! | Moon    | truncated periodic series                 | apparent, true equator of date    |
//! | Planets | Keplerian elements with secular rates     | geometric, mean equator of J2000  |
//!
//! Every position carries its geocentric distance so that
//! [`crate::coordinates::HorizonFrame`] can apply the topocentric correction. Any
//! other source (e.g. a JPL kernel reader) can be plugged in by implementing
//! [`Ephemeris::position`]; the lunar phase then comes for free from the default
//! [`Ephemeris::lunar_phase`].
//!
//! ## Lunar phase
//!
//! The illuminated fraction is `(1 + cos i) / 2`, with `i` the Sun–Moon–Earth phase
//! angle. The phase name comes from the Moon − Sun elongation in ecliptic longitude,
//! measured eastward in `[0, 360)`, split into eight 45° buckets centred on the
//! principal phases (New Moon at 0°, First Quarter at 90°, Full Moon at 180°,
//! Last Quarter at 270°).
//!
//! ## See also
//! ------------
//! * [`crate::coordinates::altaz`] – Horizontal coordinates of the returned positions.
//! * [`crate::time::julian_centuries_tt`] – Time argument of the theories.

pub mod moon;
pub mod planets;
pub mod sun;

use std::fmt;
use std::str::FromStr;

use hifitime::Epoch;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::constants::{Degree, RADEG};
use crate::coordinates::{EquatorialPosition, Equinox};
use crate::earth_orientation::true_obliquity;
use crate::ref_system::{
    cartesian_to_spherical, ecliptic_to_equatorial, normalize_degrees, precession_matrix,
    spherical_to_cartesian,
};
use crate::skyplan_errors::SkyPlanError;
use crate::time::julian_centuries_tt;

/// Solar-system bodies known to the ephemeris.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Body {
    Sun,
    Moon,
    Mercury,
    Venus,
    Mars,
    Jupiter,
    Saturn,
    Uranus,
    Neptune,
}

impl Body {
    /// The seven planets, Mercury to Neptune.
    pub const PLANETS: [Body; 7] = [
        Body::Mercury,
        Body::Venus,
        Body::Mars,
        Body::Jupiter,
        Body::Saturn,
        Body::Uranus,
        Body::Neptune,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Body::Sun => "Sun",
            Body::Moon => "Moon",
            Body::Mercury => "Mercury",
            Body::Venus => "Venus",
            Body::Mars => "Mars",
            Body::Jupiter => "Jupiter",
            Body::Saturn => "Saturn",
            Body::Uranus => "Uranus",
            Body::Neptune => "Neptune",
        }
    }

    pub fn is_planet(&self) -> bool {
        !matches!(self, Body::Sun | Body::Moon)
    }

    /// Marker colour on the sky map (RGB).
    pub fn color(&self) -> [u8; 3] {
        match self {
            Body::Sun => [255, 215, 0],
            Body::Moon => [245, 245, 245],
            Body::Mercury => [211, 211, 211],
            Body::Venus => [255, 255, 224],
            Body::Mars => [255, 69, 0],
            Body::Jupiter => [245, 222, 179],
            Body::Saturn => [240, 230, 140],
            Body::Uranus => [173, 216, 230],
            Body::Neptune => [100, 149, 237],
        }
    }
}

impl fmt::Display for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Body {
    type Err = SkyPlanError;

    /// Case-insensitive body name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        [Body::Sun, Body::Moon]
            .into_iter()
            .chain(Body::PLANETS)
            .find(|b| b.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| SkyPlanError::TargetNotFound(s.to_string()))
    }
}

/// The eight named lunar phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MoonPhase {
    NewMoon,
    WaxingCrescent,
    FirstQuarter,
    WaxingGibbous,
    FullMoon,
    WaningGibbous,
    LastQuarter,
    WaningCrescent,
}

impl MoonPhase {
    const ORDER: [MoonPhase; 8] = [
        MoonPhase::NewMoon,
        MoonPhase::WaxingCrescent,
        MoonPhase::FirstQuarter,
        MoonPhase::WaxingGibbous,
        MoonPhase::FullMoon,
        MoonPhase::WaningGibbous,
        MoonPhase::LastQuarter,
        MoonPhase::WaningCrescent,
    ];

    /// Phase from the eastward Moon − Sun elongation in degrees.
    pub fn from_elongation(elongation: Degree) -> MoonPhase {
        let bucket = ((elongation.rem_euclid(360.0) + 22.5) / 45.0).floor() as usize % 8;
        Self::ORDER[bucket]
    }
}

impl fmt::Display for MoonPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MoonPhase::NewMoon => "New Moon",
            MoonPhase::WaxingCrescent => "Waxing Crescent",
            MoonPhase::FirstQuarter => "First Quarter",
            MoonPhase::WaxingGibbous => "Waxing Gibbous",
            MoonPhase::FullMoon => "Full Moon",
            MoonPhase::WaningGibbous => "Waning Gibbous",
            MoonPhase::LastQuarter => "Last Quarter",
            MoonPhase::WaningCrescent => "Waning Crescent",
        };
        f.write_str(name)
    }
}

/// Illumination state of the Moon at an instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LunarPhase {
    /// Illuminated fraction of the disk, in [0, 1].
    pub illumination: f64,
    /// Moon − Sun elongation in ecliptic longitude, eastward, in [0, 360).
    pub elongation_deg: Degree,
    pub waxing: bool,
    pub phase: MoonPhase,
}

/// Geocentric Cartesian vector (km) of a position with a known distance, on the
/// equator of date.
fn of_date_vector(position: &EquatorialPosition, tjm: f64) -> Result<Vector3<f64>, SkyPlanError> {
    let distance = position.distance_km.ok_or_else(|| {
        SkyPlanError::DataUnavailable("lunar phase needs Sun and Moon distances".into())
    })?;
    let v = spherical_to_cartesian(position.ra_deg * RADEG, position.dec_deg * RADEG, distance);
    Ok(match position.equinox {
        Equinox::OfDate => v,
        Equinox::J2000 => precession_matrix(tjm) * v,
    })
}

/// Lunar phase from geocentric Sun and Moon positions.
///
/// Arguments
/// ---------
/// * `sun`, `moon`: geocentric positions with distances.
/// * `tjm`: MJD (TT) of the instant, for the obliquity of date.
pub fn lunar_phase_from_positions(
    sun: &EquatorialPosition,
    moon: &EquatorialPosition,
    tjm: f64,
) -> Result<LunarPhase, SkyPlanError> {
    let s = of_date_vector(sun, tjm)?;
    let m = of_date_vector(moon, tjm)?;

    let to_sun = s - m;
    let to_earth = -m;
    let cos_i = to_sun.dot(&to_earth) / (to_sun.norm() * to_earth.norm());
    let illumination = ((1.0 + cos_i.clamp(-1.0, 1.0)) / 2.0).clamp(0.0, 1.0);

    let to_ecliptic = ecliptic_to_equatorial(true_obliquity(tjm)).transpose();
    let (lon_sun, _, _) = cartesian_to_spherical(&(to_ecliptic * s));
    let (lon_moon, _, _) = cartesian_to_spherical(&(to_ecliptic * m));
    let elongation = normalize_degrees((lon_moon - lon_sun) / RADEG);

    Ok(LunarPhase {
        illumination,
        elongation_deg: elongation,
        waxing: elongation < 180.0,
        phase: MoonPhase::from_elongation(elongation),
    })
}

/// Source of solar-system positions.
pub trait Ephemeris: Send + Sync {
    /// Geocentric equatorial position of `body` at `epoch`, with its distance.
    ///
    /// Errors
    /// ------
    /// * [`SkyPlanError::DataUnavailable`] when the epoch is outside the source's coverage.
    fn position(&self, body: Body, epoch: &Epoch) -> Result<EquatorialPosition, SkyPlanError>;

    /// Lunar phase at `epoch`.
    fn lunar_phase(&self, epoch: &Epoch) -> Result<LunarPhase, SkyPlanError> {
        let sun = self.position(Body::Sun, epoch)?;
        let moon = self.position(Body::Moon, epoch)?;
        lunar_phase_from_positions(&sun, &moon, epoch.to_mjd_tt_days())
    }
}

/// Built-in analytic ephemeris.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnalyticEphemeris;

impl AnalyticEphemeris {
    pub fn new() -> Self {
        AnalyticEphemeris
    }
}

impl Ephemeris for AnalyticEphemeris {
    fn position(&self, body: Body, epoch: &Epoch) -> Result<EquatorialPosition, SkyPlanError> {
        let t = julian_centuries_tt(epoch);
        match body {
            Body::Sun => Ok(sun::sun_position(t)),
            Body::Moon => Ok(moon::moon_position(t)),
            planet => planets::planet_position(planet, t),
        }
    }
}
