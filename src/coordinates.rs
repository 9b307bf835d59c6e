//! # Horizontal coordinate transform
//!
//! Converts equatorial positions (right ascension / declination) into the local
//! horizontal frame (altitude / azimuth) of an [`Observer`] at a given instant.
//!
//! ## Pipeline
//!
//! ```text
//! RA/Dec J2000 --(IAU 1976 precession)--> RA/Dec of date
//!      --(topocentric shift, if distance known)--> topocentric RA/Dec of date
//!      --(hour angle H = LST − α)--> geometric alt/az --(refraction)--> apparent alt/az
//! ```
//!
//! * Local apparent sidereal time is `GMST(UTC) + equation of the equinoxes + longitude`.
//! * Azimuth is measured from **North through East**, in `[0, 360)`.
//! * Refraction uses `R[′] = 1.02 / tan(h + 10.3 / (h + 5.11))` for geometric altitudes
//!   at or above [`REFRACTION_FLOOR_DEG`], and is never negative.
//!
//! [`HorizonFrame`] caches everything that depends only on the site and the instant
//! (sidereal time, precession matrix, observer vector) so that [`altaz_bulk`] can
//! transform a whole catalog with a single evaluation.
//!
//! ## See also
//! ------------
//! * [`crate::ref_system::precession_matrix`] – J2000 → mean equator of date.
//! * [`crate::observers::Observer::geocentric_position`] – topocentric correction.
//! * [`crate::time::local_sidereal_time`] – Earth rotation angle.

use hifitime::Epoch;
use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

use crate::constants::{Degree, Kilometer, Radian, DEFAULT_MIN_ALTITUDE_DEG, RADEG, REFRACTION_FLOOR_DEG};
use crate::observers::Observer;
use crate::ref_system::{
    cartesian_to_spherical, normalize_degrees, precession_matrix, spherical_to_cartesian,
};
use crate::skyplan_errors::SkyPlanError;
use crate::time::local_sidereal_time;

/// Reference equinox of an equatorial position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Equinox {
    /// Mean equator and equinox of J2000.0 (catalog coordinates).
    J2000,
    /// True equator and equinox of the instant of observation.
    OfDate,
}

/// Right ascension / declination, with the equinox they refer to and an optional
/// geocentric distance (Sun, Moon, planets).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquatorialPosition {
    pub ra_deg: Degree,
    pub dec_deg: Degree,
    pub equinox: Equinox,
    pub distance_km: Option<Kilometer>,
}

impl EquatorialPosition {
    /// Catalog position referred to J2000, at infinite distance.
    pub fn j2000(ra_deg: Degree, dec_deg: Degree) -> Self {
        EquatorialPosition {
            ra_deg,
            dec_deg,
            equinox: Equinox::J2000,
            distance_km: None,
        }
    }

    /// Apparent position of date with an optional geocentric distance.
    pub fn of_date(ra_deg: Degree, dec_deg: Degree, distance_km: Option<Kilometer>) -> Self {
        EquatorialPosition {
            ra_deg,
            dec_deg,
            equinox: Equinox::OfDate,
            distance_km,
        }
    }

    /// The same direction at a known geocentric distance.
    pub fn with_distance(self, distance_km: Kilometer) -> Self {
        EquatorialPosition {
            distance_km: Some(distance_km),
            ..self
        }
    }

    /// Check that RA ∈ [0, 360), Dec ∈ [-90, 90] and distance > 0.
    pub fn validate(&self) -> Result<(), SkyPlanError> {
        SkyPlanError::check_range("ra_deg", self.ra_deg, 0.0, 360.0)?;
        if self.ra_deg >= 360.0 {
            return Err(SkyPlanError::OutOfRange {
                field: "ra_deg",
                value: self.ra_deg,
                min: 0.0,
                max: 360.0,
            });
        }
        SkyPlanError::check_range("dec_deg", self.dec_deg, -90.0, 90.0)?;
        if let Some(d) = self.distance_km {
            SkyPlanError::check_range("distance_km", d, f64::MIN_POSITIVE, f64::MAX)?;
        }
        Ok(())
    }

    fn unit_vector(&self) -> Vector3<f64> {
        spherical_to_cartesian(self.ra_deg * RADEG, self.dec_deg * RADEG, 1.0)
    }

    fn from_vector(v: &Vector3<f64>, equinox: Equinox, distance_km: Option<Kilometer>) -> Self {
        let (ra, dec, _) = cartesian_to_spherical(v);
        EquatorialPosition {
            ra_deg: normalize_degrees(ra / RADEG),
            dec_deg: (dec / RADEG).clamp(-90.0, 90.0),
            equinox,
            distance_km,
        }
    }

    /// The same position referred to the equinox of `epoch`.
    pub fn to_of_date(&self, epoch: &Epoch) -> Self {
        match self.equinox {
            Equinox::OfDate => *self,
            Equinox::J2000 => {
                let p = precession_matrix(epoch.to_mjd_tt_days());
                Self::from_vector(&(p * self.unit_vector()), Equinox::OfDate, self.distance_km)
            }
        }
    }
}

/// Altitude above the horizon and azimuth from North through East, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HorizontalPosition {
    pub altitude_deg: Degree,
    pub azimuth_deg: Degree,
}

impl HorizontalPosition {
    /// `true` when the altitude is strictly above `min_altitude`.
    pub fn is_visible(&self, min_altitude: Degree) -> bool {
        self.altitude_deg > min_altitude
    }

    /// Visibility against the default 0° horizon.
    pub fn is_above_horizon(&self) -> bool {
        self.is_visible(DEFAULT_MIN_ALTITUDE_DEG)
    }
}

/// Atmospheric refraction (degrees) to add to a geometric altitude (degrees).
///
/// Zero below [`REFRACTION_FLOOR_DEG`]; clamped at zero near the zenith where the
/// empirical formula changes sign.
pub fn refraction(geometric_altitude: Degree) -> Degree {
    if !(geometric_altitude >= REFRACTION_FLOOR_DEG) {
        return 0.0;
    }
    let h = geometric_altitude;
    let arg = (h + 10.3 / (h + 5.11)) * RADEG;
    let r_arcmin = 1.02 / arg.tan();
    (r_arcmin / 60.0).max(0.0)
}

/// Site- and instant-dependent quantities shared by every transformed object.
#[derive(Debug, Clone)]
pub struct HorizonFrame {
    lst: Radian,
    sin_lat: f64,
    cos_lat: f64,
    precession: Matrix3<f64>,
    observer_km: Vector3<Kilometer>,
}

impl HorizonFrame {
    pub fn new(observer: &Observer, epoch: &Epoch) -> Self {
        let lat = observer.latitude_deg() * RADEG;
        HorizonFrame {
            lst: local_sidereal_time(epoch, observer.longitude_deg()),
            sin_lat: lat.sin(),
            cos_lat: lat.cos(),
            precession: precession_matrix(epoch.to_mjd_tt_days()),
            observer_km: observer.geocentric_position(epoch),
        }
    }

    /// Local apparent sidereal time in radians.
    pub fn local_sidereal_time(&self) -> Radian {
        self.lst
    }

    /// Topocentric RA/Dec of date for an equatorial position.
    pub fn topocentric(&self, position: &EquatorialPosition) -> Result<EquatorialPosition, SkyPlanError> {
        position.validate()?;

        let mut v = match position.equinox {
            Equinox::J2000 => self.precession * position.unit_vector(),
            Equinox::OfDate => position.unit_vector(),
        };

        let distance = match position.distance_km {
            Some(d) => {
                v = v * d - self.observer_km;
                Some(v.norm())
            }
            None => None,
        };

        Ok(EquatorialPosition::from_vector(&v, Equinox::OfDate, distance))
    }

    /// Apparent horizontal position of an equatorial position.
    pub fn altaz(&self, position: &EquatorialPosition) -> Result<HorizontalPosition, SkyPlanError> {
        let topo = self.topocentric(position)?;

        let ra = topo.ra_deg * RADEG;
        let dec = topo.dec_deg * RADEG;
        let hour_angle = self.lst - ra;

        let (sin_dec, cos_dec) = dec.sin_cos();
        let (sin_h, cos_h) = hour_angle.sin_cos();

        let sin_alt = self.sin_lat * sin_dec + self.cos_lat * cos_dec * cos_h;
        let geometric = sin_alt.clamp(-1.0, 1.0).asin() / RADEG;

        let y = -cos_dec * sin_h;
        let x = sin_dec * self.cos_lat - cos_dec * self.sin_lat * cos_h;
        let azimuth = normalize_degrees(y.atan2(x) / RADEG);

        let altitude = (geometric + refraction(geometric)).min(90.0);

        Ok(HorizontalPosition {
            altitude_deg: altitude,
            azimuth_deg: azimuth,
        })
    }
}

/// Horizontal position of `position` seen by `observer` at `epoch`.
///
/// Arguments
/// ---------
/// * `observer`: validated site.
/// * `position`: equatorial coordinates, J2000 or of date, optionally with distance.
/// * `epoch`: instant of observation.
///
/// Errors
/// ------
/// * [`SkyPlanError::OutOfRange`] for RA outside `[0, 360)`, Dec outside `[-90, 90]` or
///   a non-positive distance.
pub fn altaz(
    observer: &Observer,
    position: &EquatorialPosition,
    epoch: &Epoch,
) -> Result<HorizontalPosition, SkyPlanError> {
    HorizonFrame::new(observer, epoch).altaz(position)
}

/// Transform many positions with a single sidereal-time and precession evaluation.
pub fn altaz_bulk(
    observer: &Observer,
    positions: &[EquatorialPosition],
    epoch: &Epoch,
) -> Result<Vec<HorizontalPosition>, SkyPlanError> {
    let frame = HorizonFrame::new(observer, epoch);
    positions.iter().map(|p| frame.altaz(p)).collect()
}

/// Great-circle distance in degrees between two equatorial positions.
///
/// Both positions are taken in the frame they are given in; callers mixing a J2000
/// and an of-date position should convert one with [`EquatorialPosition::to_of_date`].
pub fn angular_separation(a: &EquatorialPosition, b: &EquatorialPosition) -> Degree {
    let (va, vb) = (a.unit_vector(), b.unit_vector());
    // atan2 form stays accurate for tiny and near-180° separations
    va.cross(&vb).norm().atan2(va.dot(&vb)) / RADEG
}
