//! # Observer site geometry
//!
//! A ground-based [`Observer`] is a validated geodetic position on the WGS84 ellipsoid.
//! Observers are immutable and carry no time: the instant of a computation is always
//! passed alongside the site, so the same `Observer` can be reused across a night scan.
//!
//! ## Overview
//!
//! - [`Observer::new`] validates latitude, longitude and elevation and precomputes the
//!   **geocentric parallax coordinates** `(ρ·cosφ′, ρ·sinφ′)`.
//! - [`Observer::geocentric_position`] rotates the body-fixed site vector by the local
//!   sidereal time to give the observer position in the **equatorial frame of date** (km).
//!   This is the vector subtracted from geocentric Sun/Moon/planet positions to make
//!   them topocentric.
//! - [`geodetic_to_parallax`] / [`lat_alt_to_parallax`] convert a geodetic latitude and a
//!   height into `(ρ·cosφ′, ρ·sinφ′)`, accounting for Earth oblateness via
//!   [`EARTH_MAJOR_AXIS`] / [`EARTH_MINOR_AXIS`].
//!
//! ## Units
//!
//! - Latitude / longitude: **degrees**, longitude east positive, in `[-180, 180]`.
//! - Elevation: **meters** above the ellipsoid.
//! - Parallax coordinates: **Earth equatorial radii**.
//!
//! ## See also
//! ------------
//! * [`crate::coordinates::altaz`] – Uses the observer for the horizontal transform.
//! * [`crate::time::local_sidereal_time`] – Earth rotation angle at the site.

use hifitime::Epoch;
use nalgebra::Vector3;
use ordered_float::NotNan;

use crate::constants::{Degree, Kilometer, Meter, EARTH_MAJOR_AXIS, EARTH_MINOR_AXIS, EARTH_RADIUS_KM};
use crate::skyplan_errors::SkyPlanError;
use crate::time::local_sidereal_time;

/// Geodetic observing site.
///
/// `NotNan<f64>` forbids NaN in the site geometry, so observers can be hashed and
/// compared (e.g. as keys of per-site caches).
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct Observer {
    /// Geodetic latitude in **degrees** (north positive).
    pub latitude: NotNan<f64>,

    /// Geodetic longitude in **degrees** east of Greenwich.
    pub longitude: NotNan<f64>,

    /// Height above the WGS84 ellipsoid in **meters**.
    pub elevation: NotNan<f64>,

    /// Optional human-readable site name.
    pub name: Option<String>,

    /// ρ·cosφ′ (geocentric latitude φ′), in Earth radii.
    rho_cos_phi: NotNan<f64>,

    /// ρ·sinφ′ (geocentric latitude φ′), in Earth radii.
    rho_sin_phi: NotNan<f64>,
}

impl Observer {
    /// Create a new observer from geodetic coordinates.
    ///
    /// Arguments
    /// -----------------
    /// * `latitude`: Geodetic latitude in **degrees**, `[-90, 90]`.
    /// * `longitude`: Geodetic longitude in **degrees**, east positive, `[-180, 180]`.
    /// * `elevation`: Height above the reference ellipsoid in **meters**, `≥ 0`.
    /// * `name`: Optional site name.
    ///
    /// Return
    /// ----------
    /// * A validated [`Observer`] with precomputed parallax coordinates.
    ///
    /// Errors
    /// ----------
    /// * [`SkyPlanError::OutOfRange`] if a coordinate is outside its range or not finite.
    pub fn new(
        latitude: Degree,
        longitude: Degree,
        elevation: Meter,
        name: Option<String>,
    ) -> Result<Observer, SkyPlanError> {
        SkyPlanError::check_range("latitude", latitude, -90.0, 90.0)?;
        SkyPlanError::check_range("longitude", longitude, -180.0, 180.0)?;
        SkyPlanError::check_range("elevation_m", elevation, 0.0, f64::MAX)?;

        let (rho_cos_phi, rho_sin_phi) = geodetic_to_parallax(latitude, elevation);

        // Every value was checked finite above, NaN is impossible here
        let not_nan = |x: f64| {
            NotNan::new(x).map_err(|_| SkyPlanError::InvalidInput("NaN in observer geometry".into()))
        };

        Ok(Observer {
            latitude: not_nan(latitude)?,
            longitude: not_nan(longitude)?,
            elevation: not_nan(elevation)?,
            name,
            rho_cos_phi: not_nan(rho_cos_phi)?,
            rho_sin_phi: not_nan(rho_sin_phi)?,
        })
    }

    /// Observer at sea level without a name.
    pub fn at_sea_level(latitude: Degree, longitude: Degree) -> Result<Observer, SkyPlanError> {
        Observer::new(latitude, longitude, 0.0, None)
    }

    pub fn latitude_deg(&self) -> Degree {
        self.latitude.into_inner()
    }

    pub fn longitude_deg(&self) -> Degree {
        self.longitude.into_inner()
    }

    /// Geocentric parallax coordinates `(ρ·cosφ′, ρ·sinφ′)` in Earth radii.
    pub fn parallax_coordinates(&self) -> (f64, f64) {
        (self.rho_cos_phi.into_inner(), self.rho_sin_phi.into_inner())
    }

    /// Geocentric position of the observer in the **equatorial frame of date**, in km.
    ///
    /// The body-fixed site vector is rotated by the local apparent sidereal time,
    /// so `x` points to the true equinox of date.
    ///
    /// Arguments
    /// -----------------
    /// * `epoch`: instant of the observation.
    ///
    /// Return
    /// ----------
    /// * `Vector3<Kilometer>` from the geocentre to the observer.
    pub fn geocentric_position(&self, epoch: &Epoch) -> Vector3<Kilometer> {
        let lst = local_sidereal_time(epoch, self.longitude_deg());
        let (rho_cos_phi, rho_sin_phi) = self.parallax_coordinates();
        Vector3::new(
            EARTH_RADIUS_KM * rho_cos_phi * lst.cos(),
            EARTH_RADIUS_KM * rho_cos_phi * lst.sin(),
            EARTH_RADIUS_KM * rho_sin_phi,
        )
    }
}

/// Convert geodetic latitude (radians) and height (meters) into normalized
/// parallax coordinates.
///
/// Arguments
/// ---------
/// * `lat` - Geodetic latitude in **radians**.
/// * `height` - Height above the reference ellipsoid in **meters**.
///
/// Returns
/// -------
/// A tuple `(rho_cos_phi, rho_sin_phi)`, the observer's distance from the geocentre
/// projected on the equatorial plane and on the polar axis, in Earth equatorial radii.
pub fn lat_alt_to_parallax(lat: f64, height: Meter) -> (f64, f64) {
    let axis_ratio = EARTH_MINOR_AXIS / EARTH_MAJOR_AXIS;

    // Parametric (reduced) latitude
    let u = (lat.sin() * axis_ratio).atan2(lat.cos());

    let rho_sin_phi = axis_ratio * u.sin() + (height / EARTH_MAJOR_AXIS) * lat.sin();
    let rho_cos_phi = u.cos() + (height / EARTH_MAJOR_AXIS) * lat.cos();

    (rho_cos_phi, rho_sin_phi)
}

/// Degrees flavour of [`lat_alt_to_parallax`].
pub fn geodetic_to_parallax(lat: Degree, height: Meter) -> (f64, f64) {
    lat_alt_to_parallax(lat.to_radians(), height)
}

#[cfg(test)]
mod observer_test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_observer_constructor() {
        let observer = Observer::new(0.0, 0.0, 0.0, None).unwrap();
        assert_eq!(observer.longitude, 0.0);
        assert_eq!(observer.parallax_coordinates(), (1.0, 0.0));

        let rubin = Observer::new(
            -30.2446,
            -70.74942,
            2647.,
            Some("Rubin Observatory".to_string()),
        )
        .unwrap();

        let (rho_cos_phi, rho_sin_phi) = rubin.parallax_coordinates();
        assert_relative_eq!(rho_cos_phi, 0.8649760504617418, epsilon = 1e-12);
        assert_relative_eq!(rho_sin_phi, -0.5009551027512434, epsilon = 1e-12);
    }

    #[test]
    fn test_observer_rejects_invalid_coordinates() {
        assert!(matches!(
            Observer::new(90.5, 0.0, 0.0, None),
            Err(SkyPlanError::OutOfRange { field: "latitude", .. })
        ));
        assert!(matches!(
            Observer::new(0.0, 181.0, 0.0, None),
            Err(SkyPlanError::OutOfRange { field: "longitude", .. })
        ));
        assert!(matches!(
            Observer::new(0.0, 0.0, -10.0, None),
            Err(SkyPlanError::OutOfRange { field: "elevation_m", .. })
        ));
        assert!(Observer::new(f64::NAN, 0.0, 0.0, None).is_err());
        assert!(Observer::new(0.0, f64::INFINITY, 0.0, None).is_err());
    }

    #[test]
    fn test_pole_parallax() {
        let (c, s) = geodetic_to_parallax(90.0, 0.0);
        assert_relative_eq!(c, 0.0, epsilon = 1e-12);
        assert_relative_eq!(s, EARTH_MINOR_AXIS / EARTH_MAJOR_AXIS, epsilon = 1e-12);
    }

    #[test]
    fn test_geocentric_position_norm() {
        let paris = Observer::new(48.8566, 2.3522, 35.0, None).unwrap();
        let epoch = Epoch::from_gregorian_utc(2024, 3, 15, 21, 0, 0, 0);
        let r = paris.geocentric_position(&epoch);

        // between polar and equatorial radius
        assert!(r.norm() > EARTH_MINOR_AXIS / 1000.0);
        assert!(r.norm() < EARTH_MAJOR_AXIS / 1000.0 + 0.1);
        // northern hemisphere
        assert!(r.z > 0.0);
    }
}
