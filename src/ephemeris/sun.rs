//! Low-precision solar theory (mean elements and equation of the centre).
//!
//! Accuracy is about 0.01° in apparent longitude over several centuries around
//! J2000, which is ample for twilight and night-window computations.

use crate::constants::{Degree, AU, RADEG, T2000};
use crate::coordinates::EquatorialPosition;
use crate::earth_orientation::{nutation, true_obliquity};
use crate::ref_system::normalize_degrees;

/// Apparent geometric elements of the Sun at `t` Julian centuries (TT) from J2000.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SolarElements {
    /// Apparent ecliptic longitude of date (degrees).
    pub apparent_longitude: Degree,
    /// Sun–Earth distance (AU).
    pub radius_au: f64,
}

pub(crate) fn solar_elements(t: f64) -> SolarElements {
    let l0 = 280.46646 + t * (36000.76983 + 0.0003032 * t);
    let m = (357.52911 + t * (35999.05029 - 0.0001537 * t)) * RADEG;
    let e = 0.016708634 - t * (0.000042037 + 0.0000001267 * t);

    let c = (1.914602 - t * (0.004817 + 0.000014 * t)) * m.sin()
        + (0.019993 - 0.000101 * t) * (2.0 * m).sin()
        + 0.000289 * (3.0 * m).sin();

    let true_longitude = l0 + c;
    let nu = m + c * RADEG;
    let radius_au = 1.000001018 * (1.0 - e * e) / (1.0 + e * nu.cos());

    // Nutation in longitude and annual aberration
    let tjm = t * 36525.0 + T2000;
    let (dpsi, _) = nutation(tjm);
    let aberration = -20.4898 / radius_au / 3600.0;

    SolarElements {
        apparent_longitude: normalize_degrees(true_longitude + dpsi / 3600.0 + aberration),
        radius_au,
    }
}

/// Apparent equatorial position of the Sun of date, with its geocentric distance.
pub(crate) fn sun_position(t: f64) -> EquatorialPosition {
    let elements = solar_elements(t);
    let eps = true_obliquity(t * 36525.0 + T2000);
    let lambda = elements.apparent_longitude * RADEG;

    let ra = (eps.cos() * lambda.sin()).atan2(lambda.cos()) / RADEG;
    let dec = (eps.sin() * lambda.sin()).asin() / RADEG;

    EquatorialPosition::of_date(normalize_degrees(ra), dec, Some(elements.radius_au * AU))
}

#[cfg(test)]
mod sun_test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_sun_1992_october_13() {
        // Meeus, example 25.a: 1992 Oct 13.0 TD
        let t = -0.072183436;
        let sun = sun_position(t);
        assert_relative_eq!(sun.ra_deg, 198.38083, epsilon = 0.01);
        assert_relative_eq!(sun.dec_deg, -7.78507, epsilon = 0.01);

        let elements = solar_elements(t);
        assert_relative_eq!(elements.apparent_longitude, 199.90895, epsilon = 0.01);
        assert_relative_eq!(elements.radius_au, 0.99766, epsilon = 1e-4);
    }

    #[test]
    fn test_equinox_declination_near_zero() {
        // 2024 March 20 03:06 UTC
        let t = (2460389.63 - 2451545.0) / 36525.0;
        assert_relative_eq!(sun_position(t).dec_deg, 0.0, epsilon = 0.02);
    }
}
