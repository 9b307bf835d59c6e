//! Earth orientation: obliquity of the ecliptic, nutation, equation of the equinoxes.
//!
//! Nutation uses the four leading terms of the IAU 1980 series, good to ~0.5″
//! in longitude and ~0.1″ in obliquity.

use crate::constants::{ArcSec, Radian, RADEG, RADSEC, T2000};

/// Compute the mean obliquity of the ecliptic at a given epoch (IAU 1976 model).
///
/// Arguments
/// ---------
/// * `tjm`: Modified Julian Date (TT scale).
///
/// Returns
/// --------
/// * Mean obliquity of the ecliptic in radians.
///
/// The obliquity is a cubic polynomial in Julian centuries since J2000, with
/// coefficients in arcseconds, evaluated with Horner's method.
pub fn obleq(tjm: f64) -> Radian {
    let ob0 = ((23.0 * 3600.0 + 26.0 * 60.0) + 21.448) * RADSEC;
    let ob1 = -46.815 * RADSEC;
    let ob2 = -0.00059 * RADSEC;
    let ob3 = 0.001813 * RADSEC;

    let t = (tjm - T2000) / 36525.0;

    ((ob3 * t + ob2) * t + ob1) * t + ob0
}

/// Nutation in longitude and obliquity `(Δψ, Δε)`, in arcseconds.
///
/// Arguments
/// ---------
/// * `tjm`: Modified Julian Date (TT scale).
pub fn nutation(tjm: f64) -> (ArcSec, ArcSec) {
    let t = (tjm - T2000) / 36525.0;

    // Longitude of the Moon's ascending node
    let omega = (125.04452 - 1934.136261 * t) * RADEG;
    // Mean longitudes of the Sun and the Moon
    let l_sun = (280.4665 + 36000.7698 * t) * RADEG;
    let l_moon = (218.3165 + 481267.8813 * t) * RADEG;

    let dpsi = -17.20 * omega.sin() - 1.32 * (2.0 * l_sun).sin() - 0.23 * (2.0 * l_moon).sin()
        + 0.21 * (2.0 * omega).sin();
    let deps = 9.20 * omega.cos() + 0.57 * (2.0 * l_sun).cos() + 0.10 * (2.0 * l_moon).cos()
        - 0.09 * (2.0 * omega).cos();

    (dpsi, deps)
}

/// True obliquity of the ecliptic (mean obliquity + nutation in obliquity), in radians.
pub fn true_obliquity(tjm: f64) -> Radian {
    let (_, deps) = nutation(tjm);
    obleq(tjm) + deps * RADSEC
}

/// Equation of the equinoxes, in radians.
///
/// Difference between apparent and mean sidereal time: `Δψ · cos ε`.
///
/// Arguments
/// ---------
/// * `tjm`: Modified Julian Date (TT scale).
pub fn equequ(tjm: f64) -> Radian {
    let (dpsi, _) = nutation(tjm);
    RADSEC * dpsi * obleq(tjm).cos()
}

#[cfg(test)]
mod earth_orientation_test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_obliquity() {
        // 23°26′21.448″ at J2000
        assert_relative_eq!(obleq(T2000), 0.40909280422232897, epsilon = 1e-12);
        // Decreases by ~47″ per century
        let drift = (obleq(T2000 + 36525.0) - obleq(T2000)) / RADSEC;
        assert_relative_eq!(drift, -46.815, epsilon = 0.01);
    }

    #[test]
    fn test_nutation_1987_april_10() {
        // Meeus, Astronomical Algorithms, example 22.a: Δψ = -3.788″, Δε = +9.443″
        let tjm = 46895.0;
        let (dpsi, deps) = nutation(tjm);
        assert_relative_eq!(dpsi, -3.788, epsilon = 0.5);
        assert_relative_eq!(deps, 9.443, epsilon = 0.2);
    }

    #[test]
    fn test_equation_of_equinoxes_is_small() {
        for k in 0..20 {
            let eq = equequ(T2000 + 1000.0 * k as f64);
            // never more than ~1.2 s of time
            assert!(eq.abs() < 1.2 * 15.0 * RADSEC);
        }
    }
}
