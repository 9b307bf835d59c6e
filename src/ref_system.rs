//! # Reference-frame rotations
//!
//! Rotation matrices between the frames the crate works in:
//!
//! ```text
//! Ecliptic J2000 --(obliquity ε0)--> Equatorial J2000 --(precession)--> Equatorial of date
//! Ecliptic of date --(true obliquity ε)--> Equatorial of date
//! ```
//!
//! All matrices are *active* rotations acting on column vectors, built with
//! [`rotmt`]. Spherical ↔ Cartesian helpers work in radians.

use nalgebra::{Matrix3, Rotation3, Vector3};

use crate::constants::{Radian, RADSEC, T2000};

/// Build the rotation matrix of angle `alpha` (radians) about axis `k`.
///
/// Arguments
/// ---------
/// * `alpha`: rotation angle in radians, counter-clockwise seen from the tip of the axis.
/// * `k`: axis index, `0 = x`, `1 = y`, `2 = z`.
///
/// # Panics
/// Panics if `k > 2`. Every call site in the crate passes a literal axis.
pub fn rotmt(alpha: f64, k: usize) -> Matrix3<f64> {
    let axis = match k {
        0 => Vector3::x_axis(),
        1 => Vector3::y_axis(),
        2 => Vector3::z_axis(),
        _ => panic!("**** ROTMT: invalid axis index {k} (must be 0,1,2) ****"),
    };

    Rotation3::from_axis_angle(&axis, alpha).into()
}

/// Precession matrix from the mean equator and equinox of J2000 to those of date
/// (IAU 1976 angles ζ, z, θ).
///
/// Arguments
/// ---------
/// * `tjm`: Modified Julian Date, TT scale.
///
/// Returns
/// --------
/// * `P` such that `x_date = P · x_J2000`.
pub fn precession_matrix(tjm: f64) -> Matrix3<f64> {
    let t = (tjm - T2000) / 36525.0;

    let zeta = ((0.017998 * t + 0.30188) * t + 2306.2181) * t * RADSEC;
    let z = ((0.018203 * t + 1.09468) * t + 2306.2181) * t * RADSEC;
    let theta = ((-0.041833 * t - 0.42665) * t + 2004.3109) * t * RADSEC;

    rotmt(z, 2) * rotmt(-theta, 1) * rotmt(zeta, 2)
}

/// Rotation from ecliptic to equatorial coordinates for an obliquity `eps` (radians).
pub fn ecliptic_to_equatorial(eps: Radian) -> Matrix3<f64> {
    rotmt(eps, 0)
}

/// Unit (or scaled) Cartesian vector from longitude-like and latitude-like angles.
pub fn spherical_to_cartesian(lon: Radian, lat: Radian, radius: f64) -> Vector3<f64> {
    Vector3::new(
        radius * lat.cos() * lon.cos(),
        radius * lat.cos() * lon.sin(),
        radius * lat.sin(),
    )
}

/// Reduce an angle in degrees to [0, 360).
pub fn normalize_degrees(angle: f64) -> f64 {
    let a = angle.rem_euclid(360.0);
    // rem_euclid rounds tiny negative angles up to exactly 360
    if a >= 360.0 {
        0.0
    } else {
        a
    }
}

/// Longitude in [0, 2π), latitude in [-π/2, π/2] and norm of a Cartesian vector.
pub fn cartesian_to_spherical(v: &Vector3<f64>) -> (Radian, Radian, f64) {
    let r = v.norm();
    if r == 0.0 {
        return (0.0, 0.0, 0.0);
    }
    let mut lon = v.y.atan2(v.x).rem_euclid(std::f64::consts::TAU);
    if lon >= std::f64::consts::TAU {
        lon = 0.0;
    }
    let lat = (v.z / r).clamp(-1.0, 1.0).asin();
    (lon, lat, r)
}

#[cfg(test)]
mod ref_system_test {
    use super::*;
    use crate::constants::{OBLIQUITY_J2000_DEG, RADEG};
    use approx::assert_relative_eq;

    #[test]
    fn test_rotmt_z() {
        let v = rotmt(std::f64::consts::FRAC_PI_2, 2) * Vector3::x();
        assert_relative_eq!(v, Vector3::y(), epsilon = 1e-15);
    }

    #[test]
    fn test_ecliptic_pole_maps_to_ra_18h() {
        let pole = ecliptic_to_equatorial(OBLIQUITY_J2000_DEG * RADEG) * Vector3::z();
        let (ra, dec, _) = cartesian_to_spherical(&pole);
        assert_relative_eq!(ra / RADEG, 270.0, epsilon = 1e-9);
        assert_relative_eq!(dec / RADEG, 90.0 - OBLIQUITY_J2000_DEG, epsilon = 1e-9);
    }

    #[test]
    fn test_precession_identity_at_j2000() {
        assert_relative_eq!(precession_matrix(T2000), Matrix3::identity(), epsilon = 1e-15);
    }

    #[test]
    fn test_precession_theta_persei() {
        // Meeus example 21.b: θ Persei, J2000 (41.054063°, 49.227750°)
        // → 2028 Nov 13.19 TD (41.547214°, 49.348483°), proper motion removed
        // (proper motion contributes < 0.01° here)
        let ra0 = 41.054063 * RADEG;
        let dec0 = 49.227750 * RADEG;
        let tjm = 2462088.69 - 2400000.5;

        let v = precession_matrix(tjm) * spherical_to_cartesian(ra0, dec0, 1.0);
        let (ra, dec, _) = cartesian_to_spherical(&v);

        assert_relative_eq!(ra / RADEG, 41.547214, epsilon = 0.02);
        assert_relative_eq!(dec / RADEG, 49.348483, epsilon = 0.02);
    }

    #[test]
    fn test_normalize_degrees() {
        assert_eq!(normalize_degrees(-1e-17), 0.0);
        assert_eq!(normalize_degrees(720.5), 0.5);
        assert_eq!(normalize_degrees(-90.0), 270.0);
    }

    #[test]
    fn test_spherical_roundtrip_norm() {
        let v = spherical_to_cartesian(1.0, -0.3, 2.5);
        let (lon, lat, r) = cartesian_to_spherical(&v);
        assert_relative_eq!(lon, 1.0, epsilon = 1e-12);
        assert_relative_eq!(lat, -0.3, epsilon = 1e-12);
        assert_relative_eq!(r, 2.5, epsilon = 1e-12);
    }
}
