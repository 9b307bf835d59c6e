//! Elliptic Kepler equation and angle helpers.

use std::f64::consts::PI;

use crate::constants::DPI;
use crate::skyplan_errors::SkyPlanError;

/// Principal value of an angle in radians, in [0, 2π).
pub fn principal_angle(a: f64) -> f64 {
    a.rem_euclid(DPI)
}

/// Principal difference `a − b` between two angles, in [-π, π].
pub fn angle_diff(a: f64, b: f64) -> f64 {
    let mut diff = principal_angle(a) - principal_angle(b);

    if diff > PI {
        diff -= DPI;
    } else if diff < -PI {
        diff += DPI;
    }

    diff
}

/// Solve `E − e·sin E = M` for the eccentric anomaly `E` with Newton's method.
///
/// Arguments
/// ---------
/// * `mean_anomaly`: mean anomaly `M` in radians (any range).
/// * `e`: eccentricity, `0 ≤ e < 1`.
///
/// Return
/// ------
/// * The eccentric anomaly in radians, in the same revolution as `M`.
///
/// Errors
/// ------
/// * [`SkyPlanError::InvalidInput`] for a non-elliptic eccentricity or if Newton
///   iterations do not converge.
pub fn solve_kepler(mean_anomaly: f64, e: f64) -> Result<f64, SkyPlanError> {
    const JMAX: usize = 50;
    let contr = 100.0 * f64::EPSILON;

    if !(0.0..1.0).contains(&e) {
        return Err(SkyPlanError::InvalidInput(format!(
            "eccentricity {e} is not elliptic"
        )));
    }

    let m = angle_diff(mean_anomaly, 0.0);
    let offset = mean_anomaly - m;

    // Starting guess good up to e ~ 0.9
    let mut ecc_anomaly = if e < 0.8 { m } else { PI.copysign(m) };

    for _ in 0..JMAX {
        let fun = ecc_anomaly - e * ecc_anomaly.sin() - m;
        let funp = 1.0 - e * ecc_anomaly.cos();
        let delta = -fun / funp;
        ecc_anomaly += delta;

        if delta.abs() < contr * (1.0 + ecc_anomaly.abs()) {
            return Ok(ecc_anomaly + offset);
        }
    }

    Err(SkyPlanError::InvalidInput(format!(
        "Kepler equation did not converge (M = {mean_anomaly}, e = {e})"
    )))
}

#[cfg(test)]
mod kepler_test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_angle_diff() {
        assert_relative_eq!(angle_diff(0.1, DPI - 0.1), 0.2, epsilon = 1e-12);
        assert_relative_eq!(angle_diff(DPI - 0.1, 0.1), -0.2, epsilon = 1e-12);
        assert_relative_eq!(principal_angle(-0.5), DPI - 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_solve_kepler_meeus_30a() {
        // Meeus, example 30.a: e = 0.100, M = 5° → E = 5.554589°
        let ecc = solve_kepler(5.0_f64.to_radians(), 0.1).unwrap();
        assert_relative_eq!(ecc.to_degrees(), 5.554589, epsilon = 1e-6);
    }

    #[test]
    fn test_solve_kepler_residual() {
        for &e in &[0.0, 0.2, 0.6, 0.95] {
            for k in -10..=10 {
                let m = k as f64 * 0.7;
                let ecc = solve_kepler(m, e).unwrap();
                assert_relative_eq!(ecc - e * ecc.sin(), m, epsilon = 1e-10);
            }
        }
    }

    #[test]
    fn test_solve_kepler_rejects_hyperbolic() {
        assert!(solve_kepler(1.0, 1.2).is_err());
    }
}
