//! Truncated lunar theory.
//!
//! Keeps the leading periodic terms of the ELP-2000/82 based series in longitude,
//! latitude and distance. The truncation error is a few arcminutes in position and
//! below 100 km in distance.

use nalgebra::Vector3;

use crate::constants::{Kilometer, RADEG, T2000};
use crate::coordinates::EquatorialPosition;
use crate::earth_orientation::{nutation, true_obliquity};
use crate::ref_system::{cartesian_to_spherical, ecliptic_to_equatorial, normalize_degrees, spherical_to_cartesian};

/// Periodic term: multiples of (D, M, M′, F) and the sine / cosine amplitudes.
struct LunarTerm {
    d: i8,
    m: i8,
    mp: i8,
    f: i8,
    /// Longitude amplitude, 1e-6 degree.
    sigma_l: f64,
    /// Distance amplitude, 1e-3 km.
    sigma_r: f64,
}

/// Periodic term in latitude, amplitude in 1e-6 degree.
struct LatitudeTerm {
    d: i8,
    m: i8,
    mp: i8,
    f: i8,
    sigma_b: f64,
}

const fn lr(d: i8, m: i8, mp: i8, f: i8, sigma_l: f64, sigma_r: f64) -> LunarTerm {
    LunarTerm {
        d,
        m,
        mp,
        f,
        sigma_l,
        sigma_r,
    }
}

const fn b(d: i8, m: i8, mp: i8, f: i8, sigma_b: f64) -> LatitudeTerm {
    LatitudeTerm { d, m, mp, f, sigma_b }
}

#[rustfmt::skip]
const LONGITUDE_DISTANCE_TERMS: [LunarTerm; 26] = [
    lr(0, 0, 1, 0, 6288774.0, -20905355.0),
    lr(2, 0, -1, 0, 1274027.0, -3699111.0),
    lr(2, 0, 0, 0, 658314.0, -2955968.0),
    lr(0, 0, 2, 0, 213618.0, -569925.0),
    lr(0, 1, 0, 0, -185116.0, 48888.0),
    lr(0, 0, 0, 2, -114332.0, -3149.0),
    lr(2, 0, -2, 0, 58793.0, 246158.0),
    lr(2, -1, -1, 0, 57066.0, -152138.0),
    lr(2, 0, 1, 0, 53322.0, -170733.0),
    lr(2, -1, 0, 0, 45758.0, -204586.0),
    lr(0, 1, -1, 0, -40923.0, -129620.0),
    lr(1, 0, 0, 0, -34720.0, 108743.0),
    lr(0, 1, 1, 0, -30383.0, 104755.0),
    lr(2, 0, 0, -2, 15327.0, 10321.0),
    lr(0, 0, 1, 2, -12528.0, 0.0),
    lr(0, 0, 1, -2, 10980.0, 79661.0),
    lr(4, 0, -1, 0, 10675.0, -34782.0),
    lr(0, 0, 3, 0, 10034.0, -23210.0),
    lr(4, 0, -2, 0, 8548.0, -21636.0),
    lr(2, 1, -1, 0, -7888.0, 24208.0),
    lr(2, 1, 0, 0, -6766.0, 30824.0),
    lr(1, 0, -1, 0, -5163.0, -8379.0),
    lr(1, 1, 0, 0, 4987.0, -16675.0),
    lr(2, -1, 1, 0, 4036.0, -12831.0),
    lr(2, 0, 2, 0, 3994.0, -10445.0),
    lr(4, 0, 0, 0, 3861.0, -11650.0),
];

#[rustfmt::skip]
const LATITUDE_TERMS: [LatitudeTerm; 20] = [
    b(0, 0, 0, 1, 5128122.0),
    b(0, 0, 1, 1, 280602.0),
    b(0, 0, 1, -1, 277693.0),
    b(2, 0, 0, -1, 173237.0),
    b(2, 0, -1, 1, 55413.0),
    b(2, 0, -1, -1, 46271.0),
    b(2, 0, 0, 1, 32573.0),
    b(0, 0, 2, 1, 17198.0),
    b(2, 0, 1, -1, 9266.0),
    b(0, 0, 2, -1, 8822.0),
    b(2, -1, 0, -1, 8216.0),
    b(2, 0, -2, -1, 4324.0),
    b(2, 0, 1, 1, 4200.0),
    b(2, 1, 0, -1, -3359.0),
    b(2, -1, -1, 1, 2463.0),
    b(2, -1, 0, 1, 2211.0),
    b(2, -1, -1, -1, 2065.0),
    b(0, 1, -1, -1, -1870.0),
    b(4, 0, -1, -1, 1828.0),
    b(0, 1, 0, 1, -1794.0),
];

/// Geocentric ecliptic coordinates of the Moon, mean equinox of date.
#[derive(Debug, Clone, Copy)]
pub(crate) struct LunarEcliptic {
    /// Longitude, degrees, without nutation.
    pub longitude: f64,
    /// Latitude, degrees.
    pub latitude: f64,
    pub distance_km: Kilometer,
}

/// Eccentricity damping for terms involving the Sun's mean anomaly.
fn eccentricity_factor(m: i8, e: f64) -> f64 {
    match m.abs() {
        0 => 1.0,
        1 => e,
        _ => e * e,
    }
}

pub(crate) fn lunar_ecliptic(t: f64) -> LunarEcliptic {
    let t2 = t * t;
    let t3 = t2 * t;
    let t4 = t3 * t;

    // Mean longitude, elongation, anomalies and argument of latitude (degrees)
    let lp = 218.3164477 + 481267.88123421 * t - 0.0015786 * t2 + t3 / 538841.0 - t4 / 65194000.0;
    let d = 297.8501921 + 445267.1114034 * t - 0.0018819 * t2 + t3 / 545868.0 - t4 / 113065000.0;
    let m = 357.5291092 + 35999.0502909 * t - 0.0001536 * t2 + t3 / 24490000.0;
    let mp = 134.9633964 + 477198.8675055 * t + 0.0087414 * t2 + t3 / 69699.0 - t4 / 14712000.0;
    let f = 93.2720950 + 483202.0175233 * t - 0.0036539 * t2 - t3 / 3526000.0 + t4 / 863310000.0;

    let a1 = (119.75 + 131.849 * t) * RADEG;
    let a2 = (53.09 + 479264.290 * t) * RADEG;
    let a3 = (313.45 + 481266.484 * t) * RADEG;
    let e = 1.0 - 0.002516 * t - 0.0000074 * t2;

    let (lp_r, d_r, m_r, mp_r, f_r) = (lp * RADEG, d * RADEG, m * RADEG, mp * RADEG, f * RADEG);
    let argument = |cd: i8, cm: i8, cmp: i8, cf: i8| {
        cd as f64 * d_r + cm as f64 * m_r + cmp as f64 * mp_r + cf as f64 * f_r
    };

    let (mut sigma_l, mut sigma_r) = (0.0, 0.0);
    for term in &LONGITUDE_DISTANCE_TERMS {
        let arg = argument(term.d, term.m, term.mp, term.f);
        let damp = eccentricity_factor(term.m, e);
        sigma_l += term.sigma_l * damp * arg.sin();
        sigma_r += term.sigma_r * damp * arg.cos();
    }

    let mut sigma_b = 0.0;
    for term in &LATITUDE_TERMS {
        let arg = argument(term.d, term.m, term.mp, term.f);
        sigma_b += term.sigma_b * eccentricity_factor(term.m, e) * arg.sin();
    }

    // Venus, Jupiter and flattening perturbations
    sigma_l += 3958.0 * a1.sin() + 1962.0 * (lp_r - f_r).sin() + 318.0 * a2.sin();
    sigma_b += -2235.0 * lp_r.sin()
        + 382.0 * a3.sin()
        + 175.0 * (a1 - f_r).sin()
        + 175.0 * (a1 + f_r).sin()
        + 127.0 * (lp_r - mp_r).sin()
        - 115.0 * (lp_r + mp_r).sin();

    LunarEcliptic {
        longitude: normalize_degrees(lp + sigma_l / 1e6),
        latitude: sigma_b / 1e6,
        distance_km: 385000.56 + sigma_r / 1000.0,
    }
}

/// Apparent geocentric equatorial position of the Moon of date, with distance.
pub(crate) fn moon_position(t: f64) -> EquatorialPosition {
    let tjm = t * 36525.0 + T2000;
    let ecl = lunar_ecliptic(t);
    let (dpsi, _) = nutation(tjm);

    let lambda = (ecl.longitude + dpsi / 3600.0) * RADEG;
    let beta = ecl.latitude * RADEG;

    let v: Vector3<f64> =
        ecliptic_to_equatorial(true_obliquity(tjm)) * spherical_to_cartesian(lambda, beta, 1.0);
    let (ra, dec, _) = cartesian_to_spherical(&v);

    EquatorialPosition::of_date(
        normalize_degrees(ra / RADEG),
        dec / RADEG,
        Some(ecl.distance_km),
    )
}
