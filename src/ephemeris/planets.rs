//! Approximate Keplerian elements of the major planets.
//!
//! Mean J2000 ecliptic elements with linear rates per Julian century, fitted to the
//! JPL DE405 ephemeris over 1800–2050 (Standish, *Keplerian Elements for Approximate
//! Positions of the Major Planets*). Errors stay within a few arcminutes over that
//! interval; outside of it the model is refused.

use nalgebra::Vector3;

use crate::constants::{AU, OBLIQUITY_J2000_DEG, RADEG};
use crate::coordinates::EquatorialPosition;
use crate::ephemeris::Body;
use crate::kepler::{angle_diff, solve_kepler};
use crate::ref_system::{cartesian_to_spherical, ecliptic_to_equatorial, normalize_degrees, rotmt};
use crate::skyplan_errors::SkyPlanError;

/// First and last Julian century (TT, from J2000) covered by the elements.
pub(crate) const VALIDITY_CENTURIES: (f64, f64) = (-2.0, 0.5);

/// Orbital elements at J2000 and their rates per century.
///
/// Order: semi-major axis (AU), eccentricity, inclination (°), mean longitude (°),
/// longitude of perihelion (°), longitude of the ascending node (°).
#[derive(Debug, Clone, Copy)]
struct MeanElements {
    value: [f64; 6],
    rate: [f64; 6],
}

#[rustfmt::skip]
const MERCURY: MeanElements = MeanElements {
    value: [0.38709927, 0.20563593, 7.00497902, 252.25032350, 77.45779628, 48.33076593],
    rate: [0.00000037, 0.00001906, -0.00594749, 149472.67411175, 0.16047689, -0.12534081],
};
#[rustfmt::skip]
const VENUS: MeanElements = MeanElements {
    value: [0.72333566, 0.00677672, 3.39467605, 181.97909950, 131.60246718, 76.67984255],
    rate: [0.00000390, -0.00004107, -0.00078890, 58517.81538729, 0.00268329, -0.27769418],
};
#[rustfmt::skip]
const EM_BARYCENTER: MeanElements = MeanElements {
    value: [1.00000261, 0.01671123, -0.00001531, 100.46457166, 102.93768193, 0.0],
    rate: [0.00000562, -0.00004392, -0.01294668, 35999.37244981, 0.32327364, 0.0],
};
#[rustfmt::skip]
const MARS: MeanElements = MeanElements {
    value: [1.52371034, 0.09339410, 1.84969142, -4.55343205, -23.94362959, 49.55953891],
    rate: [0.00001847, 0.00007882, -0.00813131, 19140.30268499, 0.44441088, -0.29257343],
};
#[rustfmt::skip]
const JUPITER: MeanElements = MeanElements {
    value: [5.20288700, 0.04838624, 1.30439695, 34.39644051, 14.72847983, 100.47390909],
    rate: [-0.00011607, -0.00013253, -0.00183714, 3034.74612775, 0.21252668, 0.20469106],
};
#[rustfmt::skip]
const SATURN: MeanElements = MeanElements {
    value: [9.53667594, 0.05386179, 2.48599187, 49.95424423, 92.59887831, 113.66242448],
    rate: [-0.00125060, -0.00050991, 0.00193609, 1222.49362201, -0.41897216, -0.28867794],
};
#[rustfmt::skip]
const URANUS: MeanElements = MeanElements {
    value: [19.18916464, 0.04725744, 0.77263783, 313.23810451, 170.95427630, 74.01692503],
    rate: [-0.00196176, -0.00004397, -0.00242939, 428.48202785, 0.40805281, 0.04240589],
};
#[rustfmt::skip]
const NEPTUNE: MeanElements = MeanElements {
    value: [30.06992276, 0.00859048, 1.77004347, -55.12002969, 44.96476227, 131.78422574],
    rate: [0.00026291, 0.00005105, 0.00035372, 218.45945325, -0.32241464, -0.00508664],
};

fn mean_elements(body: Body) -> Option<MeanElements> {
    match body {
        Body::Mercury => Some(MERCURY),
        Body::Venus => Some(VENUS),
        Body::Mars => Some(MARS),
        Body::Jupiter => Some(JUPITER),
        Body::Saturn => Some(SATURN),
        Body::Uranus => Some(URANUS),
        Body::Neptune => Some(NEPTUNE),
        Body::Sun | Body::Moon => None,
    }
}

/// Heliocentric position in the J2000 ecliptic frame (AU).
fn heliocentric_ecliptic(elements: &MeanElements, t: f64) -> Result<Vector3<f64>, SkyPlanError> {
    let at = |i: usize| elements.value[i] + elements.rate[i] * t;
    let (a, e) = (at(0), at(1));
    let (incl, mean_lon, peri_lon, node) = (at(2) * RADEG, at(3) * RADEG, at(4) * RADEG, at(5) * RADEG);

    let arg_perihelion = peri_lon - node;
    let mean_anomaly = angle_diff(mean_lon, peri_lon);
    let ecc_anomaly = solve_kepler(mean_anomaly, e)?;

    // Position in the orbital plane, x toward perihelion
    let in_plane = Vector3::new(
        a * (ecc_anomaly.cos() - e),
        a * (1.0 - e * e).sqrt() * ecc_anomaly.sin(),
        0.0,
    );

    Ok(rotmt(node, 2) * rotmt(incl, 0) * rotmt(arg_perihelion, 2) * in_plane)
}

/// Geocentric equatorial J2000 position of a planet, with its distance.
///
/// Arguments
/// ---------
/// * `body`: one of Mercury … Neptune.
/// * `t`: Julian centuries (TT) since J2000.
///
/// Errors
/// ------
/// * [`SkyPlanError::DataUnavailable`] outside 1800–2050.
/// * [`SkyPlanError::InvalidInput`] if `body` is the Sun or the Moon.
pub(crate) fn planet_position(body: Body, t: f64) -> Result<EquatorialPosition, SkyPlanError> {
    let elements = mean_elements(body).ok_or_else(|| {
        SkyPlanError::InvalidInput(format!("{body} has no planetary elements"))
    })?;

    let (first, last) = VALIDITY_CENTURIES;
    if !(first..=last).contains(&t) {
        return Err(SkyPlanError::DataUnavailable(format!(
            "planetary elements are valid from 1800 to 2050, requested year ≈ {:.0}",
            2000.0 + t * 100.0
        )));
    }

    let planet = heliocentric_ecliptic(&elements, t)?;
    let earth = heliocentric_ecliptic(&EM_BARYCENTER, t)?;
    let geocentric = ecliptic_to_equatorial(OBLIQUITY_J2000_DEG * RADEG) * (planet - earth);

    let (ra, dec, dist) = cartesian_to_spherical(&geocentric);
    Ok(EquatorialPosition::j2000(normalize_degrees(ra / RADEG), dec / RADEG)
        .with_distance(dist * AU))
}

#[cfg(test)]
mod planets_test {
    use super::*;
    use crate::coordinates::angular_separation;
    use approx::assert_relative_eq;

    #[test]
    fn test_venus_1992_december_20() {
        // Meeus, example 33.a: apparent α = 21h04m41.454s, δ = -18°53′16.84″, Δ = 0.910947 AU,
        // precessed back to J2000
        let t = (2448976.5 - 2451545.0) / 36525.0;
        let venus = planet_position(Body::Venus, t).unwrap();

        let expected = EquatorialPosition::j2000(316.2721, -18.8597);
        assert!(angular_separation(&venus, &expected) < 0.05);
        assert_relative_eq!(venus.distance_km.unwrap() / AU, 0.910947, epsilon = 2e-3);
    }

    #[test]
    fn test_rejects_out_of_range_epoch() {
        assert!(matches!(
            planet_position(Body::Mars, 0.6),
            Err(SkyPlanError::DataUnavailable(_))
        ));
        assert!(planet_position(Body::Mars, -2.1).is_err());
        assert!(planet_position(Body::Moon, 0.0).is_err());
    }

    #[test]
    fn test_outer_planet_distances() {
        let t = 0.24;
        let jupiter = planet_position(Body::Jupiter, t).unwrap().distance_km.unwrap() / AU;
        let neptune = planet_position(Body::Neptune, t).unwrap().distance_km.unwrap() / AU;
        assert!((3.9..6.5).contains(&jupiter));
        assert!((28.7..31.5).contains(&neptune));
    }
}
