//! Parsing and formatting of sexagesimal right ascension and declination.
//!
//! Accepted right ascension forms: `"12h 34m 56.7s"`, `"12:34:56.7"`, `"12 34 56.7"`,
//! decimal hours `"12.5h"`, or decimal degrees `"187.5"`.
//! Accepted declination forms: `"+45d 30m 12s"`, `"-45° 30′ 12″"`, `"-45:30:12"`,
//! `"+45 30 12"`, or decimal degrees `"-45.5"`.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::constants::Degree;
use crate::skyplan_errors::SkyPlanError;

static RA_SEXAGESIMAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,2})\s*(?:h|:|\s)\s*(\d{1,2})\s*(?:m|:|\s)\s*(\d{1,2}(?:\.\d*)?)\s*s?$")
        .expect("valid RA regex")
});

static RA_DECIMAL_HOURS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+(?:\.\d*)?)\s*h$").expect("valid RA hours regex"));

static DEC_SEXAGESIMAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"^([+-]?)(\d{1,2})\s*(?:d|°|:|\s)\s*(\d{1,2})\s*(?:m|'|′|:|\s)\s*(\d{1,2}(?:\.\d*)?)\s*(?:s|"|″)?$"#,
    )
    .expect("valid Dec regex")
});

fn invalid(kind: &str, s: &str) -> SkyPlanError {
    SkyPlanError::InvalidInput(format!("cannot parse {kind} '{s}'"))
}

/// Minutes and seconds of a sexagesimal triple, rejecting values ≥ 60.
fn sexagesimal(whole: f64, minutes: f64, seconds: f64, kind: &str, s: &str) -> Result<f64, SkyPlanError> {
    if minutes >= 60.0 || seconds >= 60.0 {
        return Err(invalid(kind, s));
    }
    Ok(whole + minutes / 60.0 + seconds / 3600.0)
}

fn capture_f64(caps: &regex::Captures, i: usize, kind: &str, s: &str) -> Result<f64, SkyPlanError> {
    caps.get(i)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .ok_or_else(|| invalid(kind, s))
}

/// Parse a right ascension string into degrees in `[0, 360)`.
///
/// Arguments
/// ---------
/// * `ra`: right ascension text, sexagesimal hours, decimal hours (`h` suffix) or decimal degrees.
///
/// Returns
/// -------
/// * The right ascension in degrees.
///
/// Errors
/// ------
/// * [`SkyPlanError::InvalidInput`] for unparsable text,
///   [`SkyPlanError::OutOfRange`] for a value outside `[0, 360)`.
pub fn parse_ra(ra: &str) -> Result<Degree, SkyPlanError> {
    let s = ra.trim();
    let deg = if let Some(caps) = RA_SEXAGESIMAL.captures(s) {
        let h = capture_f64(&caps, 1, "right ascension", s)?;
        let m = capture_f64(&caps, 2, "right ascension", s)?;
        let sec = capture_f64(&caps, 3, "right ascension", s)?;
        sexagesimal(h, m, sec, "right ascension", s)? * 15.0
    } else if let Some(caps) = RA_DECIMAL_HOURS.captures(s) {
        capture_f64(&caps, 1, "right ascension", s)? * 15.0
    } else {
        s.parse::<f64>().map_err(|_| invalid("right ascension", s))?
    };

    SkyPlanError::check_range("ra_deg", deg, 0.0, 360.0)?;
    if deg >= 360.0 {
        return Err(SkyPlanError::OutOfRange {
            field: "ra_deg",
            value: deg,
            min: 0.0,
            max: 360.0,
        });
    }
    Ok(deg)
}

/// Parse a declination string into degrees in `[-90, 90]`.
///
/// Errors
/// ------
/// * [`SkyPlanError::InvalidInput`] for unparsable text,
///   [`SkyPlanError::OutOfRange`] beyond the poles.
pub fn parse_dec(dec: &str) -> Result<Degree, SkyPlanError> {
    let s = dec.trim();
    let deg = if let Some(caps) = DEC_SEXAGESIMAL.captures(s) {
        let sign = if caps.get(1).is_some_and(|m| m.as_str() == "-") {
            -1.0
        } else {
            1.0
        };
        let d = capture_f64(&caps, 2, "declination", s)?;
        let m = capture_f64(&caps, 3, "declination", s)?;
        let sec = capture_f64(&caps, 4, "declination", s)?;
        sign * sexagesimal(d, m, sec, "declination", s)?
    } else {
        s.parse::<f64>().map_err(|_| invalid("declination", s))?
    };

    SkyPlanError::check_range("dec_deg", deg, -90.0, 90.0)?;
    Ok(deg)
}

/// Format a right ascension in degrees as `HHhMMmSS.Ss`.
pub fn format_ra(ra_deg: Degree) -> String {
    let total_tenths = (ra_deg.rem_euclid(360.0) / 15.0 * 36000.0).round() as i64 % (24 * 36000);
    let h = total_tenths / 36000;
    let m = (total_tenths / 600) % 60;
    let s = (total_tenths % 600) as f64 / 10.0;
    format!("{h:02}h{m:02}m{s:04.1}s")
}

/// Format a declination in degrees as `±DD°MM′SS″`.
pub fn format_dec(dec_deg: Degree) -> String {
    let sign = if dec_deg < 0.0 { '-' } else { '+' };
    let total = (dec_deg.abs() * 3600.0).round() as i64;
    format!(
        "{sign}{:02}°{:02}′{:02}″",
        total / 3600,
        (total / 60) % 60,
        total % 60
    )
}

#[cfg(test)]
mod conversion_test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_ra_to_deg() {
        assert_relative_eq!(parse_ra("22 52 23.37").unwrap(), 343.097375, epsilon = 1e-9);
        assert_relative_eq!(parse_ra("23:58:57.68").unwrap(), 359.7403333333333, epsilon = 1e-9);
        assert_relative_eq!(parse_ra("04h 41m 04.77s").unwrap(), 70.269875, epsilon = 1e-9);
        assert_relative_eq!(parse_ra("5.5h").unwrap(), 82.5, epsilon = 1e-12);
        assert_relative_eq!(parse_ra("10.6847").unwrap(), 10.6847, epsilon = 1e-12);

        assert!(matches!(parse_ra("1 2 3.4.5"), Err(SkyPlanError::InvalidInput(_))));
        assert!(parse_ra("12 61 00").is_err());
        assert!(matches!(parse_ra("24h"), Err(SkyPlanError::OutOfRange { .. })));
        assert!(parse_ra("360").is_err());
    }

    #[test]
    fn test_dec_to_deg() {
        assert_relative_eq!(parse_dec("-00 30 14.2").unwrap(), -0.5039444444444444, epsilon = 1e-9);
        assert_relative_eq!(parse_dec("+13d 55m 42.7s").unwrap(), 13.928527777777777, epsilon = 1e-9);
        assert_relative_eq!(parse_dec("89:15:50.2").unwrap(), 89.26394444444445, epsilon = 1e-9);
        assert_relative_eq!(parse_dec("-14° 47′ 05.4″").unwrap(), -14.784833333333333, epsilon = 1e-9);
        assert_relative_eq!(parse_dec(r#"-14° 47' 05.4""#).unwrap(), -14.784833333333333, epsilon = 1e-9);
        assert_relative_eq!(parse_dec("41.269").unwrap(), 41.269, epsilon = 1e-12);

        assert!(parse_dec("89 15 50.2.3").is_err());
        assert!(matches!(parse_dec("-91"), Err(SkyPlanError::OutOfRange { .. })));
    }

    #[test]
    fn test_format() {
        assert_eq!(format_ra(343.097375), "22h52m23.4s");
        assert_eq!(format_dec(-0.5039444444444444), "-00°30′14″");
        assert_eq!(format_dec(41.269), "+41°16′08″");
    }
}
