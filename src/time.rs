//! # Time handling
//!
//! Calendar dates, instants and sidereal time. Every instant in the crate is a
//! [`hifitime::Epoch`]; this module adds the few conversions the planners need:
//!
//! - [`CalendarDate`] – a validated `YYYY-MM-DD` civil date.
//! - [`julian_centuries_tt`] – time argument of the analytic theories (TT, J2000).
//! - [`gmst`] / [`local_sidereal_time`] – Earth rotation angle for the horizontal transform.
//! - [`format_utc`] / [`LocalTime`] – ISO-8601 rendering of results.
//!
//! UT1 is approximated by UTC (|UT1 − UTC| < 0.9 s), which is far below the
//! precision needed for observation planning.

use std::fmt;
use std::str::FromStr;

use hifitime::{Epoch, Unit};

use crate::constants::{Degree, Radian, DAYS_PER_CENTURY, DPI, JD2000, RADEG, T2000};
use crate::earth_orientation::equequ;
use crate::skyplan_errors::SkyPlanError;

/// A civil calendar date (proleptic Gregorian).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CalendarDate {
    pub year: i32,
    pub month: u8,
    pub day: u8,
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

fn days_in_month(year: i32, month: u8) -> u8 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        _ => 28,
    }
}

impl CalendarDate {
    /// Build a validated calendar date.
    ///
    /// Errors
    /// ------
    /// * [`SkyPlanError::InvalidInput`] if the month or the day does not exist.
    pub fn new(year: i32, month: u8, day: u8) -> Result<Self, SkyPlanError> {
        if !(1..=12).contains(&month) {
            return Err(SkyPlanError::InvalidInput(format!(
                "month {month} is not in 1..=12"
            )));
        }
        if day == 0 || day > days_in_month(year, month) {
            return Err(SkyPlanError::InvalidInput(format!(
                "day {day} does not exist in {year:04}-{month:02}"
            )));
        }
        Ok(CalendarDate { year, month, day })
    }

    /// UTC midnight starting this date.
    pub fn midnight_utc(&self) -> Epoch {
        Epoch::from_gregorian_utc_at_midnight(self.year, self.month, self.day)
    }

    /// 00:00 local mean solar time at the given east longitude, expressed in UTC.
    pub fn local_mean_midnight(&self, longitude: Degree) -> Epoch {
        self.midnight_utc() - Unit::Hour * (longitude / 15.0)
    }

    /// 12:00 local mean solar time at the given east longitude, expressed in UTC.
    pub fn local_mean_noon(&self, longitude: Degree) -> Epoch {
        self.local_mean_midnight(longitude) + Unit::Hour * 12.0
    }

    /// The date `n` days later (or earlier for negative `n`).
    pub fn add_days(&self, n: i64) -> CalendarDate {
        let shifted = self.midnight_utc() + Unit::Day * (n as f64) + Unit::Hour * 12.0;
        let (year, month, day, ..) = shifted.to_gregorian_utc();
        CalendarDate { year, month, day }
    }
}

impl FromStr for CalendarDate {
    type Err = SkyPlanError;

    /// Parse a `YYYY-MM-DD` date.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || SkyPlanError::InvalidInput(format!("invalid date '{s}', use YYYY-MM-DD"));

        let mut parts = s.trim().splitn(3, '-');
        let year = parts.next().ok_or_else(invalid)?;
        let month = parts.next().ok_or_else(invalid)?;
        let day = parts.next().ok_or_else(invalid)?;

        if year.len() != 4 || month.len() != 2 || day.len() != 2 {
            return Err(invalid());
        }

        CalendarDate::new(
            year.parse().map_err(|_| invalid())?,
            month.parse().map_err(|_| invalid())?,
            day.parse().map_err(|_| invalid())?,
        )
    }
}

impl fmt::Display for CalendarDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

/// Julian centuries of TT elapsed since J2000.0.
pub fn julian_centuries_tt(epoch: &Epoch) -> f64 {
    (epoch.to_jde_tt_days() - JD2000) / DAYS_PER_CENTURY
}

/// Compute the Greenwich Mean Sidereal Time (GMST) in radians
/// for a given Modified Julian Date (UT1 time scale).
///
/// IAU 1982 polynomial for GMST at 0h UT1, plus the rotation accumulated during
/// the fraction of the day (sidereal/solar rate ratio `RAP`).
///
/// # Arguments
/// * `tjm` - Modified Julian Date (MJD, UT1 time scale)
///
/// # Returns
/// * GMST angle in radians, normalized to the interval [0, 2π).
pub fn gmst(tjm: f64) -> Radian {
    // Polynomial coefficients for GMST at 0h UT1 (in seconds)
    const C0: f64 = 24110.54841;
    const C1: f64 = 8640184.812866;
    const C2: f64 = 9.3104e-2;
    const C3: f64 = -6.2e-6;

    // Ratio of sidereal day to solar day
    const RAP: f64 = 1.00273790934;

    let t = (tjm.floor() - T2000) / 36525.0;
    let gmst0 = (((C3 * t + C2) * t + C1) * t + C0) * DPI / 86400.0;

    (gmst0 + tjm.fract() * DPI * RAP).rem_euclid(DPI)
}

/// Local apparent sidereal time in radians, in [0, 2π).
///
/// GMST + equation of the equinoxes + east longitude.
pub fn local_sidereal_time(epoch: &Epoch, longitude: Degree) -> Radian {
    let gast = gmst(epoch.to_mjd_utc_days()) + equequ(epoch.to_mjd_tt_days());
    (gast + longitude * RADEG).rem_euclid(DPI)
}

fn format_gregorian(epoch: &Epoch) -> String {
    let (y, mo, d, h, mi, s, _) = epoch.to_gregorian_utc();
    format!("{y:04}-{mo:02}-{d:02}T{h:02}:{mi:02}:{s:02}")
}

/// ISO-8601 UTC rendering, e.g. `2024-03-15T21:05:00Z`.
pub fn format_utc(epoch: &Epoch) -> String {
    format!("{}Z", format_gregorian(epoch))
}

/// An instant paired with a fixed UTC offset, rendered in local civil time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalTime {
    pub epoch: Epoch,
    pub utc_offset_hours: f64,
}

impl LocalTime {
    pub fn new(epoch: Epoch, utc_offset_hours: f64) -> Self {
        LocalTime {
            epoch,
            utc_offset_hours,
        }
    }

    /// Nautical time-zone offset (whole hours) for an east longitude.
    pub fn nautical_offset(longitude: Degree) -> f64 {
        (longitude / 15.0).round()
    }
}

impl fmt::Display for LocalTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shifted = self.epoch + Unit::Hour * self.utc_offset_hours;
        let total_minutes = (self.utc_offset_hours * 60.0).round() as i64;
        let sign = if total_minutes < 0 { '-' } else { '+' };
        let abs = total_minutes.abs();
        write!(
            f,
            "{}{}{:02}:{:02}",
            format_gregorian(&shifted),
            sign,
            abs / 60,
            abs % 60
        )
    }
}

#[cfg(test)]
mod time_test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_gmst() {
        let tut = 57028.478514610404;
        assert_relative_eq!(gmst(tut), 4.851925725092499, epsilon = 1e-12);

        assert_relative_eq!(gmst(T2000), 4.894961212789145, epsilon = 1e-12);
    }

    #[test]
    fn test_parse_calendar_date() {
        let date: CalendarDate = "2024-03-15".parse().unwrap();
        assert_eq!(date, CalendarDate::new(2024, 3, 15).unwrap());
        assert_eq!(date.to_string(), "2024-03-15");

        assert!("2024-02-30".parse::<CalendarDate>().is_err());
        assert!("2023-02-29".parse::<CalendarDate>().is_err());
        assert!("2024-02-29".parse::<CalendarDate>().is_ok());
        assert!("15/03/2024".parse::<CalendarDate>().is_err());
        assert!("2024-3-15".parse::<CalendarDate>().is_err());
    }

    #[test]
    fn test_add_days_crosses_month_and_year() {
        let date = CalendarDate::new(2023, 12, 30).unwrap();
        assert_eq!(date.add_days(3), CalendarDate::new(2024, 1, 2).unwrap());
        assert_eq!(date.add_days(-30), CalendarDate::new(2023, 11, 30).unwrap());
    }

    #[test]
    fn test_local_mean_midnight() {
        let date = CalendarDate::new(2024, 3, 15).unwrap();
        let midnight = date.local_mean_midnight(90.0);
        assert_eq!(format_utc(&midnight), "2024-03-14T18:00:00Z");
        assert_eq!(format_utc(&date.local_mean_noon(-45.0)), "2024-03-15T15:00:00Z");
    }

    #[test]
    fn test_local_time_display() {
        let epoch = Epoch::from_gregorian_utc(2024, 3, 15, 21, 30, 0, 0);
        assert_eq!(LocalTime::new(epoch, 1.0).to_string(), "2024-03-15T22:30:00+01:00");
        assert_eq!(LocalTime::new(epoch, -5.5).to_string(), "2024-03-15T16:00:00-05:30");
        assert_eq!(LocalTime::nautical_offset(2.35), 0.0);
        assert_eq!(LocalTime::nautical_offset(-73.9), -5.0);
    }

    #[test]
    fn test_local_sidereal_time_at_greenwich_is_gast() {
        // 2000-01-01 12:00 UT: GMST ≈ 18.697 h
        let epoch = Epoch::from_gregorian_utc(2000, 1, 1, 12, 0, 0, 0);
        let lst_hours = local_sidereal_time(&epoch, 0.0) / DPI * 24.0;
        assert_relative_eq!(lst_hours, 18.697, epsilon = 2e-3);

        let east = local_sidereal_time(&epoch, 15.0) / DPI * 24.0;
        assert_relative_eq!((east - lst_hours).rem_euclid(24.0), 1.0, epsilon = 1e-9);
    }
}
