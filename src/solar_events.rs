//! # Solar and lunar events
//!
//! Per-day sunrise, sunset, solar noon, twilights, golden and blue hours, moonrise,
//! moonset and lunar phase for a site.
//!
//! ## Method
//!
//! Each day runs over one **local mean-solar day**: from 00:00 local mean time
//! (00:00 UTC shifted by `−longitude / 15` hours) to the next local midnight. The
//! apparent altitudes of the Sun and of the Moon are sampled every 2 minutes
//! (configurable) into an [`AltitudeSeries`]; every threshold then gets its own
//! bracketing pass over the series, with linear interpolation inside the bracket:
//!
//! | Threshold | Rising crossing              | Setting crossing            |
//! |-----------|------------------------------|-----------------------------|
//! | 0°        | sunrise                      | sunset                      |
//! | −6°       | civil twilight begin         | civil twilight end          |
//! | −12°      | nautical twilight begin      | nautical twilight end       |
//! | −18°      | astronomical twilight begin  | astronomical twilight end   |
//!
//! Golden hour spans the Sun between 6° and −4°, blue hour between −4° and −8°:
//!
//! ```text
//! golden morning = [rise −4°, rise 6°]     golden evening = [set 6°, set −4°]
//! blue morning   = [rise −8°, rise −4°]    blue evening   = [set −4°, set −8°]
//! ```
//!
//! Solar noon is the maximum of the Sun series refined by a parabola through the
//! three highest samples. Nothing assumes that a crossing exists: every event is
//! independently optional, and the day carries a [`SunCondition`] for midnight sun
//! and polar night.

use hifitime::{Duration, Epoch, Unit};
use itertools::Itertools;

use crate::cancel::CancelToken;
use crate::config::EventSettings;
use crate::constants::{
    Degree, ASTRONOMICAL_TWILIGHT_DEG, BLUE_HOUR_LOWER_DEG, CIVIL_TWILIGHT_DEG, GOLDEN_BLUE_BOUNDARY_DEG,
    GOLDEN_HOUR_UPPER_DEG, HORIZON_DEG, NAUTICAL_TWILIGHT_DEG,
};
use crate::coordinates::HorizonFrame;
use crate::ephemeris::{Body, Ephemeris, MoonPhase};
use crate::observers::Observer;
use crate::skyplan_errors::SkyPlanError;
use crate::time::CalendarDate;

/// Samples between two cancellation checks.
const CANCEL_CHECK_INTERVAL: usize = 64;

/// A threshold crossing of an altitude series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Crossing {
    pub epoch: Epoch,
    /// `true` when the altitude goes up through the threshold.
    pub rising: bool,
}

/// Altitudes of one object sampled at a regular step.
#[derive(Debug, Clone)]
pub struct AltitudeSeries {
    step: Duration,
    samples: Vec<(Epoch, Degree)>,
}

impl AltitudeSeries {
    /// Sample `altitude_at` from `start` to `end` (inclusive) every `step`.
    pub fn sample_with<F>(
        start: Epoch,
        end: Epoch,
        step: Duration,
        cancel: &CancelToken,
        mut altitude_at: F,
    ) -> Result<Self, SkyPlanError>
    where
        F: FnMut(&Epoch) -> Result<Degree, SkyPlanError>,
    {
        if step <= Duration::ZERO {
            return Err(SkyPlanError::InvalidInput("sampling step must be positive".into()));
        }
        let mut samples = Vec::new();
        let mut t = start;
        while t <= end {
            if samples.len() % CANCEL_CHECK_INTERVAL == 0 {
                cancel.check()?;
            }
            samples.push((t, altitude_at(&t)?));
            t += step;
        }
        Ok(AltitudeSeries { step, samples })
    }

    /// Apparent altitude of a solar-system body seen from `observer`.
    pub fn for_body(
        observer: &Observer,
        ephemeris: &dyn Ephemeris,
        body: Body,
        start: Epoch,
        end: Epoch,
        step: Duration,
        cancel: &CancelToken,
    ) -> Result<Self, SkyPlanError> {
        AltitudeSeries::sample_with(start, end, step, cancel, |t| {
            let position = ephemeris.position(body, t)?;
            Ok(HorizonFrame::new(observer, t).altaz(&position)?.altitude_deg)
        })
    }

    pub fn samples(&self) -> &[(Epoch, Degree)] {
        &self.samples
    }

    pub fn step(&self) -> Duration {
        self.step
    }

    /// Every crossing of `threshold`, in time order.
    pub fn crossings(&self, threshold: Degree) -> Vec<Crossing> {
        self.samples
            .iter()
            .tuple_windows()
            .filter_map(|(&(ta, a), &(tb, b))| {
                let rising = if a < threshold && b >= threshold {
                    true
                } else if a >= threshold && b < threshold {
                    false
                } else {
                    return None;
                };
                let fraction = (threshold - a) / (b - a);
                Some(Crossing {
                    epoch: ta + (tb - ta) * fraction,
                    rising,
                })
            })
            .collect()
    }

    /// First upward crossing of `threshold`.
    pub fn first_rising(&self, threshold: Degree) -> Option<Epoch> {
        self.crossings(threshold)
            .into_iter()
            .find(|c| c.rising)
            .map(|c| c.epoch)
    }

    /// First downward crossing of `threshold`.
    pub fn first_setting(&self, threshold: Degree) -> Option<Epoch> {
        self.crossings(threshold)
            .into_iter()
            .find(|c| !c.rising)
            .map(|c| c.epoch)
    }

    pub fn min_altitude(&self) -> Option<Degree> {
        self.samples.iter().map(|s| s.1).reduce(f64::min)
    }

    pub fn max_altitude(&self) -> Option<Degree> {
        self.samples.iter().map(|s| s.1).reduce(f64::max)
    }

    /// Highest point of the series, refined by a parabola through the best sample
    /// and its neighbours. Earliest sample wins ties.
    pub fn maximum(&self) -> Option<(Epoch, Degree)> {
        let (i, &(t1, y1)) = self
            .samples
            .iter()
            .enumerate()
            .reduce(|best, cur| if cur.1 .1 > best.1 .1 { cur } else { best })?;

        if i == 0 || i + 1 == self.samples.len() {
            return Some((t1, y1));
        }
        let (y0, y2) = (self.samples[i - 1].1, self.samples[i + 1].1);
        let curvature = y0 - 2.0 * y1 + y2;
        if curvature >= 0.0 {
            return Some((t1, y1));
        }
        // Vertex offset in steps, within [-0.5, 0.5] for a true local maximum
        let offset = (0.5 * (y0 - y2) / curvature).clamp(-1.0, 1.0);
        let peak = y1 - (y0 - y2).powi(2) / (8.0 * curvature);
        Some((t1 + self.step * offset, peak))
    }
}

/// Whether the Sun rises and sets during a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SunCondition {
    Normal,
    /// The Sun never goes below the horizon.
    MidnightSun,
    /// The Sun never rises.
    PolarNight,
}

/// A time interval whose bounds are independently optional.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EventWindow {
    pub start: Option<Epoch>,
    pub end: Option<Epoch>,
}

/// Solar and lunar events of one local day.
#[derive(Debug, Clone, PartialEq)]
pub struct DayEvents {
    pub date: CalendarDate,
    pub sunrise: Option<Epoch>,
    pub sunset: Option<Epoch>,
    pub solar_noon: Option<Epoch>,
    pub solar_noon_altitude: Option<Degree>,
    pub civil_twilight_begin: Option<Epoch>,
    pub civil_twilight_end: Option<Epoch>,
    pub nautical_twilight_begin: Option<Epoch>,
    pub nautical_twilight_end: Option<Epoch>,
    pub astronomical_twilight_begin: Option<Epoch>,
    pub astronomical_twilight_end: Option<Epoch>,
    pub golden_hour_morning: EventWindow,
    pub golden_hour_evening: EventWindow,
    pub blue_hour_morning: EventWindow,
    pub blue_hour_evening: EventWindow,
    pub moonrise: Option<Epoch>,
    pub moonset: Option<Epoch>,
    pub moon_phase: MoonPhase,
    pub moon_illumination: f64,
    pub day_length_hours: Option<f64>,
    pub sun_condition: SunCondition,
}

/// Sun condition of a day from its Sun altitude series.
pub fn sun_condition(sun: &AltitudeSeries) -> SunCondition {
    match (sun.min_altitude(), sun.max_altitude()) {
        (Some(min), _) if min >= HORIZON_DEG => SunCondition::MidnightSun,
        (_, Some(max)) if max < HORIZON_DEG => SunCondition::PolarNight,
        _ => SunCondition::Normal,
    }
}

/// Events of a single local mean-solar day.
///
/// Arguments
/// ---------
/// * `observer`: observing site.
/// * `date`: civil date of the local day.
/// * `ephemeris`: Sun and Moon positions.
/// * `step_minutes`: sampling step of the altitude series.
/// * `cancel`: checked while sampling.
pub fn day_events(
    observer: &Observer,
    date: CalendarDate,
    ephemeris: &dyn Ephemeris,
    step_minutes: u32,
    cancel: &CancelToken,
) -> Result<DayEvents, SkyPlanError> {
    let longitude = observer.longitude_deg();
    let start = date.local_mean_midnight(longitude);
    let end = start + Unit::Day * 1.0;
    let step = Unit::Minute * f64::from(step_minutes.max(1));

    let sun = AltitudeSeries::for_body(observer, ephemeris, Body::Sun, start, end, step, cancel)?;
    let moon = AltitudeSeries::for_body(observer, ephemeris, Body::Moon, start, end, step, cancel)?;

    let sunrise = sun.first_rising(HORIZON_DEG);
    let sunset = sun.first_setting(HORIZON_DEG);
    let noon = sun.maximum();
    let lunar_phase = ephemeris.lunar_phase(&date.local_mean_noon(longitude))?;

    let day_length_hours = match (sunrise, sunset) {
        (Some(rise), Some(set)) if set > rise => Some((set - rise).to_unit(Unit::Hour)),
        _ => None,
    };

    Ok(DayEvents {
        date,
        sunrise,
        sunset,
        solar_noon: noon.map(|n| n.0),
        solar_noon_altitude: noon.map(|n| n.1),
        civil_twilight_begin: sun.first_rising(CIVIL_TWILIGHT_DEG),
        civil_twilight_end: sun.first_setting(CIVIL_TWILIGHT_DEG),
        nautical_twilight_begin: sun.first_rising(NAUTICAL_TWILIGHT_DEG),
        nautical_twilight_end: sun.first_setting(NAUTICAL_TWILIGHT_DEG),
        astronomical_twilight_begin: sun.first_rising(ASTRONOMICAL_TWILIGHT_DEG),
        astronomical_twilight_end: sun.first_setting(ASTRONOMICAL_TWILIGHT_DEG),
        golden_hour_morning: EventWindow {
            start: sun.first_rising(GOLDEN_BLUE_BOUNDARY_DEG),
            end: sun.first_rising(GOLDEN_HOUR_UPPER_DEG),
        },
        golden_hour_evening: EventWindow {
            start: sun.first_setting(GOLDEN_HOUR_UPPER_DEG),
            end: sun.first_setting(GOLDEN_BLUE_BOUNDARY_DEG),
        },
        blue_hour_morning: EventWindow {
            start: sun.first_rising(BLUE_HOUR_LOWER_DEG),
            end: sun.first_rising(GOLDEN_BLUE_BOUNDARY_DEG),
        },
        blue_hour_evening: EventWindow {
            start: sun.first_setting(GOLDEN_BLUE_BOUNDARY_DEG),
            end: sun.first_setting(BLUE_HOUR_LOWER_DEG),
        },
        moonrise: moon.first_rising(HORIZON_DEG),
        moonset: moon.first_setting(HORIZON_DEG),
        moon_phase: lunar_phase.phase,
        moon_illumination: lunar_phase.illumination,
        day_length_hours,
        sun_condition: sun_condition(&sun),
    })
}

/// Events for `days` consecutive days starting at `start_date`.
///
/// Arguments
/// ---------
/// * `latitude`, `longitude`: site in degrees (sea level).
/// * `start_date`: first civil date.
/// * `days`: number of days, `1..=settings.max_days`.
/// * `ephemeris`: Sun and Moon positions.
/// * `settings`: sampling step and day limit.
/// * `cancel`: checked between samples.
///
/// Errors
/// ------
/// * [`SkyPlanError::OutOfRange`] for invalid coordinates.
/// * [`SkyPlanError::InvalidInput`] when `days` is outside `1..=max_days`.
/// * [`SkyPlanError::Cancelled`] when `cancel` trips.
pub fn solar_lunar_events(
    latitude: Degree,
    longitude: Degree,
    start_date: CalendarDate,
    days: u32,
    ephemeris: &dyn Ephemeris,
    settings: &EventSettings,
    cancel: &CancelToken,
) -> Result<Vec<DayEvents>, SkyPlanError> {
    let observer = Observer::at_sea_level(latitude, longitude)?;
    if days == 0 || days > settings.max_days {
        return Err(SkyPlanError::InvalidInput(format!(
            "days must be between 1 and {}, got {days}",
            settings.max_days
        )));
    }

    let events = (0..i64::from(days))
        .map(|offset| {
            day_events(
                &observer,
                start_date.add_days(offset),
                ephemeris,
                settings.sample_step_minutes,
                cancel,
            )
        })
        .collect::<Result<Vec<_>, _>>()?;

    log::debug!(
        "computed events for {days} days from {start_date} at ({latitude}, {longitude})"
    );
    Ok(events)
}

#[cfg(test)]
mod solar_events_test {
    use super::*;
    use crate::ephemeris::AnalyticEphemeris;
    use approx::assert_relative_eq;

    fn synthetic(altitudes: &[f64]) -> AltitudeSeries {
        let start = Epoch::from_gregorian_utc_at_midnight(2024, 1, 1);
        let mut values = altitudes.iter();
        AltitudeSeries::sample_with(
            start,
            start + Unit::Minute * (altitudes.len() as f64 - 1.0),
            Unit::Minute * 1.0,
            &CancelToken::new(),
            |_| Ok(*values.next().unwrap_or(&0.0)),
        )
        .unwrap()
    }

    #[test]
    fn test_crossings_interpolate() {
        let series = synthetic(&[-2.0, 2.0, 6.0, 1.0, -4.0]);
        let crossings = series.crossings(0.0);
        assert_eq!(crossings.len(), 2);
        assert!(crossings[0].rising);
        assert!(!crossings[1].rising);

        let start = series.samples()[0].0;
        assert_relative_eq!((crossings[0].epoch - start).to_unit(Unit::Minute), 0.5, epsilon = 1e-9);
        assert_relative_eq!((crossings[1].epoch - start).to_unit(Unit::Minute), 3.2, epsilon = 1e-9);
        assert!(series.first_rising(10.0).is_none());
    }

    #[test]
    fn test_threshold_touch_counts_once() {
        let series = synthetic(&[-1.0, 0.0, 0.0, -1.0]);
        let crossings = series.crossings(0.0);
        assert_eq!(crossings.len(), 2);
        assert!(crossings[0].rising);
        assert!(!crossings[1].rising);
    }

    #[test]
    fn test_parabolic_maximum() {
        // y = 10 − (x − 2.25)², sampled at x = 0..5
        let values: Vec<f64> = (0..5).map(|x| 10.0 - (f64::from(x) - 2.25).powi(2)).collect();
        let series = synthetic(&values);
        let (t, peak) = series.maximum().unwrap();
        assert_relative_eq!(peak, 10.0, epsilon = 1e-9);
        assert_relative_eq!((t - series.samples()[0].0).to_unit(Unit::Minute), 2.25, epsilon = 1e-9);

        let edge = synthetic(&[5.0, 3.0, 1.0]);
        assert_eq!(edge.maximum().unwrap().1, 5.0);
    }

    #[test]
    fn test_paris_midsummer() {
        let paris = Observer::at_sea_level(48.8566, 2.3522).unwrap();
        let date = CalendarDate::new(2024, 6, 21).unwrap();
        let day = day_events(&paris, date, &AnalyticEphemeris, 2, &CancelToken::new()).unwrap();

        assert_eq!(day.sun_condition, SunCondition::Normal);
        let (sunrise, sunset, noon) = (day.sunrise.unwrap(), day.sunset.unwrap(), day.solar_noon.unwrap());
        let utc_hours = |e: Epoch| {
            let (_, _, _, h, m, s, _) = e.to_gregorian_utc();
            f64::from(h) + f64::from(m) / 60.0 + f64::from(s) / 3600.0
        };
        assert_relative_eq!(utc_hours(sunrise), 3.82, epsilon = 0.05);
        assert_relative_eq!(utc_hours(sunset), 19.93, epsilon = 0.05);
        assert_relative_eq!(utc_hours(noon), 11.87, epsilon = 0.05);
        assert_relative_eq!(day.solar_noon_altitude.unwrap(), 64.6, epsilon = 0.2);
        assert_relative_eq!(day.day_length_hours.unwrap(), 16.11, epsilon = 0.05);

        // No astronomical night around the solstice at this latitude
        assert!(day.astronomical_twilight_end.is_none());
        assert!(day.golden_hour_morning.start.unwrap() < day.golden_hour_morning.end.unwrap());
        assert_eq!(day.blue_hour_morning.end, day.golden_hour_morning.start);
    }

    #[test]
    fn test_event_ordering_at_mid_latitude() {
        let site = Observer::at_sea_level(40.0, -3.7).unwrap();
        let date = CalendarDate::new(2024, 3, 20).unwrap();
        let day = day_events(&site, date, &AnalyticEphemeris, 2, &CancelToken::new()).unwrap();

        let sequence = [
            day.astronomical_twilight_begin,
            day.nautical_twilight_begin,
            day.civil_twilight_begin,
            day.sunrise,
            day.solar_noon,
            day.sunset,
            day.civil_twilight_end,
            day.nautical_twilight_end,
            day.astronomical_twilight_end,
        ];
        let epochs: Vec<Epoch> = sequence.iter().map(|e| e.unwrap()).collect();
        assert!(epochs.windows(2).all(|w| w[0] < w[1]));
        assert_relative_eq!(day.day_length_hours.unwrap(), 12.1, epsilon = 0.2);
    }

    #[test]
    fn test_polar_conditions() {
        let tromso = Observer::at_sea_level(69.65, 18.96).unwrap();
        let june = day_events(&tromso, CalendarDate::new(2024, 6, 21).unwrap(), &AnalyticEphemeris, 5, &CancelToken::new())
            .unwrap();
        assert_eq!(june.sun_condition, SunCondition::MidnightSun);
        assert!(june.sunrise.is_none() && june.sunset.is_none());
        assert!(june.day_length_hours.is_none());

        let december = day_events(&tromso, CalendarDate::new(2024, 12, 21).unwrap(), &AnalyticEphemeris, 5, &CancelToken::new())
            .unwrap();
        assert_eq!(december.sun_condition, SunCondition::PolarNight);
        assert!(december.sunrise.is_none());
        assert!(december.civil_twilight_begin.is_some());
        assert!(december.solar_noon_altitude.unwrap() < 0.0);
    }

    #[test]
    fn test_series_validation() {
        let settings = EventSettings::default();
        let date = CalendarDate::new(2024, 3, 1).unwrap();
        let run = |days| solar_lunar_events(48.0, 2.0, date, days, &AnalyticEphemeris, &settings, &CancelToken::new());

        assert!(matches!(run(0), Err(SkyPlanError::InvalidInput(_))));
        assert!(matches!(run(31), Err(SkyPlanError::InvalidInput(_))));

        let week = run(7).unwrap();
        assert_eq!(week.len(), 7);
        assert_eq!(week[6].date, CalendarDate::new(2024, 3, 7).unwrap());
        // Days lengthen in March
        assert!(week[6].day_length_hours.unwrap() > week[0].day_length_hours.unwrap());

        assert!(matches!(
            solar_lunar_events(91.0, 0.0, date, 1, &AnalyticEphemeris, &settings, &CancelToken::new()),
            Err(SkyPlanError::OutOfRange { .. })
        ));
    }
}
