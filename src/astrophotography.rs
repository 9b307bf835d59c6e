//! # Astrophotography scorer
//!
//! Finds the best instant of a night to image a target.
//!
//! ## Overview
//!
//! 1. The **night window** is searched from local mean noon to the next local mean
//!    noon on the Sun altitude series: it runs from the evening civil-twilight end
//!    (Sun descending through −6°) to the following civil-twilight begin. Without
//!    civil darkness the window falls back to sunset/sunrise. A polar night uses the
//!    whole interval, a midnight sun yields no window at all.
//! 2. The window is sampled every few minutes into a [`TimelineSample`] timeline
//!    holding the target, Moon and Sun geometry and a quality score in `[0, 100]`.
//! 3. The best sample is the highest score among those where the target stands
//!    above the minimum altitude; ties go to the earliest sample.
//!
//! ## Score
//!
//! Each component lies in `[0, 1]` and the weighted sum is normalised by the sum of
//! the [`ScoreWeights`]:
//!
//! ```text
//! altitude        = 0 at or below min_altitude, else alt / 90
//! darkness        = clamp(−sun_alt / 18, 0, 1)
//! moon_separation = sep / 180
//! moon_altitude   = 1 when the Moon is down, else 1 − moon_alt / 90
//! score           = 100 · Σ wᵢ·componentᵢ / Σ wᵢ
//! ```
//!
//! A target that never clears the altitude gate is not an error: the result carries
//! a [`NoImagingReason`] and no best-time fields.
//!
//! ## See also
//! ------------
//! * [`crate::solar_events::AltitudeSeries`] – threshold crossings and culminations.
//! * [`crate::catalog::TargetCatalog`] – named targets.

use std::fmt;

use hifitime::{Duration, Epoch, Unit};
use serde::{Deserialize, Serialize};

use crate::cancel::CancelToken;
use crate::catalog::Target;
use crate::config::AstrophotographySettings;
use crate::constants::{
    Degree, ASTRONOMICAL_TWILIGHT_DEG, CIVIL_TWILIGHT_DEG, HORIZON_DEG,
};
use crate::coordinates::{angular_separation, EquatorialPosition, HorizonFrame};
use crate::ephemeris::{Body, Ephemeris, MoonPhase};
use crate::observers::Observer;
use crate::skyplan_errors::SkyPlanError;
use crate::solar_events::{sun_condition, AltitudeSeries, EventWindow, SunCondition};
use crate::time::{CalendarDate, LocalTime};

/// Samples between two cancellation checks.
const CANCEL_CHECK_INTERVAL: usize = 32;

/// Sampling step of the Sun series used to find the night window.
const WINDOW_SEARCH_STEP_MINUTES: f64 = 2.0;

/// Relative weights of the quality score components.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    #[serde(default = "default_altitude_weight")]
    pub altitude: f64,
    #[serde(default = "default_minor_weight")]
    pub darkness: f64,
    #[serde(default = "default_minor_weight")]
    pub moon_separation: f64,
    #[serde(default = "default_minor_weight")]
    pub moon_altitude: f64,
}

fn default_altitude_weight() -> f64 {
    0.4
}

fn default_minor_weight() -> f64 {
    0.2
}

impl Default for ScoreWeights {
    fn default() -> Self {
        ScoreWeights {
            altitude: default_altitude_weight(),
            darkness: default_minor_weight(),
            moon_separation: default_minor_weight(),
            moon_altitude: default_minor_weight(),
        }
    }
}

impl ScoreWeights {
    fn total(&self) -> f64 {
        self.altitude + self.darkness + self.moon_separation + self.moon_altitude
    }

    /// Weights must be finite, non-negative, and not all zero.
    pub fn validate(&self) -> Result<(), SkyPlanError> {
        for (field, value) in [
            ("astrophotography.weights.altitude", self.altitude),
            ("astrophotography.weights.darkness", self.darkness),
            ("astrophotography.weights.moon_separation", self.moon_separation),
            ("astrophotography.weights.moon_altitude", self.moon_altitude),
        ] {
            SkyPlanError::check_range(field, value, 0.0, f64::MAX)?;
        }
        if self.total() <= 0.0 {
            return Err(SkyPlanError::InvalidInput(
                "at least one score weight must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Quality score in `[0, 100]` of one instant.
///
/// Arguments
/// ---------
/// * `weights`: validated component weights.
/// * `altitude`: target apparent altitude.
/// * `min_altitude`: altitude gate; the altitude component is zero at or below it.
/// * `sun_altitude`, `moon_altitude`: apparent altitudes.
/// * `moon_separation`: target–Moon angular distance.
pub fn quality_score(
    weights: &ScoreWeights,
    altitude: Degree,
    min_altitude: Degree,
    sun_altitude: Degree,
    moon_separation: Degree,
    moon_altitude: Degree,
) -> f64 {
    let altitude_score = if altitude > min_altitude {
        (altitude / 90.0).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let darkness_score = (-sun_altitude / -ASTRONOMICAL_TWILIGHT_DEG).clamp(0.0, 1.0);
    let separation_score = (moon_separation / 180.0).clamp(0.0, 1.0);
    let moon_score = if moon_altitude <= HORIZON_DEG {
        1.0
    } else {
        (1.0 - moon_altitude / 90.0).clamp(0.0, 1.0)
    };

    let weighted = weights.altitude * altitude_score
        + weights.darkness * darkness_score
        + weights.moon_separation * separation_score
        + weights.moon_altitude * moon_score;
    (100.0 * weighted / weights.total()).clamp(0.0, 100.0)
}

/// Recommendation bucket of a quality score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Rating {
    NotRecommended,
    Poor,
    Fair,
    Good,
    Excellent,
}

impl Rating {
    pub fn from_score(score: f64) -> Rating {
        match score {
            s if s > 80.0 => Rating::Excellent,
            s if s > 60.0 => Rating::Good,
            s if s > 40.0 => Rating::Fair,
            s if s > 20.0 => Rating::Poor,
            _ => Rating::NotRecommended,
        }
    }

    fn advice(&self) -> &'static str {
        match self {
            Rating::Excellent => "Excellent imaging conditions!",
            Rating::Good => "Good imaging conditions.",
            Rating::Fair => "Fair imaging conditions - some compromises needed.",
            Rating::Poor => "Poor imaging conditions - consider another date.",
            Rating::NotRecommended => "Imaging not recommended on this night.",
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Rating::Excellent => "Excellent",
            Rating::Good => "Good",
            Rating::Fair => "Fair",
            Rating::Poor => "Poor",
            Rating::NotRecommended => "Not recommended",
        };
        f.write_str(name)
    }
}

/// Why a night has no best imaging time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NoImagingReason {
    /// The target stays below the horizon all day.
    NeverRises,
    /// The target never clears the minimum altitude during the night.
    BelowMinimumAltitude { peak_altitude_deg: Degree },
    /// The Sun never sets.
    NoDarkWindow,
}

impl NoImagingReason {
    fn explain(&self, min_altitude: Degree) -> String {
        match self {
            NoImagingReason::NeverRises => {
                "Target never rises above the horizon at this location.".to_string()
            }
            NoImagingReason::BelowMinimumAltitude { peak_altitude_deg } => format!(
                "Target does not rise above {min_altitude:.1}° during the night (peak {peak_altitude_deg:.1}°)."
            ),
            NoImagingReason::NoDarkWindow => {
                "No dark window: the Sun does not set on this date.".to_string()
            }
        }
    }
}

/// How the night window was bounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NightKind {
    /// Civil twilight end to civil twilight begin.
    Civil,
    /// Sunset to sunrise, the Sun never reaching −6°.
    SunsetToSunrise,
    /// Whole noon-to-noon interval.
    PolarNight,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NightWindow {
    pub start: Epoch,
    pub end: Epoch,
    pub kind: NightKind,
}

impl NightWindow {
    pub fn midpoint(&self) -> Epoch {
        self.start + (self.end - self.start) * 0.5
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

/// Geometry and score of the target at one instant of the night.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimelineSample {
    pub epoch: Epoch,
    pub altitude_deg: Degree,
    pub azimuth_deg: Degree,
    pub moon_separation_deg: Degree,
    pub moon_altitude_deg: Degree,
    pub sun_altitude_deg: Degree,
    pub quality_score: f64,
}

/// Best instant of the night.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BestTime {
    pub epoch: Epoch,
    pub local: LocalTime,
    pub altitude_deg: Degree,
    pub azimuth_deg: Degree,
    pub moon_separation_deg: Degree,
    pub sun_altitude_deg: Degree,
    pub quality_score: f64,
}

/// Upper culmination of the target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transit {
    pub epoch: Epoch,
    pub altitude_deg: Degree,
}

/// A request for the best imaging time of one target on one night.
#[derive(Debug, Clone, PartialEq)]
pub struct ImagingRequest {
    pub target: Target,
    pub latitude: Degree,
    pub longitude: Degree,
    /// Civil date of the evening starting the night.
    pub date: CalendarDate,
    /// Altitude gate; the configured default when `None`.
    pub min_altitude: Option<Degree>,
    /// Cloud-cover limit in percent, carried through to the result.
    pub max_cloud_cover: Option<f64>,
    /// Offset for local times; the nautical offset of the longitude when `None`.
    pub utc_offset_hours: Option<f64>,
}

impl ImagingRequest {
    pub fn new(target: Target, latitude: Degree, longitude: Degree, date: CalendarDate) -> Self {
        ImagingRequest {
            target,
            latitude,
            longitude,
            date,
            min_altitude: None,
            max_cloud_cover: None,
            utc_offset_hours: None,
        }
    }

    pub fn with_min_altitude(mut self, min_altitude: Degree) -> Self {
        self.min_altitude = Some(min_altitude);
        self
    }

    pub fn with_max_cloud_cover(mut self, percent: f64) -> Self {
        self.max_cloud_cover = Some(percent);
        self
    }

    pub fn with_utc_offset(mut self, hours: f64) -> Self {
        self.utc_offset_hours = Some(hours);
        self
    }

    fn validate(&self) -> Result<(), SkyPlanError> {
        if let Some(min_altitude) = self.min_altitude {
            SkyPlanError::check_range("min_altitude", min_altitude, -90.0, 90.0)?;
        }
        if let Some(cloud) = self.max_cloud_cover {
            SkyPlanError::check_range("max_cloud_cover", cloud, 0.0, 100.0)?;
        }
        if let Some(offset) = self.utc_offset_hours {
            SkyPlanError::check_range("utc_offset_hours", offset, -14.0, 14.0)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AstrophotographyResult {
    pub target_id: String,
    pub target_name: String,
    pub date: CalendarDate,
    pub min_altitude_deg: Degree,
    pub max_cloud_cover: Option<f64>,
    pub utc_offset_hours: f64,
    pub night: Option<NightWindow>,
    pub best: Option<BestTime>,
    pub timeline: Vec<TimelineSample>,
    /// Moon at the best time, or at the middle of the night without one.
    pub moon_phase: MoonPhase,
    pub moon_illumination: f64,
    pub transit: Option<Transit>,
    pub astronomical_night: EventWindow,
    pub rating: Option<Rating>,
    pub recommendation: String,
    pub no_imaging_reason: Option<NoImagingReason>,
}

impl AstrophotographyResult {
    pub fn quality_score(&self) -> Option<f64> {
        self.best.map(|b| b.quality_score)
    }
}

/// Where the target is at an instant.
fn target_position(
    target: &Target,
    ephemeris: &dyn Ephemeris,
    epoch: &Epoch,
) -> Result<EquatorialPosition, SkyPlanError> {
    match target {
        Target::Fixed { position, .. } => Ok(*position),
        Target::Planet(body) => ephemeris.position(*body, epoch),
    }
}

/// Interval of `series` spent below `threshold`, starting at the first setting
/// crossing (or the series start when already below) and ending at the next rising
/// crossing (or the series end).
fn below_interval(series: &AltitudeSeries, threshold: Degree) -> Option<(Epoch, Epoch)> {
    let samples = series.samples();
    let (first, last) = (samples.first()?, samples.last()?);
    if series.min_altitude()? >= threshold {
        return None;
    }
    let crossings = series.crossings(threshold);
    let start = if first.1 < threshold {
        first.0
    } else {
        crossings.iter().find(|c| !c.rising)?.epoch
    };
    let end = crossings
        .iter()
        .find(|c| c.rising && c.epoch > start)
        .map_or(last.0, |c| c.epoch);
    Some((start, end))
}

/// Night window of the local night starting on `date`, with the Sun series used
/// to find it.
///
/// Return
/// ------
/// * `None` for the window under a midnight sun.
pub fn night_window(
    observer: &Observer,
    date: CalendarDate,
    ephemeris: &dyn Ephemeris,
    cancel: &CancelToken,
) -> Result<(Option<NightWindow>, AltitudeSeries), SkyPlanError> {
    let start = date.local_mean_noon(observer.longitude_deg());
    let end = start + Unit::Day * 1.0;
    let step = Unit::Minute * WINDOW_SEARCH_STEP_MINUTES;
    let sun = AltitudeSeries::for_body(observer, ephemeris, Body::Sun, start, end, step, cancel)?;

    let window = match sun_condition(&sun) {
        SunCondition::MidnightSun => None,
        SunCondition::PolarNight => Some(NightWindow {
            start,
            end,
            kind: NightKind::PolarNight,
        }),
        SunCondition::Normal => below_interval(&sun, CIVIL_TWILIGHT_DEG)
            .map(|(s, e)| NightWindow {
                start: s,
                end: e,
                kind: NightKind::Civil,
            })
            .or_else(|| {
                below_interval(&sun, HORIZON_DEG).map(|(s, e)| NightWindow {
                    start: s,
                    end: e,
                    kind: NightKind::SunsetToSunrise,
                })
            }),
    };
    Ok((window, sun))
}

/// Score every step of the night window.
fn scan_night(
    observer: &Observer,
    target: &Target,
    window: &NightWindow,
    min_altitude: Degree,
    ephemeris: &dyn Ephemeris,
    settings: &AstrophotographySettings,
    cancel: &CancelToken,
) -> Result<Vec<TimelineSample>, SkyPlanError> {
    let step = Unit::Minute * f64::from(settings.sample_step_minutes.max(1));
    let mut timeline = Vec::new();
    let mut t = window.start;

    while t <= window.end {
        if timeline.len() % CANCEL_CHECK_INTERVAL == 0 {
            cancel.check()?;
        }
        let frame = HorizonFrame::new(observer, &t);
        let target_eq = target_position(target, ephemeris, &t)?;
        let moon_eq = ephemeris.position(Body::Moon, &t)?;
        let sun_eq = ephemeris.position(Body::Sun, &t)?;

        let target_hz = frame.altaz(&target_eq)?;
        let moon_hz = frame.altaz(&moon_eq)?;
        let sun_hz = frame.altaz(&sun_eq)?;
        let separation = angular_separation(&frame.topocentric(&target_eq)?, &frame.topocentric(&moon_eq)?);

        timeline.push(TimelineSample {
            epoch: t,
            altitude_deg: target_hz.altitude_deg,
            azimuth_deg: target_hz.azimuth_deg,
            moon_separation_deg: separation,
            moon_altitude_deg: moon_hz.altitude_deg,
            sun_altitude_deg: sun_hz.altitude_deg,
            quality_score: quality_score(
                &settings.weights,
                target_hz.altitude_deg,
                min_altitude,
                sun_hz.altitude_deg,
                separation,
                moon_hz.altitude_deg,
            ),
        });
        t += step;
    }
    Ok(timeline)
}

/// Highest-scoring sample above `min_altitude`; the earliest one on ties.
pub fn best_sample(timeline: &[TimelineSample], min_altitude: Degree) -> Option<&TimelineSample> {
    timeline
        .iter()
        .filter(|s| s.altitude_deg > min_altitude)
        .fold(None, |best: Option<&TimelineSample>, s| match best {
            Some(b) if b.quality_score >= s.quality_score => Some(b),
            _ => Some(s),
        })
}

/// Upper culmination within the 24 hours centred on `center`.
fn find_transit(
    observer: &Observer,
    target: &Target,
    center: Epoch,
    ephemeris: &dyn Ephemeris,
    step: Duration,
    cancel: &CancelToken,
) -> Result<Option<Transit>, SkyPlanError> {
    let half_day = Unit::Hour * 12.0;
    let series = AltitudeSeries::sample_with(center - half_day, center + half_day, step, cancel, |t| {
        let position = target_position(target, ephemeris, t)?;
        Ok(HorizonFrame::new(observer, t).altaz(&position)?.altitude_deg)
    })?;
    Ok(series.maximum().map(|(epoch, altitude_deg)| Transit { epoch, altitude_deg }))
}

/// Best time of the night to image a target.
///
/// Arguments
/// ---------
/// * `request`: target, site, date and optional limits.
/// * `ephemeris`: Sun, Moon and planet positions.
/// * `settings`: sampling step, default altitude gate and score weights.
/// * `cancel`: checked between samples.
///
/// Return
/// ------
/// * The scored timeline with the best instant, or an empty best-time with a
///   [`NoImagingReason`] when the target never qualifies.
///
/// Errors
/// ------
/// * [`SkyPlanError::OutOfRange`] for invalid coordinates or limits.
/// * [`SkyPlanError::DataUnavailable`] for a planet outside the ephemeris coverage.
/// * [`SkyPlanError::Cancelled`] when `cancel` trips.
pub fn best_imaging_time(
    request: &ImagingRequest,
    ephemeris: &dyn Ephemeris,
    settings: &AstrophotographySettings,
    cancel: &CancelToken,
) -> Result<AstrophotographyResult, SkyPlanError> {
    let observer = Observer::at_sea_level(request.latitude, request.longitude)?;
    request.validate()?;
    settings.weights.validate()?;

    let min_altitude = request.min_altitude.unwrap_or(settings.default_min_altitude);
    let utc_offset = request
        .utc_offset_hours
        .unwrap_or_else(|| LocalTime::nautical_offset(request.longitude));
    let step = Unit::Minute * f64::from(settings.sample_step_minutes.max(1));

    let (night, sun) = night_window(&observer, request.date, ephemeris, cancel)?;
    let center = night
        .map(|w| w.midpoint())
        .unwrap_or_else(|| request.date.local_mean_noon(request.longitude) + Unit::Hour * 12.0);

    let timeline = match &night {
        Some(window) => scan_night(
            &observer,
            &request.target,
            window,
            min_altitude,
            ephemeris,
            settings,
            cancel,
        )?,
        None => Vec::new(),
    };
    let transit = find_transit(&observer, &request.target, center, ephemeris, step, cancel)?;

    let best = best_sample(&timeline, min_altitude).map(|s| BestTime {
        epoch: s.epoch,
        local: LocalTime::new(s.epoch, utc_offset),
        altitude_deg: s.altitude_deg,
        azimuth_deg: s.azimuth_deg,
        moon_separation_deg: s.moon_separation_deg,
        sun_altitude_deg: s.sun_altitude_deg,
        quality_score: s.quality_score,
    });

    let moon = ephemeris.lunar_phase(&best.map_or(center, |b| b.epoch))?;

    let astronomical_night = match night.map(|w| w.kind) {
        Some(NightKind::PolarNight) => EventWindow {
            start: night.map(|w| w.start),
            end: night.map(|w| w.end),
        },
        _ => below_interval(&sun, ASTRONOMICAL_TWILIGHT_DEG)
            .map(|(start, end)| EventWindow {
                start: Some(start),
                end: Some(end),
            })
            .unwrap_or_default(),
    };

    let (rating, no_imaging_reason) = match best {
        Some(b) => (Some(Rating::from_score(b.quality_score)), None),
        None if night.is_none() => (None, Some(NoImagingReason::NoDarkWindow)),
        None if transit.map_or(true, |t| t.altitude_deg <= HORIZON_DEG) => {
            (None, Some(NoImagingReason::NeverRises))
        }
        None => {
            let peak = timeline
                .iter()
                .map(|s| s.altitude_deg)
                .reduce(f64::max)
                .unwrap_or(f64::NAN);
            (
                None,
                Some(NoImagingReason::BelowMinimumAltitude {
                    peak_altitude_deg: peak,
                }),
            )
        }
    };
    let recommendation = match (rating, no_imaging_reason) {
        (Some(r), _) => r.advice().to_string(),
        (None, Some(reason)) => reason.explain(min_altitude),
        (None, None) => String::new(),
    };

    log::debug!(
        "{}: {} samples, best score {:?}",
        request.target.id(),
        timeline.len(),
        best.map(|b| b.quality_score)
    );

    Ok(AstrophotographyResult {
        target_id: request.target.id(),
        target_name: request.target.name().to_string(),
        date: request.date,
        min_altitude_deg: min_altitude,
        max_cloud_cover: request.max_cloud_cover,
        utc_offset_hours: utc_offset,
        night,
        best,
        timeline,
        moon_phase: moon.phase,
        moon_illumination: moon.illumination,
        transit,
        astronomical_night,
        rating,
        recommendation,
        no_imaging_reason,
    })
}
