//! # SkyPlanner: configuration, ephemeris, catalogs and light pollution
//!
//! [`SkyPlanner`] is the façade that wires together everything a planning request
//! needs:
//!
//! 1. **Configuration** ([`SkyPlanConfig`]), read once at start-up.
//! 2. **Ephemeris** behind the [`Ephemeris`] trait, the built-in analytic theory by
//!    default.
//! 3. **Star catalog** and **target catalog**, read-only after construction.
//! 4. **Light pollution** estimator over the process-wide radiance raster.
//!
//! Every operation exists in a synchronous form, which runs on the caller's thread
//! and takes a [`CancelToken`], and in an `async` form which moves the computation to
//! tokio's blocking pool and bounds it with the configured request timeout. On
//! timeout the token is cancelled, so the blocking task stops at its next check, and
//! [`SkyPlanError::Timeout`] is returned.
//!
//! ## Typical usage
//!
//! ```rust, no_run
//! use skyplan::planner::SkyPlanner;
//! use skyplan::time::CalendarDate;
//!
//! # async fn demo() -> Result<(), skyplan::skyplan_errors::SkyPlanError> {
//! let planner = SkyPlanner::from_default_config()?;
//! let date: CalendarDate = "2024-03-15".parse()?;
//! let result = planner.best_imaging_time_async("M42", 48.85, 2.35, date, None).await?;
//! println!("{}", result.recommendation);
//! # Ok(())
//! # }
//! ```
//!
//! ## See also
//! ------------
//! * [`crate::sky_map::render_sky`] – sky map rendering.
//! * [`crate::astrophotography::best_imaging_time`] – night scoring.
//! * [`crate::solar_events::solar_lunar_events`] – daily events.

use std::sync::Arc;
use std::time::Duration;

use hifitime::Epoch;

use crate::astrophotography::{best_imaging_time, AstrophotographyResult, ImagingRequest};
use crate::cancel::CancelToken;
use crate::catalog::{CelestialObject, InMemoryCatalog, StarCatalog, TargetCatalog};
use crate::config::SkyPlanConfig;
use crate::constants::Degree;
use crate::coordinates::{altaz_bulk, HorizontalPosition};
use crate::ephemeris::{AnalyticEphemeris, Ephemeris};
use crate::light_pollution::{LightPollution, LightPollutionEstimator};
use crate::observers::Observer;
use crate::sky_map::{render_sky, SkyMap, SkyMapOptions};
use crate::skyplan_errors::SkyPlanError;
use crate::solar_events::{solar_lunar_events, DayEvents};
use crate::time::CalendarDate;

/// A catalog star above the horizon.
#[derive(Debug, Clone, PartialEq)]
pub struct VisibleObject {
    pub object: CelestialObject,
    pub position: HorizontalPosition,
}

#[derive(Clone)]
pub struct SkyPlanner {
    config: Arc<SkyPlanConfig>,
    ephemeris: Arc<dyn Ephemeris>,
    stars: Arc<InMemoryCatalog>,
    targets: Arc<TargetCatalog>,
    light_pollution: LightPollutionEstimator,
}

impl std::fmt::Debug for SkyPlanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SkyPlanner")
            .field("config", &self.config)
            .field("stars", &self.stars.len())
            .field("targets", &self.targets.objects().len())
            .field("light_pollution", &self.light_pollution.has_data())
            .finish()
    }
}

impl SkyPlanner {
    /// Planner over the built-in catalogs and the analytic ephemeris.
    ///
    /// Arguments
    /// ---------
    /// * `config`: validated settings; its raster path initialises the process raster
    ///   if nothing did before.
    ///
    /// Errors
    /// ------
    /// * [`SkyPlanError::InvalidInput`] / [`SkyPlanError::OutOfRange`] for an invalid configuration.
    /// * [`SkyPlanError::CsvError`] if a built-in catalog cannot be parsed.
    pub fn new(config: SkyPlanConfig) -> Result<Self, SkyPlanError> {
        config.validate()?;
        let light_pollution = LightPollutionEstimator::shared(config.light_pollution.raster_path.as_deref());
        Ok(SkyPlanner {
            config: Arc::new(config),
            ephemeris: Arc::new(AnalyticEphemeris::new()),
            stars: Arc::new(InMemoryCatalog::builtin()?),
            targets: Arc::new(TargetCatalog::builtin()?),
            light_pollution,
        })
    }

    /// Planner configured from [`SkyPlanConfig::from_default_location`].
    pub fn from_default_config() -> Result<Self, SkyPlanError> {
        SkyPlanner::new(SkyPlanConfig::from_default_location()?)
    }

    pub fn with_ephemeris(mut self, ephemeris: Arc<dyn Ephemeris>) -> Self {
        self.ephemeris = ephemeris;
        self
    }

    pub fn with_star_catalog(mut self, stars: InMemoryCatalog) -> Self {
        self.stars = Arc::new(stars);
        self
    }

    pub fn with_target_catalog(mut self, targets: TargetCatalog) -> Self {
        self.targets = Arc::new(targets);
        self
    }

    pub fn with_light_pollution(mut self, estimator: LightPollutionEstimator) -> Self {
        self.light_pollution = estimator;
        self
    }

    pub fn config(&self) -> &SkyPlanConfig {
        &self.config
    }

    pub fn targets(&self) -> &TargetCatalog {
        &self.targets
    }

    pub fn stars(&self) -> &InMemoryCatalog {
        &self.stars
    }

    /// Sky map options initialised from the configuration.
    pub fn default_map_options(&self) -> SkyMapOptions {
        SkyMapOptions::from_config(&self.config)
    }

    /// Catalog stars down to the configured magnitude that are above the configured
    /// minimum altitude, brightest first.
    pub fn visible_stars(&self, observer: &Observer, epoch: &Epoch) -> Result<Vec<VisibleObject>, SkyPlanError> {
        let visibility = &self.config.visibility;
        let stars = self.stars.stars_brighter_than(visibility.max_magnitude);
        let positions: Vec<_> = stars.iter().map(|s| s.position()).collect();
        let horizontal = altaz_bulk(observer, &positions, epoch)?;

        Ok(stars
            .into_iter()
            .zip(horizontal)
            .filter(|(_, position)| position.is_visible(visibility.min_altitude))
            .map(|(object, position)| VisibleObject {
                object: object.clone(),
                position,
            })
            .collect())
    }

    pub fn render_sky(
        &self,
        observer: &Observer,
        epoch: &Epoch,
        options: &SkyMapOptions,
        cancel: &CancelToken,
    ) -> Result<SkyMap, SkyPlanError> {
        render_sky(observer, epoch, self.stars.as_ref(), self.ephemeris.as_ref(), options, cancel)
    }

    pub fn light_pollution(&self, latitude: Degree, longitude: Degree) -> Result<LightPollution, SkyPlanError> {
        self.light_pollution.estimate(latitude, longitude)
    }

    pub fn light_pollution_estimator(&self) -> &LightPollutionEstimator {
        &self.light_pollution
    }

    /// Best imaging time of a catalog target (id, name or planet).
    ///
    /// Errors
    /// ------
    /// * [`SkyPlanError::TargetNotFound`] for an unknown target.
    /// * see [`best_imaging_time`].
    pub fn best_imaging_time(
        &self,
        target: &str,
        latitude: Degree,
        longitude: Degree,
        date: CalendarDate,
        min_altitude: Option<Degree>,
        cancel: &CancelToken,
    ) -> Result<AstrophotographyResult, SkyPlanError> {
        let mut request = ImagingRequest::new(self.targets.find(target)?, latitude, longitude, date);
        request.min_altitude = min_altitude;
        self.imaging(&request, cancel)
    }

    /// Best imaging time for a fully specified request.
    pub fn imaging(
        &self,
        request: &ImagingRequest,
        cancel: &CancelToken,
    ) -> Result<AstrophotographyResult, SkyPlanError> {
        best_imaging_time(
            request,
            self.ephemeris.as_ref(),
            &self.config.astrophotography,
            cancel,
        )
    }

    pub fn solar_lunar_events(
        &self,
        latitude: Degree,
        longitude: Degree,
        start_date: CalendarDate,
        days: u32,
        cancel: &CancelToken,
    ) -> Result<Vec<DayEvents>, SkyPlanError> {
        solar_lunar_events(
            latitude,
            longitude,
            start_date,
            days,
            self.ephemeris.as_ref(),
            &self.config.events,
            cancel,
        )
    }

    /// Run `job` on the blocking pool, cancelling it after the request timeout.
    async fn run_blocking<T, F>(&self, job: F) -> Result<T, SkyPlanError>
    where
        T: Send + 'static,
        F: FnOnce(SkyPlanner, CancelToken) -> Result<T, SkyPlanError> + Send + 'static,
    {
        let timeout = self.config.request_timeout();
        run_with_timeout(self.clone(), timeout, job).await
    }

    pub async fn render_sky_async(
        &self,
        observer: Observer,
        epoch: Epoch,
        options: SkyMapOptions,
    ) -> Result<SkyMap, SkyPlanError> {
        self.run_blocking(move |planner, cancel| planner.render_sky(&observer, &epoch, &options, &cancel))
            .await
    }

    pub async fn best_imaging_time_async(
        &self,
        target: &str,
        latitude: Degree,
        longitude: Degree,
        date: CalendarDate,
        min_altitude: Option<Degree>,
    ) -> Result<AstrophotographyResult, SkyPlanError> {
        let target = target.to_string();
        self.run_blocking(move |planner, cancel| {
            planner.best_imaging_time(&target, latitude, longitude, date, min_altitude, &cancel)
        })
        .await
    }

    pub async fn solar_lunar_events_async(
        &self,
        latitude: Degree,
        longitude: Degree,
        start_date: CalendarDate,
        days: u32,
    ) -> Result<Vec<DayEvents>, SkyPlanError> {
        self.run_blocking(move |planner, cancel| {
            planner.solar_lunar_events(latitude, longitude, start_date, days, &cancel)
        })
        .await
    }
}

async fn run_with_timeout<T, F>(planner: SkyPlanner, timeout: Duration, job: F) -> Result<T, SkyPlanError>
where
    T: Send + 'static,
    F: FnOnce(SkyPlanner, CancelToken) -> Result<T, SkyPlanError> + Send + 'static,
{
    let cancel = CancelToken::new();
    let worker_token = cancel.clone();
    let handle = tokio::task::spawn_blocking(move || job(planner, worker_token));

    match tokio::time::timeout(timeout, handle).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_error)) => {
            log::error!("planning task failed: {join_error}");
            Err(SkyPlanError::Internal(format!("planning task failed: {join_error}")))
        }
        Err(_) => {
            cancel.cancel();
            log::warn!("request timed out after {timeout:?}");
            Err(SkyPlanError::Timeout(timeout))
        }
    }
}

#[cfg(test)]
mod planner_test {
    use super::*;
    use crate::config::ServiceSettings;

    fn planner() -> SkyPlanner {
        SkyPlanner::new(SkyPlanConfig::default()).unwrap()
    }

    #[test]
    fn test_visible_stars_from_paris() {
        let planner = planner();
        let observer = Observer::at_sea_level(48.8566, 2.3522).unwrap();
        let epoch = Epoch::from_gregorian_utc_hms(2024, 1, 15, 21, 0, 0);
        let visible = planner.visible_stars(&observer, &epoch).unwrap();

        assert!(!visible.is_empty());
        assert!(visible.iter().all(|v| v.position.altitude_deg > 0.0));
        assert!(visible.iter().any(|v| v.object.name.as_deref() == Some("Sirius")));
        assert!(visible
            .windows(2)
            .all(|w| w[0].object.magnitude <= w[1].object.magnitude));
    }

    #[test]
    fn test_unknown_target() {
        let date = CalendarDate::new(2024, 1, 15).unwrap();
        let result = planner().best_imaging_time("M999", 45.0, 0.0, date, None, &CancelToken::new());
        assert_eq!(result, Err(SkyPlanError::TargetNotFound("M999".into())));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_async_events() {
        let date = CalendarDate::new(2024, 3, 20).unwrap();
        let events = planner()
            .solar_lunar_events_async(40.0, -3.7, date, 3)
            .await
            .unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events[2].date, CalendarDate::new(2024, 3, 22).unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_timeout_cancels_the_job() {
        let planner = planner();
        let (tx, rx) = std::sync::mpsc::channel();
        let result: Result<(), _> = run_with_timeout(planner, Duration::from_millis(20), move |_, cancel| {
            while !cancel.is_cancelled() {
                std::thread::sleep(Duration::from_millis(5));
            }
            let _ = tx.send(());
            cancel.check()
        })
        .await;

        assert_eq!(result, Err(SkyPlanError::Timeout(Duration::from_millis(20))));
        assert!(rx.recv_timeout(Duration::from_secs(5)).is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_panicking_job_is_internal_error() {
        let result: Result<(), _> = run_with_timeout(planner(), Duration::from_secs(5), |_, _| {
            panic!("worker exploded");
        })
        .await;
        assert!(matches!(result, Err(SkyPlanError::Internal(_))));
    }

    struct OfflineEphemeris;

    impl Ephemeris for OfflineEphemeris {
        fn position(&self, body: crate::ephemeris::Body, _epoch: &Epoch) -> Result<crate::coordinates::EquatorialPosition, SkyPlanError> {
            Err(SkyPlanError::DataUnavailable(format!("{} offline", body.name())))
        }
    }

    #[test]
    fn test_overridden_components() {
        let targets = TargetCatalog::from_reader(
            "id,name,object_type,ra,dec,magnitude\nNGC7000,North America Nebula,Emission Nebula,20 59 17.1,+44 31 44,4.0\n"
                .as_bytes(),
        )
        .unwrap();
        let planner = planner()
            .with_target_catalog(targets)
            .with_light_pollution(LightPollutionEstimator::new(None))
            .with_ephemeris(Arc::new(OfflineEphemeris));

        assert!(!planner.light_pollution_estimator().has_data());
        assert_eq!(planner.targets().find("north america nebula").unwrap().id(), "NGC7000");
        assert!(matches!(
            planner.targets().find("M42"),
            Err(SkyPlanError::TargetNotFound(_))
        ));

        let observer = Observer::at_sea_level(48.8566, 2.3522).unwrap();
        let epoch = Epoch::from_gregorian_utc_hms(2024, 1, 15, 21, 0, 0);
        let options = planner.default_map_options();
        assert!(matches!(
            planner.render_sky(&observer, &epoch, &options, &CancelToken::new()),
            Err(SkyPlanError::DataUnavailable(_))
        ));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = SkyPlanConfig {
            service: ServiceSettings {
                request_timeout_secs: 0,
            },
            ..SkyPlanConfig::default()
        };
        assert!(matches!(
            SkyPlanner::new(config),
            Err(SkyPlanError::InvalidInput(_))
        ));
    }
}
