//! # Sky map renderer
//!
//! Renders the sky above an observer as a PNG image, in an azimuthal-equidistant
//! projection centred on the zenith (North up, East right).
//!
//! ## Overview
//!
//! * Catalog stars with `magnitude ≤ max_magnitude` above `min_altitude` are drawn
//!   as dots whose radius shrinks with magnitude.
//! * Constellation segments are drawn when both endpoint stars are up.
//! * Visible planets are drawn in their colour with a gold rim; the Sun and the Moon
//!   get their own markers, the Moon showing its lit fraction on the correct side.
//! * Named stars brighter than `label_magnitude` and visible planets receive a
//!   marker ring and a text label; the cardinal points are lettered inside the
//!   horizon. Labels are also returned with their pixel positions.
//! * With a [`FieldOfView`], the view zooms onto the projected FOV centre, the FOV
//!   radius filling the image. A FOV centred below the horizon falls back to the
//!   full-sky view.
//! * Planets outside the ephemeris coverage are left out of the map.
//!
//! An empty sky (no star above the horizon) still yields a valid image.
//!
//! ## See also
//! ------------
//! * [`projection`] – Projection and pixel mapping.
//! * [`crate::coordinates::altaz_bulk`] – Horizontal coordinates of the catalog.

pub mod projection;
pub mod render;

use hifitime::Epoch;
use serde::{Deserialize, Serialize};

use crate::cancel::CancelToken;
use crate::catalog::StarCatalog;
use crate::config::SkyPlanConfig;
use crate::constants::Degree;
use crate::coordinates::{EquatorialPosition, HorizonFrame, HorizontalPosition};
use crate::ephemeris::{Body, Ephemeris};
use crate::observers::Observer;
use crate::skyplan_errors::SkyPlanError;

use projection::Viewport;
use render::{star_radius, Canvas};

/// Stars between two cancellation checks.
const CANCEL_CHECK_INTERVAL: usize = 256;

/// Smallest field of view radius, in degrees.
pub const MIN_FOV_RADIUS_DEG: Degree = 0.05;

/// Region of the sky to zoom on, in J2000 coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldOfView {
    pub center_ra_deg: Degree,
    pub center_dec_deg: Degree,
    pub radius_deg: Degree,
}

impl FieldOfView {
    pub fn new(center_ra_deg: Degree, center_dec_deg: Degree, radius_deg: Degree) -> Result<Self, SkyPlanError> {
        let fov = FieldOfView {
            center_ra_deg,
            center_dec_deg,
            radius_deg,
        };
        fov.validate()?;
        Ok(fov)
    }

    pub fn validate(&self) -> Result<(), SkyPlanError> {
        self.center().validate()?;
        SkyPlanError::check_range("fov.radius_deg", self.radius_deg, MIN_FOV_RADIUS_DEG, 90.0)
    }

    fn center(&self) -> EquatorialPosition {
        EquatorialPosition::j2000(self.center_ra_deg, self.center_dec_deg)
    }
}

/// Rendering options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkyMapOptions {
    pub show_constellations: bool,
    pub show_labels: bool,
    pub fov: Option<FieldOfView>,
    pub image_size_px: u32,
    /// Faintest catalog star drawn.
    pub max_magnitude: f64,
    /// Named stars brighter than this are labelled.
    pub label_magnitude: f64,
    /// Altitude above which an object counts as visible.
    pub min_altitude: Degree,
}

impl Default for SkyMapOptions {
    fn default() -> Self {
        SkyMapOptions::from_config(&SkyPlanConfig::default())
    }
}

impl SkyMapOptions {
    pub fn from_config(config: &SkyPlanConfig) -> Self {
        SkyMapOptions {
            show_constellations: true,
            show_labels: true,
            fov: None,
            image_size_px: config.sky_map.image_size_px,
            max_magnitude: config.visibility.max_magnitude,
            label_magnitude: config.visibility.label_magnitude,
            min_altitude: config.visibility.min_altitude,
        }
    }

    pub fn with_fov(mut self, fov: FieldOfView) -> Self {
        self.fov = Some(fov);
        self
    }

    pub fn with_image_size(mut self, size_px: u32) -> Self {
        self.image_size_px = size_px;
        self
    }

    pub fn validate(&self) -> Result<(), SkyPlanError> {
        SkyPlanError::check_range("image_size_px", f64::from(self.image_size_px), 64.0, 8192.0)?;
        SkyPlanError::check_range("max_magnitude", self.max_magnitude, -30.0, 30.0)?;
        SkyPlanError::check_range("label_magnitude", self.label_magnitude, -30.0, 30.0)?;
        SkyPlanError::check_range("min_altitude", self.min_altitude, -90.0, 90.0)?;
        if let Some(fov) = &self.fov {
            fov.validate()?;
        }
        Ok(())
    }
}

/// Label text anchored at a pixel position of the image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapLabel {
    pub text: String,
    pub x: f32,
    pub y: f32,
}

/// A rendered sky map and the figures shown with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkyMap {
    /// PNG-encoded square image.
    pub png: Vec<u8>,
    pub image_size_px: u32,
    /// Catalog stars plotted in the rendered view.
    pub stars_visible: usize,
    pub sun_altitude: Degree,
    pub moon_altitude: Degree,
    pub moon_illumination: f64,
    pub labels: Vec<MapLabel>,
    /// `false` when a requested FOV was below the horizon and the full sky was drawn.
    pub fov_applied: bool,
}

/// Star projected for drawing.
struct PlacedStar<'a> {
    name: Option<&'a str>,
    magnitude: f64,
    pixel: (f32, f32),
}

/// Render the sky seen by `observer` at `epoch`.
///
/// Arguments
/// ---------
/// * `observer`: observing site.
/// * `epoch`: instant of observation.
/// * `catalog`: star and constellation source.
/// * `ephemeris`: Sun, Moon and planet positions.
/// * `options`: what to draw, see [`SkyMapOptions`].
/// * `cancel`: checked while projecting stars and before encoding.
///
/// Return
/// ------
/// * The PNG image and its figures.
///
/// Errors
/// ------
/// * [`SkyPlanError::OutOfRange`] for invalid options.
/// * [`SkyPlanError::DataUnavailable`] when the Sun or Moon position cannot be computed.
/// * [`SkyPlanError::Cancelled`] when `cancel` trips.
pub fn render_sky(
    observer: &Observer,
    epoch: &Epoch,
    catalog: &dyn StarCatalog,
    ephemeris: &dyn Ephemeris,
    options: &SkyMapOptions,
    cancel: &CancelToken,
) -> Result<SkyMap, SkyPlanError> {
    options.validate()?;

    let frame = HorizonFrame::new(observer, epoch);
    let is_up = |p: &HorizontalPosition| p.is_visible(options.min_altitude);

    let (viewport, fov_center) = match &options.fov {
        Some(fov) => {
            let center = frame.altaz(&fov.center())?;
            if center.is_above_horizon() {
                let projected = projection::project(&center);
                (
                    Viewport::zoomed(options.image_size_px, projected, fov.radius_deg),
                    Some(projected),
                )
            } else {
                log::warn!(
                    "FOV centre at altitude {:.1}° is below the horizon, rendering the full sky",
                    center.altitude_deg
                );
                (Viewport::full_sky(options.image_size_px), None)
            }
        }
        None => (Viewport::full_sky(options.image_size_px), None),
    };
    let scale_factor = options.image_size_px as f32 / 1024.0;
    let margin = 20.0 * scale_factor;

    let mut canvas = Canvas::new(viewport);
    canvas.draw_grid();

    if options.show_constellations {
        for line in catalog.constellation_lines() {
            let (Some(a), Some(b)) = (catalog.find_by_id(&line.from_id), catalog.find_by_id(&line.to_id))
            else {
                continue;
            };
            let (pa, pb) = (frame.altaz(&a.position())?, frame.altaz(&b.position())?);
            if is_up(&pa) && is_up(&pb) {
                canvas.draw_segment(viewport.place(&pa), viewport.place(&pb));
            }
        }
    }

    let mut placed = Vec::new();
    for (i, star) in catalog.stars_brighter_than(options.max_magnitude).into_iter().enumerate() {
        if i % CANCEL_CHECK_INTERVAL == 0 {
            cancel.check()?;
        }
        let position = frame.altaz(&star.position())?;
        if !is_up(&position) {
            continue;
        }
        let pixel = viewport.place(&position);
        if viewport.contains(pixel, margin) {
            placed.push(PlacedStar {
                name: star.name.as_deref(),
                magnitude: star.magnitude,
                pixel,
            });
        }
    }

    // Faint stars first so bright ones stay on top
    let mut labels = Vec::new();
    for star in placed.iter().rev() {
        canvas.draw_star(star.pixel, star.magnitude);
    }
    if options.show_labels {
        for star in &placed {
            let Some(name) = star.name else { continue };
            if star.magnitude < options.label_magnitude {
                let radius = star_radius(star.magnitude, options.image_size_px);
                canvas.draw_label_marker(star.pixel, radius);
                labels.push(MapLabel {
                    text: name.to_string(),
                    x: star.pixel.0,
                    y: star.pixel.1 - radius - 4.0,
                });
            }
        }
    }

    for planet in Body::PLANETS {
        let equatorial = match ephemeris.position(planet, epoch) {
            Ok(position) => position,
            Err(SkyPlanError::DataUnavailable(reason)) => {
                log::debug!("{} left out of the sky map: {reason}", planet.name());
                continue;
            }
            Err(err) => return Err(err),
        };
        let position = frame.altaz(&equatorial)?;
        let pixel = viewport.place(&position);
        if !is_up(&position) || !viewport.contains(pixel, margin) {
            continue;
        }
        canvas.draw_planet(pixel, planet.color());
        if options.show_labels {
            labels.push(MapLabel {
                text: planet.name().to_string(),
                x: pixel.0,
                y: pixel.1 - 12.0 * scale_factor,
            });
        }
    }

    for label in &labels {
        canvas.draw_label(&label.text, (label.x, label.y));
    }

    let sun = frame.altaz(&ephemeris.position(Body::Sun, epoch)?)?;
    let moon = frame.altaz(&ephemeris.position(Body::Moon, epoch)?)?;
    let lunar_phase = ephemeris.lunar_phase(epoch)?;

    if sun.is_above_horizon() {
        canvas.draw_sun(viewport.place(&sun));
    }
    if moon.is_above_horizon() {
        canvas.draw_moon(viewport.place(&moon), &lunar_phase);
    }
    if let (Some(center), Some(fov)) = (fov_center, &options.fov) {
        canvas.draw_fov(viewport.to_pixel(center), (fov.radius_deg * viewport.scale()) as f32);
    }

    cancel.check()?;
    let png = canvas.encode_png()?;
    let stars_visible = placed.len();

    log::debug!(
        "sky map rendered: {stars_visible} stars drawn, {} labels, {} bytes",
        labels.len(),
        png.len()
    );

    Ok(SkyMap {
        png,
        image_size_px: options.image_size_px,
        stars_visible,
        sun_altitude: sun.altitude_deg,
        moon_altitude: moon.altitude_deg,
        moon_illumination: lunar_phase.illumination,
        labels,
        fov_applied: fov_center.is_some(),
    })
}

#[cfg(test)]
mod sky_map_test {
    use super::*;
    use crate::catalog::{CelestialObject, InMemoryCatalog};
    use crate::ephemeris::AnalyticEphemeris;
    use crate::unit_test_global::BUILTIN_STARS;

    fn paris() -> Observer {
        Observer::new(48.8566, 2.3522, 35.0, Some("Paris".into())).unwrap()
    }

    fn winter_evening() -> Epoch {
        Epoch::from_gregorian_utc(2024, 1, 15, 21, 0, 0, 0)
    }

    fn small_options() -> SkyMapOptions {
        SkyMapOptions::default().with_image_size(256)
    }

    #[test]
    fn test_builtin_catalog_render() {
        let catalog = &*BUILTIN_STARS;
        let map = render_sky(
            &paris(),
            &winter_evening(),
            catalog,
            &AnalyticEphemeris,
            &small_options(),
            &CancelToken::new(),
        )
        .unwrap();

        assert_eq!(&map.png[..4], b"\x89PNG");
        assert!(map.stars_visible > 10);
        assert!(map.sun_altitude < -18.0);
        // Sirius and Betelgeuse are up on a January evening
        assert!(map.labels.iter().any(|l| l.text == "Sirius"));
        assert!(map.labels.iter().any(|l| l.text == "Betelgeuse"));
        assert!((0.0..=1.0).contains(&map.moon_illumination));
        assert!(!map.fov_applied);
    }

    #[test]
    fn test_empty_catalog_still_renders() {
        let catalog = InMemoryCatalog::new(Vec::new(), Vec::new());
        let map = render_sky(
            &paris(),
            &winter_evening(),
            &catalog,
            &AnalyticEphemeris,
            &small_options(),
            &CancelToken::new(),
        )
        .unwrap();
        assert_eq!(map.stars_visible, 0);
        assert!(!map.png.is_empty());
    }

    #[test]
    fn test_labels_respect_threshold_and_flag() {
        let stars = vec![
            CelestialObject {
                id: "A".into(),
                name: Some("Bright".into()),
                ra_deg: 0.0,
                dec_deg: 89.0,
                magnitude: 1.0,
                distance_pc: None,
            },
            CelestialObject {
                id: "B".into(),
                name: Some("Faint".into()),
                ra_deg: 90.0,
                dec_deg: 88.0,
                magnitude: 3.0,
                distance_pc: None,
            },
        ];
        let catalog = InMemoryCatalog::new(stars, Vec::new());

        let map = render_sky(
            &paris(),
            &winter_evening(),
            &catalog,
            &AnalyticEphemeris,
            &small_options(),
            &CancelToken::new(),
        )
        .unwrap();
        assert_eq!(map.stars_visible, 2);
        assert!(map.labels.iter().any(|l| l.text == "Bright"));
        assert!(!map.labels.iter().any(|l| l.text == "Faint"));

        let mut quiet = small_options();
        quiet.show_labels = false;
        let map = render_sky(&paris(), &winter_evening(), &catalog, &AnalyticEphemeris, &quiet, &CancelToken::new())
            .unwrap();
        assert!(map.labels.is_empty());
    }

    #[test]
    fn test_fov_below_horizon_falls_back() {
        let catalog = &*BUILTIN_STARS;
        // South celestial pole never rises at Paris
        let options = small_options().with_fov(FieldOfView::new(0.0, -89.0, 10.0).unwrap());
        let map = render_sky(&paris(), &winter_evening(), catalog, &AnalyticEphemeris, &options, &CancelToken::new())
            .unwrap();
        assert!(!map.fov_applied);

        let polaris_fov = small_options().with_fov(FieldOfView::new(37.95, 89.26, 15.0).unwrap());
        let map = render_sky(&paris(), &winter_evening(), catalog, &AnalyticEphemeris, &polaris_fov, &CancelToken::new())
            .unwrap();
        assert!(map.fov_applied);
        // No other catalog star lies within 25° of the pole
        assert_eq!(map.stars_visible, 1);
    }

    #[test]
    fn test_narrowest_fov() {
        let catalog = &*BUILTIN_STARS;
        assert!(matches!(
            FieldOfView::new(37.95, 89.26, 0.01),
            Err(SkyPlanError::OutOfRange { field: "fov.radius_deg", .. })
        ));
        assert!(matches!(
            FieldOfView::new(37.95, 89.26, 1e-6),
            Err(SkyPlanError::OutOfRange { field: "fov.radius_deg", .. })
        ));

        let options = SkyMapOptions::default()
            .with_image_size(1024)
            .with_fov(FieldOfView::new(37.95, 89.26, MIN_FOV_RADIUS_DEG).unwrap());
        let map = render_sky(&paris(), &winter_evening(), catalog, &AnalyticEphemeris, &options, &CancelToken::new())
            .unwrap();
        assert!(map.fov_applied);
        assert_eq!(&map.png[..4], b"\x89PNG");
        assert_eq!(map.stars_visible, 1);
    }

    #[test]
    fn test_render_beyond_planet_coverage() {
        let catalog = &*BUILTIN_STARS;
        let epoch = Epoch::from_gregorian_utc(2060, 1, 15, 21, 0, 0, 0);
        let map = render_sky(&paris(), &epoch, catalog, &AnalyticEphemeris, &small_options(), &CancelToken::new())
            .unwrap();
        assert!(map.stars_visible > 10);
        assert!(map.labels.iter().any(|l| l.text == "Sirius"));
        assert!(!map.labels.iter().any(|l| Body::PLANETS.iter().any(|p| p.name() == l.text)));
    }

    #[test]
    fn test_labels_are_drawn_into_the_image() {
        let catalog = &*BUILTIN_STARS;
        let render = |show_labels: bool| {
            let mut options = small_options();
            options.show_labels = show_labels;
            let map = render_sky(&paris(), &winter_evening(), catalog, &AnalyticEphemeris, &options, &CancelToken::new())
                .unwrap();
            image::load_from_memory(&map.png).unwrap().to_rgb8()
        };
        let (plain, labelled) = (render(false), render(true));
        let differing = plain
            .pixels()
            .zip(labelled.pixels())
            .filter(|(a, b)| a != b)
            .count();
        assert!(differing > 100);
    }

    #[test]
    fn test_invalid_options_and_cancel() {
        let catalog = &*BUILTIN_STARS;
        assert!(FieldOfView::new(400.0, 0.0, 10.0).is_err());
        assert!(FieldOfView::new(10.0, 0.0, 0.0).is_err());

        let tiny = SkyMapOptions::default().with_image_size(8);
        assert!(matches!(
            render_sky(&paris(), &winter_evening(), catalog, &AnalyticEphemeris, &tiny, &CancelToken::new()),
            Err(SkyPlanError::OutOfRange { field: "image_size_px", .. })
        ));

        let token = CancelToken::new();
        token.cancel();
        assert_eq!(
            render_sky(&paris(), &winter_evening(), catalog, &AnalyticEphemeris, &small_options(), &token),
            Err(SkyPlanError::Cancelled)
        );
    }
}
