//! Azimuthal-equidistant projection of the local sky.
//!
//! The zenith sits at the origin and the radial distance is the zenith distance
//! `r = 90° − altitude`, so the horizon is the circle `r = 90`. The angle is the
//! azimuth measured from North through East, with North up and East right:
//!
//! ```text
//! x =  r · sin(az)
//! y =  r · cos(az)
//! ```
//!
//! [`Viewport`] maps those projection-plane degrees onto image pixels (y grows
//! downward in the image).

use crate::constants::{Degree, RADEG};
use crate::coordinates::HorizontalPosition;

/// Half-width of the full-sky view in projection degrees, leaving a margin
/// outside the horizon for the cardinal ticks.
pub const FULL_SKY_HALF_WIDTH: Degree = 95.0;

/// Projection-plane coordinates (degrees) of a horizontal position.
pub fn project(position: &HorizontalPosition) -> (f64, f64) {
    let r = 90.0 - position.altitude_deg;
    let az = position.azimuth_deg * RADEG;
    (r * az.sin(), r * az.cos())
}

/// Mapping from the projection plane to the pixels of a square image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    size_px: u32,
    /// Projection-plane point at the image centre.
    center: (f64, f64),
    /// Pixels per projection degree.
    scale: f64,
}

impl Viewport {
    /// Whole hemisphere, zenith at the image centre.
    pub fn full_sky(size_px: u32) -> Self {
        Viewport {
            size_px,
            center: (0.0, 0.0),
            scale: f64::from(size_px) / 2.0 / FULL_SKY_HALF_WIDTH,
        }
    }

    /// Zoom on a projected point so that `radius_deg` fills half the image.
    pub fn zoomed(size_px: u32, center: (f64, f64), radius_deg: Degree) -> Self {
        Viewport {
            size_px,
            center,
            scale: f64::from(size_px) / 2.0 / radius_deg,
        }
    }

    pub fn size_px(&self) -> u32 {
        self.size_px
    }

    /// Pixels per projection degree.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Pixel position of a projection-plane point.
    pub fn to_pixel(&self, point: (f64, f64)) -> (f32, f32) {
        let half = f64::from(self.size_px) / 2.0;
        (
            (half + (point.0 - self.center.0) * self.scale) as f32,
            (half - (point.1 - self.center.1) * self.scale) as f32,
        )
    }

    /// Pixel position of a horizontal position.
    pub fn place(&self, position: &HorizontalPosition) -> (f32, f32) {
        self.to_pixel(project(position))
    }

    /// Whether a pixel position falls inside the image, with a margin.
    pub fn contains(&self, pixel: (f32, f32), margin: f32) -> bool {
        let size = self.size_px as f32;
        (-margin..size + margin).contains(&pixel.0) && (-margin..size + margin).contains(&pixel.1)
    }
}

#[cfg(test)]
mod projection_test {
    use super::*;
    use approx::assert_relative_eq;

    fn hp(altitude_deg: f64, azimuth_deg: f64) -> HorizontalPosition {
        HorizontalPosition {
            altitude_deg,
            azimuth_deg,
        }
    }

    #[test]
    fn test_project_cardinal_points() {
        let (x, y) = project(&hp(90.0, 123.0));
        assert_relative_eq!(x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(y, 0.0, epsilon = 1e-12);

        let (x, y) = project(&hp(0.0, 0.0));
        assert_relative_eq!(x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(y, 90.0);

        let (x, y) = project(&hp(30.0, 90.0));
        assert_relative_eq!(x, 60.0);
        assert_relative_eq!(y, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_full_sky_viewport() {
        let vp = Viewport::full_sky(1000);
        let (px, py) = vp.place(&hp(90.0, 0.0));
        assert_relative_eq!(px, 500.0);
        assert_relative_eq!(py, 500.0);

        // North up, East right
        let (_, north_y) = vp.place(&hp(0.0, 0.0));
        let (east_x, _) = vp.place(&hp(0.0, 90.0));
        assert!(north_y < 500.0);
        assert!(east_x > 500.0);
        assert_relative_eq!(500.0 - north_y, 90.0 * 500.0 / 95.0, epsilon = 1e-3);
        assert!(vp.contains((east_x, 500.0), 0.0));
    }

    #[test]
    fn test_zoomed_viewport() {
        let vp = Viewport::zoomed(800, (30.0, -10.0), 20.0);
        assert_relative_eq!(vp.scale(), 20.0);
        let (px, py) = vp.to_pixel((30.0, -10.0));
        assert_relative_eq!(px, 400.0);
        assert_relative_eq!(py, 400.0);
        let (px, _) = vp.to_pixel((50.0, -10.0));
        assert_relative_eq!(px, 800.0);
        assert!(!vp.contains(vp.to_pixel((0.0, 0.0)), 10.0));
    }
}
