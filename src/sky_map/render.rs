//! Raster drawing of the sky map.
//!
//! Everything is drawn through [`Canvas`], which clips primitives to the image
//! before handing them to `imageproc`: a zoomed view puts the horizon ring and
//! constellation segments millions of pixels away from the image.

use std::io::Cursor;

use ab_glyph::{FontRef, PxScale};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use imageproc::drawing::{
    draw_cross_mut, draw_filled_circle_mut, draw_hollow_circle_mut, draw_line_segment_mut,
    draw_text_mut, text_size,
};
use once_cell::sync::Lazy;

use crate::ephemeris::LunarPhase;
use crate::sky_map::projection::Viewport;
use crate::skyplan_errors::SkyPlanError;

pub mod colors {
    use image::Rgb;

    pub const BACKGROUND: Rgb<u8> = Rgb([10, 10, 10]);
    pub const HORIZON: Rgb<u8> = Rgb([128, 128, 128]);
    pub const ALTITUDE_RING: Rgb<u8> = Rgb([48, 48, 48]);
    pub const CARDINAL: Rgb<u8> = Rgb([200, 200, 200]);
    pub const CONSTELLATION: Rgb<u8> = Rgb([0, 77, 77]);
    pub const LABEL: Rgb<u8> = Rgb([255, 255, 0]);
    pub const PLANET_RIM: Rgb<u8> = Rgb([255, 215, 0]);
    pub const SUN: Rgb<u8> = Rgb([255, 200, 40]);
    pub const MOON_LIT: Rgb<u8> = Rgb([235, 235, 220]);
    pub const MOON_DARK: Rgb<u8> = Rgb([45, 45, 50]);
    pub const FOV: Rgb<u8> = Rgb([220, 40, 40]);
}

/// Dot radius in pixels for a star of magnitude `magnitude` on an image of
/// `size_px` pixels. Non-increasing in magnitude.
pub fn star_radius(magnitude: f64, size_px: u32) -> f32 {
    let scale_factor = f64::from(size_px) / 1024.0;
    (3.0 * 10f64.powf(-0.2 * (magnitude - 1.0)) * scale_factor).clamp(0.5, 10.0) as f32
}

/// Star colour by magnitude, brightest whitest.
fn star_color(magnitude: f64) -> Rgb<u8> {
    match magnitude {
        m if m < 1.0 => Rgb([255, 255, 255]),
        m if m < 2.5 => Rgb([224, 255, 255]),
        m if m < 4.0 => Rgb([176, 196, 222]),
        m if m < 5.5 => Rgb([170, 170, 170]),
        m if m < 7.0 => Rgb([140, 140, 140]),
        _ => Rgb([100, 100, 100]),
    }
}

/// DejaVu Sans, see `data/fonts/LICENSE-DejaVu.txt`.
static LABEL_FONT_DATA: &[u8] = include_bytes!("../../data/fonts/DejaVuSans.ttf");

static LABEL_FONT: Lazy<Option<FontRef<'static>>> = Lazy::new(|| match FontRef::try_from_slice(LABEL_FONT_DATA) {
    Ok(font) => Some(font),
    Err(err) => {
        log::warn!("label font unusable, labels are not rasterized: {err}");
        None
    }
});

/// Label text height on a 1024 px image.
const LABEL_HEIGHT_PX: f32 = 16.0;

/// Cardinal letters and their azimuths.
const CARDINALS: [(&str, f64); 4] = [("N", 0.0), ("E", 90.0), ("S", 180.0), ("W", 270.0)];

fn to_point(pixel: (f32, f32)) -> (i32, i32) {
    (pixel.0.round() as i32, pixel.1.round() as i32)
}

/// Part of the segment `from`-`to` inside the box `[lo, hi]²` (Liang-Barsky).
pub(crate) fn clip_segment(from: (f32, f32), to: (f32, f32), lo: f32, hi: f32) -> Option<((f32, f32), (f32, f32))> {
    let (dx, dy) = (to.0 - from.0, to.1 - from.1);
    let (mut t0, mut t1) = (0.0_f32, 1.0_f32);
    for (p, q) in [
        (-dx, from.0 - lo),
        (dx, hi - from.0),
        (-dy, from.1 - lo),
        (dy, hi - from.1),
    ] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let t = q / p;
        if p < 0.0 {
            t0 = t0.max(t);
        } else {
            t1 = t1.min(t);
        }
        if t0 > t1 {
            return None;
        }
    }
    Some((
        (from.0 + t0 * dx, from.1 + t0 * dy),
        (from.0 + t1 * dx, from.1 + t1 * dy),
    ))
}

pub(crate) struct Canvas {
    image: RgbImage,
    viewport: Viewport,
    scale_factor: f32,
}

impl Canvas {
    pub fn new(viewport: Viewport) -> Self {
        let size = viewport.size_px();
        Canvas {
            image: RgbImage::from_pixel(size, size, colors::BACKGROUND),
            viewport,
            scale_factor: size as f32 / 1024.0,
        }
    }

    fn scaled(&self, px: f32) -> i32 {
        (px * self.scale_factor).round().max(1.0) as i32
    }

    /// Whether a marker of `radius` pixels around `pixel` touches the image.
    fn touches(&self, pixel: (f32, f32), radius: f32) -> bool {
        self.viewport.contains(pixel, radius + 2.0)
    }

    /// Circle of `radius` pixels around `center`, skipped when it misses the image.
    fn draw_ring(&mut self, center: (f32, f32), radius: f64, color: Rgb<u8>) {
        let size = f64::from(self.viewport.size_px());
        let (cx, cy) = (f64::from(center.0), f64::from(center.1));
        let nearest = (0.0_f64.max(-cx).max(cx - size)).hypot(0.0_f64.max(-cy).max(cy - size));
        let farthest = cx.abs().max((cx - size).abs()).hypot(cy.abs().max((cy - size).abs()));
        if !radius.is_finite() || radius + 1.0 < nearest || radius - 1.0 > farthest {
            return;
        }
        draw_hollow_circle_mut(&mut self.image, to_point(center), radius.round() as i32, color);
    }

    /// Line segment clipped to the image.
    fn draw_line(&mut self, from: (f32, f32), to: (f32, f32), color: Rgb<u8>) {
        let size = self.viewport.size_px() as f32;
        if let Some((a, b)) = clip_segment(from, to, -1.0, size + 1.0) {
            draw_line_segment_mut(&mut self.image, a, b, color);
        }
    }

    fn label_scale(&self) -> PxScale {
        PxScale::from((LABEL_HEIGHT_PX * self.scale_factor).max(10.0))
    }

    /// Text with its top-left corner at `origin`.
    fn put_text(&mut self, text: &str, origin: (f32, f32), color: Rgb<u8>) {
        let Some(font) = LABEL_FONT.as_ref() else { return };
        let scale = self.label_scale();
        draw_text_mut(
            &mut self.image,
            color,
            origin.0.round() as i32,
            origin.1.round() as i32,
            scale,
            font,
            text,
        );
    }

    /// Width and height of `text` in pixels.
    fn text_extent(&self, text: &str) -> (f32, f32) {
        LABEL_FONT.as_ref().map_or((0.0, 0.0), |font| {
            let (w, h) = text_size(self.label_scale(), font, text);
            (w as f32, h as f32)
        })
    }

    /// Horizon circle, 30° and 60° altitude rings, cardinal ticks and letters,
    /// and the zenith.
    pub fn draw_grid(&mut self) {
        let zenith = self.viewport.to_pixel((0.0, 0.0));
        let scale = self.viewport.scale();

        for altitude in [30.0, 60.0] {
            self.draw_ring(zenith, (90.0 - altitude) * scale, colors::ALTITUDE_RING);
        }
        let horizon = 90.0 * scale;
        self.draw_ring(zenith, horizon, colors::HORIZON);
        self.draw_ring(zenith, horizon + 1.0, colors::HORIZON);

        // N, NE, E, ... outward from the horizon, main directions longer
        for (i, azimuth) in (0..8).map(|i| (i, f64::from(i) * 45.0)) {
            let outer = if i % 2 == 0 { 95.0 } else { 92.5 };
            let (sin_az, cos_az) = azimuth.to_radians().sin_cos();
            let start = self.viewport.to_pixel((90.0 * sin_az, 90.0 * cos_az));
            let end = self.viewport.to_pixel((outer * sin_az, outer * cos_az));
            self.draw_line(start, end, colors::CARDINAL);
        }

        // Letters just inside the horizon
        for (letter, azimuth) in CARDINALS {
            let (sin_az, cos_az) = azimuth.to_radians().sin_cos();
            let anchor = self.viewport.to_pixel((85.0 * sin_az, 85.0 * cos_az));
            if self.viewport.contains(anchor, 0.0) {
                let (w, h) = self.text_extent(letter);
                self.put_text(letter, (anchor.0 - w / 2.0, anchor.1 - h / 2.0), colors::CARDINAL);
            }
        }

        if self.touches(zenith, 1.0) {
            let center = to_point(zenith);
            draw_cross_mut(&mut self.image, colors::ALTITUDE_RING, center.0, center.1);
        }
    }

    pub fn draw_segment(&mut self, from: (f32, f32), to: (f32, f32)) {
        self.draw_line(from, to, colors::CONSTELLATION);
    }

    /// Label centred horizontally on `anchor.0`, just above `anchor.1`.
    pub fn draw_label(&mut self, text: &str, anchor: (f32, f32)) {
        let (w, h) = self.text_extent(text);
        self.put_text(text, (anchor.0 - w / 2.0, anchor.1 - h), colors::LABEL);
    }

    pub fn draw_star(&mut self, pixel: (f32, f32), magnitude: f64) {
        let radius = star_radius(magnitude, self.viewport.size_px());
        if !self.touches(pixel, radius) {
            return;
        }
        draw_filled_circle_mut(&mut self.image, to_point(pixel), radius.round() as i32, star_color(magnitude));
    }

    pub fn draw_planet(&mut self, pixel: (f32, f32), color: [u8; 3]) {
        let radius = self.scaled(5.0);
        if !self.touches(pixel, (radius + 2) as f32) {
            return;
        }
        let center = to_point(pixel);
        draw_filled_circle_mut(&mut self.image, center, radius, Rgb(color));
        draw_hollow_circle_mut(&mut self.image, center, radius + 1, colors::PLANET_RIM);
        draw_hollow_circle_mut(&mut self.image, center, radius + 2, colors::PLANET_RIM);
    }

    pub fn draw_sun(&mut self, pixel: (f32, f32)) {
        let radius = self.scaled(9.0);
        let halo = radius + self.scaled(3.0);
        if !self.touches(pixel, halo as f32) {
            return;
        }
        let center = to_point(pixel);
        draw_filled_circle_mut(&mut self.image, center, radius, colors::SUN);
        draw_hollow_circle_mut(&mut self.image, center, halo, colors::SUN);
    }

    /// Moon disk with its lit fraction on the sunward side (right when waxing).
    pub fn draw_moon(&mut self, pixel: (f32, f32), phase: &LunarPhase) {
        let radius = self.scaled(8.0);
        if !self.touches(pixel, radius as f32) {
            return;
        }
        let (cx, cy) = to_point(pixel);
        let r = radius as f64;
        // Terminator abscissa, in units of the chord half-width
        let terminator = 1.0 - 2.0 * phase.illumination;
        let side = if phase.waxing { 1.0 } else { -1.0 };

        for dy in -radius..=radius {
            for dx in -radius..=radius {
                let (x, y) = (cx + dx, cy + dy);
                if x < 0 || y < 0 || x as u32 >= self.image.width() || y as u32 >= self.image.height() {
                    continue;
                }
                let (u, v) = (f64::from(dx) / r, f64::from(dy) / r);
                if u * u + v * v > 1.0 {
                    continue;
                }
                let half_width = (1.0 - v * v).sqrt();
                let lit = side * u >= half_width * terminator;
                let color = if lit { colors::MOON_LIT } else { colors::MOON_DARK };
                self.image.put_pixel(x as u32, y as u32, color);
            }
        }
    }

    /// Ring around an object that carries a label.
    pub fn draw_label_marker(&mut self, pixel: (f32, f32), radius: f32) {
        let ring = f64::from(radius.round()) + f64::from(self.scaled(3.0));
        self.draw_ring(pixel, ring, colors::LABEL);
    }

    pub fn draw_fov(&mut self, center: (f32, f32), radius_px: f32) {
        let radius = f64::from(radius_px);
        self.draw_ring(center, radius, colors::FOV);
        self.draw_ring(center, radius - 1.0, colors::FOV);
        if self.touches(center, 1.0) {
            let point = to_point(center);
            draw_cross_mut(&mut self.image, colors::FOV, point.0, point.1);
        }
    }

    pub fn encode_png(self) -> Result<Vec<u8>, SkyPlanError> {
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(self.image).write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
        Ok(bytes)
    }

    #[cfg(test)]
    pub fn pixel(&self, x: u32, y: u32) -> Rgb<u8> {
        *self.image.get_pixel(x, y)
    }
}

#[cfg(test)]
mod render_test {
    use super::*;
    use crate::ephemeris::MoonPhase;

    #[test]
    fn test_star_radius_decreases_with_magnitude() {
        let radii: Vec<f32> = (-2..=8).map(|m| star_radius(f64::from(m), 1024)).collect();
        assert!(radii.windows(2).all(|w| w[0] >= w[1]));
        assert_eq!(star_radius(-10.0, 1024), 10.0);
        assert_eq!(star_radius(12.0, 1024), 0.5);
        assert!(star_radius(2.0, 2048) > star_radius(2.0, 1024));
    }

    fn phase(illumination: f64, waxing: bool) -> LunarPhase {
        LunarPhase {
            illumination,
            elongation_deg: if waxing { 90.0 } else { 270.0 },
            waxing,
            phase: if waxing {
                MoonPhase::FirstQuarter
            } else {
                MoonPhase::LastQuarter
            },
        }
    }

    #[test]
    fn test_moon_lit_side() {
        let mut canvas = Canvas::new(Viewport::full_sky(1024));
        canvas.draw_moon((100.0, 100.0), &phase(0.5, true));
        assert_eq!(canvas.pixel(105, 100), colors::MOON_LIT);
        assert_eq!(canvas.pixel(95, 100), colors::MOON_DARK);

        canvas.draw_moon((200.0, 100.0), &phase(0.5, false));
        assert_eq!(canvas.pixel(205, 100), colors::MOON_DARK);
        assert_eq!(canvas.pixel(195, 100), colors::MOON_LIT);

        canvas.draw_moon((300.0, 100.0), &phase(1.0, true));
        assert_eq!(canvas.pixel(295, 100), colors::MOON_LIT);
        assert_eq!(canvas.pixel(305, 100), colors::MOON_LIT);
    }

    #[test]
    fn test_moon_near_edge_is_clipped() {
        let mut canvas = Canvas::new(Viewport::full_sky(256));
        canvas.draw_moon((0.0, 255.0), &phase(0.3, true));
    }

    #[test]
    fn test_sun_disk_and_halo() {
        let mut canvas = Canvas::new(Viewport::full_sky(1024));
        canvas.draw_sun((200.0, 200.0));
        assert_eq!(canvas.pixel(200, 200), colors::SUN);
        // halo ring at 12 px, gap between disk (9 px) and halo
        assert_eq!(canvas.pixel(212, 200), colors::SUN);
        assert_eq!(canvas.pixel(210, 200), colors::BACKGROUND);
    }

    #[test]
    fn test_clip_segment() {
        let inside = clip_segment((10.0, 10.0), (20.0, 30.0), 0.0, 100.0).unwrap();
        assert_eq!(inside, ((10.0, 10.0), (20.0, 30.0)));

        let ((x0, y0), (x1, y1)) = clip_segment((-1e7, 50.0), (1e7, 50.0), 0.0, 100.0).unwrap();
        assert!((x0 - 0.0).abs() < 1.0 && (x1 - 100.0).abs() < 1.0);
        assert_eq!((y0, y1), (50.0, 50.0));

        assert!(clip_segment((-50.0, -50.0), (-10.0, 500.0), 0.0, 100.0).is_none());
    }

    fn non_background(canvas: &Canvas, x: std::ops::Range<u32>, y: std::ops::Range<u32>) -> usize {
        y.flat_map(|py| x.clone().map(move |px| (px, py)))
            .filter(|&(px, py)| canvas.pixel(px, py) != colors::BACKGROUND)
            .count()
    }

    #[test]
    fn test_label_is_rasterized() {
        let mut canvas = Canvas::new(Viewport::full_sky(256));
        assert_eq!(non_background(&canvas, 78..178, 40..64), 0);
        canvas.draw_label("Betelgeuse", (128.0, 60.0));
        assert!(non_background(&canvas, 78..178, 40..64) > 20);
    }

    #[test]
    fn test_cardinal_letters_drawn() {
        let mut canvas = Canvas::new(Viewport::full_sky(512));
        canvas.draw_grid();
        // North letter sits just inside the top of the horizon, off the ticks
        let scale = Viewport::full_sky(512).scale();
        let letter_y = (256.0 - 85.0 * scale) as u32;
        assert!(non_background(&canvas, 250..263, letter_y - 6..letter_y + 6) > 0);
    }

    #[test]
    fn test_far_away_primitives_are_skipped() {
        // 0.05° view: the horizon ring is millions of pixels wide
        let viewport = Viewport::zoomed(256, (0.0, 40.0), 0.05);
        let mut canvas = Canvas::new(viewport);
        canvas.draw_grid();
        canvas.draw_segment((-5e6, -5e6), (5e6, 5e6));
        canvas.draw_sun((1e9, 1e9));
        canvas.draw_moon((-1e9, 1e9), &phase(0.5, true));
        canvas.draw_planet((f32::MAX, 0.0), [255, 0, 0]);
        canvas.draw_star((-3e38, 0.0), 1.0);
        assert_eq!(canvas.pixel(0, 0), colors::CONSTELLATION);
    }

    #[test]
    fn test_encode_png_signature() {
        let mut canvas = Canvas::new(Viewport::full_sky(128));
        canvas.draw_grid();
        let png = canvas.encode_png().unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    }
}
