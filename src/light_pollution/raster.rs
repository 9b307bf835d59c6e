//! # Night-time radiance raster
//!
//! Single-band GeoTIFF of upward radiance (nW·cm⁻²·sr⁻¹), e.g. the VIIRS
//! Nighttime Lights annual composites, held in memory as `f32`.
//!
//! ## Georeferencing
//!
//! Pixel ↔ geographic mapping comes from the GeoTIFF tags:
//!
//! * `ModelPixelScaleTag` (33550) + `ModelTiepointTag` (33922), the common north-up
//!   layout, or
//! * `ModelTransformationTag` (34264), a full affine matrix.
//!
//! Both are reduced to a six-coefficient affine [`GeoTransform`]:
//!
//! ```text
//! lon = c0 + c1 · col + c2 · row
//! lat = c3 + c4 · col + c5 · row
//! ```
//!
//! Coordinates refer to pixel corners (PixelIsArea); a lookup takes the pixel
//! whose area contains the coordinate.

use std::fs::File;
use std::io::BufReader;

use camino::Utf8Path;
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::tags::Tag;

use crate::constants::{Degree, Radiance};
use crate::skyplan_errors::SkyPlanError;

const MODEL_PIXEL_SCALE: u16 = 33550;
const MODEL_TIEPOINT: u16 = 33922;
const MODEL_TRANSFORMATION: u16 = 34264;

/// Affine pixel → (lon, lat) mapping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    coefficients: [f64; 6],
}

impl GeoTransform {
    /// North-up transform from the top-left corner and the pixel size in degrees.
    pub fn north_up(origin_lon: Degree, origin_lat: Degree, pixel_width: Degree, pixel_height: Degree) -> Self {
        GeoTransform {
            coefficients: [origin_lon, pixel_width, 0.0, origin_lat, 0.0, -pixel_height.abs()],
        }
    }

    /// From `ModelPixelScale = [sx, sy, sz]` and `ModelTiepoint = [i, j, k, x, y, z]`.
    fn from_scale_and_tiepoint(scale: &[f64], tiepoint: &[f64]) -> Result<Self, SkyPlanError> {
        if scale.len() < 2 || tiepoint.len() < 6 {
            return Err(SkyPlanError::DataUnavailable(
                "malformed ModelPixelScale / ModelTiepoint tags".into(),
            ));
        }
        let (sx, sy) = (scale[0], scale[1]);
        let (i, j, x, y) = (tiepoint[0], tiepoint[1], tiepoint[3], tiepoint[4]);
        Ok(GeoTransform {
            coefficients: [x - i * sx, sx, 0.0, y + j * sy, 0.0, -sy],
        })
    }

    /// From a row-major 4×4 `ModelTransformation` matrix.
    fn from_matrix(matrix: &[f64]) -> Result<Self, SkyPlanError> {
        if matrix.len() < 8 {
            return Err(SkyPlanError::DataUnavailable(
                "malformed ModelTransformation tag".into(),
            ));
        }
        Ok(GeoTransform {
            coefficients: [matrix[3], matrix[0], matrix[1], matrix[7], matrix[4], matrix[5]],
        })
    }

    /// Geographic coordinate of the top-left corner of pixel `(col, row)`.
    pub fn pixel_to_geo(&self, col: f64, row: f64) -> (Degree, Degree) {
        let c = &self.coefficients;
        (c[0] + c[1] * col + c[2] * row, c[3] + c[4] * col + c[5] * row)
    }

    /// Fractional pixel coordinate `(col, row)` of a geographic coordinate, or
    /// `None` for a degenerate transform.
    pub fn geo_to_pixel(&self, lon: Degree, lat: Degree) -> Option<(f64, f64)> {
        let c = &self.coefficients;
        let det = c[1] * c[5] - c[2] * c[4];
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        let (dx, dy) = (lon - c[0], lat - c[3]);
        let col = (c[5] * dx - c[2] * dy) / det;
        let row = (c[1] * dy - c[4] * dx) / det;
        Some((col, row))
    }
}

/// Radiance grid with its georeferencing.
#[derive(Debug, Clone)]
pub struct RadianceRaster {
    width: usize,
    height: usize,
    data: Vec<f32>,
    transform: GeoTransform,
}

impl RadianceRaster {
    /// Build a raster from row-major samples.
    ///
    /// Errors
    /// ------
    /// * [`SkyPlanError::InvalidInput`] if `data.len() != width * height`.
    pub fn from_parts(
        width: usize,
        height: usize,
        data: Vec<f32>,
        transform: GeoTransform,
    ) -> Result<Self, SkyPlanError> {
        if width == 0 || height == 0 || data.len() != width * height {
            return Err(SkyPlanError::InvalidInput(format!(
                "raster of {width}x{height} pixels cannot hold {} samples",
                data.len()
            )));
        }
        Ok(RadianceRaster {
            width,
            height,
            data,
            transform,
        })
    }

    /// Read the first band of a GeoTIFF.
    ///
    /// Errors
    /// ------
    /// * `IoError` / `TiffError` if the file cannot be opened or decoded.
    /// * `DataUnavailable` if the georeferencing tags are missing or the sample
    ///   format is not supported.
    pub fn from_geotiff(path: &Utf8Path) -> Result<Self, SkyPlanError> {
        let file = BufReader::new(File::open(path)?);
        let mut decoder = Decoder::new(file)?.with_limits(Limits::unlimited());

        let (width, height) = decoder.dimensions()?;
        let transform = read_geotransform(&mut decoder)?;

        let samples: Vec<f32> = match decoder.read_image()? {
            DecodingResult::F32(buf) => buf,
            DecodingResult::F64(buf) => buf.into_iter().map(|v| v as f32).collect(),
            DecodingResult::U8(buf) => buf.into_iter().map(f32::from).collect(),
            DecodingResult::U16(buf) => buf.into_iter().map(f32::from).collect(),
            DecodingResult::U32(buf) => buf.into_iter().map(|v| v as f32).collect(),
            DecodingResult::I16(buf) => buf.into_iter().map(f32::from).collect(),
            DecodingResult::I32(buf) => buf.into_iter().map(|v| v as f32).collect(),
            _ => {
                return Err(SkyPlanError::DataUnavailable(format!(
                    "unsupported sample format in {path}"
                )))
            }
        };

        let (width, height) = (width as usize, height as usize);
        // Multi-band files are interleaved: keep the first band
        let bands = samples.len() / (width * height).max(1);
        let data = if bands > 1 {
            samples.into_iter().step_by(bands).collect()
        } else {
            samples
        };

        let raster = RadianceRaster::from_parts(width, height, data, transform)?;
        log::info!("radiance raster loaded from {path}: {width}x{height} pixels");
        Ok(raster)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    /// Pixel `(col, row)` containing a geographic coordinate, if inside the raster.
    pub fn pixel_of(&self, lat: Degree, lon: Degree) -> Option<(usize, usize)> {
        let (col, row) = self.transform.geo_to_pixel(lon, lat)?;
        let (col, row) = (col.floor(), row.floor());
        if !(0.0..self.width as f64).contains(&col) || !(0.0..self.height as f64).contains(&row) {
            return None;
        }
        Some((col as usize, row as usize))
    }

    /// Raw sample at a pixel.
    fn sample(&self, col: usize, row: usize) -> f32 {
        self.data[row * self.width + col]
    }

    /// Radiance at a coordinate, nearest neighbour. Negative and no-data samples
    /// read as zero; `None` outside the raster.
    pub fn radiance_at(&self, lat: Degree, lon: Degree) -> Option<Radiance> {
        let (col, row) = self.pixel_of(lat, lon)?;
        Some(clean_radiance(self.sample(col, row)))
    }

    /// Valid (non-negative, finite) samples in the square window of half-size
    /// `radius_px` pixels around a coordinate.
    pub fn window(&self, lat: Degree, lon: Degree, radius_px: usize) -> Option<Vec<Radiance>> {
        let (col, row) = self.pixel_of(lat, lon)?;
        let rows = row.saturating_sub(radius_px)..(row + radius_px).min(self.height);
        let cols = col.saturating_sub(radius_px)..(col + radius_px).min(self.width);

        Some(
            rows.flat_map(|r| cols.clone().map(move |c| (c, r)))
                .map(|(c, r)| self.sample(c, r))
                .filter(|v| v.is_finite() && *v >= 0.0)
                .map(f64::from)
                .collect(),
        )
    }
}

fn clean_radiance(sample: f32) -> Radiance {
    if sample.is_finite() && sample > 0.0 {
        f64::from(sample)
    } else {
        0.0
    }
}

fn read_f64_tag<R>(decoder: &mut Decoder<R>, code: u16) -> Result<Option<Vec<f64>>, SkyPlanError>
where
    R: std::io::Read + std::io::Seek,
{
    // Decoded directories key tags by their named variant when one exists
    let tag = Tag::from_u16_exhaustive(code);
    Ok(decoder
        .find_tag(tag)?
        .map(|value| value.into_f64_vec())
        .transpose()?)
}

fn read_geotransform<R>(decoder: &mut Decoder<R>) -> Result<GeoTransform, SkyPlanError>
where
    R: std::io::Read + std::io::Seek,
{
    if let Some(matrix) = read_f64_tag(decoder, MODEL_TRANSFORMATION)? {
        return GeoTransform::from_matrix(&matrix);
    }
    match (
        read_f64_tag(decoder, MODEL_PIXEL_SCALE)?,
        read_f64_tag(decoder, MODEL_TIEPOINT)?,
    ) {
        (Some(scale), Some(tiepoint)) => GeoTransform::from_scale_and_tiepoint(&scale, &tiepoint),
        _ => Err(SkyPlanError::DataUnavailable(
            "raster has no GeoTIFF georeferencing tags".into(),
        )),
    }
}

#[cfg(test)]
mod raster_test {
    use super::*;
    use approx::assert_relative_eq;
    use tiff::encoder::{colortype, TiffEncoder};

    fn world_raster() -> RadianceRaster {
        // 4x2 pixels of 90°x90°
        let data = vec![0.05, 1.0, 5.0, -3.0, 30.0, f32::NAN, 0.5, 12.0];
        RadianceRaster::from_parts(4, 2, data, GeoTransform::north_up(-180.0, 90.0, 90.0, 90.0)).unwrap()
    }

    #[test]
    fn test_geo_transform_roundtrip() {
        let gt = GeoTransform::north_up(-10.0, 50.0, 0.5, 0.25);
        let (col, row) = gt.geo_to_pixel(-7.5, 49.0).unwrap();
        assert_relative_eq!(col, 5.0);
        assert_relative_eq!(row, 4.0);
        let (lon, lat) = gt.pixel_to_geo(col, row);
        assert_relative_eq!(lon, -7.5);
        assert_relative_eq!(lat, 49.0);
    }

    #[test]
    fn test_scale_and_tiepoint() {
        let gt = GeoTransform::from_scale_and_tiepoint(
            &[0.5, 0.5, 0.0],
            &[0.0, 0.0, 0.0, -180.0, 75.0, 0.0],
        )
        .unwrap();
        assert_eq!(gt, GeoTransform::north_up(-180.0, 75.0, 0.5, 0.5));
        assert!(GeoTransform::from_scale_and_tiepoint(&[0.5], &[0.0; 6]).is_err());
    }

    #[test]
    fn test_lookup() {
        let raster = world_raster();
        assert_eq!(raster.pixel_of(45.0, -135.0), Some((0, 0)));
        assert_eq!(raster.pixel_of(-45.0, 135.0), Some((3, 1)));
        assert_relative_eq!(raster.radiance_at(45.0, -135.0).unwrap(), 0.05, epsilon = 1e-6);
        assert_relative_eq!(raster.radiance_at(10.0, 100.0).unwrap(), 0.0);
        assert_relative_eq!(raster.radiance_at(-10.0, -80.0).unwrap(), 0.0);
        assert_eq!(raster.radiance_at(0.0, 200.0), None);
    }

    #[test]
    fn test_window_skips_invalid_samples() {
        let raster = world_raster();
        let values = raster.window(-45.0, -45.0, 2).unwrap();
        // rows 0..2, cols 0..3 minus the NaN sample
        assert_eq!(values.len(), 5);
        assert!(values.iter().all(|v| *v >= 0.0));
    }

    #[test]
    fn test_from_parts_rejects_mismatch() {
        assert!(matches!(
            RadianceRaster::from_parts(3, 3, vec![0.0; 8], GeoTransform::north_up(0.0, 0.0, 1.0, 1.0)),
            Err(SkyPlanError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_read_geotiff() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("radiance.tif");
        {
            let file = File::create(&path).unwrap();
            let mut tiff = TiffEncoder::new(file).unwrap();
            let mut image = tiff.new_image::<colortype::Gray32Float>(3, 2).unwrap();
            image
                .encoder()
                .write_tag(Tag::from_u16_exhaustive(MODEL_PIXEL_SCALE), &[1.0f64, 1.0, 0.0][..])
                .unwrap();
            image
                .encoder()
                .write_tag(
                    Tag::from_u16_exhaustive(MODEL_TIEPOINT),
                    &[0.0f64, 0.0, 0.0, 2.0, 48.0, 0.0][..],
                )
                .unwrap();
            image
                .write_data(&[0.1f32, 0.2, 0.3, 40.0, 50.0, 60.0])
                .unwrap();
        }

        let raster = RadianceRaster::from_geotiff(Utf8Path::from_path(&path).unwrap()).unwrap();
        assert_eq!((raster.width(), raster.height()), (3, 2));
        assert_relative_eq!(raster.radiance_at(46.5, 3.5).unwrap(), 50.0);
        assert_relative_eq!(raster.radiance_at(47.5, 3.5).unwrap(), 0.2, epsilon = 1e-6);
        assert_relative_eq!(raster.radiance_at(47.9, 2.1).unwrap(), 0.1, epsilon = 1e-6);
        assert_eq!(raster.radiance_at(45.0, 3.5), None);
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            RadianceRaster::from_geotiff(Utf8Path::new("/nonexistent/viirs.tif")),
            Err(SkyPlanError::IoError(_))
        ));
    }
}
