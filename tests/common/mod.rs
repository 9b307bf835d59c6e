#![allow(dead_code)]

use std::fs::File;
use std::path::Path;

use hifitime::Epoch;
use skyplan::observers::Observer;
use skyplan::time::CalendarDate;
use tiff::encoder::{colortype, TiffEncoder};
use tiff::tags::Tag;

pub const PARIS: (f64, f64) = (48.8566, 2.3522);
pub const MADRID: (f64, f64) = (40.4168, -3.7038);
pub const TROMSO: (f64, f64) = (69.6492, 18.9553);

pub fn observer(site: (f64, f64)) -> Observer {
    Observer::at_sea_level(site.0, site.1).unwrap()
}

pub fn date(year: i32, month: u8, day: u8) -> CalendarDate {
    CalendarDate::new(year, month, day).unwrap()
}

pub fn utc(year: i32, month: u8, day: u8, hour: u8, minute: u8) -> Epoch {
    Epoch::from_gregorian_utc_hms(year, month, day, hour, minute, 0)
}

/// Hours elapsed since 00:00 UTC of `day`.
pub fn utc_hours(epoch: Epoch, day: CalendarDate) -> f64 {
    (epoch - day.midnight_utc()).to_unit(hifitime::Unit::Hour)
}

/// North-up single-band GeoTIFF with `origin` the (lon, lat) of the upper-left
/// corner and `pixel` the pixel size in degrees.
pub fn write_geotiff(path: &Path, width: u32, height: u32, origin: (f64, f64), pixel: f64, data: &[f32]) {
    let file = File::create(path).unwrap();
    let mut tiff = TiffEncoder::new(file).unwrap();
    let mut image = tiff.new_image::<colortype::Gray32Float>(width, height).unwrap();
    image
        .encoder()
        .write_tag(Tag::from_u16_exhaustive(33550), &[pixel, pixel, 0.0][..])
        .unwrap();
    image
        .encoder()
        .write_tag(
            Tag::from_u16_exhaustive(33922),
            &[0.0, 0.0, 0.0, origin.0, origin.1, 0.0][..],
        )
        .unwrap();
    image.write_data(data).unwrap();
}
