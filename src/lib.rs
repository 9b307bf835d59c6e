pub mod astrophotography;
pub mod cancel;
pub mod catalog;
pub mod config;
pub mod constants;
pub mod conversion;
pub mod coordinates;
mod earth_orientation;
pub mod ephemeris;
mod kepler;
pub mod light_pollution;
pub mod observers;
pub mod planner;
mod ref_system;
pub mod sky_map;
pub mod skyplan_errors;
pub mod solar_events;
pub mod time;
