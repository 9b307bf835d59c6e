//! # Configuration
//!
//! Runtime settings read from a TOML file. Every field has a default, so an empty
//! file (or no file at all) yields a working configuration.
//!
//! ```toml
//! [visibility]
//! max_magnitude = 6.0      # faintest star drawn on the sky map
//! min_altitude = 0.0       # visibility threshold (degrees)
//! label_magnitude = 1.5    # named stars brighter than this get a label
//!
//! [sky_map]
//! image_size_px = 1024
//!
//! [light_pollution]
//! raster_path = "/data/viirs_2023.tif"
//!
//! [astrophotography]
//! sample_step_minutes = 5
//! default_min_altitude = 30.0
//! weights = { altitude = 0.4, darkness = 0.2, moon_separation = 0.2, moon_altitude = 0.2 }
//!
//! [events]
//! sample_step_minutes = 2
//! max_days = 30
//!
//! [service]
//! request_timeout_secs = 30
//! ```
//!
//! ## Lookup order
//!
//! [`SkyPlanConfig::from_default_location`] reads the file named by `SKYPLAN_CONFIG`,
//! then `skyplan.toml` and `config/skyplan.toml` in the working directory, and falls
//! back to the defaults. `SKYPLAN_VNL_PATH` overrides `light_pollution.raster_path`.

use std::fs;
use std::str::FromStr;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::astrophotography::ScoreWeights;
use crate::skyplan_errors::SkyPlanError;

/// Environment variable naming the configuration file.
pub const CONFIG_ENV_VAR: &str = "SKYPLAN_CONFIG";

/// Environment variable naming the radiance GeoTIFF.
pub const RASTER_ENV_VAR: &str = "SKYPLAN_VNL_PATH";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkyPlanConfig {
    #[serde(default)]
    pub visibility: VisibilitySettings,
    #[serde(default)]
    pub sky_map: SkyMapSettings,
    #[serde(default)]
    pub light_pollution: LightPollutionSettings,
    #[serde(default)]
    pub astrophotography: AstrophotographySettings,
    #[serde(default)]
    pub events: EventSettings,
    #[serde(default)]
    pub service: ServiceSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisibilitySettings {
    #[serde(default = "default_max_magnitude")]
    pub max_magnitude: f64,
    #[serde(default)]
    pub min_altitude: f64,
    #[serde(default = "default_label_magnitude")]
    pub label_magnitude: f64,
}

impl Default for VisibilitySettings {
    fn default() -> Self {
        VisibilitySettings {
            max_magnitude: default_max_magnitude(),
            min_altitude: 0.0,
            label_magnitude: default_label_magnitude(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkyMapSettings {
    #[serde(default = "default_image_size")]
    pub image_size_px: u32,
}

impl Default for SkyMapSettings {
    fn default() -> Self {
        SkyMapSettings {
            image_size_px: default_image_size(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LightPollutionSettings {
    /// GeoTIFF of night-time radiance. Without it every estimate is the fallback.
    #[serde(default)]
    pub raster_path: Option<Utf8PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AstrophotographySettings {
    #[serde(default = "default_astro_step")]
    pub sample_step_minutes: u32,
    #[serde(default = "default_imaging_altitude")]
    pub default_min_altitude: f64,
    #[serde(default)]
    pub weights: ScoreWeights,
}

impl Default for AstrophotographySettings {
    fn default() -> Self {
        AstrophotographySettings {
            sample_step_minutes: default_astro_step(),
            default_min_altitude: default_imaging_altitude(),
            weights: ScoreWeights::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventSettings {
    #[serde(default = "default_events_step")]
    pub sample_step_minutes: u32,
    #[serde(default = "default_max_days")]
    pub max_days: u32,
}

impl Default for EventSettings {
    fn default() -> Self {
        EventSettings {
            sample_step_minutes: default_events_step(),
            max_days: default_max_days(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceSettings {
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        ServiceSettings {
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_max_magnitude() -> f64 {
    6.0
}

fn default_label_magnitude() -> f64 {
    1.5
}

fn default_image_size() -> u32 {
    1024
}

fn default_astro_step() -> u32 {
    5
}

fn default_imaging_altitude() -> f64 {
    30.0
}

fn default_events_step() -> u32 {
    2
}

fn default_max_days() -> u32 {
    30
}

fn default_request_timeout() -> u64 {
    30
}

impl FromStr for SkyPlanConfig {
    type Err = SkyPlanError;

    /// Parse and validate a TOML document.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let config: SkyPlanConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }
}

impl SkyPlanConfig {
    /// Load and validate a configuration file.
    ///
    /// # Errors
    /// * `IoError` if the file cannot be read, `ConfigError` on malformed TOML,
    ///   `InvalidInput` / `OutOfRange` if a value is outside its domain.
    pub fn from_file(path: &Utf8Path) -> Result<Self, SkyPlanError> {
        let content = fs::read_to_string(path)?;
        let config: SkyPlanConfig = content.parse()?;
        log::info!("configuration loaded from {path}");
        Ok(config)
    }

    /// Load from `SKYPLAN_CONFIG` or the standard locations, else defaults, then
    /// apply environment overrides.
    pub fn from_default_location() -> Result<Self, SkyPlanError> {
        let mut config = match std::env::var(CONFIG_ENV_VAR) {
            Ok(path) => Self::from_file(Utf8Path::new(&path))?,
            Err(_) => {
                let search_paths = [
                    Utf8PathBuf::from("skyplan.toml"),
                    Utf8PathBuf::from("config/skyplan.toml"),
                ];
                match search_paths.iter().find(|p| p.exists()) {
                    Some(path) => Self::from_file(path)?,
                    None => {
                        log::debug!("no skyplan.toml found, using default configuration");
                        SkyPlanConfig::default()
                    }
                }
            }
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply `SKYPLAN_VNL_PATH`.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var(RASTER_ENV_VAR) {
            if !path.trim().is_empty() {
                self.light_pollution.raster_path = Some(Utf8PathBuf::from(path));
            }
        }
    }

    /// Check every value against its domain.
    pub fn validate(&self) -> Result<(), SkyPlanError> {
        SkyPlanError::check_range("visibility.max_magnitude", self.visibility.max_magnitude, -30.0, 30.0)?;
        SkyPlanError::check_range("visibility.min_altitude", self.visibility.min_altitude, -90.0, 90.0)?;
        SkyPlanError::check_range(
            "visibility.label_magnitude",
            self.visibility.label_magnitude,
            -30.0,
            30.0,
        )?;
        SkyPlanError::check_range(
            "sky_map.image_size_px",
            self.sky_map.image_size_px as f64,
            64.0,
            8192.0,
        )?;
        SkyPlanError::check_range(
            "astrophotography.sample_step_minutes",
            self.astrophotography.sample_step_minutes as f64,
            1.0,
            60.0,
        )?;
        SkyPlanError::check_range(
            "astrophotography.default_min_altitude",
            self.astrophotography.default_min_altitude,
            0.0,
            90.0,
        )?;
        self.astrophotography.weights.validate()?;
        SkyPlanError::check_range(
            "events.sample_step_minutes",
            self.events.sample_step_minutes as f64,
            1.0,
            30.0,
        )?;
        SkyPlanError::check_range("events.max_days", self.events.max_days as f64, 1.0, 366.0)?;
        if self.service.request_timeout_secs == 0 {
            return Err(SkyPlanError::InvalidInput(
                "service.request_timeout_secs must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.service.request_timeout_secs)
    }
}
