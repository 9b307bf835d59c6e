use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SkyPlanError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{field} = {value} is out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Data unavailable: {0}")]
    DataUnavailable(String),

    #[error("Target not found in catalog: {0}")]
    TargetNotFound(String),

    #[error("Computation cancelled")]
    Cancelled,

    #[error("Computation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Unable to perform file operation: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("TIFF decoding error: {0}")]
    TiffError(#[from] tiff::TiffError),

    #[error("Image encoding error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Configuration parsing error: {0}")]
    ConfigError(#[from] toml::de::Error),
}

impl SkyPlanError {
    /// Build an [`SkyPlanError::OutOfRange`] if `value` is not a finite number inside
    /// `[min, max]`.
    pub(crate) fn check_range(
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    ) -> Result<(), SkyPlanError> {
        if value.is_finite() && (min..=max).contains(&value) {
            Ok(())
        } else {
            Err(SkyPlanError::OutOfRange {
                field,
                value,
                min,
                max,
            })
        }
    }
}

impl PartialEq for SkyPlanError {
    fn eq(&self, other: &Self) -> bool {
        use SkyPlanError::*;
        match (self, other) {
            (InvalidInput(a), InvalidInput(b)) => a == b,
            (
                OutOfRange {
                    field: fa,
                    value: va,
                    ..
                },
                OutOfRange {
                    field: fb,
                    value: vb,
                    ..
                },
            ) => fa == fb && (va == vb || (va.is_nan() && vb.is_nan())),
            (DataUnavailable(a), DataUnavailable(b)) => a == b,
            (TargetNotFound(a), TargetNotFound(b)) => a == b,
            (Timeout(a), Timeout(b)) => a == b,
            (Cancelled, Cancelled) => true,
            (Internal(a), Internal(b)) => a == b,

            // Wrapped foreign errors are not comparable: same variant is enough
            (IoError(_), IoError(_)) => true,
            (CsvError(_), CsvError(_)) => true,
            (TiffError(_), TiffError(_)) => true,
            (ImageError(_), ImageError(_)) => true,
            (ConfigError(_), ConfigError(_)) => true,

            _ => false,
        }
    }
}
