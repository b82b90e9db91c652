//! Upload size and tessellation parameter bounds.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::AppError;

/// Limits applied to every conversion request before a job is created.
///
/// Deflection is the maximum distance between the true surface and the
/// tessellated mesh; angular deflection is the maximum angle (radians)
/// between adjacent facets approximating a curve.
#[derive(Debug, Clone, Validate, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionLimits {
    /// Maximum accepted input payload in bytes.
    #[validate(range(min = 1))]
    pub max_upload_bytes: u64,

    /// Smallest accepted deflection.
    #[validate(range(exclusive_min = 0.0))]
    pub min_deflection: f64,

    /// Largest accepted deflection.
    #[validate(range(exclusive_min = 0.0))]
    pub max_deflection: f64,

    /// Deflection used when the request does not specify one.
    pub default_deflection: f64,

    /// Smallest accepted angular deflection (radians).
    #[validate(range(exclusive_min = 0.0))]
    pub min_angular_deflection: f64,

    /// Largest accepted angular deflection (radians).
    #[validate(range(exclusive_min = 0.0, max = 3.2))]
    pub max_angular_deflection: f64,

    /// Angular deflection used when the request does not specify one.
    pub default_angular_deflection: f64,
}

impl Default for ConversionLimits {
    fn default() -> Self {
        Self {
            max_upload_bytes: default_max_upload_bytes(),
            min_deflection: 0.001,
            max_deflection: 1.0,
            default_deflection: 0.1,
            min_angular_deflection: 0.1,
            max_angular_deflection: 1.0,
            default_angular_deflection: 0.5,
        }
    }
}

fn default_max_upload_bytes() -> u64 {
    100 * 1024 * 1024
}

impl ConversionLimits {
    /// Check that each `min <= default <= max` chain holds.
    pub fn check_ordering(&self) -> Result<(), AppError> {
        if !(self.min_deflection <= self.default_deflection
            && self.default_deflection <= self.max_deflection)
        {
            return Err(AppError::configuration(format!(
                "deflection bounds out of order: min={} default={} max={}",
                self.min_deflection, self.default_deflection, self.max_deflection
            )));
        }
        if !(self.min_angular_deflection <= self.default_angular_deflection
            && self.default_angular_deflection <= self.max_angular_deflection)
        {
            return Err(AppError::configuration(format!(
                "angular deflection bounds out of order: min={} default={} max={}",
                self.min_angular_deflection,
                self.default_angular_deflection,
                self.max_angular_deflection
            )));
        }
        Ok(())
    }
}
