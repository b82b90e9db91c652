//! Request validation against the format table and configured limits.
//!
//! Checks run in a fixed order and stop at the first violation. Values are
//! never clamped: an out-of-range deflection is a rejected request, so a
//! given request always produces the same mesh or the same error.

use thiserror::Error;

use meshforge_core::config::ConversionLimits;
use meshforge_core::error::AppError;

use crate::formats::{Direction, FormatRegistry};
use crate::request::ConversionRequest;

/// The first constraint a request violated.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// The input format is unknown or cannot be read.
    #[error("unsupported input format '{0}'")]
    UnsupportedInputFormat(String),

    /// The output format is unknown or cannot be written.
    #[error("unsupported output format '{0}'")]
    UnsupportedOutputFormat(String),

    /// The payload has no bytes.
    #[error("input payload is empty")]
    EmptyPayload,

    /// The payload exceeds the configured size limit.
    #[error("input payload is {size} bytes, maximum is {max}")]
    PayloadTooLarge {
        /// Payload length in bytes.
        size: u64,
        /// Configured maximum in bytes.
        max: u64,
    },

    /// Linear deflection is outside the configured bounds.
    #[error("deflection {value} is outside [{min}, {max}]")]
    DeflectionOutOfRange {
        /// Requested deflection.
        value: f64,
        /// Lower bound.
        min: f64,
        /// Upper bound.
        max: f64,
    },

    /// Angular deflection is outside the configured bounds.
    #[error("angular deflection {value} rad is outside [{min}, {max}]")]
    AngularDeflectionOutOfRange {
        /// Requested angle in radians.
        value: f64,
        /// Lower bound in radians.
        min: f64,
        /// Upper bound in radians.
        max: f64,
    },
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::validation(err.to_string())
    }
}

/// Validates conversion requests.
#[derive(Debug, Clone)]
pub struct ParameterValidator {
    limits: ConversionLimits,
}

impl ParameterValidator {
    /// Create a validator for the given limits.
    pub fn new(limits: ConversionLimits) -> Self {
        Self { limits }
    }

    /// The limits in force.
    pub fn limits(&self) -> &ConversionLimits {
        &self.limits
    }

    /// Return the first violated constraint, if any.
    pub fn validate(&self, request: &ConversionRequest) -> Result<(), ValidationError> {
        if !FormatRegistry::supports(&request.input_format, Direction::Input) {
            return Err(ValidationError::UnsupportedInputFormat(
                request.input_format.clone(),
            ));
        }
        if !FormatRegistry::supports(&request.output_format, Direction::Output) {
            return Err(ValidationError::UnsupportedOutputFormat(
                request.output_format.clone(),
            ));
        }

        let size = request.input_bytes();
        if size == 0 {
            return Err(ValidationError::EmptyPayload);
        }
        if size > self.limits.max_upload_bytes {
            return Err(ValidationError::PayloadTooLarge {
                size,
                max: self.limits.max_upload_bytes,
            });
        }

        let deflection = request.quality.deflection;
        if !in_range(deflection, self.limits.min_deflection, self.limits.max_deflection) {
            return Err(ValidationError::DeflectionOutOfRange {
                value: deflection,
                min: self.limits.min_deflection,
                max: self.limits.max_deflection,
            });
        }

        let angular = request.quality.angular_deflection;
        if !in_range(
            angular,
            self.limits.min_angular_deflection,
            self.limits.max_angular_deflection,
        ) {
            return Err(ValidationError::AngularDeflectionOutOfRange {
                value: angular,
                min: self.limits.min_angular_deflection,
                max: self.limits.max_angular_deflection,
            });
        }

        Ok(())
    }
}

/// NaN fails every comparison, so it is rejected here too.
fn in_range(value: f64, min: f64, max: f64) -> bool {
    value >= min && value <= max
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> ParameterValidator {
        ParameterValidator::new(ConversionLimits::default())
    }

    fn request() -> ConversionRequest {
        ConversionRequest::new(&b"ISO-10303-21;"[..], "step", "stl")
    }

    #[test]
    fn test_accepts_defaults() {
        assert_eq!(validator().validate(&request()), Ok(()));
    }

    #[test]
    fn test_deflection_bounds() {
        let v = validator();
        assert!(matches!(
            v.validate(&request().with_deflection(0.0)),
            Err(ValidationError::DeflectionOutOfRange { .. })
        ));
        assert!(matches!(
            v.validate(&request().with_deflection(10.0)),
            Err(ValidationError::DeflectionOutOfRange { .. })
        ));
        assert!(v.validate(&request().with_deflection(0.1)).is_ok());
        assert!(v.validate(&request().with_deflection(0.001)).is_ok());
        assert!(v.validate(&request().with_deflection(1.0)).is_ok());
        assert!(v.validate(&request().with_deflection(f64::NAN)).is_err());
    }

    #[test]
    fn test_angular_bounds() {
        let v = validator();
        assert!(matches!(
            v.validate(&request().with_angular_deflection(0.05)),
            Err(ValidationError::AngularDeflectionOutOfRange { .. })
        ));
        assert!(matches!(
            v.validate(&request().with_angular_deflection(1.5)),
            Err(ValidationError::AngularDeflectionOutOfRange { .. })
        ));
        assert!(v.validate(&request().with_angular_deflection(0.1)).is_ok());
    }

    #[test]
    fn test_formats_checked_first() {
        let bad = ConversionRequest::new(Vec::<u8>::new(), "dwg", "pdf").with_deflection(0.0);
        assert_eq!(
            validator().validate(&bad),
            Err(ValidationError::UnsupportedInputFormat("dwg".into()))
        );

        let bad_out = ConversionRequest::new(Vec::<u8>::new(), "step", "pdf");
        assert_eq!(
            validator().validate(&bad_out),
            Err(ValidationError::UnsupportedOutputFormat("pdf".into()))
        );
    }

    #[test]
    fn test_input_only_format_rejected_as_output() {
        let req = ConversionRequest::new(&b"x"[..], "stl", "step");
        assert_eq!(
            validator().validate(&req),
            Err(ValidationError::UnsupportedOutputFormat("step".into()))
        );
    }

    #[test]
    fn test_payload_size() {
        let empty = ConversionRequest::new(Vec::<u8>::new(), "step", "stl");
        assert_eq!(validator().validate(&empty), Err(ValidationError::EmptyPayload));

        let small = ParameterValidator::new(ConversionLimits {
            max_upload_bytes: 4,
            ..Default::default()
        });
        assert_eq!(
            small.validate(&request()),
            Err(ValidationError::PayloadTooLarge { size: 13, max: 4 })
        );
    }

    #[test]
    fn test_maps_to_validation_app_error() {
        let err: AppError = ValidationError::EmptyPayload.into();
        assert_eq!(err.kind, meshforge_core::error::ErrorKind::Validation);
    }
}
