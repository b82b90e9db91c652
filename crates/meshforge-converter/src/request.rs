//! Conversion request value.

use bytes::Bytes;

use meshforge_entity::{ExecutionMode, QualityParams};

use crate::quality::QualityPreset;

/// An immutable conversion request.
///
/// Formats are kept exactly as the client sent them; canonicalization
/// happens after validation.
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    /// Raw input payload.
    pub payload: Bytes,
    /// Declared input format.
    pub input_format: String,
    /// Requested output format.
    pub output_format: String,
    /// Tessellation parameters.
    pub quality: QualityParams,
    /// Sync or async execution.
    pub mode: ExecutionMode,
    /// Original file name, if known.
    pub source_name: Option<String>,
}

impl ConversionRequest {
    /// Build a sync request with the medium quality preset.
    pub fn new(
        payload: impl Into<Bytes>,
        input_format: impl Into<String>,
        output_format: impl Into<String>,
    ) -> Self {
        Self {
            payload: payload.into(),
            input_format: input_format.into(),
            output_format: output_format.into(),
            quality: QualityPreset::default().params(),
            mode: ExecutionMode::Sync,
            source_name: None,
        }
    }

    /// Use a named preset for both tolerances.
    pub fn with_preset(mut self, preset: QualityPreset) -> Self {
        self.quality = preset.params();
        self
    }

    /// Override the deflection.
    pub fn with_deflection(mut self, deflection: f64) -> Self {
        self.quality.deflection = deflection;
        self
    }

    /// Override the angular deflection (radians).
    pub fn with_angular_deflection(mut self, angular_deflection: f64) -> Self {
        self.quality.angular_deflection = angular_deflection;
        self
    }

    /// Set the execution mode.
    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Attach the client's file name.
    pub fn with_source_name(mut self, name: impl Into<String>) -> Self {
        self.source_name = Some(name.into());
        self
    }

    /// Payload size in bytes.
    pub fn input_bytes(&self) -> u64 {
        self.payload.len() as u64
    }
}
