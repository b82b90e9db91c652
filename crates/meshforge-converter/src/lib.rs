//! # meshforge-converter
//!
//! The format-aware half of MeshForge: which formats exist, which requests
//! are acceptable, and how a payload becomes a stored mesh artifact.
//!
//! B-rep inputs are tessellated by an external geometry kernel behind the
//! [`Tessellator`] trait; mesh inputs are decoded directly by the built-in
//! codecs. [`ConversionPipeline`] strings the stages together.

pub mod codec;
pub mod error;
pub mod formats;
pub mod kernel;
pub mod metrics;
pub mod pipeline;
pub mod quality;
pub mod request;
pub mod validator;
pub mod workspace;

pub use codec::{CodecError, MeshCodec, StandardCodec};
pub use error::ConversionError;
pub use formats::{Direction, FormatRegistry, FormatSpec};
pub use kernel::{
    KernelError, ProcessKernel, TessellationInput, Tessellator, UnconfiguredKernel, build_kernel,
};
pub use metrics::{ConversionMetrics, MetricsSnapshot};
pub use pipeline::ConversionPipeline;
pub use quality::QualityPreset;
pub use request::ConversionRequest;
pub use validator::{ParameterValidator, ValidationError};
