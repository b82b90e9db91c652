//! # meshforge-service
//!
//! The surface MeshForge exposes to its callers. [`ConversionService`] wraps
//! the dispatcher, job store and artifact store behind string job ids and
//! [`AppError`](meshforge_core::AppError) results; [`ServiceBuilder`] wires
//! it from configuration.
//!
//! Services follow constructor injection: the builder assembles every
//! collaborator once and the service holds them behind `Arc`s.

pub mod builder;
pub mod conversion;
pub mod formats;
pub mod health;

pub use builder::ServiceBuilder;
pub use conversion::{ArtifactDownload, ConversionService};
pub use formats::{FormatInfo, SupportedFormats};
pub use health::{HealthReport, HealthStatus};
