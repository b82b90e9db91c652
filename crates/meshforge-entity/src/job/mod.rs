//! Conversion job record and its lifecycle enumerations.

pub mod model;
pub mod status;

pub use model::{Job, JobFailure, NewJob, QualityParams};
pub use status::{ExecutionMode, FailureKind, JobStatus};
