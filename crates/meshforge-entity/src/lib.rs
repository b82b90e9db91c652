//! # meshforge-entity
//!
//! Domain models for MeshForge. Jobs are owned by the job store in
//! `meshforge-worker`; artifacts by `meshforge-storage`; meshes are the
//! transient intermediate passed from the kernel or decoder to an encoder.

pub mod artifact;
pub mod job;
pub mod mesh;

pub use artifact::Artifact;
pub use job::{ExecutionMode, FailureKind, Job, JobFailure, JobStatus, NewJob, QualityParams};
pub use mesh::{Mesh, MeshError, MeshStats};
