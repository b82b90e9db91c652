//! Job entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use meshforge_core::types::JobId;

use super::status::{ExecutionMode, FailureKind, JobStatus};
use crate::artifact::Artifact;

/// Tessellation quality for one conversion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityParams {
    /// Maximum surface-to-mesh distance.
    pub deflection: f64,
    /// Maximum angle between adjacent facets, in radians.
    pub angular_deflection: f64,
}

/// Error detail recorded on a failed job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobFailure {
    /// Failure category.
    pub kind: FailureKind,
    /// Human-readable description.
    pub message: String,
}

impl JobFailure {
    /// Build a failure record.
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// A conversion job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Unique job identifier.
    pub id: JobId,
    /// Current lifecycle state.
    pub status: JobStatus,
    /// Declared input format (canonical id).
    pub input_format: String,
    /// Requested output format (canonical id).
    pub output_format: String,
    /// Tessellation parameters.
    pub quality: QualityParams,
    /// Sync or async submission.
    pub mode: ExecutionMode,
    /// Size of the submitted payload.
    pub input_bytes: u64,
    /// Original file name, if the client supplied one.
    pub source_name: Option<String>,
    /// Stored output, set on completion.
    pub artifact: Option<Artifact>,
    /// Error detail, set on failure.
    pub error: Option<JobFailure>,
    /// When the job was created.
    pub created_at: DateTime<Utc>,
    /// When the job was last updated.
    pub updated_at: DateTime<Utc>,
    /// When a worker started the conversion.
    pub started_at: Option<DateTime<Utc>>,
    /// When the job reached a terminal state.
    pub completed_at: Option<DateTime<Utc>>,
    /// After this instant a terminal job is no longer visible.
    pub expires_at: DateTime<Utc>,
}

impl Job {
    /// Whether the job is terminal and past its retention expiry.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.status.is_terminal() && self.expires_at <= now
    }

    /// Wall-clock time between start and completion, in milliseconds.
    pub fn duration_ms(&self) -> Option<i64> {
        match (self.started_at, self.completed_at) {
            (Some(start), Some(end)) => Some((end - start).num_milliseconds()),
            _ => None,
        }
    }
}

/// Data required to create a new job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewJob {
    /// Canonical input format id.
    pub input_format: String,
    /// Canonical output format id.
    pub output_format: String,
    /// Tessellation parameters.
    pub quality: QualityParams,
    /// Sync or async submission.
    pub mode: ExecutionMode,
    /// Payload size in bytes.
    pub input_bytes: u64,
    /// Original file name, if known.
    pub source_name: Option<String>,
}
