//! Job status, execution mode, and failure kind enumerations.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a conversion job.
///
/// `Pending → InProgress → {Completed, Failed}`. `Pending → Failed` is also
/// allowed for dispatch failures and cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Created, waiting for a worker.
    Pending,
    /// A worker has started the conversion.
    InProgress,
    /// Conversion succeeded and the artifact is stored.
    Completed,
    /// Conversion failed; the job carries the error detail.
    Failed,
}

impl JobStatus {
    /// Check if the job is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether `self → next` is a permitted transition.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::InProgress)
                | (Self::Pending, Self::Failed)
                | (Self::InProgress, Self::Completed)
                | (Self::InProgress, Self::Failed)
        )
    }

    /// Return the status as a snake_case string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Whether the caller waits for the conversion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// Run inline; the caller receives the finished job.
    #[default]
    Sync,
    /// Queue for the worker pool; the caller polls.
    Async,
}

impl ExecutionMode {
    /// Return the mode as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sync => "sync",
            Self::Async => "async",
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Category of a recorded job failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureKind {
    /// The kernel rejected the geometry or produced an unusable mesh.
    GeometryError,
    /// A mesh-native input could not be decoded.
    DecodeError,
    /// The mesh could not be written in the requested format.
    EncodeError,
    /// The artifact could not be persisted.
    StorageError,
    /// The conversion's execution context terminated abnormally.
    KernelFault,
    /// The conversion exceeded its wall-clock bound.
    Timeout,
    /// The job was cancelled before a worker started it.
    Cancelled,
}

impl FailureKind {
    /// Return the kind as its wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GeometryError => "GeometryError",
            Self::DecodeError => "DecodeError",
            Self::EncodeError => "EncodeError",
            Self::StorageError => "StorageError",
            Self::KernelFault => "KernelFault",
            Self::Timeout => "Timeout",
            Self::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::InProgress.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
    }

    #[test]
    fn test_no_transition_leaves_terminal() {
        for from in [JobStatus::Completed, JobStatus::Failed] {
            for to in [
                JobStatus::Pending,
                JobStatus::InProgress,
                JobStatus::Completed,
                JobStatus::Failed,
            ] {
                assert!(!from.can_transition_to(to), "{from} -> {to}");
            }
        }
    }

    #[test]
    fn test_pending_cannot_complete_directly() {
        assert!(!JobStatus::Pending.can_transition_to(JobStatus::Completed));
        assert!(JobStatus::Pending.can_transition_to(JobStatus::Failed));
    }

    #[test]
    fn test_status_wire_names() {
        let json = serde_json::to_string(&JobStatus::InProgress).expect("serialize");
        assert_eq!(json, "\"in_progress\"");
        let mode: ExecutionMode = serde_json::from_str("\"async\"").expect("deserialize");
        assert_eq!(mode, ExecutionMode::Async);
    }
}
