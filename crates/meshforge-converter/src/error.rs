//! Conversion failures.
//!
//! Every way a conversion can end badly, after the job exists, is a
//! [`ConversionError`]. Each variant maps to exactly one [`FailureKind`] that
//! is recorded on the job.

use thiserror::Error;

use meshforge_core::error::AppError;
use meshforge_entity::{FailureKind, JobFailure, MeshError};

use crate::codec::CodecError;
use crate::kernel::KernelError;

/// Why a conversion did not produce an artifact.
#[derive(Debug, Error)]
pub enum ConversionError {
    /// The kernel refused the geometry or the mesh failed validation.
    #[error("{0}")]
    Geometry(String),

    /// A mesh-native payload could not be parsed.
    #[error("decode failed: {0}")]
    Decode(#[source] CodecError),

    /// The mesh could not be written in the requested format.
    #[error("encode failed: {0}")]
    Encode(#[source] CodecError),

    /// The artifact could not be persisted.
    #[error("artifact storage failed: {0}")]
    Storage(#[source] AppError),

    /// The kernel or the task running the conversion died.
    #[error("kernel fault: {0}")]
    KernelFault(String),

    /// The conversion exceeded its wall-clock bound.
    #[error("conversion timed out after {timeout_seconds}s")]
    Timeout {
        /// The bound that was exceeded.
        timeout_seconds: u64,
    },
}

impl ConversionError {
    /// The failure category recorded on the job.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Geometry(_) => FailureKind::GeometryError,
            Self::Decode(_) => FailureKind::DecodeError,
            Self::Encode(_) => FailureKind::EncodeError,
            Self::Storage(_) => FailureKind::StorageError,
            Self::KernelFault(_) => FailureKind::KernelFault,
            Self::Timeout { .. } => FailureKind::Timeout,
        }
    }

    /// Job failure record for this error.
    pub fn failure(&self) -> JobFailure {
        JobFailure::new(self.kind(), self.to_string())
    }
}

impl From<KernelError> for ConversionError {
    fn from(err: KernelError) -> Self {
        match err {
            KernelError::Rejected { .. } => Self::Geometry(err.to_string()),
            KernelError::Unavailable { .. }
            | KernelError::Crashed { .. }
            | KernelError::Workspace(_) => Self::KernelFault(err.to_string()),
        }
    }
}

impl From<MeshError> for ConversionError {
    fn from(err: MeshError) -> Self {
        Self::Geometry(format!("invalid mesh: {err}"))
    }
}

impl From<tokio::task::JoinError> for ConversionError {
    fn from(err: tokio::task::JoinError) -> Self {
        if err.is_panic() {
            Self::KernelFault("conversion task panicked".to_string())
        } else {
            Self::KernelFault("conversion task was cancelled".to_string())
        }
    }
}

impl From<ConversionError> for AppError {
    fn from(err: ConversionError) -> Self {
        match err {
            ConversionError::Storage(source) => source,
            other => AppError::internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kernel_error_mapping() {
        let rejected: ConversionError = KernelError::Rejected {
            code: 2,
            message: "not a STEP file".into(),
        }
        .into();
        assert_eq!(rejected.kind(), FailureKind::GeometryError);

        let crashed: ConversionError = KernelError::Crashed {
            reason: "terminated by signal 11".into(),
        }
        .into();
        assert_eq!(crashed.kind(), FailureKind::KernelFault);

        let unavailable: ConversionError = KernelError::Unavailable {
            reason: "none".into(),
        }
        .into();
        assert_eq!(unavailable.kind(), FailureKind::KernelFault);
    }

    #[test]
    fn test_failure_record() {
        let failure = ConversionError::Timeout {
            timeout_seconds: 5,
        }
        .failure();
        assert_eq!(failure.kind, FailureKind::Timeout);
        assert_eq!(failure.message, "conversion timed out after 5s");

        let geometry: ConversionError = MeshError::NoTriangles.into();
        assert_eq!(geometry.failure().message, "invalid mesh: mesh has no triangles");
    }
}
