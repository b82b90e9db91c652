//! Convenience result type alias for MeshForge.

use crate::error::AppError;

/// A specialized `Result` type for MeshForge operations.
pub type AppResult<T> = Result<T, AppError>;
