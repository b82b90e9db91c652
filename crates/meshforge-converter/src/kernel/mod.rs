//! Geometry kernel boundary.
//!
//! B-rep formats (STEP, IGES, BREP) are tessellated by a native engine that
//! can crash or hang on malformed input. The engine always runs out of
//! process, so a fault ends one child and never the service.

pub mod process;

use std::fmt::Debug;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use meshforge_core::config::KernelConfig;
use meshforge_entity::{Mesh, QualityParams};

pub use self::process::ProcessKernel;

/// Everything the kernel needs for one tessellation.
#[derive(Debug, Clone, Copy)]
pub struct TessellationInput<'a> {
    /// Raw CAD payload.
    pub payload: &'a [u8],
    /// Canonical input format id.
    pub format: &'a str,
    /// Tolerances.
    pub quality: QualityParams,
    /// Client file name, used to name the scratch input.
    pub source_name: Option<&'a str>,
}

/// Kernel failure modes.
#[derive(Debug, Error)]
pub enum KernelError {
    /// No engine is configured or it cannot be launched.
    #[error("geometry kernel unavailable: {reason}")]
    Unavailable {
        /// Why.
        reason: String,
    },

    /// The engine ran and refused the geometry.
    #[error("geometry kernel rejected input (exit code {code}): {message}")]
    Rejected {
        /// Process exit code.
        code: i32,
        /// Tail of the engine's stderr.
        message: String,
    },

    /// The engine died or produced unusable output.
    #[error("geometry kernel crashed: {reason}")]
    Crashed {
        /// What happened.
        reason: String,
    },

    /// Scratch directory I/O failed.
    #[error("kernel workspace I/O error: {0}")]
    Workspace(#[from] std::io::Error),
}

/// A tessellation engine.
#[async_trait]
pub trait Tessellator: Send + Sync + Debug + 'static {
    /// Short engine name for logs and health reports.
    fn name(&self) -> &str;

    /// Whether the engine can be invoked at all.
    fn is_available(&self) -> bool;

    /// Tessellate a B-rep payload into a triangle mesh.
    async fn tessellate(&self, input: TessellationInput<'_>) -> Result<Mesh, KernelError>;
}

/// Stand-in used when no kernel command is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredKernel;

#[async_trait]
impl Tessellator for UnconfiguredKernel {
    fn name(&self) -> &str {
        "none"
    }

    fn is_available(&self) -> bool {
        false
    }

    async fn tessellate(&self, input: TessellationInput<'_>) -> Result<Mesh, KernelError> {
        Err(KernelError::Unavailable {
            reason: format!("no kernel configured to read '{}'", input.format),
        })
    }
}

/// Build the kernel described by configuration.
pub fn build_kernel(config: &KernelConfig, temp_root: PathBuf) -> Arc<dyn Tessellator> {
    if config.is_configured() {
        Arc::new(ProcessKernel::new(config.clone(), temp_root))
    } else {
        Arc::new(UnconfiguredKernel)
    }
}
