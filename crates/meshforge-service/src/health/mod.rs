//! Health reporting.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use meshforge_worker::JobStats;

/// Overall service state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Storage reachable, kernel configured, accepting work.
    Healthy,
    /// Running, but some conversions will fail or be refused.
    Degraded,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Healthy => write!(f, "healthy"),
            Self::Degraded => write!(f, "degraded"),
        }
    }
}

/// Storage backend state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageHealth {
    /// Provider name.
    pub provider: String,
    /// Whether the provider answered its health check.
    pub healthy: bool,
}

/// Geometry kernel state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KernelHealth {
    /// Kernel name.
    pub name: String,
    /// Whether BREP inputs can be tessellated.
    pub available: bool,
}

/// Worker pool occupancy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerHealth {
    /// Configured concurrent conversions.
    pub pool_size: usize,
    /// Slots not currently running a conversion.
    pub available_slots: usize,
    /// Asynchronous jobs waiting for a worker.
    pub queued: usize,
}

/// Snapshot returned by the health operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    /// Overall status.
    pub status: HealthStatus,
    /// Service name.
    pub service: String,
    /// Crate version.
    pub version: String,
    /// Storage state.
    pub storage: StorageHealth,
    /// Kernel state.
    pub kernel: KernelHealth,
    /// Worker pool state.
    pub workers: WorkerHealth,
    /// Jobs by status.
    pub jobs: JobStats,
    /// Whether shutdown has begun.
    pub shutting_down: bool,
    /// When the report was taken.
    pub checked_at: DateTime<Utc>,
}
