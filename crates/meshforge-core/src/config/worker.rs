//! Conversion worker pool configuration.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Sizing for the bounded conversion pool.
#[derive(Debug, Clone, Validate, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Maximum number of simultaneous conversions (sync and async combined).
    #[validate(range(min = 1, max = 64))]
    pub pool_size: usize,

    /// Maximum number of async jobs waiting for a worker.
    #[validate(range(min = 1, max = 100_000))]
    pub queue_capacity: usize,

    /// Wall-clock bound for a single conversion.
    #[validate(range(min = 1, max = 7200))]
    pub conversion_timeout_seconds: u64,

    /// How long shutdown waits for in-flight conversions.
    #[validate(range(max = 600))]
    pub shutdown_grace_seconds: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            pool_size: default_pool_size(),
            queue_capacity: default_queue_capacity(),
            conversion_timeout_seconds: default_conversion_timeout(),
            shutdown_grace_seconds: default_shutdown_grace(),
        }
    }
}

fn default_pool_size() -> usize {
    4
}

fn default_queue_capacity() -> usize {
    64
}

fn default_conversion_timeout() -> u64 {
    300
}

fn default_shutdown_grace() -> u64 {
    30
}
