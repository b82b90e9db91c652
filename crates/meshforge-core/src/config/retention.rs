//! Job retention and maintenance cadence.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// How long finished jobs live and how often cleanup runs.
#[derive(Debug, Clone, Validate, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    /// Lifetime of a job (and its artifact) after it reaches a terminal state.
    #[validate(range(min = 1))]
    pub job_retention_seconds: u64,

    /// Interval between retention sweeps.
    #[validate(range(min = 1, max = 86_400))]
    pub sweep_interval_seconds: u64,

    /// Age after which orphaned scratch directories are removed.
    #[validate(range(min = 60))]
    pub temp_ttl_seconds: u64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            job_retention_seconds: 30 * 60,
            sweep_interval_seconds: 300,
            temp_ttl_seconds: 30 * 60,
        }
    }
}
