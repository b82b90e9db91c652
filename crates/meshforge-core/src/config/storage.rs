//! Artifact storage configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Storage backend selection and filesystem roots.
#[derive(Debug, Clone, Validate, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Provider name: `"local"` or `"memory"`.
    #[validate(length(min = 1))]
    pub provider: String,

    /// Root directory for the local provider.
    #[validate(length(min = 1))]
    pub data_root: String,

    /// Root for per-conversion scratch directories.
    pub temp_root: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            data_root: default_data_root(),
            temp_root: None,
        }
    }
}

fn default_provider() -> String {
    "local".to_string()
}

fn default_data_root() -> String {
    "./data/artifacts".to_string()
}

impl StorageConfig {
    /// Resolve the effective scratch root directory.
    pub fn effective_temp_root(&self) -> PathBuf {
        self.temp_root
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("meshforge"))
    }
}
