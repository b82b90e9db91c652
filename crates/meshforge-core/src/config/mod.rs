//! Application configuration schemas.
//!
//! All configuration structs are deserialized via the `config` crate from an
//! optional TOML base file, an optional environment overlay, and
//! `MESHFORGE__*` environment variables. Each sub-module represents one
//! logical configuration section.

pub mod conversion;
pub mod kernel;
pub mod logging;
pub mod retention;
pub mod storage;
pub mod worker;

use serde::{Deserialize, Serialize};
use validator::Validate;

pub use self::conversion::ConversionLimits;
pub use self::kernel::KernelConfig;
pub use self::logging::LoggingConfig;
pub use self::retention::RetentionConfig;
pub use self::storage::StorageConfig;
pub use self::worker::WorkerConfig;

use crate::error::AppError;

/// Prefix for environment variable overrides (`MESHFORGE__WORKER__POOL_SIZE=8`).
pub const ENV_PREFIX: &str = "MESHFORGE";

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Upload size and tessellation parameter bounds.
    pub conversion: ConversionLimits,
    /// Worker pool sizing and per-conversion timeout.
    pub worker: WorkerConfig,
    /// Job retention and cleanup cadence.
    pub retention: RetentionConfig,
    /// Artifact storage backend.
    pub storage: StorageConfig,
    /// External geometry kernel invocation.
    pub kernel: KernelConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from `config/default.toml`, the `config/{env}.toml`
    /// overlay, and environment variables.
    pub fn load(env: &str) -> Result<Self, AppError> {
        Self::load_from("config/default", env)
    }

    /// Load configuration using an explicit base file (with or without the
    /// `.toml` extension) followed by the `config/{env}` overlay.
    pub fn load_from(base: &str, env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(base).required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let config: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;

        config.validate_all()?;
        Ok(config)
    }

    /// Validate every section, returning the first failure.
    pub fn validate_all(&self) -> Result<(), AppError> {
        self.conversion.validate()?;
        self.conversion.check_ordering()?;
        self.worker.validate()?;
        self.retention.validate()?;
        self.storage.validate()?;
        self.check_scratch_outlives_timeout()?;
        Ok(())
    }

    /// Scratch files must not be swept while a conversion may still use them.
    fn check_scratch_outlives_timeout(&self) -> Result<(), AppError> {
        let timeout = self.worker.conversion_timeout_seconds;
        let ttl = self.retention.temp_ttl_seconds;
        if timeout > ttl {
            return Err(AppError::configuration(format!(
                "worker.conversion_timeout_seconds ({timeout}) exceeds retention.temp_ttl_seconds ({ttl})"
            )));
        }
        Ok(())
    }
}
