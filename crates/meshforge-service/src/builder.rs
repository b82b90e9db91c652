//! Service assembly from configuration.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use meshforge_converter::{ConversionPipeline, ParameterValidator, Tessellator, build_kernel};
use meshforge_core::config::AppConfig;
use meshforge_core::result::AppResult;
use meshforge_core::traits::StorageProvider;
use meshforge_storage::{ArtifactStore, build_provider};
use meshforge_worker::{DispatcherSettings, ExecutionDispatcher, JobStore};

use crate::conversion::ConversionService;

/// Builds a [`ConversionService`].
///
/// The kernel and storage provider come from configuration unless supplied
/// explicitly.
#[derive(Debug)]
pub struct ServiceBuilder {
    config: AppConfig,
    kernel: Option<Arc<dyn Tessellator>>,
    provider: Option<Arc<dyn StorageProvider>>,
}

impl ServiceBuilder {
    /// Start from a loaded configuration.
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            kernel: None,
            provider: None,
        }
    }

    /// Use this kernel instead of the configured command.
    pub fn with_kernel(mut self, kernel: Arc<dyn Tessellator>) -> Self {
        self.kernel = Some(kernel);
        self
    }

    /// Use this storage provider instead of the configured one.
    pub fn with_storage_provider(mut self, provider: Arc<dyn StorageProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Validate configuration and assemble the service.
    ///
    /// Spawns the dispatcher's workers, so it must run inside a Tokio runtime.
    pub async fn build(self) -> AppResult<ConversionService> {
        let config = self.config;
        config.validate_all()?;

        let provider = match self.provider {
            Some(provider) => provider,
            None => build_provider(&config.storage).await?,
        };
        let artifacts = ArtifactStore::new(provider);

        let temp_root = config.storage.effective_temp_root();
        let kernel = self
            .kernel
            .unwrap_or_else(|| build_kernel(&config.kernel, temp_root.clone()));

        info!(
            storage = artifacts.provider_type(),
            kernel = kernel.name(),
            kernel_available = kernel.is_available(),
            temp_root = %temp_root.display(),
            "Assembling conversion service"
        );

        let pipeline = ConversionPipeline::new(kernel, artifacts.clone());
        let store = Arc::new(JobStore::new(
            ParameterValidator::new(config.conversion.clone()),
            Duration::from_secs(config.retention.job_retention_seconds),
        ));
        let dispatcher = Arc::new(ExecutionDispatcher::new(
            store,
            pipeline,
            DispatcherSettings::from(&config.worker),
        ));

        Ok(ConversionService::new(
            dispatcher,
            artifacts,
            config.retention,
            temp_root,
        ))
    }
}
