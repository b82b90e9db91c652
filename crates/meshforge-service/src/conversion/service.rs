//! The conversion service facade.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};

use meshforge_converter::{ConversionRequest, MetricsSnapshot};
use meshforge_core::config::RetentionConfig;
use meshforge_core::error::AppError;
use meshforge_entity::Job;
use meshforge_storage::ArtifactStore;
use meshforge_worker::{
    ExecutionDispatcher, JobStats, MaintenanceScheduler, MaintenanceTask, RetentionSweepTask,
    TempCleanupTask,
};

use super::download::{ArtifactDownload, DownloadService};
use super::parse_job_id;
use crate::formats::SupportedFormats;
use crate::health::{HealthReport, HealthStatus, KernelHealth, StorageHealth, WorkerHealth};

/// Entry point for callers: every operation takes and returns plain values
/// and reports failures as [`AppError`].
#[derive(Debug, Clone)]
pub struct ConversionService {
    dispatcher: Arc<ExecutionDispatcher>,
    artifacts: ArtifactStore,
    downloads: DownloadService,
    retention: RetentionConfig,
    temp_root: PathBuf,
}

impl ConversionService {
    /// Creates a new conversion service.
    pub fn new(
        dispatcher: Arc<ExecutionDispatcher>,
        artifacts: ArtifactStore,
        retention: RetentionConfig,
        temp_root: PathBuf,
    ) -> Self {
        let downloads = DownloadService::new(Arc::clone(dispatcher.store()), artifacts.clone());
        Self {
            dispatcher,
            artifacts,
            downloads,
            retention,
            temp_root,
        }
    }

    /// Submit a conversion.
    ///
    /// Synchronous requests return the finished job (completed or failed);
    /// asynchronous ones return the pending job immediately.
    pub async fn submit(&self, request: ConversionRequest) -> Result<Job, AppError> {
        self.dispatcher.submit(request).await
    }

    /// Current state of a job.
    pub fn get_status(&self, job_id: &str) -> Result<Job, AppError> {
        let id = parse_job_id(job_id)?;
        Ok(self.dispatcher.store().get(id)?)
    }

    /// Artifact of a completed job.
    pub async fn get_artifact(&self, job_id: &str) -> Result<ArtifactDownload, AppError> {
        let id = parse_job_id(job_id)?;
        self.downloads.download(id).await
    }

    /// Cancel a job that has not started yet.
    pub fn cancel(&self, job_id: &str) -> Result<Job, AppError> {
        let id = parse_job_id(job_id)?;
        self.dispatcher.cancel(id)
    }

    /// Formats accepted and produced.
    pub fn list_supported_formats(&self) -> SupportedFormats {
        SupportedFormats::current()
    }

    /// Conversion counters and latency percentiles.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.dispatcher.pipeline().metrics().snapshot()
    }

    /// Job counts by status.
    pub fn job_stats(&self) -> JobStats {
        self.dispatcher.store().stats()
    }

    /// Service health.
    pub async fn health(&self) -> HealthReport {
        let storage_healthy = match self.artifacts.health_check().await {
            Ok(healthy) => healthy,
            Err(e) => {
                warn!(error = %e, "Storage health check failed");
                false
            }
        };

        let kernel = self.dispatcher.pipeline().kernel();
        let kernel_available = kernel.is_available();
        let shutting_down = self.dispatcher.is_shutting_down();

        let status = if storage_healthy && kernel_available && !shutting_down {
            HealthStatus::Healthy
        } else {
            HealthStatus::Degraded
        };

        HealthReport {
            status,
            service: "meshforge".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            storage: StorageHealth {
                provider: self.artifacts.provider_type().to_string(),
                healthy: storage_healthy,
            },
            kernel: KernelHealth {
                name: kernel.name().to_string(),
                available: kernel_available,
            },
            workers: WorkerHealth {
                pool_size: self.dispatcher.settings().pool_size,
                available_slots: self.dispatcher.available_slots(),
                queued: self.dispatcher.queued(),
            },
            jobs: self.job_stats(),
            shutting_down,
            checked_at: Utc::now(),
        }
    }

    /// Remove expired jobs and their artifacts now, returning how many were
    /// removed.
    pub async fn sweep_expired(&self) -> Result<usize, AppError> {
        let task = RetentionSweepTask::new(
            Arc::clone(self.dispatcher.store()),
            self.artifacts.clone(),
        );
        Ok(task.run().await?.removed)
    }

    /// Start periodic retention sweeps and scratch cleanup.
    ///
    /// The caller owns the returned scheduler and shuts it down.
    pub async fn start_maintenance(&self) -> Result<MaintenanceScheduler, AppError> {
        let mut scheduler = MaintenanceScheduler::new().await?;

        scheduler
            .register(
                Arc::new(RetentionSweepTask::new(
                    Arc::clone(self.dispatcher.store()),
                    self.artifacts.clone(),
                )),
                Duration::from_secs(self.retention.sweep_interval_seconds),
            )
            .await?;

        scheduler
            .register(
                Arc::new(TempCleanupTask::new(
                    self.temp_root.clone(),
                    Duration::from_secs(self.retention.temp_ttl_seconds),
                )),
                Duration::from_secs(self.retention.sweep_interval_seconds),
            )
            .await?;

        scheduler.start().await?;
        Ok(scheduler)
    }

    /// Stop accepting work, let running conversions finish within the grace
    /// period, and fail queued jobs as cancelled.
    pub async fn shutdown(&self) {
        info!("Conversion service shutting down");
        self.dispatcher.shutdown().await;
    }
}
