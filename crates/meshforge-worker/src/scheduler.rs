//! Interval scheduler for maintenance tasks.

use std::sync::Arc;
use std::time::Duration;

use tokio_cron_scheduler::{Job as CronJob, JobScheduler};
use tracing;

use meshforge_core::error::AppError;

use crate::jobs::MaintenanceTask;

/// Runs registered maintenance tasks on fixed intervals, independent of
/// request traffic.
pub struct MaintenanceScheduler {
    /// The underlying job scheduler
    scheduler: JobScheduler,
    /// Registered task names with their intervals
    registered: Vec<(&'static str, Duration)>,
}

impl std::fmt::Debug for MaintenanceScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MaintenanceScheduler")
            .field("registered", &self.registered)
            .finish()
    }
}

impl MaintenanceScheduler {
    /// Create an empty scheduler
    pub async fn new() -> Result<Self, AppError> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::internal(format!("Failed to create scheduler: {}", e)))?;

        Ok(Self {
            scheduler,
            registered: Vec::new(),
        })
    }

    /// Run `task` every `interval`
    pub async fn register(
        &mut self,
        task: Arc<dyn MaintenanceTask>,
        interval: Duration,
    ) -> Result<(), AppError> {
        let name = task.name();
        let job = CronJob::new_repeated_async(interval, move |_uuid, _lock| {
            let task = Arc::clone(&task);
            Box::pin(async move {
                tracing::debug!("Running maintenance task '{}'", task.name());
                match task.run().await {
                    Ok(report) => {
                        tracing::debug!("Task '{}' removed {} items", report.task, report.removed)
                    }
                    Err(e) => tracing::error!("Maintenance task '{}' failed: {}", task.name(), e),
                }
            })
        })
        .map_err(|e| AppError::internal(format!("Failed to create {} schedule: {}", name, e)))?;

        self.scheduler
            .add(job)
            .await
            .map_err(|e| AppError::internal(format!("Failed to add {} schedule: {}", name, e)))?;

        self.registered.push((name, interval));
        tracing::info!("Registered: {} (every {}s)", name, interval.as_secs());
        Ok(())
    }

    /// Names and intervals of registered tasks
    pub fn registered(&self) -> &[(&'static str, Duration)] {
        &self.registered
    }

    /// Start the scheduler
    pub async fn start(&self) -> Result<(), AppError> {
        self.scheduler
            .start()
            .await
            .map_err(|e| AppError::internal(format!("Failed to start scheduler: {}", e)))?;

        tracing::info!("Maintenance scheduler started");
        Ok(())
    }

    /// Shutdown the scheduler
    pub async fn shutdown(&self) -> Result<(), AppError> {
        let mut scheduler = self.scheduler.clone();
        scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::internal(format!("Failed to shutdown scheduler: {}", e)))?;

        tracing::info!("Maintenance scheduler shut down");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use meshforge_core::result::AppResult;

    use crate::jobs::MaintenanceReport;

    #[derive(Debug, Default)]
    struct CountingTask {
        runs: AtomicUsize,
    }

    #[async_trait]
    impl MaintenanceTask for CountingTask {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn run(&self) -> AppResult<MaintenanceReport> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            Ok(MaintenanceReport {
                task: "counting",
                removed: 0,
            })
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_registered_task_runs_repeatedly() {
        let task = Arc::new(CountingTask::default());
        let mut scheduler = MaintenanceScheduler::new().await.unwrap();
        scheduler
            .register(task.clone(), Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(scheduler.registered(), &[("counting", Duration::from_secs(1))]);

        scheduler.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(3500)).await;
        scheduler.shutdown().await.unwrap();

        assert!(task.runs.load(Ordering::SeqCst) >= 2);
    }
}
