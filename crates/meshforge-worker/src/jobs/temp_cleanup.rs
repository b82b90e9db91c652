//! Removal of scratch directories left behind by crashed conversions.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tracing;

use meshforge_converter::workspace;
use meshforge_core::error::AppError;
use meshforge_core::result::AppResult;

use super::{MaintenanceReport, MaintenanceTask};

/// Deletes `job-*` scratch directories older than the TTL.
#[derive(Debug, Clone)]
pub struct TempCleanupTask {
    temp_root: PathBuf,
    ttl: Duration,
}

impl TempCleanupTask {
    /// Create a cleanup over `temp_root`.
    pub fn new(temp_root: PathBuf, ttl: Duration) -> Self {
        Self { temp_root, ttl }
    }
}

#[async_trait]
impl MaintenanceTask for TempCleanupTask {
    fn name(&self) -> &'static str {
        "temp_cleanup"
    }

    async fn run(&self) -> AppResult<MaintenanceReport> {
        let removed = workspace::sweep_stale(&self.temp_root, self.ttl)
            .await
            .map_err(|e| {
                AppError::with_source(
                    meshforge_core::error::ErrorKind::Storage,
                    format!("Failed to scan temp root {}", self.temp_root.display()),
                    e,
                )
            })?;

        if removed > 0 {
            tracing::info!("Cleaned up {} stale scratch directories", removed);
        }

        Ok(MaintenanceReport {
            task: self.name(),
            removed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_removes_stale_scratch_dirs() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(root.path().join("job-abc")).unwrap();

        let task = TempCleanupTask::new(root.path().to_path_buf(), Duration::ZERO);
        let report = task.run().await.unwrap();
        assert_eq!(report.task, "temp_cleanup");
        assert_eq!(report.removed, 1);
    }
}
