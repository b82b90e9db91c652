//! Retention sweep: drop expired terminal jobs and their artifacts.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing;

use meshforge_core::result::AppResult;
use meshforge_storage::ArtifactStore;

use super::{MaintenanceReport, MaintenanceTask};
use crate::store::JobStore;

/// Removes jobs past their retention expiry.
#[derive(Debug, Clone)]
pub struct RetentionSweepTask {
    store: Arc<JobStore>,
    artifacts: ArtifactStore,
}

impl RetentionSweepTask {
    /// Create a sweep over `store`, deleting artifacts from `artifacts`.
    pub fn new(store: Arc<JobStore>, artifacts: ArtifactStore) -> Self {
        Self { store, artifacts }
    }
}

#[async_trait]
impl MaintenanceTask for RetentionSweepTask {
    fn name(&self) -> &'static str {
        "retention_sweep"
    }

    async fn run(&self) -> AppResult<MaintenanceReport> {
        let swept = self.store.sweep(Utc::now());

        for job in &swept {
            if let Err(e) = self.artifacts.delete_for_job(job.id).await {
                tracing::warn!("Failed to delete artifacts of expired job {}: {}", job.id, e);
            }
        }

        if !swept.is_empty() {
            tracing::info!("Retention sweep removed {} expired jobs", swept.len());
        }

        Ok(MaintenanceReport {
            task: self.name(),
            removed: swept.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use bytes::Bytes;
    use meshforge_converter::{ConversionRequest, ParameterValidator};
    use meshforge_core::config::ConversionLimits;
    use meshforge_entity::JobStatus;
    use meshforge_storage::{ArtifactKind, MemoryStorageProvider};

    #[tokio::test]
    async fn test_sweep_deletes_artifacts_of_expired_jobs() {
        let provider = Arc::new(MemoryStorageProvider::new());
        let artifacts = ArtifactStore::new(provider.clone());
        let store = Arc::new(JobStore::new(
            ParameterValidator::new(ConversionLimits::default()),
            Duration::ZERO,
        ));

        let request = ConversionRequest::new(&b"solid x"[..], "stl", "obj");
        let job = store.create(&request).unwrap();
        store.start(job.id).unwrap();
        let kind = ArtifactKind {
            format: "obj",
            extension: "obj",
            mime_type: "model/obj",
        };
        let artifact = artifacts
            .put(job.id, kind, Bytes::from_static(b"v 0 0 0\n"))
            .await
            .unwrap();
        store.complete(job.id, artifact.clone()).unwrap();

        let live = store.create(&request).unwrap();

        tokio::time::sleep(Duration::from_millis(5)).await;
        let report = RetentionSweepTask::new(Arc::clone(&store), artifacts.clone())
            .run()
            .await
            .unwrap();

        assert_eq!(report.removed, 1);
        assert!(!artifacts.exists(&artifact).await.unwrap());
        assert!(provider.is_empty());
        assert_eq!(store.get(live.id).unwrap().status, JobStatus::Pending);
    }
}
