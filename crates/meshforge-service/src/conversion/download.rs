//! Artifact retrieval for completed jobs.

use std::sync::Arc;

use bytes::Bytes;
use tracing::debug;

use meshforge_core::error::AppError;
use meshforge_core::types::JobId;
use meshforge_entity::{Artifact, JobStatus};
use meshforge_storage::ArtifactStore;
use meshforge_worker::JobStore;

/// An artifact together with its bytes.
#[derive(Debug, Clone)]
pub struct ArtifactDownload {
    /// Artifact metadata.
    pub artifact: Artifact,
    /// Encoded mesh bytes.
    pub data: Bytes,
    /// Suggested file name for saving.
    pub file_name: String,
    /// MIME type of `data`.
    pub content_type: String,
}

/// Serves artifacts of completed jobs.
#[derive(Debug, Clone)]
pub struct DownloadService {
    store: Arc<JobStore>,
    artifacts: ArtifactStore,
}

impl DownloadService {
    /// Creates a new download service.
    pub fn new(store: Arc<JobStore>, artifacts: ArtifactStore) -> Self {
        Self { store, artifacts }
    }

    /// Fetch the artifact of `id`.
    ///
    /// Pending, in-progress, failed and expired jobs all answer `NotFound`.
    pub async fn download(&self, id: JobId) -> Result<ArtifactDownload, AppError> {
        let job = self.store.get(id)?;

        let artifact = match (job.status, job.artifact) {
            (JobStatus::Completed, Some(artifact)) => artifact,
            (status, _) => {
                return Err(AppError::not_found(format!(
                    "No artifact for job {id} (status {status})"
                )));
            }
        };

        let data = self.artifacts.get(&artifact).await?;
        debug!(job_id = %id, bytes = data.len(), "Serving artifact");

        Ok(ArtifactDownload {
            file_name: artifact.file_name(),
            content_type: artifact.mime_type.clone(),
            artifact,
            data,
        })
    }
}
