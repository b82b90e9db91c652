//! Job-addressed artifact persistence.

use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use tracing::{debug, info, warn};

use meshforge_core::error::AppError;
use meshforge_core::result::AppResult;
use meshforge_core::traits::storage::StorageProvider;
use meshforge_core::types::{ArtifactId, JobId};
use meshforge_entity::Artifact;

/// Directory under the provider root that holds every artifact.
const ARTIFACT_ROOT: &str = "artifacts";

/// Suffix for blobs that are still being written.
const PARTIAL_SUFFIX: &str = ".partial";

/// Describes the encoded payload being stored.
#[derive(Debug, Clone, Copy)]
pub struct ArtifactKind<'a> {
    /// Output format id.
    pub format: &'a str,
    /// File extension without the dot.
    pub extension: &'a str,
    /// MIME type.
    pub mime_type: &'a str,
}

/// Stores conversion outputs under `artifacts/<job id>/<artifact id>.<ext>`.
///
/// Writes are all-or-nothing: bytes land in a `.partial` object first and
/// only become visible under their final key after a rename.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    provider: Arc<dyn StorageProvider>,
}

impl ArtifactStore {
    /// Wrap a storage provider.
    pub fn new(provider: Arc<dyn StorageProvider>) -> Self {
        Self { provider }
    }

    /// Name of the underlying provider.
    pub fn provider_type(&self) -> &str {
        self.provider.provider_type()
    }

    /// Check the underlying provider.
    pub async fn health_check(&self) -> AppResult<bool> {
        self.provider.health_check().await
    }

    fn job_dir(job_id: JobId) -> String {
        format!("{ARTIFACT_ROOT}/{job_id}")
    }

    /// Persist an encoded mesh for `job_id`.
    pub async fn put(
        &self,
        job_id: JobId,
        kind: ArtifactKind<'_>,
        data: Bytes,
    ) -> AppResult<Artifact> {
        if data.is_empty() {
            return Err(AppError::storage(format!(
                "Refusing to store empty artifact for job {job_id}"
            )));
        }

        let id = ArtifactId::new();
        let storage_path = format!("{}/{}.{}", Self::job_dir(job_id), id, kind.extension);
        let partial_path = format!("{storage_path}{PARTIAL_SUFFIX}");
        let size_bytes = data.len() as u64;

        self.provider.write(&partial_path, data).await?;
        if let Err(e) = self.provider.rename(&partial_path, &storage_path).await {
            if let Err(cleanup) = self.provider.delete(&partial_path).await {
                warn!(path = %partial_path, error = %cleanup, "Failed to remove partial artifact");
            }
            return Err(e);
        }

        info!(
            job_id = %job_id,
            artifact_id = %id,
            format = kind.format,
            bytes = size_bytes,
            "Stored artifact"
        );

        Ok(Artifact {
            id,
            job_id,
            format: kind.format.to_string(),
            mime_type: kind.mime_type.to_string(),
            size_bytes,
            storage_path,
            created_at: Utc::now(),
        })
    }

    /// Read an artifact's bytes.
    pub async fn get(&self, artifact: &Artifact) -> AppResult<Bytes> {
        let data = self.provider.read_bytes(&artifact.storage_path).await?;
        if data.len() as u64 != artifact.size_bytes {
            return Err(AppError::storage(format!(
                "Artifact {} is {} bytes, expected {}",
                artifact.id,
                data.len(),
                artifact.size_bytes
            )));
        }
        Ok(data)
    }

    /// Whether the artifact's blob is still present.
    pub async fn exists(&self, artifact: &Artifact) -> AppResult<bool> {
        self.provider.exists(&artifact.storage_path).await
    }

    /// Delete one artifact.
    pub async fn delete(&self, artifact: &Artifact) -> AppResult<()> {
        self.provider.delete(&artifact.storage_path).await?;
        debug!(artifact_id = %artifact.id, job_id = %artifact.job_id, "Deleted artifact");
        Ok(())
    }

    /// Delete everything stored for a job, including partial writes.
    pub async fn delete_for_job(&self, job_id: JobId) -> AppResult<()> {
        self.provider.delete_dir(&Self::job_dir(job_id)).await?;
        debug!(job_id = %job_id, "Purged job artifacts");
        Ok(())
    }
}
