//! Stored conversion output metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use meshforge_core::types::{ArtifactId, JobId};

/// Metadata for an immutable artifact blob.
///
/// The blob itself lives in a storage provider at `storage_path`; this
/// record is what a completed job references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// Unique artifact identifier.
    pub id: ArtifactId,
    /// Owning job.
    pub job_id: JobId,
    /// Output format id.
    pub format: String,
    /// MIME type of the blob.
    pub mime_type: String,
    /// Blob size in bytes.
    pub size_bytes: u64,
    /// Provider-relative storage path.
    pub storage_path: String,
    /// When the blob was written.
    pub created_at: DateTime<Utc>,
}

impl Artifact {
    /// Suggested download file name (`<job id>.<extension>`).
    pub fn file_name(&self) -> String {
        let ext = self
            .storage_path
            .rsplit_once('.')
            .map(|(_, ext)| ext)
            .unwrap_or("bin");
        format!("{}.{}", self.job_id, ext)
    }
}
