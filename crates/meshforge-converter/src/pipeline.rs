//! Conversion pipeline: payload in, stored artifact out.
//!
//! Stages run in order and stop at the first failure: tessellate (kernel
//! formats) or decode (mesh formats), validate the mesh, encode, persist.
//! There are no retries; the same request fails the same way.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, instrument, warn};

use meshforge_core::types::JobId;
use meshforge_entity::{Artifact, Mesh};
use meshforge_storage::{ArtifactKind, ArtifactStore};

use crate::codec::{CodecError, MeshCodec, StandardCodec};
use crate::error::ConversionError;
use crate::formats::{FormatRegistry, FormatSpec};
use crate::kernel::{TessellationInput, Tessellator};
use crate::metrics::ConversionMetrics;
use crate::request::ConversionRequest;

/// Runs one conversion end to end.
#[derive(Debug, Clone)]
pub struct ConversionPipeline {
    kernel: Arc<dyn Tessellator>,
    codec: Arc<dyn MeshCodec>,
    artifacts: ArtifactStore,
    metrics: Arc<ConversionMetrics>,
}

impl ConversionPipeline {
    /// Pipeline with the built-in codecs.
    pub fn new(kernel: Arc<dyn Tessellator>, artifacts: ArtifactStore) -> Self {
        Self::with_codec(kernel, Arc::new(StandardCodec), artifacts)
    }

    /// Pipeline with an explicit codec.
    pub fn with_codec(
        kernel: Arc<dyn Tessellator>,
        codec: Arc<dyn MeshCodec>,
        artifacts: ArtifactStore,
    ) -> Self {
        Self {
            kernel,
            codec,
            artifacts,
            metrics: Arc::new(ConversionMetrics::new()),
        }
    }

    /// The geometry kernel.
    pub fn kernel(&self) -> &Arc<dyn Tessellator> {
        &self.kernel
    }

    /// The artifact store.
    pub fn artifacts(&self) -> &ArtifactStore {
        &self.artifacts
    }

    /// Shared metrics collector.
    pub fn metrics(&self) -> &Arc<ConversionMetrics> {
        &self.metrics
    }

    /// Convert a validated request and store the result under `job_id`.
    #[instrument(
        skip(self, request),
        fields(
            job_id = %job_id,
            input = %request.input_format,
            output = %request.output_format,
        )
    )]
    pub async fn convert(
        &self,
        job_id: JobId,
        request: &ConversionRequest,
    ) -> Result<Artifact, ConversionError> {
        let start = Instant::now();
        self.metrics.record_started(request.input_bytes());

        match self.run(job_id, request).await {
            Ok(artifact) => {
                let elapsed = start.elapsed();
                self.metrics.record_success(elapsed, artifact.size_bytes);
                info!(
                    elapsed_ms = elapsed.as_millis() as u64,
                    bytes = artifact.size_bytes,
                    "Conversion completed"
                );
                Ok(artifact)
            }
            Err(e) => {
                self.metrics.record_failure(e.kind());
                warn!(kind = %e.kind(), error = %e, "Conversion failed");
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        job_id: JobId,
        request: &ConversionRequest,
    ) -> Result<Artifact, ConversionError> {
        let input = FormatRegistry::lookup(&request.input_format).ok_or_else(|| {
            ConversionError::Decode(CodecError::Unsupported {
                format: request.input_format.clone(),
            })
        })?;
        let output = FormatRegistry::lookup(&request.output_format).ok_or_else(|| {
            ConversionError::Encode(CodecError::Unsupported {
                format: request.output_format.clone(),
            })
        })?;

        let mesh = self.load_mesh(input, request).await?;

        let stats = mesh.validate()?;
        if stats.degenerate_count > 0 {
            warn!(
                degenerate = stats.degenerate_count,
                triangles = stats.triangle_count,
                "Mesh contains degenerate triangles"
            );
        }
        debug!(
            vertices = stats.vertex_count,
            triangles = stats.triangle_count,
            "Mesh validated"
        );

        let codec = Arc::clone(&self.codec);
        let format = output.id;
        let data = tokio::task::spawn_blocking(move || codec.encode(&mesh, format))
            .await?
            .map_err(ConversionError::Encode)?;

        let kind = ArtifactKind {
            format: output.id,
            extension: output.extension,
            mime_type: output.mime_type,
        };
        self.artifacts
            .put(job_id, kind, data)
            .await
            .map_err(ConversionError::Storage)
    }

    async fn load_mesh(
        &self,
        input: &'static FormatSpec,
        request: &ConversionRequest,
    ) -> Result<Mesh, ConversionError> {
        if input.requires_kernel {
            let tessellation = TessellationInput {
                payload: &request.payload,
                format: input.id,
                quality: request.quality,
                source_name: request.source_name.as_deref(),
            };
            return Ok(self.kernel.tessellate(tessellation).await?);
        }

        let codec = Arc::clone(&self.codec);
        let payload = request.payload.clone();
        let format = input.id;
        let mesh = tokio::task::spawn_blocking(move || codec.decode(&payload, format))
            .await?
            .map_err(ConversionError::Decode)?;
        Ok(mesh)
    }
}
