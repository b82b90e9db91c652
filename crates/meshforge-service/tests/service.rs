//! End-to-end tests of the conversion service over in-memory storage.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use meshforge_converter::codec::{obj, stl};
use meshforge_converter::{ConversionRequest, KernelError, TessellationInput, Tessellator};
use meshforge_core::config::AppConfig;
use meshforge_core::error::ErrorKind;
use meshforge_entity::{ExecutionMode, FailureKind, JobStatus, Mesh};
use meshforge_service::{ConversionService, HealthStatus, ServiceBuilder};

#[derive(Debug)]
enum TestKernel {
    Cube,
    Reject,
    PanicOnBad,
}

#[async_trait]
impl Tessellator for TestKernel {
    fn name(&self) -> &str {
        "test-kernel"
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn tessellate(&self, input: TessellationInput<'_>) -> Result<Mesh, KernelError> {
        assert!(input.quality.deflection > 0.0);
        match self {
            Self::Cube => Ok(Mesh::unit_cube()),
            Self::Reject => Err(KernelError::Rejected {
                code: 2,
                message: "no solids in file".into(),
            }),
            Self::PanicOnBad => {
                if input.source_name == Some("bad.step") {
                    panic!("kernel crashed");
                }
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok(Mesh::unit_cube())
            }
        }
    }
}

fn config(temp: &tempfile::TempDir) -> AppConfig {
    let mut config = AppConfig::default();
    config.storage.provider = "memory".into();
    config.storage.temp_root = Some(temp.path().to_path_buf());
    config.worker.pool_size = 2;
    config.worker.queue_capacity = 8;
    config
}

async fn service_with(kernel: TestKernel, config: AppConfig) -> ConversionService {
    ServiceBuilder::new(config)
        .with_kernel(Arc::new(kernel))
        .build()
        .await
        .expect("build service")
}

fn step_payload() -> &'static [u8] {
    b"ISO-10303-21;\nHEADER;\nENDSEC;\nDATA;\nENDSEC;\nEND-ISO-10303-21;\n"
}

#[tokio::test]
async fn test_step_to_stl_sync() {
    let temp = tempfile::tempdir().unwrap();
    let service = service_with(TestKernel::Cube, config(&temp)).await;

    let request = ConversionRequest::new(step_payload(), "STEP", "stl").with_source_name("part.step");
    let job = service.submit(request).await.unwrap();

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.input_format, "step");
    assert!(job.error.is_none());
    assert!(job.started_at.is_some() && job.completed_at.is_some());

    let download = service.get_artifact(&job.id.to_string()).await.unwrap();
    assert_eq!(download.content_type, "model/stl");
    assert_eq!(download.file_name, format!("{}.stl", job.id));

    let mesh = stl::decode(&download.data).unwrap();
    assert!(mesh.triangle_count() > 0);

    let metrics = service.metrics();
    assert_eq!(metrics.conversions_succeeded, 1);
}

#[tokio::test]
async fn test_mesh_input_to_obj() {
    let temp = tempfile::tempdir().unwrap();
    let service = service_with(TestKernel::Reject, config(&temp)).await;

    let payload = stl::encode_binary(&Mesh::unit_cube()).unwrap();
    let job = service
        .submit(ConversionRequest::new(payload, "stl", "obj"))
        .await
        .unwrap();
    assert_eq!(job.status, JobStatus::Completed);

    let download = service.get_artifact(&job.id.to_string()).await.unwrap();
    let mesh = obj::decode(&download.data).unwrap();
    assert_eq!(mesh.triangle_count(), 12);
}

#[tokio::test]
async fn test_failed_job_has_no_artifact() {
    let temp = tempfile::tempdir().unwrap();
    let service = service_with(TestKernel::Reject, config(&temp)).await;

    let job = service
        .submit(ConversionRequest::new(step_payload(), "step", "glb"))
        .await
        .unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    let failure = job.error.clone().unwrap();
    assert_eq!(failure.kind, FailureKind::GeometryError);
    assert!(job.artifact.is_none());

    let err = service.get_artifact(&job.id.to_string()).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_status_is_idempotent() {
    let temp = tempfile::tempdir().unwrap();
    let service = service_with(TestKernel::Cube, config(&temp)).await;

    let job = service
        .submit(ConversionRequest::new(step_payload(), "stp", "gltf"))
        .await
        .unwrap();
    let id = job.id.to_string();

    let first = service.get_status(&id).unwrap();
    let second = service.get_status(&id).unwrap();
    assert_eq!(first, second);
    assert_eq!(first, job);
}

#[tokio::test]
async fn test_async_job_completes() {
    let temp = tempfile::tempdir().unwrap();
    let service = service_with(TestKernel::Cube, config(&temp)).await;

    let request =
        ConversionRequest::new(step_payload(), "step", "glb").with_mode(ExecutionMode::Async);
    let job = service.submit(request).await.unwrap();
    assert_eq!(job.status, JobStatus::Pending);

    let id = job.id.to_string();
    let mut status = job.status;
    for _ in 0..200 {
        status = service.get_status(&id).unwrap().status;
        if status.is_terminal() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(status, JobStatus::Completed);

    let download = service.get_artifact(&id).await.unwrap();
    assert_eq!(&download.data[..4], b"glTF");
}

async fn wait_terminal(service: &ConversionService, id: &str) -> JobStatus {
    for _ in 0..300 {
        let status = service.get_status(id).unwrap().status;
        if status.is_terminal() {
            return status;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {id} did not finish");
}

#[tokio::test]
async fn test_kernel_fault_is_isolated() {
    let temp = tempfile::tempdir().unwrap();
    let service = service_with(TestKernel::PanicOnBad, config(&temp)).await;

    let submit = |name: &str| {
        ConversionRequest::new(step_payload(), "step", "stl")
            .with_source_name(name)
            .with_mode(ExecutionMode::Async)
    };
    let bad = service.submit(submit("bad.step")).await.unwrap();
    let good = service.submit(submit("good.step")).await.unwrap();

    assert_eq!(
        wait_terminal(&service, &bad.id.to_string()).await,
        JobStatus::Failed
    );
    assert_eq!(
        wait_terminal(&service, &good.id.to_string()).await,
        JobStatus::Completed
    );

    let failed = service.get_status(&bad.id.to_string()).unwrap();
    assert_eq!(failed.error.unwrap().kind, FailureKind::KernelFault);
    assert!(service.get_artifact(&good.id.to_string()).await.is_ok());

    let metrics = service.metrics();
    assert_eq!(metrics.kernel_faults, 1);
    assert_eq!(metrics.conversions_succeeded, 1);
}

#[tokio::test]
async fn test_invalid_parameters_rejected_without_job() {
    let temp = tempfile::tempdir().unwrap();
    let service = service_with(TestKernel::Cube, config(&temp)).await;

    for deflection in [0.0, 10.0] {
        let request =
            ConversionRequest::new(step_payload(), "step", "stl").with_deflection(deflection);
        let err = service.submit(request).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    let err = service
        .submit(ConversionRequest::new(step_payload(), "dwg", "stl"))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);

    let err = service
        .submit(ConversionRequest::new(Vec::<u8>::new(), "step", "stl"))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);

    assert_eq!(service.job_stats().total(), 0);
}

#[tokio::test]
async fn test_unknown_ids_are_not_found() {
    let temp = tempfile::tempdir().unwrap();
    let service = service_with(TestKernel::Cube, config(&temp)).await;

    let missing = meshforge_core::types::JobId::new().to_string();
    for id in ["garbage", "", missing.as_str()] {
        assert_eq!(service.get_status(id).unwrap_err().kind, ErrorKind::NotFound);
        assert_eq!(
            service.get_artifact(id).await.unwrap_err().kind,
            ErrorKind::NotFound
        );
        assert_eq!(service.cancel(id).unwrap_err().kind, ErrorKind::NotFound);
    }
}

#[tokio::test]
async fn test_cancel_finished_job_is_invalid_state() {
    let temp = tempfile::tempdir().unwrap();
    let service = service_with(TestKernel::Cube, config(&temp)).await;

    let job = service
        .submit(ConversionRequest::new(step_payload(), "step", "stl"))
        .await
        .unwrap();
    let err = service.cancel(&job.id.to_string()).unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidState);
    assert_eq!(
        service.get_status(&job.id.to_string()).unwrap().status,
        JobStatus::Completed
    );
}

#[tokio::test]
async fn test_expired_job_is_swept() {
    let temp = tempfile::tempdir().unwrap();
    let mut config = config(&temp);
    config.retention.job_retention_seconds = 1;
    let service = service_with(TestKernel::Cube, config).await;

    let job = service
        .submit(ConversionRequest::new(step_payload(), "step", "stl"))
        .await
        .unwrap();
    let id = job.id.to_string();
    assert!(service.get_artifact(&id).await.is_ok());

    tokio::time::sleep(Duration::from_millis(1200)).await;

    assert_eq!(service.get_status(&id).unwrap_err().kind, ErrorKind::NotFound);
    assert_eq!(service.sweep_expired().await.unwrap(), 1);
    assert_eq!(service.get_artifact(&id).await.unwrap_err().kind, ErrorKind::NotFound);
    assert_eq!(service.sweep_expired().await.unwrap(), 0);
}

#[tokio::test]
async fn test_formats_and_health() {
    let temp = tempfile::tempdir().unwrap();
    let service = service_with(TestKernel::Cube, config(&temp)).await;

    let formats = service.list_supported_formats();
    assert!(formats.inputs.iter().any(|f| f.id == "step"));
    assert!(formats.outputs.iter().any(|f| f.id == "glb"));
    assert!(!formats.outputs.iter().any(|f| f.id == "step"));

    let health = service.health().await;
    assert_eq!(health.status, HealthStatus::Healthy);
    assert_eq!(health.storage.provider, "memory");
    assert_eq!(health.kernel.name, "test-kernel");
    assert_eq!(health.workers.pool_size, 2);
    assert!(!health.shutting_down);

    service.shutdown().await;
    let health = service.health().await;
    assert_eq!(health.status, HealthStatus::Degraded);
    assert!(health.shutting_down);
}

#[tokio::test]
async fn test_invalid_config_fails_build() {
    let temp = tempfile::tempdir().unwrap();
    let mut config = config(&temp);
    config.worker.pool_size = 0;

    let err = ServiceBuilder::new(config)
        .with_kernel(Arc::new(TestKernel::Cube))
        .build()
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Configuration);
}

#[tokio::test]
async fn test_unconfigured_kernel_degrades_health() {
    let temp = tempfile::tempdir().unwrap();
    let service = ServiceBuilder::new(config(&temp)).build().await.unwrap();

    let health = service.health().await;
    assert_eq!(health.status, HealthStatus::Degraded);
    assert!(!health.kernel.available);

    let job = service
        .submit(ConversionRequest::new(step_payload(), "step", "stl"))
        .await
        .unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.error.unwrap().kind, FailureKind::KernelFault);
}
