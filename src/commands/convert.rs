//! File conversion command.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use meshforge_converter::{ConversionRequest, FormatRegistry, QualityPreset};
use meshforge_core::config::AppConfig;
use meshforge_entity::{ExecutionMode, Job, JobStatus};
use meshforge_service::ConversionService;

use crate::output::{self, OutputFormat};

/// How often asynchronous jobs are polled.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Arguments for the convert command
#[derive(Debug, Args)]
pub struct ConvertArgs {
    /// Files to convert
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Output format (stl, stl_ascii, obj, gltf, glb)
    #[arg(short, long)]
    pub to: String,

    /// Input format; inferred from each file's extension when omitted
    #[arg(long)]
    pub from: Option<String>,

    /// Quality preset (low, medium, high, ultra)
    #[arg(short, long, default_value = "medium")]
    pub quality: String,

    /// Deflection override
    #[arg(long)]
    pub deflection: Option<f64>,

    /// Angular deflection override, in radians
    #[arg(long)]
    pub angular_deflection: Option<f64>,

    /// Directory for converted files; defaults to each input's directory
    #[arg(short, long)]
    pub out_dir: Option<PathBuf>,

    /// Queue every file and poll instead of converting one at a time
    #[arg(long = "async")]
    pub run_async: bool,
}

/// Conversion result row
#[derive(Debug, Serialize, Tabled)]
struct ConvertRow {
    /// Input file
    input: String,
    /// Job ID
    job: String,
    /// Final status
    status: String,
    /// Converted file or failure reason
    result: String,
    /// Conversion time
    duration: String,
}

impl ConvertRow {
    fn rejected(input: &Path, reason: String) -> Self {
        Self {
            input: input.display().to_string(),
            job: "-".to_string(),
            status: "rejected".to_string(),
            result: reason,
            duration: "-".to_string(),
        }
    }

    fn finished(input: &Path, job: &Job, result: String) -> Self {
        Self {
            input: input.display().to_string(),
            job: job.id.to_string(),
            status: job.status.to_string(),
            result,
            duration: job
                .duration_ms()
                .map(|ms| format!("{ms} ms"))
                .unwrap_or_else(|| "-".to_string()),
        }
    }

    fn succeeded(&self) -> bool {
        self.status == JobStatus::Completed.to_string()
    }
}

/// Execute the convert command
pub async fn execute(args: &ConvertArgs, config: AppConfig, format: OutputFormat) -> Result<()> {
    let preset: QualityPreset = args.quality.parse().map_err(|e: String| anyhow!(e))?;
    let mode = if args.run_async {
        ExecutionMode::Async
    } else {
        ExecutionMode::Sync
    };

    let service = super::build_service(config).await?;

    let mut submitted = Vec::with_capacity(args.inputs.len());
    let mut rows = Vec::with_capacity(args.inputs.len());
    for input in &args.inputs {
        let request = match build_request(args, input, preset, mode).await {
            Ok(request) => request,
            Err(e) => {
                rows.push(ConvertRow::rejected(input, format!("{e:#}")));
                continue;
            }
        };
        match service.submit(request).await {
            Ok(job) => submitted.push((input, job)),
            Err(e) => rows.push(ConvertRow::rejected(input, e.to_string())),
        }
    }

    for (input, job) in submitted {
        let job = wait_for(&service, job).await?;
        let result = match job.status {
            JobStatus::Completed => match save_artifact(&service, &job, input, args).await {
                Ok(path) => path.display().to_string(),
                Err(e) => format!("{e:#}"),
            },
            _ => job
                .error
                .as_ref()
                .map(|failure| format!("{}: {}", failure.kind, failure.message))
                .unwrap_or_default(),
        };
        rows.push(ConvertRow::finished(input, &job, result));
    }

    service.shutdown().await;
    output::print_list(&rows, format);

    let failed = rows.iter().filter(|row| !row.succeeded()).count();
    if failed > 0 {
        bail!("{failed} of {} conversions failed", rows.len());
    }
    Ok(())
}

async fn build_request(
    args: &ConvertArgs,
    input: &Path,
    preset: QualityPreset,
    mode: ExecutionMode,
) -> Result<ConversionRequest> {
    let input_format = match &args.from {
        Some(format) => format.clone(),
        None => input
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_string)
            .context("cannot infer input format without a file extension; pass --from")?,
    };

    let payload = tokio::fs::read(input)
        .await
        .with_context(|| format!("reading {}", input.display()))?;

    let mut request = ConversionRequest::new(payload, input_format, args.to.as_str())
        .with_preset(preset)
        .with_mode(mode);
    if let Some(deflection) = args.deflection {
        request = request.with_deflection(deflection);
    }
    if let Some(angular) = args.angular_deflection {
        request = request.with_angular_deflection(angular);
    }
    if let Some(name) = input.file_name().and_then(|n| n.to_str()) {
        request = request.with_source_name(name);
    }
    Ok(request)
}

async fn wait_for(service: &ConversionService, mut job: Job) -> Result<Job> {
    let id = job.id.to_string();
    while !job.status.is_terminal() {
        tokio::time::sleep(POLL_INTERVAL).await;
        job = service.get_status(&id)?;
    }
    Ok(job)
}

async fn save_artifact(
    service: &ConversionService,
    job: &Job,
    input: &Path,
    args: &ConvertArgs,
) -> Result<PathBuf> {
    let download = service.get_artifact(&job.id.to_string()).await?;

    let extension = FormatRegistry::lookup(&job.output_format)
        .map(|spec| spec.extension)
        .unwrap_or("bin");
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("mesh");
    let dir = match &args.out_dir {
        Some(dir) => dir.clone(),
        None => input.parent().map(Path::to_path_buf).unwrap_or_default(),
    };

    tokio::fs::create_dir_all(&dir)
        .await
        .with_context(|| format!("creating {}", dir.display()))?;
    let path = dir.join(format!("{stem}.{extension}"));
    tokio::fs::write(&path, &download.data)
        .await
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}
