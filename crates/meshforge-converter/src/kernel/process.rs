//! Out-of-process kernel driver.
//!
//! The configured executable is launched once per conversion with the input
//! written to a scratch directory. It must print the mesh as JSON
//! (`{"vertices": [[x,y,z],...], "faces": [[a,b,c],...], "normals": [...]}`)
//! on stdout and exit 0. A non-zero exit is a rejection of the geometry; a
//! signal or garbage output is a crash. Stdout is read up to
//! `max_output_bytes`; a child that writes more is killed. Only a short tail
//! of stderr is kept. The child is also killed if the future is dropped,
//! which is how the dispatcher enforces its timeout.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Instant;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, error, info, warn};

use meshforge_core::config::KernelConfig;
use meshforge_entity::Mesh;

use super::{KernelError, TessellationInput, Tessellator};
use crate::formats::FormatRegistry;
use crate::workspace::ScratchDir;

const STDERR_TAIL: usize = 2048;

/// Runs an external tessellation executable.
#[derive(Debug, Clone)]
pub struct ProcessKernel {
    config: KernelConfig,
    temp_root: PathBuf,
}

impl ProcessKernel {
    /// Create a driver for the given command.
    pub fn new(config: KernelConfig, temp_root: PathBuf) -> Self {
        Self { config, temp_root }
    }

    /// Expand argument placeholders.
    fn render_args(&self, input_path: &str, input: &TessellationInput<'_>) -> Vec<String> {
        self.config
            .args
            .iter()
            .map(|arg| {
                arg.replace("{input}", input_path)
                    .replace("{format}", input.format)
                    .replace("{deflection}", &input.quality.deflection.to_string())
                    .replace(
                        "{angular_deflection}",
                        &input.quality.angular_deflection.to_string(),
                    )
            })
            .collect()
    }

    fn parse_mesh(&self, stdout: &[u8]) -> Result<Mesh, KernelError> {
        serde_json::from_slice(stdout).map_err(|e| KernelError::Crashed {
            reason: format!("unparseable mesh output: {e}"),
        })
    }
}

#[async_trait]
impl Tessellator for ProcessKernel {
    fn name(&self) -> &str {
        &self.config.command
    }

    fn is_available(&self) -> bool {
        self.config.is_configured()
    }

    async fn tessellate(&self, input: TessellationInput<'_>) -> Result<Mesh, KernelError> {
        if !self.config.is_configured() {
            return Err(KernelError::Unavailable {
                reason: "kernel command is empty".to_string(),
            });
        }

        let scratch = ScratchDir::create(&self.temp_root)?;
        let extension = FormatRegistry::lookup(input.format)
            .map(|spec| spec.extension)
            .unwrap_or(input.format);
        let input_path = scratch
            .write_input(input.source_name, extension, input.payload)
            .await?;
        let input_str = input_path.to_string_lossy();

        let mut cmd = tokio::process::Command::new(&self.config.command);

        #[cfg(windows)]
        {
            const CREATE_NO_WINDOW: u32 = 0x08000000;
            cmd.creation_flags(CREATE_NO_WINDOW);
        }

        cmd.args(self.render_args(&input_str, &input))
            .current_dir(scratch.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(
            kernel = %self.config.command,
            input = %input_path.display(),
            format = input.format,
            deflection = input.quality.deflection,
            angular_deflection = input.quality.angular_deflection,
            "Spawning geometry kernel"
        );

        let start = Instant::now();
        let mut child = cmd.spawn().map_err(|e| KernelError::Unavailable {
            reason: format!("failed to launch '{}': {e}", self.config.command),
        })?;
        let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
            return Err(KernelError::Crashed {
                reason: "kernel output pipes were not captured".to_string(),
            });
        };

        let stderr_task = tokio::spawn(read_tail(stderr, STDERR_TAIL));
        let limit = self.config.max_output_bytes;
        let stdout = read_capped(stdout, limit).await?;

        if stdout.len() as u64 > limit {
            let _ = child.start_kill();
            let _ = child.wait().await;
            stderr_task.abort();
            error!(limit, "Geometry kernel output exceeded limit, killed");
            return Err(KernelError::Crashed {
                reason: format!("output exceeds limit of {limit} bytes"),
            });
        }

        let status = child.wait().await?;
        let elapsed_ms = start.elapsed().as_millis() as u64;
        let stderr = stderr_task.await.unwrap_or_default();
        if !stderr.is_empty() {
            debug!(stderr = %stderr, "Geometry kernel stderr output");
        }

        if status.success() {
            let mesh = self.parse_mesh(&stdout)?;
            info!(
                elapsed_ms,
                vertices = mesh.vertices.len(),
                triangles = mesh.triangle_count(),
                "Geometry kernel completed"
            );
            return Ok(mesh);
        }

        match status.code() {
            Some(code) => {
                warn!(code, elapsed_ms, "Geometry kernel rejected input");
                Err(KernelError::Rejected {
                    code,
                    message: stderr,
                })
            }
            None => {
                let reason = termination_reason(&status);
                error!(elapsed_ms, reason = %reason, "Geometry kernel terminated abnormally");
                Err(KernelError::Crashed { reason })
            }
        }
    }
}

#[cfg(unix)]
fn termination_reason(status: &std::process::ExitStatus) -> String {
    use std::os::unix::process::ExitStatusExt;
    match status.signal() {
        Some(signal) => format!("terminated by signal {signal}"),
        None => "terminated without exit code".to_string(),
    }
}

#[cfg(not(unix))]
fn termination_reason(_status: &std::process::ExitStatus) -> String {
    "terminated without exit code".to_string()
}

/// Read at most `limit + 1` bytes, so an oversized stream is detectable
/// without buffering it.
async fn read_capped<R>(reader: R, limit: u64) -> std::io::Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    reader.take(limit.saturating_add(1)).read_to_end(&mut buf).await?;
    Ok(buf)
}

/// Drain `reader`, keeping only roughly the last `max` bytes.
async fn read_tail<R>(mut reader: R, max: usize) -> String
where
    R: AsyncRead + Unpin,
{
    let mut kept: Vec<u8> = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                kept.extend_from_slice(&chunk[..n]);
                if kept.len() > max * 2 {
                    kept.drain(..kept.len() - max);
                }
            }
        }
    }
    tail(&String::from_utf8_lossy(&kept), max)
}

/// Last `max` bytes of `text`, cut on a char boundary.
fn tail(text: &str, max: usize) -> String {
    let text = text.trim();
    if text.len() <= max {
        return text.to_string();
    }
    let mut start = text.len() - max;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    text[start..].to_string()
}
