//! Health report command.

use anyhow::Result;

use meshforge_core::config::AppConfig;
use meshforge_service::HealthStatus;

use crate::output::{self, OutputFormat};

/// Execute the health command
pub async fn execute(config: AppConfig, format: OutputFormat) -> Result<()> {
    let service = super::build_service(config).await?;
    let report = service.health().await;
    service.shutdown().await;

    if format == OutputFormat::Json {
        output::print_item(&report, format);
        return Ok(());
    }

    match report.status {
        HealthStatus::Healthy => output::print_success("MeshForge is healthy"),
        HealthStatus::Degraded => output::print_warning("MeshForge is degraded"),
    }
    output::print_kv("Version", &report.version);
    output::print_kv(
        "Storage",
        &format!(
            "{} ({})",
            report.storage.provider,
            if report.storage.healthy { "ok" } else { "unreachable" }
        ),
    );
    output::print_kv(
        "Kernel",
        &format!(
            "{} ({})",
            report.kernel.name,
            if report.kernel.available { "available" } else { "not configured" }
        ),
    );
    output::print_kv("Worker pool", &report.workers.pool_size.to_string());
    output::print_kv("Free slots", &report.workers.available_slots.to_string());
    Ok(())
}
