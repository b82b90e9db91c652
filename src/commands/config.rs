//! Configuration management CLI commands.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use meshforge_core::config::AppConfig;

use crate::output::{self, OutputFormat};

/// Arguments for config commands
#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Config subcommand
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show,
    /// Validate the configuration
    Validate,
    /// Write the default configuration file
    Generate {
        /// Output file path
        #[arg(short, long, default_value = "config/generated.toml")]
        output: String,
    },
}

/// Execute config commands
pub async fn execute(
    args: &ConfigArgs,
    config: &AppConfig,
    config_path: &str,
    format: OutputFormat,
) -> Result<()> {
    match &args.command {
        ConfigCommand::Show => output::print_item(config, format),
        ConfigCommand::Validate => {
            config.validate_all()?;
            output::print_success(&format!("Configuration '{config_path}' is valid"));
            output::print_kv("Storage", &config.storage.provider);
            output::print_kv(
                "Kernel",
                if config.kernel.is_configured() {
                    config.kernel.command.as_str()
                } else {
                    "(none)"
                },
            );
            output::print_kv("Worker pool", &config.worker.pool_size.to_string());
            output::print_kv(
                "Timeout",
                &format!("{}s", config.worker.conversion_timeout_seconds),
            );
        }
        ConfigCommand::Generate { output: out_path } => {
            let default_config = include_str!("../../config/default.toml");

            if let Some(parent) = std::path::Path::new(out_path).parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
            tokio::fs::write(out_path, default_config)
                .await
                .with_context(|| format!("writing {out_path}"))?;

            output::print_success(&format!("Default config written to '{out_path}'"));
        }
    }
    Ok(())
}
