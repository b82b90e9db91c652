//! CLI command definitions and dispatch.

pub mod config;
pub mod convert;
pub mod formats;
pub mod health;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use meshforge_core::config::AppConfig;
use meshforge_service::{ConversionService, ServiceBuilder};

use crate::output::OutputFormat;

/// MeshForge: CAD to mesh conversion
#[derive(Debug, Parser)]
#[command(name = "meshforge", version, about, long_about = None)]
pub struct Cli {
    /// Base configuration file (with or without `.toml`)
    #[arg(short, long, default_value = "config/default", env = "MESHFORGE_CONFIG")]
    pub config: String,

    /// Environment overlay loaded from `config/<env>.toml`
    #[arg(long, default_value = "development", env = "MESHFORGE_ENV")]
    pub env: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Log at debug level unless RUST_LOG is set
    #[arg(short, long)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Convert CAD or mesh files
    Convert(convert::ConvertArgs),
    /// List supported input and output formats
    Formats,
    /// Report storage, kernel and worker health
    Health,
    /// Configuration management
    Config(config::ConfigArgs),
}

impl Cli {
    /// Load configuration for this invocation
    pub fn load_config(&self) -> Result<AppConfig> {
        AppConfig::load_from(&self.config, &self.env)
            .with_context(|| format!("loading '{}' (env: {})", self.config, self.env))
    }

    /// Execute the CLI command
    pub async fn execute(&self, app_config: AppConfig) -> Result<()> {
        match &self.command {
            Commands::Convert(args) => convert::execute(args, app_config, self.format).await,
            Commands::Formats => formats::execute(self.format),
            Commands::Health => health::execute(app_config, self.format).await,
            Commands::Config(args) => {
                config::execute(args, &app_config, &self.config, self.format).await
            }
        }
    }
}

/// Helper: assemble the conversion service from configuration
pub async fn build_service(config: AppConfig) -> Result<ConversionService> {
    ServiceBuilder::new(config)
        .build()
        .await
        .context("starting conversion service")
}
