//! MeshForge command-line front end.
//!
//! Loads configuration, initializes logging, and hands off to the selected
//! subcommand.

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt};

use meshforge_core::config::LoggingConfig;

mod commands;
mod output;

use commands::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match cli.load_config() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e:#}");
            std::process::exit(1);
        }
    };

    init_logging(&config.logging, cli.verbose);
    tracing::debug!(config = %cli.config, env = %cli.env, "Configuration loaded");

    if let Err(e) = cli.execute(config).await {
        output::print_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

/// Initialize tracing. `RUST_LOG` wins over the configured level; logs go
/// to stderr so command output stays machine-readable.
fn init_logging(config: &LoggingConfig, verbose: bool) {
    let level = if verbose { "debug" } else { config.level.as_str() };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match config.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .with_writer(std::io::stderr)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}
