// Drover
// Main entry point for the drover binary

use clap::Parser;
use drover::cli::{Cli, Command};
use drover::config::Config;
use drover::handlers::{handle_call, handle_serve, OutputFormat};
use drover::telemetry::{init_telemetry, init_telemetry_with_level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    let version = env!("CARGO_PKG_VERSION");
    let commit = env!("GIT_COMMIT_HASH");
    let timestamp = env!("BUILD_TIMESTAMP");

    // Determine output format
    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    // Load configuration (or use custom path if provided)
    let config = match &cli.config {
        Some(config_path) => Config::load_from_path(config_path),
        None => Config::load_or_create(),
    };

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            init_telemetry();
            return Err(e.into());
        }
    };

    // --log wins over the config file; RUST_LOG wins over both
    init_telemetry_with_level(cli.log.as_deref().unwrap_or(&config.core.log_level));

    tracing::debug!("Drover v{} ({} - {})", version, commit, timestamp);

    match cli.command {
        Command::Serve { kind, bind } => handle_serve(kind, bind, &config).await,
        Command::Call {
            capability,
            endpoint,
            input,
            encrypt,
        } => handle_call(capability, endpoint, &input, encrypt, &config, format).await,
    }
}
