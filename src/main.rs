//! Playhead CLI - Transport/Time Controller
//!
//! Command-line interface for driving a transport against the real clock.

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use playhead::cli::{commands, Cli, Commands};
use playhead::TransportConfig;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logger
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("Playhead v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&cli)?;

    match cli.command {
        Some(cmd) => handle_command(cmd, config, cli.json).await,
        None => {
            println!("Playhead v{}", env!("CARGO_PKG_VERSION"));
            println!("Use --help for available commands");
            Ok(())
        }
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<TransportConfig> {
    let mut config = match &cli.config {
        Some(path) => TransportConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => TransportConfig::default(),
    };
    if let Some(fps) = cli.fps {
        config = config.with_frame_rate(fps);
        config.validate().context("invalid --fps")?;
    }
    Ok(config)
}

async fn handle_command(cmd: Commands, config: TransportConfig, json: bool) -> anyhow::Result<()> {
    match cmd {
        Commands::Play { seconds } => commands::play(config, json, seconds).await?,
        Commands::Animate { to_ms, duration_ms } => {
            commands::animate(config, json, to_ms, duration_ms).await?
        }
        Commands::Jump { to_ms } => commands::jump(config, json, to_ms).await?,
    }
    Ok(())
}
