//! Health-risk - Main Entry Point
//!
//! Trains the classification pipeline and serves predictions from the CLI or the web form.

use clap::Parser;
use health_risk::cli::{cmd_interactive, cmd_predict, cmd_serve, cmd_train, Cli, Commands};
use std::path::Path;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "health_risk=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Train { config }) => {
            // Grid search saturates rayon; keep it off the async runtime
            tokio::task::spawn_blocking(move || cmd_train(&config)).await??;
        }
        Some(Commands::Predict { artifacts, input }) => {
            cmd_predict(&artifacts, &input)?;
        }
        Some(Commands::Interactive { artifacts }) => {
            tokio::task::spawn_blocking(move || cmd_interactive(&artifacts)).await??;
        }
        Some(Commands::Serve { artifacts, host, port }) => {
            cmd_serve(&artifacts, &host, port).await?;
        }
        None => {
            let artifacts = std::env::var("ARTIFACTS_DIR").unwrap_or_else(|_| "./artifacts".to_string());
            tokio::task::spawn_blocking(move || cmd_interactive(Path::new(&artifacts))).await??;
        }
    }

    Ok(())
}
