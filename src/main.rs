// src/main.rs

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

use reasoning_relay::config::RelayConfig;
use reasoning_relay::server;

#[derive(Parser)]
#[command(name = "reasoning-relay")]
#[command(about = "Relay a reasoning model's chain-of-thought into a synthesis model")]
struct Args {
    /// Bind host
    #[arg(long, env = "HOST")]
    host: Option<String>,

    /// Bind port
    #[arg(long, env = "PORT")]
    port: Option<u16>,

    /// Fallback log filter when RUST_LOG is unset
    #[arg(long, env = "LOG_LEVEL")]
    log_level: Option<String>,
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, draining connections...");
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    // CLI args > env vars (handled by clap) > defaults
    let mut config = RelayConfig::from_env();
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(level) = args.log_level {
        config.log_level = level;
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    fmt().with_env_filter(filter).init();

    info!(
        reasoning_provider = %config.reasoning_provider,
        reasoning_model = %config.reasoning_model,
        claude_provider = %config.claude_provider,
        claude_model = %config.claude_model,
        origin_reasoning = config.origin_reasoning,
        "Starting reasoning relay"
    );

    server::run(config, shutdown_signal()).await
}
