//! Bit-preservation daemon.

use anyhow::{Context, Result};
use bitpres_core::config::AppConfig;
use bitpres_server::{Services, create_router};
use clap::Parser;
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// bitpresd - active bit preservation across replicas
#[derive(Parser, Debug)]
#[command(name = "bitpresd")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(
        short,
        long,
        env = "BITPRES_CONFIG",
        default_value = "config/bitpres.toml"
    )]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("bitpresd v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&args.config)?;

    bitpres_server::metrics::register_metrics();
    tracing::info!("Prometheus metrics registered");

    let services = Services::start(config.clone()).await?;
    let app = create_router(services.state.clone());

    let addr: SocketAddr = config.server.bind.parse().context("invalid bind address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutting down");
    services.shutdown().await;
    Ok(())
}

/// Load configuration from the TOML file (optional) and `BITPRES_` env vars.
fn load_config(path: &str) -> Result<AppConfig> {
    let mut figment = Figment::new();
    let has_config_file = std::path::Path::new(path).exists();
    if has_config_file {
        tracing::info!(config_path = %path, "Loading configuration from file");
        figment = figment.merge(Toml::file(path));
    } else {
        tracing::debug!("No config file found at {}", path);
    }

    let has_env_config =
        std::env::vars().any(|(key, _)| key.starts_with("BITPRES_") && key != "BITPRES_CONFIG");
    if !has_config_file && !has_env_config {
        anyhow::bail!(
            "No configuration provided.\n\n\
             Provide configuration via one of:\n  \
             1. Config file: bitpresd --config /path/to/bitpres.toml\n  \
             2. Environment variables prefixed BITPRES_ (nested keys split on __)\n\n\
             See config/bitpres.example.toml for an example configuration."
        );
    }

    figment
        .merge(Env::prefixed("BITPRES_").split("__"))
        .extract()
        .context("failed to load configuration")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}
