//! Ship parties HTTP server.
//!
//! Serves the deterministic engine over HTTP. Retrieval and AI
//! collaborators are deployment specific and not wired here, so requests
//! that want AI report `ai_status = "failed"` ("AI unavailable").

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::signal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use ship_parties::config::EngineConfig;
use ship_parties::engine::PartiesEngine;
use ship_parties::inference::Mode;
use ship_parties::transport;

#[derive(Debug, Parser)]
#[command(name = "ship-parties-server")]
#[command(about = "HTTP server for ship parties resolution")]
#[command(version)]
struct Args {
    /// YAML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Listen address (overrides the config file).
    #[arg(long)]
    bind: Option<SocketAddr>,
    /// Default AI mode: strict, balanced or aggressive.
    #[arg(long)]
    mode: Option<Mode>,
}

fn load_config(args: &Args) -> Result<EngineConfig, Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    config.apply_env_overrides()?;
    if let Some(bind) = args.bind {
        config.server.bind = bind.to_string();
    }
    if let Some(mode) = args.mode {
        config.default_mode = mode;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ship_parties=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;
    let addr: SocketAddr = config.server.bind.parse()?;

    let engine = Arc::new(PartiesEngine::from_config(&config));
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %addr,
        default_mode = %config.default_mode,
        "starting ship parties server"
    );

    let listener = TcpListener::bind(addr).await?;
    transport::serve(engine, listener, async {
        let _ = signal::ctrl_c().await;
    })
    .await?;

    tracing::info!("shut down");
    Ok(())
}
