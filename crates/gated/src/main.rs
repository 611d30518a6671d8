//! Connection front-end daemon.
//!
//! Wires the static virtual host, the session verifier and the play
//! handler into the gate server, then runs until interrupted.

mod config;
mod hosts;
mod play;

use clap::Parser;
use config::ServerConfig;
use gate::{GateConfig, GateServer, RsaEncryptionFactory, Services};
use hosts::{StaticHostResolver, StaticVirtualHost};
use play::KeepAlivePlayFactory;
use session::HttpSessionVerifier;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gated")]
#[command(about = "Minecraft-compatible connection front-end", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "GATED_CONFIG")]
    config: Option<PathBuf>,

    /// Listening port override
    #[arg(short, long)]
    port: Option<u16>,

    /// Disable online-mode authentication
    #[arg(long)]
    offline: bool,

    /// Enable packet-level debug logging
    #[arg(short, long)]
    debug: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut config = match &cli.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    if let Some(port) = cli.port {
        config.port = port;
    }
    if cli.offline {
        config.online_mode = false;
    }

    let verifier = match &config.session_url {
        Some(url) => HttpSessionVerifier::with_base_url(url.clone()),
        None => HttpSessionVerifier::new(),
    };
    let verifier = Arc::new(verifier);
    let host = Arc::new(StaticVirtualHost::new(config.clone()));
    let services = Arc::new(Services {
        resolver: Arc::new(StaticHostResolver::new(host)),
        encryption_factory: Arc::new(RsaEncryptionFactory),
        session_verifier: verifier.clone(),
        play_factory: Arc::new(KeepAlivePlayFactory),
    });

    let mut server = GateServer::new(
        GateConfig {
            port: config.port,
            read_timeout: Duration::from_secs(config.timeout),
        },
        services,
    );
    server.start()?;

    let io = server.io_handle()?;
    io.block_on(tokio::signal::ctrl_c())?;
    info!("Interrupt received");

    server.shutdown();
    verifier.shutdown();
    Ok(())
}
