//! # Basalt Server
//!
//! Serves the handshake and status phases of the basalt protocol.
//!
//! ## Usage
//!
//! ```bash
//! basalt_server --config basalt.toml --bind 0.0.0.0:25565 --log-level debug
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use basalt_networking::server::{GameServer, JsonStatus};
use basalt_shared::{ConfigResult, ServerConfig};
use clap::Parser;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "basalt_server", version, about = "Basalt protocol server")]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listen address
    #[arg(short, long)]
    bind: Option<SocketAddr>,

    /// Override the log filter (RUST_LOG still wins)
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    fn resolve(&self) -> ConfigResult<ServerConfig> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::load(path)?,
            None => ServerConfig::default(),
        };
        if let Some(bind) = self.bind {
            config.bind_address = bind;
        }
        if let Some(level) = &self.log_level {
            config.log_level.clone_from(level);
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match cli.resolve() {
        Ok(config) => config,
        Err(error) => {
            eprintln!("basalt_server: {error}");
            return ExitCode::FAILURE;
        }
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)))
        .with(fmt::layer())
        .init();

    println!("╔══════════════════════════════════════════════════════════════════╗");
    println!("║         BASALT SERVER                                            ║");
    println!("╚══════════════════════════════════════════════════════════════════╝");
    println!();
    println!("┌─ CONFIGURATION ─────────────────────────────────────────────────┐");
    println!("│ Bind Address:       {}", config.bind_address);
    println!("│ Read Timeout:       {} ms", config.read_timeout_ms);
    println!("│ Poll Interval:      {} ms", config.poll_interval_ms);
    println!("│ Version:            {} ({})", config.status.version_name, config.status.protocol_version);
    println!("└──────────────────────────────────────────────────────────────────┘");
    println!();

    let status = match JsonStatus::from_config(&config.status) {
        Ok(status) => status,
        Err(error) => {
            tracing::error!(%error, "failed to render status document");
            return ExitCode::FAILURE;
        }
    };

    let server = match GameServer::bind(config, Arc::new(status)).await {
        Ok(server) => server,
        Err(error) => {
            tracing::error!(%error, "failed to bind");
            return ExitCode::FAILURE;
        }
    };

    tokio::select! {
        () = server.run() => {}
        result = tokio::signal::ctrl_c() => {
            if let Err(error) = result {
                tracing::error!(%error, "failed to listen for shutdown signal");
                return ExitCode::FAILURE;
            }
            tracing::info!("shutting down");
        }
    }
    ExitCode::SUCCESS
}
