//! Tic-tac-toe game server entry point.
//!
//! # Usage
//!
//! ```text
//! ttt-server [OPTIONS]
//!
//! Options:
//!   --config <PATH>   TOML config file [default: ttt-server.toml]
//!   --bind   <ADDR>   Override [network].bind_address
//!   --port   <PORT>   Override [network].port
//! ```
//!
//! Log verbosity comes from `RUST_LOG` when set, otherwise from
//! `[logging].level` in the config file.

use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ttt_server::infrastructure::network::run_server;
use ttt_server::infrastructure::storage::config::{load_config, ServerConfig};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Two-player tic-tac-toe server.
#[derive(Debug, Parser)]
#[command(name = "ttt-server", about = "Two-player tic-tac-toe server", version)]
struct Cli {
    /// Path to the TOML configuration file.  A missing file means defaults.
    #[arg(long, default_value = "ttt-server.toml", env = "TTT_CONFIG")]
    config: PathBuf,

    /// IP address to listen on.
    #[arg(long, env = "TTT_BIND")]
    bind: Option<String>,

    /// TCP port to listen on.
    #[arg(long, env = "TTT_PORT")]
    port: Option<u16>,
}

impl Cli {
    /// Loads the config file and applies command-line overrides.
    fn into_server_config(self) -> anyhow::Result<ServerConfig> {
        let mut config = load_config(&self.config)
            .with_context(|| format!("failed to load config from {}", self.config.display()))?;
        if let Some(bind) = self.bind {
            config.network.bind_address = bind;
        }
        if let Some(port) = self.port {
            config.network.port = port;
        }
        Ok(config)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Cli::parse().into_server_config()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .init();

    info!(
        "tic-tac-toe server starting on {}",
        config.network.bind_addr()
    );

    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C; shutting down");
                running_clone.store(false, Ordering::Relaxed);
            }
            Err(e) => {
                tracing::error!("failed to listen for Ctrl+C signal: {e}");
            }
        }
    });

    run_server(config, running)
        .await
        .context("server failed")?;

    info!("tic-tac-toe server stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
