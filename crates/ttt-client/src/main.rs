//! Tic-tac-toe console client entry point.
//!
//! # Usage
//!
//! ```text
//! ttt-client [OPTIONS]
//!
//! Options:
//!   --host <HOST>              Server host [default: 127.0.0.1]
//!   --port <PORT>              Server port [default: 5555]
//!   --name <NAME>              Display name (prompted for when absent)
//!   --connect-timeout <SECS>   Give up connecting after this long [default: 10]
//!   --read-timeout <SECS>      Socket read poll interval [default: 10]
//! ```
//!
//! # Message loop
//!
//! ```text
//! connect ──► Assign ──► send Join ──► loop {
//!     recv ──► ClientSession::handle ──► Render / Status / PromptMove / Send
//! } until Finish (opponent left, server full, or EOF) or the player quits
//! ```

use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use ttt_client::application::game_loop::run_game;
use ttt_client::application::play::ClientSession;
use ttt_client::infrastructure::console::{prompt_name, TerminalConsole};
use ttt_client::infrastructure::network::ServerConnection;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Play tic-tac-toe against another player over the network.
#[derive(Debug, Parser)]
#[command(name = "ttt-client", about = "Networked tic-tac-toe client", version)]
struct Cli {
    /// Hostname or IP address of the server.
    #[arg(long, default_value = "127.0.0.1", env = "TTT_HOST")]
    host: String,

    /// TCP port of the server.
    #[arg(long, default_value_t = 5555, env = "TTT_PORT")]
    port: u16,

    /// Display name shown to the opponent.
    #[arg(long, env = "TTT_NAME")]
    name: Option<String>,

    /// Seconds to wait for the connection to be accepted.
    #[arg(long, default_value_t = 10, value_name = "SECS")]
    connect_timeout: u64,

    /// Seconds per socket read before checking back in.  Expiry is not an
    /// error; the client keeps waiting.
    #[arg(long, default_value_t = 10, value_name = "SECS")]
    read_timeout: u64,
}

impl Cli {
    fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The `--name` value, if it is not blank.
    fn given_name(&self) -> Option<String> {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Default to `warn` so log lines do not interleave with the board.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let name = match cli.given_name() {
        Some(name) => name,
        None => tokio::task::spawn_blocking(prompt_name)
            .await
            .context("name prompt task failed")??,
    };

    let addr = cli.server_addr();
    println!("Connecting to {addr}...");
    let mut conn = ServerConnection::connect(&addr, Duration::from_secs(cli.connect_timeout))
        .await
        .with_context(|| format!("could not reach the tic-tac-toe server at {addr}"))?;

    let mut console = TerminalConsole;
    let end = run_game(
        &mut conn,
        &mut console,
        ClientSession::new(name),
        Duration::from_secs(cli.read_timeout),
    )
    .await
    .context("game session failed")?;
    debug!("game ended: {end:?}");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        // Arrange / Act
        let cli = Cli::parse_from(["ttt-client"]);

        // Assert
        assert_eq!(cli.server_addr(), "127.0.0.1:5555");
        assert_eq!(cli.connect_timeout, 10);
        assert_eq!(cli.read_timeout, 10);
        assert_eq!(cli.given_name(), None);
    }

    #[test]
    fn test_blank_name_flag_counts_as_missing() {
        let cli = Cli::parse_from(["ttt-client", "--name", "   "]);
        assert_eq!(cli.given_name(), None);

        let cli = Cli::parse_from(["ttt-client", "--name", " Ada "]);
        assert_eq!(cli.given_name(), Some("Ada".to_string()));
    }
}
