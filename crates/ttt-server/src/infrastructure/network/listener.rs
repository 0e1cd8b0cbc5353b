//! TCP accept loop.
//!
//! Binds the configured address, accepts connections, and hands each one to
//! its own Tokio task (see [`super::peer_conn`]).  The coordinator decides
//! whether a connection is seated or rejected; the accept loop never refuses
//! anything itself.
//!
//! Shutdown is cooperative: `accept()` is polled with a 200 ms timeout so the
//! loop notices when the shared `running` flag is cleared.

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{error, info};

use crate::application::coordinate_session::SessionCoordinator;
use crate::infrastructure::network::peer_conn::{handle_peer, SharedCoordinator};
use crate::infrastructure::storage::config::{GameConfig, ServerConfig};

/// How often the accept loop re-checks the shutdown flag.
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Error type for the server's network layer.
#[derive(Debug, Error)]
pub enum ServerNetworkError {
    #[error("bind failed on {addr}: {source}")]
    BindFailed {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("could not read local address: {0}")]
    LocalAddr(#[source] std::io::Error),
}

/// A bound listener plus the coordinator its connections share.
pub struct GameServer {
    listener: TcpListener,
    coordinator: SharedCoordinator,
    game: Arc<GameConfig>,
}

impl GameServer {
    /// Binds `config.network` and prepares an empty table.
    ///
    /// # Errors
    ///
    /// [`ServerNetworkError::BindFailed`] if the address is invalid, in use,
    /// or not permitted.
    pub async fn bind(config: &ServerConfig) -> Result<Self, ServerNetworkError> {
        let addr = config.network.bind_addr();
        let bound = TcpListener::bind(addr.as_str()).await;
        let listener = bound.map_err(|source| ServerNetworkError::BindFailed { addr, source })?;

        Ok(Self {
            listener,
            coordinator: Arc::new(Mutex::new(SessionCoordinator::new(
                config.game.max_name_len,
            ))),
            game: Arc::new(config.game.clone()),
        })
    }

    /// The address actually bound (useful when the configured port is 0).
    ///
    /// # Errors
    ///
    /// [`ServerNetworkError::LocalAddr`] if the OS cannot report it.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerNetworkError> {
        self.listener
            .local_addr()
            .map_err(ServerNetworkError::LocalAddr)
    }

    /// Accepts connections until `running` is set to `false`.
    pub async fn serve(self, running: Arc<AtomicBool>) {
        match self.listener.local_addr() {
            Ok(addr) => info!("tic-tac-toe server listening on {addr}"),
            Err(_) => info!("tic-tac-toe server listening"),
        }

        loop {
            if !running.load(Ordering::Relaxed) {
                info!("shutdown flag set; stopping accept loop");
                break;
            }

            match timeout(ACCEPT_POLL_INTERVAL, self.listener.accept()).await {
                Ok(Ok((stream, addr))) => {
                    info!("new connection from {addr}");
                    let coordinator = Arc::clone(&self.coordinator);
                    let game = Arc::clone(&self.game);
                    tokio::spawn(async move {
                        handle_peer(stream, addr, coordinator, game).await;
                    });
                }
                Ok(Err(e)) => {
                    // Transient accept error (e.g., too many open file descriptors).
                    error!("accept error: {e}");
                }
                Err(_) => {
                    // Timeout; loop back to check the flag.
                }
            }
        }
    }
}

/// Binds and serves in one call.
///
/// # Errors
///
/// Returns an error if the listener cannot be bound.
pub async fn run_server(
    config: ServerConfig,
    running: Arc<AtomicBool>,
) -> Result<(), ServerNetworkError> {
    let server = GameServer::bind(&config).await?;
    server.serve(running).await;
    Ok(())
}
