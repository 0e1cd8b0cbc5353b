//! One task per connected peer.
//!
//! Each task owns its socket and multiplexes three event sources with
//! `tokio::select!`:
//!
//! - bytes from the socket, fed through a [`FrameReader`] and dispatched to
//!   the coordinator;
//! - frames queued for this peer by the coordinator (via [`ChannelOutbox`]),
//!   written to the socket in order;
//! - a close request from the coordinator, after which queued frames are
//!   flushed and the socket is shut down.
//!
//! Until the peer has sent `Join`, a name deadline is also armed.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::{Mutex, Notify};
use tracing::{debug, info, warn};

use ttt_core::protocol::{encode_message_now, FrameReader, SequenceCounter};
use ttt_core::GameMessage;

use crate::application::coordinate_session::{
    DeliveryError, MoveDisposition, PeerId, PeerOutbox, SessionCoordinator,
};
use crate::infrastructure::storage::config::GameConfig;

/// Coordinator shared by every peer task.
pub type SharedCoordinator = Arc<Mutex<SessionCoordinator>>;

/// Frames a single peer may have queued before further messages are dropped.
pub const OUTBOUND_QUEUE_CAPACITY: usize = 32;

const READ_BUFFER_SIZE: usize = 1024;

// ── Outbox ────────────────────────────────────────────────────────────────────

/// [`PeerOutbox`] backed by a bounded channel into the peer's task.
pub struct ChannelOutbox {
    tx: mpsc::Sender<GameMessage>,
    shutdown: Arc<Notify>,
}

impl ChannelOutbox {
    pub fn new(tx: mpsc::Sender<GameMessage>, shutdown: Arc<Notify>) -> Self {
        Self { tx, shutdown }
    }
}

impl PeerOutbox for ChannelOutbox {
    fn deliver(&self, msg: GameMessage) -> Result<(), DeliveryError> {
        self.tx.try_send(msg).map_err(|e| match e {
            TrySendError::Full(_) => DeliveryError::Full,
            TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }

    fn close(&self) {
        // notify_one stores a permit, so a close issued before the task
        // reaches its select is not lost.
        self.shutdown.notify_one();
    }
}

// ── Per-peer task ─────────────────────────────────────────────────────────────

/// Why a peer's loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Exit {
    /// The coordinator already removed this peer and asked it to close.
    Closed,
    /// The peer went away on its own; the coordinator must be told.
    Departed,
}

/// Runs the complete lifecycle of one TCP connection.
pub async fn handle_peer(
    stream: TcpStream,
    addr: SocketAddr,
    coordinator: SharedCoordinator,
    game: Arc<GameConfig>,
) {
    if let Err(e) = stream.set_nodelay(true) {
        debug!("{addr}: could not set TCP_NODELAY: {e}");
    }
    let (mut reader, mut writer) = stream.into_split();
    let (tx, mut rx) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);
    let shutdown = Arc::new(Notify::new());
    let seq = SequenceCounter::new();

    let admitted = {
        let outbox = ChannelOutbox::new(tx, Arc::clone(&shutdown));
        coordinator.lock().await.admit(Box::new(outbox))
    };
    let peer = match admitted {
        Ok(admission) => {
            info!("{addr}: seated as {} ({})", admission.symbol, admission.peer);
            admission.peer
        }
        Err(e) => {
            info!("{addr}: rejected: {e}");
            flush_and_close(&mut rx, &mut writer, &seq, addr).await;
            return;
        }
    };

    let mut frames = FrameReader::new();
    let mut buf = [0u8; READ_BUFFER_SIZE];
    let mut named = false;
    let name_deadline = tokio::time::sleep(game.name_timeout());
    tokio::pin!(name_deadline);

    let exit = loop {
        tokio::select! {
            read = reader.read(&mut buf) => {
                let n = match read {
                    Ok(0) => {
                        info!("{addr}: connection closed by peer");
                        break Exit::Departed;
                    }
                    Ok(n) => n,
                    Err(e) => {
                        warn!("{addr}: read error: {e}");
                        break Exit::Departed;
                    }
                };
                frames.extend(&buf[..n]);
                match drain_inbound(&mut frames, peer, &mut named, &coordinator, &game, addr).await {
                    Some(exit) => break exit,
                    None => continue,
                }
            }
            Some(msg) = rx.recv() => {
                if let Err(e) = write_frame(&mut writer, &msg, &seq).await {
                    warn!("{addr}: write error: {e}");
                    break Exit::Departed;
                }
            }
            _ = shutdown.notified() => {
                debug!("{addr}: close requested");
                break Exit::Closed;
            }
            _ = &mut name_deadline, if !named => {
                warn!("{addr}: no name within {:?}; disconnecting", game.name_timeout());
                break Exit::Departed;
            }
        }
    };

    match exit {
        Exit::Departed => {
            let seated = {
                let mut coordinator = coordinator.lock().await;
                coordinator.leave(peer);
                coordinator.seated()
            };
            info!("{addr}: departed; {seated} seat(s) still taken");
            let _ = writer.shutdown().await;
        }
        Exit::Closed => flush_and_close(&mut rx, &mut writer, &seq, addr).await,
    }
    info!("{addr}: peer task finished");
}

/// Dispatches every complete message in `frames`.  Returns `Some` when the
/// connection should end.
async fn drain_inbound(
    frames: &mut FrameReader,
    peer: PeerId,
    named: &mut bool,
    coordinator: &SharedCoordinator,
    game: &Arc<GameConfig>,
    addr: SocketAddr,
) -> Option<Exit> {
    while let Some(next) = frames.next_message() {
        let msg = match next {
            Ok(msg) => msg,
            Err(e) => {
                warn!("{addr}: unrecoverable stream error: {e}");
                return Some(Exit::Departed);
            }
        };

        match msg {
            GameMessage::Join { name } => {
                *named |= coordinator.lock().await.register_name(peer, &name);
            }
            GameMessage::MoveRequest { cell } => {
                let disposition = coordinator.lock().await.submit_move(peer, cell);
                if let MoveDisposition::RoundOver {
                    session_id,
                    round_number,
                } = disposition
                {
                    schedule_restart(Arc::clone(coordinator), game.round_reset_delay(), session_id, round_number);
                }
            }
            GameMessage::Quit => {
                info!("{addr}: quit");
                return Some(Exit::Departed);
            }
            other => {
                coordinator
                    .lock()
                    .await
                    .refuse_message(peer, other.message_type());
            }
        }
    }
    None
}

fn schedule_restart(
    coordinator: SharedCoordinator,
    delay: std::time::Duration,
    session_id: uuid::Uuid,
    round_number: u32,
) {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        coordinator
            .lock()
            .await
            .restart_round(session_id, round_number);
    });
}

async fn write_frame(
    writer: &mut OwnedWriteHalf,
    msg: &GameMessage,
    seq: &SequenceCounter,
) -> std::io::Result<()> {
    match encode_message_now(msg, seq.next()) {
        Ok(bytes) => writer.write_all(&bytes).await,
        Err(e) => {
            warn!("dropping unencodable {:?}: {e}", msg.message_type());
            Ok(())
        }
    }
}

/// Writes whatever is already queued, then shuts the socket down.
async fn flush_and_close(
    rx: &mut mpsc::Receiver<GameMessage>,
    writer: &mut OwnedWriteHalf,
    seq: &SequenceCounter,
    addr: SocketAddr,
) {
    while let Ok(msg) = rx.try_recv() {
        if let Err(e) = write_frame(writer, &msg, seq).await {
            debug!("{addr}: write error while flushing: {e}");
            break;
        }
    }
    let _ = writer.shutdown().await;
}
