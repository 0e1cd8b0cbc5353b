//! Network infrastructure for the client.
//!
//! [`ServerConnection`] owns the TCP stream to the server.  Reads go through
//! a [`FrameReader`] so a message split across TCP segments, or several
//! messages arriving in one segment, are both handled.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tracing::{debug, info};

use ttt_core::protocol::{encode_message_now, FrameReader, SequenceCounter};
use ttt_core::{GameMessage, ProtocolError};

use crate::application::game_loop::{GameLink, LinkError};

/// Errors that can occur in the client network layer.
#[derive(Debug, Error)]
pub enum ClientNetworkError {
    /// TCP connection to the server failed.
    #[error("failed to connect to server at {addr}: {source}")]
    ConnectFailed {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    /// The server did not accept the connection in time.
    #[error("timed out after {timeout:?} connecting to server at {addr}")]
    ConnectTimeout { addr: String, timeout: Duration },
    /// An I/O error occurred on the established connection.
    #[error("connection I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The server's byte stream can no longer be decoded.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
    /// The connection was closed by the remote side.
    #[error("connection closed by server")]
    Closed,
}

const READ_BUFFER_SIZE: usize = 1024;

/// Reads the next complete message from `reader`, buffering through `frames`.
///
/// Cancel safe: bytes already read stay in `frames`, so wrapping this in a
/// timeout and retrying loses nothing.
///
/// # Errors
///
/// [`ClientNetworkError::Closed`] on EOF, [`ClientNetworkError::Protocol`]
/// for an undecodable stream, [`ClientNetworkError::Io`] for socket errors.
pub async fn read_message<R>(
    reader: &mut R,
    frames: &mut FrameReader,
) -> Result<GameMessage, ClientNetworkError>
where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; READ_BUFFER_SIZE];
    loop {
        if let Some(next) = frames.next_message() {
            return Ok(next?);
        }
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            return Err(ClientNetworkError::Closed);
        }
        frames.extend(&buf[..n]);
    }
}

/// Encodes `msg` and writes it to `writer`.
///
/// # Errors
///
/// [`ClientNetworkError::Protocol`] if the message cannot be encoded,
/// [`ClientNetworkError::Io`] if the write fails.
pub async fn write_message<W>(
    writer: &mut W,
    msg: &GameMessage,
    seq: &SequenceCounter,
) -> Result<(), ClientNetworkError>
where
    W: AsyncWrite + Unpin,
{
    let bytes = encode_message_now(msg, seq.next())?;
    writer.write_all(&bytes).await?;
    writer.flush().await?;
    Ok(())
}

/// An open connection to the game server.
pub struct ServerConnection {
    reader: OwnedReadHalf,
    writer: OwnedWriteHalf,
    frames: FrameReader,
    seq: SequenceCounter,
}

impl ServerConnection {
    /// Connects to `addr` (`host:port`), giving up after `timeout`.
    ///
    /// # Errors
    ///
    /// [`ClientNetworkError::ConnectTimeout`] or
    /// [`ClientNetworkError::ConnectFailed`].
    pub async fn connect(addr: &str, timeout: Duration) -> Result<Self, ClientNetworkError> {
        let stream = match tokio::time::timeout(timeout, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => {
                return Err(ClientNetworkError::ConnectFailed {
                    addr: addr.to_string(),
                    source,
                })
            }
            Err(_) => {
                return Err(ClientNetworkError::ConnectTimeout {
                    addr: addr.to_string(),
                    timeout,
                })
            }
        };
        if let Err(e) = stream.set_nodelay(true) {
            debug!("could not set TCP_NODELAY: {e}");
        }
        info!("connected to server at {addr}");

        let (reader, writer) = stream.into_split();
        Ok(Self {
            reader,
            writer,
            frames: FrameReader::new(),
            seq: SequenceCounter::new(),
        })
    }

    /// Sends one message.
    ///
    /// # Errors
    ///
    /// See [`write_message`].
    pub async fn send(&mut self, msg: &GameMessage) -> Result<(), ClientNetworkError> {
        write_message(&mut self.writer, msg, &self.seq).await
    }

    /// Waits up to `timeout` for the next message.  `Ok(None)` means nothing
    /// arrived in time, which is not an error; call again to keep waiting.
    ///
    /// # Errors
    ///
    /// See [`read_message`].
    pub async fn recv_timeout(
        &mut self,
        timeout: Duration,
    ) -> Result<Option<GameMessage>, ClientNetworkError> {
        match tokio::time::timeout(timeout, read_message(&mut self.reader, &mut self.frames)).await
        {
            Ok(result) => result.map(Some),
            Err(_) => Ok(None),
        }
    }
}

impl From<ClientNetworkError> for LinkError {
    fn from(e: ClientNetworkError) -> Self {
        match e {
            ClientNetworkError::Closed => LinkError::Closed,
            other => LinkError::Failed(other.to_string()),
        }
    }
}

#[async_trait]
impl GameLink for ServerConnection {
    async fn recv(&mut self, timeout: Duration) -> Result<Option<GameMessage>, LinkError> {
        Ok(self.recv_timeout(timeout).await?)
    }

    async fn send(&mut self, msg: &GameMessage) -> Result<(), LinkError> {
        Ok(ServerConnection::send(self, msg).await?)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
