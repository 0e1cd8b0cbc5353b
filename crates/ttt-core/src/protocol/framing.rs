//! Reassembles complete frames from an arbitrary TCP byte stream.
//!
//! TCP delivers bytes, not messages: one `read` may return half a header, or
//! three frames glued together.  [`FrameReader`] buffers whatever arrives and
//! hands back one decoded [`GameMessage`] at a time.
//!
//! Bad input is handled in two tiers:
//!
//! - A frame whose header is sound but whose type code is unknown or whose
//!   payload does not parse is skipped.  Its length is known, so the stream
//!   stays aligned.
//! - A wrong version byte or an oversized length means the stream can no
//!   longer be trusted.  [`FrameReader::next_message`] returns the error and
//!   the caller should drop the connection.

use tracing::warn;

use crate::protocol::codec::{decode_message, frame_length, ProtocolError};
use crate::protocol::messages::GameMessage;

/// Growable receive buffer that yields decoded messages.
#[derive(Debug, Default)]
pub struct FrameReader {
    buf: Vec<u8>,
}

impl FrameReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends freshly received bytes.
    pub fn extend(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Pops the next complete message.
    ///
    /// Returns `None` when more bytes are needed, `Some(Ok(_))` for a message,
    /// and `Some(Err(_))` only for a fatal stream error.  Recoverable frame
    /// errors are logged and skipped internally.
    pub fn next_message(&mut self) -> Option<Result<GameMessage, ProtocolError>> {
        loop {
            let total = match frame_length(&self.buf) {
                Ok(total) => total,
                Err(ProtocolError::InsufficientData { .. }) => return None,
                Err(e) => return Some(Err(e)),
            };

            let result = decode_message(&self.buf[..total]);
            self.buf.drain(..total);

            match result {
                Ok((msg, _)) => return Some(Ok(msg)),
                Err(e) if e.is_fatal() => return Some(Err(e)),
                Err(e) => {
                    warn!("skipping undecodable frame ({total} bytes): {e}");
                }
            }
        }
    }
}
