//! Binary codec for encoding and decoding tic-tac-toe protocol messages.
//!
//! Wire format:
//! ```text
//! [version:1][msg_type:1][reserved:2][payload_len:4][seq:8][timestamp_us:8][payload:N]
//! ```
//! Total header size: 24 bytes. All multi-byte integers are big-endian.
//! Strings are a 2-byte length prefix followed by UTF-8 bytes.

use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;

use crate::domain::board::{Symbol, BOARD_CELLS};
use crate::protocol::messages::{
    BoardStateMessage, ErrorCode, ErrorMessage, GameMessage, GameOutcome, MessageType,
    HEADER_SIZE, MAX_PAYLOAD_SIZE, PROTOCOL_VERSION,
};

/// Errors that can occur during message encoding or decoding.
#[derive(Debug, Error, PartialEq)]
pub enum ProtocolError {
    /// The byte slice is shorter than the minimum required length.
    #[error("insufficient data: need at least {needed} bytes, got {available}")]
    InsufficientData { needed: usize, available: usize },

    /// The message type byte in the header is not a recognized value.
    #[error("unknown message type: 0x{0:02X}")]
    UnknownMessageType(u8),

    /// The protocol version in the header is not supported.
    #[error("unsupported protocol version: {0}")]
    UnsupportedVersion(u8),

    /// The payload could not be parsed (field value out of range, UTF-8 error, etc.).
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// The header declares a payload larger than [`MAX_PAYLOAD_SIZE`].
    #[error("payload too large: {declared} bytes (limit {limit})", limit = MAX_PAYLOAD_SIZE)]
    PayloadTooLarge { declared: usize },
}

impl ProtocolError {
    /// True when the stream itself can no longer be trusted, as opposed to a
    /// single bad frame whose length was still readable.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ProtocolError::UnsupportedVersion(_) | ProtocolError::PayloadTooLarge { .. }
        )
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Encodes a [`GameMessage`] into a byte vector including the 24-byte header.
///
/// The sequence number is **not** set by this function – pass a pre-incremented
/// value from a [`crate::protocol::SequenceCounter`].
///
/// # Errors
///
/// Returns [`ProtocolError::PayloadTooLarge`] if the payload would exceed
/// [`MAX_PAYLOAD_SIZE`] (only possible with very long names).
///
/// # Examples
///
/// ```rust
/// use ttt_core::protocol::{encode_message, decode_message};
/// use ttt_core::protocol::messages::GameMessage;
///
/// let msg = GameMessage::MoveRequest { cell: 4 };
/// let bytes = encode_message(&msg, 0, 0).unwrap();
/// let (decoded, consumed) = decode_message(&bytes).unwrap();
/// assert_eq!(decoded, msg);
/// assert_eq!(consumed, bytes.len());
/// ```
pub fn encode_message(
    msg: &GameMessage,
    sequence_number: u64,
    timestamp_us: u64,
) -> Result<Vec<u8>, ProtocolError> {
    let payload = encode_payload(msg);
    if payload.len() > MAX_PAYLOAD_SIZE {
        return Err(ProtocolError::PayloadTooLarge {
            declared: payload.len(),
        });
    }
    let payload_len = payload.len() as u32;

    let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len());

    // Header: version (1) + msg_type (1) + reserved (2) + payload_len (4) +
    //         seq (8) + timestamp_us (8) = 24 bytes
    buf.push(PROTOCOL_VERSION);
    buf.push(msg.message_type() as u8);
    buf.push(0x00); // reserved
    buf.push(0x00); // reserved
    buf.extend_from_slice(&payload_len.to_be_bytes());
    buf.extend_from_slice(&sequence_number.to_be_bytes());
    buf.extend_from_slice(&timestamp_us.to_be_bytes());

    buf.extend_from_slice(&payload);
    Ok(buf)
}

/// Encodes a [`GameMessage`] using the current system time as the timestamp.
///
/// # Errors
///
/// Same as [`encode_message`].
pub fn encode_message_now(
    msg: &GameMessage,
    sequence_number: u64,
) -> Result<Vec<u8>, ProtocolError> {
    encode_message(msg, sequence_number, current_timestamp_us())
}

/// Microseconds since the Unix epoch, or 0 if the clock is before it.
pub fn current_timestamp_us() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}

/// Returns the total length (header + payload) of the frame at the start of
/// `bytes`, validating only the header.
///
/// # Errors
///
/// [`ProtocolError::InsufficientData`] when the header or payload has not
/// fully arrived yet; [`ProtocolError::UnsupportedVersion`] and
/// [`ProtocolError::PayloadTooLarge`] for headers that cannot be trusted.
pub fn frame_length(bytes: &[u8]) -> Result<usize, ProtocolError> {
    if bytes.len() < HEADER_SIZE {
        return Err(ProtocolError::InsufficientData {
            needed: HEADER_SIZE,
            available: bytes.len(),
        });
    }

    let version = bytes[0];
    if version != PROTOCOL_VERSION {
        return Err(ProtocolError::UnsupportedVersion(version));
    }

    let payload_len = u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]) as usize;
    if payload_len > MAX_PAYLOAD_SIZE {
        return Err(ProtocolError::PayloadTooLarge {
            declared: payload_len,
        });
    }

    let total_needed = HEADER_SIZE + payload_len;
    if bytes.len() < total_needed {
        return Err(ProtocolError::InsufficientData {
            needed: total_needed,
            available: bytes.len(),
        });
    }
    Ok(total_needed)
}

/// Decodes one [`GameMessage`] from the beginning of `bytes`.
///
/// Returns the decoded message and the total number of bytes consumed
/// (header + payload), so the caller can advance their read cursor.
///
/// # Errors
///
/// Returns [`ProtocolError`] if the bytes are incomplete or malformed.
pub fn decode_message(bytes: &[u8]) -> Result<(GameMessage, usize), ProtocolError> {
    let total = frame_length(bytes)?;

    let msg_type_byte = bytes[1];
    let msg_type = MessageType::try_from(msg_type_byte)
        .map_err(|_| ProtocolError::UnknownMessageType(msg_type_byte))?;

    // bytes[2..4] are reserved – ignored on decode

    let payload = &bytes[HEADER_SIZE..total];
    let msg = decode_payload(msg_type, payload)?;
    Ok((msg, total))
}

// ── Payload encoding ──────────────────────────────────────────────────────────

fn encode_payload(msg: &GameMessage) -> Vec<u8> {
    let mut buf = Vec::new();
    match msg {
        GameMessage::Join { name } => write_length_prefixed_string(&mut buf, name),
        GameMessage::MoveRequest { cell } => buf.push(*cell),
        GameMessage::Quit => {} // empty payload
        GameMessage::Assign { symbol } => buf.push(*symbol as u8),
        GameMessage::OpponentJoined { name } => write_length_prefixed_string(&mut buf, name),
        GameMessage::GameStart { x_name, o_name } => {
            write_length_prefixed_string(&mut buf, x_name);
            write_length_prefixed_string(&mut buf, o_name);
        }
        GameMessage::BoardState(m) => encode_board_state(&mut buf, m),
        GameMessage::GameOver(outcome) => encode_game_over(&mut buf, outcome),
        GameMessage::OpponentDisconnected => {}
        GameMessage::Error(m) => {
            buf.push(m.code as u8);
            write_length_prefixed_string(&mut buf, &m.description);
        }
    }
    buf
}

fn encode_board_state(buf: &mut Vec<u8>, m: &BoardStateMessage) {
    for cell in &m.cells {
        buf.push(symbol_byte(*cell));
    }
    buf.push(symbol_byte(m.to_move));
}

fn encode_game_over(buf: &mut Vec<u8>, outcome: &GameOutcome) {
    match outcome {
        GameOutcome::Win { symbol, name } => {
            buf.push(0x01);
            buf.push(*symbol as u8);
            write_length_prefixed_string(buf, name);
        }
        GameOutcome::Draw => buf.push(0x02),
    }
}

/// `0` for none, otherwise the symbol's discriminant.
fn symbol_byte(symbol: Option<Symbol>) -> u8 {
    symbol.map_or(0x00, |s| s as u8)
}

// ── Payload decoding ──────────────────────────────────────────────────────────

fn decode_payload(msg_type: MessageType, p: &[u8]) -> Result<GameMessage, ProtocolError> {
    match msg_type {
        MessageType::Join => {
            let (name, _) = read_length_prefixed_string(p, 0)?;
            Ok(GameMessage::Join { name })
        }
        MessageType::MoveRequest => {
            require_len(p, 1, "MoveRequest")?;
            Ok(GameMessage::MoveRequest { cell: p[0] })
        }
        MessageType::Quit => Ok(GameMessage::Quit),
        MessageType::Assign => {
            require_len(p, 1, "Assign")?;
            Ok(GameMessage::Assign {
                symbol: read_symbol(p[0])?,
            })
        }
        MessageType::OpponentJoined => {
            let (name, _) = read_length_prefixed_string(p, 0)?;
            Ok(GameMessage::OpponentJoined { name })
        }
        MessageType::GameStart => {
            let (x_name, next) = read_length_prefixed_string(p, 0)?;
            let (o_name, _) = read_length_prefixed_string(p, next)?;
            Ok(GameMessage::GameStart { x_name, o_name })
        }
        MessageType::BoardState => decode_board_state(p).map(GameMessage::BoardState),
        MessageType::GameOver => decode_game_over(p).map(GameMessage::GameOver),
        MessageType::OpponentDisconnected => Ok(GameMessage::OpponentDisconnected),
        MessageType::Error => decode_error(p).map(GameMessage::Error),
    }
}

fn decode_board_state(p: &[u8]) -> Result<BoardStateMessage, ProtocolError> {
    // 9 cells + 1 to_move
    require_len(p, BOARD_CELLS + 1, "BoardState")?;
    let mut cells = [None; BOARD_CELLS];
    for (i, cell) in cells.iter_mut().enumerate() {
        *cell = read_optional_symbol(p[i])?;
    }
    let to_move = read_optional_symbol(p[BOARD_CELLS])?;
    Ok(BoardStateMessage { cells, to_move })
}

fn decode_game_over(p: &[u8]) -> Result<GameOutcome, ProtocolError> {
    require_len(p, 1, "GameOver")?;
    match p[0] {
        0x01 => {
            require_len(p, 2, "GameOver.Win")?;
            let symbol = read_symbol(p[1])?;
            let (name, _) = read_length_prefixed_string(p, 2)?;
            Ok(GameOutcome::Win { symbol, name })
        }
        0x02 => Ok(GameOutcome::Draw),
        other => Err(ProtocolError::MalformedPayload(format!(
            "unknown game outcome: {other}"
        ))),
    }
}

fn decode_error(p: &[u8]) -> Result<ErrorMessage, ProtocolError> {
    require_len(p, 3, "Error")?;
    let code = ErrorCode::try_from(p[0]).unwrap_or(ErrorCode::InternalError);
    let (description, _) = read_length_prefixed_string(p, 1)?;
    Ok(ErrorMessage { code, description })
}

// ── Utility helpers ───────────────────────────────────────────────────────────

fn require_len(buf: &[u8], needed: usize, context: &str) -> Result<(), ProtocolError> {
    if buf.len() < needed {
        Err(ProtocolError::MalformedPayload(format!(
            "{context}: need {needed} bytes, got {}",
            buf.len()
        )))
    } else {
        Ok(())
    }
}

fn read_symbol(byte: u8) -> Result<Symbol, ProtocolError> {
    Symbol::try_from(byte)
        .map_err(|_| ProtocolError::MalformedPayload(format!("unknown symbol: {byte}")))
}

fn read_optional_symbol(byte: u8) -> Result<Option<Symbol>, ProtocolError> {
    match byte {
        0x00 => Ok(None),
        other => read_symbol(other).map(Some),
    }
}

/// Writes a 2-byte length prefix followed by the UTF-8 string bytes.
///
/// Strings longer than `u16::MAX` bytes are cut on a character boundary.
fn write_length_prefixed_string(buf: &mut Vec<u8>, s: &str) {
    let mut len = s.len().min(u16::MAX as usize);
    while !s.is_char_boundary(len) {
        len -= 1;
    }
    buf.extend_from_slice(&(len as u16).to_be_bytes());
    buf.extend_from_slice(&s.as_bytes()[..len]);
}

/// Reads a 2-byte length prefix and then that many UTF-8 bytes.
/// Returns the string and the offset of the byte after the string.
fn read_length_prefixed_string(buf: &[u8], offset: usize) -> Result<(String, usize), ProtocolError> {
    if buf.len() < offset + 2 {
        return Err(ProtocolError::MalformedPayload(format!(
            "need 2 bytes for string length at offset {offset}"
        )));
    }
    let len = u16::from_be_bytes([buf[offset], buf[offset + 1]]) as usize;
    let start = offset + 2;
    if buf.len() < start + len {
        return Err(ProtocolError::MalformedPayload(format!(
            "string of length {len} at offset {start} exceeds buffer"
        )));
    }
    let s = std::str::from_utf8(&buf[start..start + len])
        .map_err(|e| ProtocolError::MalformedPayload(format!("invalid UTF-8: {e}")))?
        .to_string();
    Ok((s, start + len))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(msg: &GameMessage) -> GameMessage {
        let encoded = encode_message(msg, 0, 0).expect("encode failed");
        let (decoded, consumed) = decode_message(&encoded).expect("decode failed");
        assert_eq!(consumed, encoded.len(), "consumed bytes should equal total encoded size");
        decoded
    }

    #[test]
    fn test_board_state_with_mixed_cells_round_trip() {
        let msg = GameMessage::BoardState(BoardStateMessage {
            cells: [
                Some(Symbol::X),
                None,
                Some(Symbol::O),
                None,
                Some(Symbol::X),
                None,
                None,
                None,
                Some(Symbol::O),
            ],
            to_move: Some(Symbol::X),
        });
        assert_eq!(round_trip(&msg), msg);
    }

    #[test]
    fn test_board_state_payload_layout() {
        // Arrange
        let mut cells = [None; BOARD_CELLS];
        cells[0] = Some(Symbol::X);
        cells[8] = Some(Symbol::O);
        let msg = GameMessage::BoardState(BoardStateMessage {
            cells,
            to_move: None,
        });

        // Act
        let bytes = encode_message(&msg, 0, 0).unwrap();

        // Assert – 9 cell bytes then the to_move byte
        assert_eq!(
            &bytes[HEADER_SIZE..],
            &[0x01, 0, 0, 0, 0, 0, 0, 0, 0x02, 0x00]
        );
    }

    #[test]
    fn test_game_over_win_carries_name() {
        let msg = GameMessage::GameOver(GameOutcome::Win {
            symbol: Symbol::O,
            name: "Ada".to_string(),
        });
        assert_eq!(round_trip(&msg), msg);
    }

    #[test]
    fn test_join_with_multibyte_name_round_trip() {
        let msg = GameMessage::Join {
            name: "Zoë ✓".to_string(),
        };
        assert_eq!(round_trip(&msg), msg);
    }

    #[test]
    fn test_move_request_out_of_range_cell_still_decodes() {
        // Range checks belong to the game rules, not the codec.
        let msg = GameMessage::MoveRequest { cell: 200 };
        assert_eq!(round_trip(&msg), msg);
    }

    #[test]
    fn test_unknown_error_code_decodes_as_internal_error() {
        let mut bytes = encode_message(&GameMessage::server_full(), 0, 0).unwrap();
        bytes[HEADER_SIZE] = 0x7F;
        let (decoded, _) = decode_message(&bytes).unwrap();
        assert!(matches!(
            decoded,
            GameMessage::Error(ErrorMessage {
                code: ErrorCode::InternalError,
                ..
            })
        ));
    }

    // ── Error conditions ──────────────────────────────────────────────────────

    #[test]
    fn test_decode_empty_bytes_returns_insufficient_data() {
        let result = decode_message(&[]);
        assert!(matches!(result, Err(ProtocolError::InsufficientData { .. })));
    }

    #[test]
    fn test_decode_truncated_payload_returns_insufficient_data() {
        let bytes = encode_message(&GameMessage::Join { name: "Bob".into() }, 0, 0).unwrap();
        let result = decode_message(&bytes[..bytes.len() - 1]);
        assert!(matches!(result, Err(ProtocolError::InsufficientData { .. })));
    }

    #[test]
    fn test_decode_unknown_message_type_returns_error() {
        let mut bytes = vec![0u8; HEADER_SIZE];
        bytes[0] = PROTOCOL_VERSION;
        bytes[1] = 0xFF;
        let result = decode_message(&bytes);
        assert!(matches!(result, Err(ProtocolError::UnknownMessageType(0xFF))));
    }

    #[test]
    fn test_decode_wrong_version_returns_fatal_error() {
        let mut bytes = vec![0u8; HEADER_SIZE];
        bytes[0] = 0x99;
        bytes[1] = MessageType::Quit as u8;
        let err = decode_message(&bytes).unwrap_err();
        assert_eq!(err, ProtocolError::UnsupportedVersion(0x99));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_oversized_payload_declaration_is_fatal() {
        let mut bytes = vec![0u8; HEADER_SIZE];
        bytes[0] = PROTOCOL_VERSION;
        bytes[1] = MessageType::Join as u8;
        bytes[4..8].copy_from_slice(&((MAX_PAYLOAD_SIZE as u32) + 1).to_be_bytes());
        let err = frame_length(&bytes).unwrap_err();
        assert!(matches!(err, ProtocolError::PayloadTooLarge { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_invalid_symbol_byte_is_malformed_not_fatal() {
        let mut bytes = encode_message(&GameMessage::Assign { symbol: Symbol::X }, 0, 0).unwrap();
        bytes[HEADER_SIZE] = 0x09;
        let err = decode_message(&bytes).unwrap_err();
        assert!(matches!(err, ProtocolError::MalformedPayload(_)));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_encode_rejects_payload_over_limit() {
        let msg = GameMessage::Join {
            name: "n".repeat(MAX_PAYLOAD_SIZE + 1),
        };
        assert!(matches!(
            encode_message(&msg, 0, 0),
            Err(ProtocolError::PayloadTooLarge { .. })
        ));
    }

    #[test]
    fn test_header_encodes_sequence_number_correctly() {
        let seq = 0x1234_5678_9ABC_DEF0u64;
        let bytes = encode_message(&GameMessage::Quit, seq, 0).unwrap();
        let decoded_seq = u64::from_be_bytes(bytes[8..16].try_into().unwrap());
        assert_eq!(decoded_seq, seq);
    }

    #[test]
    fn test_header_size_is_24_bytes() {
        // Quit has an empty payload so total = HEADER_SIZE
        let bytes = encode_message(&GameMessage::Quit, 0, 0).unwrap();
        assert_eq!(bytes.len(), HEADER_SIZE);
    }
}
