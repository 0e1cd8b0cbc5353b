//! All tic-tac-toe protocol message types.
//!
//! One tagged enum, [`GameMessage`], covers both directions.  Client-to-server
//! messages use type codes `0x01`–`0x0F`; server-to-client messages use
//! `0x10`–`0x2F`.  A board update and a status line can never be confused
//! because each travels under its own type code.

use crate::domain::board::{Symbol, BOARD_CELLS};

// ── Protocol constants ────────────────────────────────────────────────────────

/// Current protocol version byte.
pub const PROTOCOL_VERSION: u8 = 0x01;

/// Total size of the common message header in bytes.
pub const HEADER_SIZE: usize = 24;

/// Largest payload a peer may declare.  Anything bigger is treated as a
/// corrupt or hostile stream.
pub const MAX_PAYLOAD_SIZE: usize = 4096;

// ── Message type codes ────────────────────────────────────────────────────────

/// All message type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageType {
    // Client → server (0x01–0x0F)
    Join = 0x01,
    MoveRequest = 0x02,
    Quit = 0x03,
    // Server → client (0x10–0x2F)
    Assign = 0x10,
    OpponentJoined = 0x11,
    GameStart = 0x12,
    BoardState = 0x13,
    GameOver = 0x14,
    OpponentDisconnected = 0x15,
    Error = 0x16,
}

impl TryFrom<u8> for MessageType {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, ()> {
        match value {
            0x01 => Ok(MessageType::Join),
            0x02 => Ok(MessageType::MoveRequest),
            0x03 => Ok(MessageType::Quit),
            0x10 => Ok(MessageType::Assign),
            0x11 => Ok(MessageType::OpponentJoined),
            0x12 => Ok(MessageType::GameStart),
            0x13 => Ok(MessageType::BoardState),
            0x14 => Ok(MessageType::GameOver),
            0x15 => Ok(MessageType::OpponentDisconnected),
            0x16 => Ok(MessageType::Error),
            _ => Err(()),
        }
    }
}

// ── Payload types ─────────────────────────────────────────────────────────────

/// Snapshot of the shared board sent after every accepted move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardStateMessage {
    /// Row-major cells; `None` is empty.
    pub cells: [Option<Symbol>; BOARD_CELLS],
    /// Who moves next; `None` while the round is over and awaiting reset.
    pub to_move: Option<Symbol>,
}

/// How a round ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameOutcome {
    /// `symbol` completed a triple; `name` is that player's display name.
    Win { symbol: Symbol, name: String },
    Draw,
}

/// Error codes carried by [`GameMessage::Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ErrorCode {
    /// Two players are already seated.
    ServerFull = 0x01,
    /// The peer sent something the server could not use.
    InvalidMessage = 0x02,
    InternalError = 0x03,
}

impl TryFrom<u8> for ErrorCode {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x01 => Ok(ErrorCode::ServerFull),
            0x02 => Ok(ErrorCode::InvalidMessage),
            0x03 => Ok(ErrorCode::InternalError),
            _ => Err(()),
        }
    }
}

/// ERROR (0x16): error notification from the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorMessage {
    pub code: ErrorCode,
    /// Human-readable description.
    pub description: String,
}

// ── Top-level message enum ────────────────────────────────────────────────────

/// All valid tic-tac-toe messages, discriminated by type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameMessage {
    /// Client announces its display name, once, right after `Assign`.
    Join { name: String },
    /// Client asks to mark `cell`.  Range is checked by the server, not the codec.
    MoveRequest { cell: u8 },
    /// Client leaves the game.
    Quit,
    /// Server tells a newly seated peer which symbol it plays.
    Assign { symbol: Symbol },
    /// Server tells a peer the name of the player it faces.
    OpponentJoined { name: String },
    GameStart { x_name: String, o_name: String },
    BoardState(BoardStateMessage),
    GameOver(GameOutcome),
    OpponentDisconnected,
    Error(ErrorMessage),
}

impl GameMessage {
    /// Returns the [`MessageType`] discriminant for this message.
    pub fn message_type(&self) -> MessageType {
        match self {
            GameMessage::Join { .. } => MessageType::Join,
            GameMessage::MoveRequest { .. } => MessageType::MoveRequest,
            GameMessage::Quit => MessageType::Quit,
            GameMessage::Assign { .. } => MessageType::Assign,
            GameMessage::OpponentJoined { .. } => MessageType::OpponentJoined,
            GameMessage::GameStart { .. } => MessageType::GameStart,
            GameMessage::BoardState(_) => MessageType::BoardState,
            GameMessage::GameOver(_) => MessageType::GameOver,
            GameMessage::OpponentDisconnected => MessageType::OpponentDisconnected,
            GameMessage::Error(_) => MessageType::Error,
        }
    }

    /// Convenience constructor for the "server full" rejection.
    pub fn server_full() -> Self {
        GameMessage::Error(ErrorMessage {
            code: ErrorCode::ServerFull,
            description: "Server full".to_string(),
        })
    }

    /// Reply to a peer that sent a message only the server may send.
    pub fn invalid_message(received: MessageType) -> Self {
        GameMessage::Error(ErrorMessage {
            code: ErrorCode::InvalidMessage,
            description: format!("{received:?} is not accepted from clients"),
        })
    }
}
