//! # ttt-core
//!
//! Shared library for networked tic-tac-toe containing the board rules, the
//! tagged wire messages, and the binary codec.
//!
//! This crate is used by both the server and client applications.
//! It has zero dependencies on OS APIs, terminals, or network sockets.
//!
//! # Architecture overview
//!
//! Two players connect to one server over TCP.  The server seats the first
//! connection as `X` and the second as `O`, validates every move against a
//! single shared board, and broadcasts the board after each accepted move.
//!
//! - **`domain`** – Pure game rules with no I/O.  [`Board`] holds the nine
//!   cells and knows the eight winning triples; [`Round`] adds whose turn it
//!   is and whether the round is still being played.
//!
//! - **`protocol`** – How bytes travel over the network.  Messages are encoded
//!   into a compact binary format (24-byte header + payload) and decoded back
//!   into a typed [`GameMessage`] on the other end.

pub mod domain;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `ttt_core::Board` instead of `ttt_core::domain::board::Board`.
pub use domain::board::{Board, MoveError, Symbol, BOARD_CELLS, TRIPLES};
pub use domain::round::{MoveOutcome, Round, RoundStatus};
pub use protocol::codec::{decode_message, encode_message, ProtocolError};
pub use protocol::messages::GameMessage;
