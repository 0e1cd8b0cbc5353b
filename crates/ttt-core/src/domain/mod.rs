//! Domain entities for tic-tac-toe.
//!
//! This module contains the game rules and nothing else: no sockets, no
//! terminal output, no clocks.  The server validates every move through these
//! types while holding its session lock, and the tests exercise them directly.

/// The nine-cell board and the eight winning triples.
///
/// See [`board::Board`] for the main type.
pub mod board;

/// Turn order and round status layered on top of a [`board::Board`].
pub mod round;
