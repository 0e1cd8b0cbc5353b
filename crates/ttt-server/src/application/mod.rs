//! Application layer use cases for the game server.
//!
//! The only use case is seating two players and refereeing their game.  It
//! owns no sockets: outbound messages go through the [`coordinate_session::PeerOutbox`]
//! trait, which the network layer implements with a per-peer queue and the
//! unit tests implement with mocks.

pub mod coordinate_session;
