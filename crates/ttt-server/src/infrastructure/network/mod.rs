//! Network infrastructure: the TCP accept loop and per-peer connection tasks.

pub mod listener;
pub mod peer_conn;

pub use listener::{run_server, GameServer, ServerNetworkError};
