//! Infrastructure layer for the game server.
//!
//! Contains the OS-facing adapters: the TCP listener with its per-peer tasks,
//! and TOML configuration storage.
//!
//! **Dependency rule**: this layer may depend on `application` and `ttt_core`,
//! but MUST NOT be imported by the `application` layer.

pub mod network;
pub mod storage;
