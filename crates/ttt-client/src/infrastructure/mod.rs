//! Infrastructure layer for the client: the TCP connection to the server and
//! the terminal.

pub mod console;
pub mod network;
