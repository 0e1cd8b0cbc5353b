//! Application layer for the client.
//!
//! - **`play`** – Turns each server message into the steps the console loop
//!   should take (render, print, prompt, send, stop) and validates typed
//!   moves.  It performs no I/O, so every decision is unit-testable.
//! - **`game_loop`** – Runs the receive → handle → act loop over two seams:
//!   the server link and the player's console.

pub mod game_loop;
pub mod play;
