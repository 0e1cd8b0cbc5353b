//! Per-connection sequence numbering for outgoing frames.
//!
//! Every frame carries a monotonically increasing sequence number in its
//! header.  Nothing in the game logic depends on it, but it makes packet
//! captures and debug logs easy to line up.

use std::sync::atomic::{AtomicU64, Ordering};

/// A thread-safe, monotonically increasing counter for frame sequence numbers.
///
/// Starts at 0 and wraps at `u64::MAX` without panicking.
///
/// # Examples
///
/// ```rust
/// use ttt_core::protocol::SequenceCounter;
///
/// let counter = SequenceCounter::new();
/// assert_eq!(counter.next(), 0);
/// assert_eq!(counter.next(), 1);
/// ```
#[derive(Debug, Default)]
pub struct SequenceCounter {
    inner: AtomicU64,
}

impl SequenceCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next sequence number and increments the counter.
    pub fn next(&self) -> u64 {
        // Relaxed: the value only labels frames, it orders no other memory.
        self.inner.fetch_add(1, Ordering::Relaxed)
    }
}
