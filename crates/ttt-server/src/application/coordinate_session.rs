//! SessionCoordinator: seats two players and referees their shared board.
//!
//! The coordinator is the server's only shared mutable state.  The network
//! layer keeps it behind one `tokio::sync::Mutex`, so every name, move, and
//! departure is applied in a single total order across both peer tasks.
//!
//! # Lifecycle
//!
//! ```text
//! admit(X) ──► admit(O) ──► both named ──► Session { round 1 }
//!                                              │  win / draw
//!                                              ▼
//!                                     restart_round (after delay)
//!
//! any leave() ──► all seats cleared, session discarded
//! ```
//!
//! Outbound delivery never blocks: [`PeerOutbox::deliver`] is expected to
//! queue the message and return immediately.  A full queue drops that one
//! message; a closed queue means the peer is gone and is handled like a
//! disconnect.

use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use ttt_core::protocol::messages::{BoardStateMessage, GameOutcome, MessageType};
use ttt_core::{GameMessage, MoveError, MoveOutcome, Round, Symbol};

/// Identifies one accepted connection for its whole lifetime.
pub type PeerId = Uuid;

/// Why a message could not be handed to a peer.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum DeliveryError {
    /// The peer's outbound queue is momentarily full; the message was dropped.
    #[error("outbound queue full")]
    Full,
    /// The peer's connection task has exited.
    #[error("peer connection closed")]
    Closed,
}

/// Outbound side of one peer connection.
///
/// The network layer implements this with a bounded channel feeding the
/// peer's socket writer.
#[cfg_attr(test, mockall::automock)]
pub trait PeerOutbox: Send + Sync {
    /// Queues `msg` for the peer without waiting.
    fn deliver(&self, msg: GameMessage) -> Result<(), DeliveryError>;

    /// Asks the peer's connection to flush what is queued and then close.
    fn close(&self);
}

/// A connection could not be seated.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum AdmitError {
    #[error("both seats are taken")]
    ServerFull,
}

/// A successfully seated connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    pub peer: PeerId,
    pub symbol: Symbol,
}

/// Why a move request changed nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// The sender is not seated (already left, or never admitted).
    UnknownPeer,
    /// Both players have not named themselves yet.
    NoSession,
    /// The game rules refused the move.
    Rejected(MoveError),
}

/// What became of a move request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDisposition {
    /// Nothing changed and nobody was told.
    Ignored(IgnoreReason),
    /// The board changed and play continues.
    Accepted,
    /// The move ended the round.  The caller should wait for the configured
    /// delay and then call [`SessionCoordinator::restart_round`] with these
    /// values.
    RoundOver { session_id: Uuid, round_number: u32 },
}

struct Seat {
    peer: PeerId,
    symbol: Symbol,
    name: Option<String>,
    outbox: Box<dyn PeerOutbox>,
}

/// Board and turn state shared by the two seated players.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub round: Round,
    /// Starts at 1 and increments on every restart.
    pub round_number: u32,
}

/// Owns the seats and the optional running session.
pub struct SessionCoordinator {
    seats: Vec<Seat>,
    session: Option<Session>,
    max_name_len: usize,
}

const MAX_SEATS: usize = 2;

impl SessionCoordinator {
    /// Creates a coordinator with no one seated.  Display names longer than
    /// `max_name_len` characters are truncated.
    pub fn new(max_name_len: usize) -> Self {
        Self {
            seats: Vec::with_capacity(MAX_SEATS),
            session: None,
            max_name_len,
        }
    }

    /// Number of occupied seats (0–2).
    pub fn seated(&self) -> usize {
        self.seats.len()
    }

    #[cfg(test)]
    pub(crate) fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn symbol_of(&self, peer: PeerId) -> Option<Symbol> {
        self.seat(peer).map(|s| s.symbol)
    }

    // ── Seating ───────────────────────────────────────────────────────────────

    /// Seats a new connection and sends it `Assign`.
    ///
    /// The first seated peer plays `X`, the second `O`.
    ///
    /// # Errors
    ///
    /// [`AdmitError::ServerFull`] when both seats are taken.  The rejected
    /// connection has already been sent an explicit error and asked to close.
    pub fn admit(&mut self, outbox: Box<dyn PeerOutbox>) -> Result<Admission, AdmitError> {
        if self.seats.len() >= MAX_SEATS {
            if let Err(e) = outbox.deliver(GameMessage::server_full()) {
                debug!("could not tell rejected connection the server is full: {e}");
            }
            outbox.close();
            return Err(AdmitError::ServerFull);
        }

        let symbol = match self.seats.first() {
            Some(seat) => seat.symbol.opponent(),
            None => Symbol::X,
        };
        let peer = Uuid::new_v4();
        self.seats.push(Seat {
            peer,
            symbol,
            name: None,
            outbox,
        });
        info!("seated peer {peer} as {symbol} ({}/{MAX_SEATS})", self.seats.len());

        self.send_to(peer, GameMessage::Assign { symbol });
        Ok(Admission { peer, symbol })
    }

    /// Records `peer`'s display name and starts a session once both seats
    /// are named.
    ///
    /// The name is trimmed and truncated; an empty name becomes
    /// `"Player X"` or `"Player O"`.  A second name from the same peer is
    /// ignored.  Returns `true` when the name was recorded.
    pub fn register_name(&mut self, peer: PeerId, name: &str) -> bool {
        let max_len = self.max_name_len;
        let Some(seat) = self.seats.iter_mut().find(|s| s.peer == peer) else {
            debug!("name from unseated peer {peer} ignored");
            return false;
        };
        if seat.name.is_some() {
            debug!("peer {peer} already named; repeated Join ignored");
            return false;
        }

        let shown = sanitize_name(name, seat.symbol, max_len);
        info!("peer {peer} ({}) is {shown:?}", seat.symbol);
        seat.name = Some(shown);

        let all_named = self.seats.len() == MAX_SEATS && self.seats.iter().all(|s| s.name.is_some());
        if all_named && self.session.is_none() {
            self.start_session();
        }
        true
    }

    fn start_session(&mut self) {
        let session = Session {
            id: Uuid::new_v4(),
            round: Round::new(),
            round_number: 1,
        };
        info!("session {} started", session.id);
        self.session = Some(session);

        let pairs: Vec<(PeerId, String)> = self
            .seats
            .iter()
            .map(|s| (s.peer, self.opponent_name(s.peer)))
            .collect();
        for (peer, opponent) in pairs {
            self.send_to(peer, GameMessage::OpponentJoined { name: opponent });
        }

        self.broadcast(GameMessage::GameStart {
            x_name: self.name_for(Symbol::X),
            o_name: self.name_for(Symbol::O),
        });
        self.broadcast_board();
    }

    // ── Play ──────────────────────────────────────────────────────────────────

    /// Validates and applies `peer`'s move on `cell`.
    ///
    /// Refused moves are silent: no reply goes out and the connection stays
    /// open.  Accepted moves are followed by a `BoardState` broadcast, plus a
    /// `GameOver` broadcast when the round ends.
    pub fn submit_move(&mut self, peer: PeerId, cell: u8) -> MoveDisposition {
        let Some(symbol) = self.symbol_of(peer) else {
            return MoveDisposition::Ignored(IgnoreReason::UnknownPeer);
        };
        let Some(session) = self.session.as_mut() else {
            return MoveDisposition::Ignored(IgnoreReason::NoSession);
        };

        let outcome = match session.round.apply_move(symbol, cell) {
            Ok(outcome) => outcome,
            Err(e) => {
                debug!("move by {symbol} on {cell} ignored: {e}");
                return MoveDisposition::Ignored(IgnoreReason::Rejected(e));
            }
        };
        let (session_id, round_number) = (session.id, session.round_number);
        debug!("{symbol} took cell {cell}");

        self.broadcast_board();
        let game_over = match outcome {
            MoveOutcome::Continue => return MoveDisposition::Accepted,
            MoveOutcome::Win(winner) => {
                info!("round {round_number} won by {winner}");
                GameOutcome::Win {
                    symbol: winner,
                    name: self.name_for(winner),
                }
            }
            MoveOutcome::Draw => {
                info!("round {round_number} drawn");
                GameOutcome::Draw
            }
        };
        self.broadcast(GameMessage::GameOver(game_over));

        // A broadcast failure may have ended the session in the meantime.
        if self.session.as_ref().map(|s| s.id) == Some(session_id) {
            MoveDisposition::RoundOver {
                session_id,
                round_number,
            }
        } else {
            MoveDisposition::Accepted
        }
    }

    /// Clears the board for the next round and broadcasts it.
    ///
    /// Does nothing unless `session_id` is still the live session and
    /// `round_number` is still its current, finished round.  Returns `true`
    /// when the board was reset.
    pub fn restart_round(&mut self, session_id: Uuid, round_number: u32) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        if session.id != session_id
            || session.round_number != round_number
            || session.round.is_in_progress()
        {
            debug!("stale restart for session {session_id} round {round_number} ignored");
            return false;
        }

        session.round.reset();
        session.round_number += 1;
        info!("session {session_id}: round {} begins", session.round_number);
        self.broadcast_board();
        true
    }

    /// Answers a message type clients may not send with
    /// `Error { InvalidMessage }`.  The peer stays connected.
    pub fn refuse_message(&mut self, peer: PeerId, received: MessageType) {
        debug!("peer {peer} sent server-only {received:?}");
        self.send_to(peer, GameMessage::invalid_message(received));
    }

    // ── Departure ─────────────────────────────────────────────────────────────

    /// Handles `peer` going away for any reason.
    ///
    /// Every seat is cleared, each remaining peer is told
    /// `OpponentDisconnected` and asked to close, and the session is
    /// discarded.  The next two connections start from an empty board.
    /// Returns `false` if `peer` was not seated.
    pub fn leave(&mut self, peer: PeerId) -> bool {
        if self.seat(peer).is_none() {
            return false;
        }
        info!("peer {peer} left; clearing table");

        for seat in self.seats.drain(..) {
            if seat.peer == peer {
                continue;
            }
            if let Err(e) = seat.outbox.deliver(GameMessage::OpponentDisconnected) {
                debug!("could not notify {} of disconnect: {e}", seat.peer);
            }
            seat.outbox.close();
        }
        if let Some(session) = self.session.take() {
            info!("session {} discarded", session.id);
        }
        true
    }

    // ── Delivery helpers ──────────────────────────────────────────────────────

    fn seat(&self, peer: PeerId) -> Option<&Seat> {
        self.seats.iter().find(|s| s.peer == peer)
    }

    fn name_for(&self, symbol: Symbol) -> String {
        self.seats
            .iter()
            .find(|s| s.symbol == symbol)
            .and_then(|s| s.name.clone())
            .unwrap_or_else(|| default_name(symbol))
    }

    fn opponent_name(&self, peer: PeerId) -> String {
        let symbol = self.symbol_of(peer).unwrap_or(Symbol::X);
        self.name_for(symbol.opponent())
    }

    fn board_message(&self) -> Option<GameMessage> {
        self.session.as_ref().map(|s| {
            GameMessage::BoardState(BoardStateMessage {
                cells: *s.round.board().cells(),
                to_move: s.round.to_move(),
            })
        })
    }

    fn broadcast_board(&mut self) {
        if let Some(msg) = self.board_message() {
            self.broadcast(msg);
        }
    }

    fn send_to(&mut self, peer: PeerId, msg: GameMessage) {
        let result = match self.seat(peer) {
            Some(seat) => seat.outbox.deliver(msg),
            None => return,
        };
        self.handle_delivery(peer, result);
    }

    fn broadcast(&mut self, msg: GameMessage) {
        let results: Vec<(PeerId, Result<(), DeliveryError>)> = self
            .seats
            .iter()
            .map(|s| (s.peer, s.outbox.deliver(msg.clone())))
            .collect();
        for (peer, result) in results {
            self.handle_delivery(peer, result);
        }
    }

    fn handle_delivery(&mut self, peer: PeerId, result: Result<(), DeliveryError>) {
        match result {
            Ok(()) => {}
            Err(DeliveryError::Full) => {
                warn!("outbound queue for {peer} is full; message dropped");
            }
            Err(DeliveryError::Closed) => {
                warn!("peer {peer} is no longer reachable");
                self.leave(peer);
            }
        }
    }
}

fn default_name(symbol: Symbol) -> String {
    format!("Player {symbol}")
}

fn sanitize_name(raw: &str, symbol: Symbol, max_len: usize) -> String {
    let trimmed: String = raw.trim().chars().take(max_len).collect();
    let trimmed = trimmed.trim_end();
    if trimmed.is_empty() {
        default_name(symbol)
    } else {
        trimmed.to_string()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
