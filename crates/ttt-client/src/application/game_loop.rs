//! The client's receive → handle → act loop.
//!
//! [`run_game`] depends only on two traits, so the whole loop runs against
//! in-memory fakes in tests:
//!
//! - [`GameLink`] – the connection to the server (`ServerConnection` in the
//!   infrastructure layer);
//! - [`PlayerConsole`] – where lines and boards are shown and moves are typed
//!   (`TerminalConsole` in the infrastructure layer).
//!
//! If a send fails, typically because the opponent left and the server closed
//! the socket while the player was typing, the loop does not give up
//! straight away.  It reads whatever the server had already queued so the
//! player still sees the reason the game ended.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

use ttt_core::protocol::messages::BoardStateMessage;
use ttt_core::{GameMessage, Symbol};

use crate::application::play::{ClientSession, PlayerInput, Step};

/// Why the connection to the server stopped working.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    /// The server closed the connection.
    #[error("connection closed by server")]
    Closed,
    #[error("connection failed: {0}")]
    Failed(String),
}

/// Message transport to the game server.
#[async_trait]
pub trait GameLink: Send {
    /// Waits up to `timeout` for the next message.  `Ok(None)` means nothing
    /// arrived in time.
    async fn recv(&mut self, timeout: Duration) -> Result<Option<GameMessage>, LinkError>;

    async fn send(&mut self, msg: &GameMessage) -> Result<(), LinkError>;
}

/// The player's side of the game: output and move entry.
#[async_trait]
pub trait PlayerConsole: Send {
    fn show_status(&mut self, line: &str);

    fn show_board(&mut self, board: &BoardStateMessage, me: Option<Symbol>);

    /// Blocks (asynchronously) until the player picks a cell or quits.
    async fn choose_move(&mut self) -> Result<PlayerInput, String>;
}

/// Error type for the game loop.
#[derive(Debug, Error)]
pub enum GameLoopError {
    #[error("lost connection to the server: {0}")]
    Link(#[from] LinkError),
    #[error("could not read the player's move: {0}")]
    Console(String),
}

/// How a game that ended without error ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEnd {
    /// The player chose to quit.
    Quit,
    /// The server ended the game; carries the line shown to the player.
    Over(String),
}

/// Line printed when the player quits.
pub const LEFT_THE_GAME: &str = "You left the game.";

/// Drives one connection until the session finishes or the player quits.
///
/// A read that times out is not an error; the loop keeps waiting.
///
/// # Errors
///
/// [`GameLoopError::Link`] if reading from the server fails for any reason
/// other than an orderly close, and [`GameLoopError::Console`] if the move
/// prompt cannot be read.
pub async fn run_game<L, C>(
    link: &mut L,
    console: &mut C,
    mut session: ClientSession,
    read_timeout: Duration,
) -> Result<GameEnd, GameLoopError>
where
    L: GameLink,
    C: PlayerConsole,
{
    loop {
        let steps = match link.recv(read_timeout).await {
            Ok(Some(msg)) => session.handle(msg),
            Ok(None) => {
                debug!("no message within {read_timeout:?}; still waiting");
                continue;
            }
            Err(LinkError::Closed) => session.handle_closed(),
            Err(e) => return Err(e.into()),
        };

        for step in steps {
            match step {
                Step::Send(msg) => {
                    if let Err(e) = link.send(&msg).await {
                        warn!("send failed: {e}");
                        return Ok(wind_down(link, console, &mut session, read_timeout).await);
                    }
                }
                Step::Status(line) => console.show_status(&line),
                Step::Render(board) => console.show_board(&board, session.symbol()),
                Step::PromptMove => {
                    let input = console.choose_move().await.map_err(GameLoopError::Console)?;
                    let sent = link.send(&input.into_message()).await;
                    if input == PlayerInput::Quit {
                        if let Err(e) = sent {
                            debug!("quit not delivered: {e}");
                        }
                        console.show_status(LEFT_THE_GAME);
                        return Ok(GameEnd::Quit);
                    }
                    if let Err(e) = sent {
                        warn!("move not delivered: {e}");
                        return Ok(wind_down(link, console, &mut session, read_timeout).await);
                    }
                }
                Step::Finish(line) => {
                    console.show_status(&line);
                    return Ok(GameEnd::Over(line));
                }
            }
        }
    }
}

/// Shows what the server queued before the connection broke, then ends.
async fn wind_down<L, C>(
    link: &mut L,
    console: &mut C,
    session: &mut ClientSession,
    read_timeout: Duration,
) -> GameEnd
where
    L: GameLink,
    C: PlayerConsole,
{
    while let Ok(Some(msg)) = link.recv(read_timeout).await {
        for step in session.handle(msg) {
            match step {
                Step::Status(line) => console.show_status(&line),
                Step::Render(board) => console.show_board(&board, session.symbol()),
                Step::Finish(line) => {
                    console.show_status(&line);
                    return GameEnd::Over(line);
                }
                Step::Send(_) | Step::PromptMove => {}
            }
        }
    }

    let line = session
        .handle_closed()
        .into_iter()
        .find_map(|step| match step {
            Step::Finish(line) => Some(line),
            _ => None,
        })
        .unwrap_or_default();
    console.show_status(&line);
    GameEnd::Over(line)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use ttt_core::protocol::messages::GameOutcome;

    use super::*;

    const TICK: Duration = Duration::from_millis(10);

    /// A link that replays scripted reads and records every send.
    #[derive(Default)]
    struct ScriptedLink {
        incoming: VecDeque<Result<Option<GameMessage>, LinkError>>,
        sent: Vec<GameMessage>,
        /// Sends start failing once this many have succeeded.
        send_budget: Option<usize>,
    }

    impl ScriptedLink {
        fn new(incoming: Vec<Result<Option<GameMessage>, LinkError>>) -> Self {
            Self {
                incoming: incoming.into(),
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl GameLink for ScriptedLink {
        async fn recv(&mut self, _timeout: Duration) -> Result<Option<GameMessage>, LinkError> {
            self.incoming.pop_front().unwrap_or(Err(LinkError::Closed))
        }

        async fn send(&mut self, msg: &GameMessage) -> Result<(), LinkError> {
            if self.send_budget == Some(self.sent.len()) {
                return Err(LinkError::Failed("broken pipe".into()));
            }
            self.sent.push(msg.clone());
            Ok(())
        }
    }

    #[derive(Default)]
    struct ScriptedConsole {
        moves: VecDeque<PlayerInput>,
        lines: Vec<String>,
        boards: usize,
    }

    #[async_trait]
    impl PlayerConsole for ScriptedConsole {
        fn show_status(&mut self, line: &str) {
            self.lines.push(line.to_string());
        }

        fn show_board(&mut self, _board: &BoardStateMessage, _me: Option<Symbol>) {
            self.boards += 1;
        }

        async fn choose_move(&mut self) -> Result<PlayerInput, String> {
            self.moves.pop_front().ok_or_else(|| "stdin closed".to_string())
        }
    }

    fn board(to_move: Option<Symbol>) -> GameMessage {
        GameMessage::BoardState(BoardStateMessage {
            cells: [None; 9],
            to_move,
        })
    }

    fn msg(m: GameMessage) -> Result<Option<GameMessage>, LinkError> {
        Ok(Some(m))
    }

    #[tokio::test]
    async fn test_quit_at_prompt_sends_quit_and_ends() {
        // Arrange
        let mut link = ScriptedLink::new(vec![
            msg(GameMessage::Assign { symbol: Symbol::X }),
            msg(board(Some(Symbol::X))),
        ]);
        let mut console = ScriptedConsole {
            moves: VecDeque::from([PlayerInput::Quit]),
            ..ScriptedConsole::default()
        };

        // Act
        let end = run_game(&mut link, &mut console, ClientSession::new("Ada"), TICK)
            .await
            .unwrap();

        // Assert
        assert_eq!(end, GameEnd::Quit);
        assert_eq!(
            link.sent,
            vec![GameMessage::Join { name: "Ada".into() }, GameMessage::Quit]
        );
        assert_eq!(console.lines.last().map(String::as_str), Some(LEFT_THE_GAME));
    }

    #[tokio::test]
    async fn test_opponent_disconnect_ends_the_loop() {
        let mut link = ScriptedLink::new(vec![
            msg(GameMessage::Assign { symbol: Symbol::O }),
            msg(board(Some(Symbol::X))),
            msg(GameMessage::OpponentDisconnected),
        ]);
        let mut console = ScriptedConsole::default();

        let end = run_game(&mut link, &mut console, ClientSession::new("Bo"), TICK)
            .await
            .unwrap();

        assert_eq!(end, GameEnd::Over("Your opponent disconnected.".into()));
        assert_eq!(console.boards, 1);
    }

    #[tokio::test]
    async fn test_server_close_ends_the_loop_cleanly() {
        let mut link = ScriptedLink::new(vec![msg(GameMessage::Assign { symbol: Symbol::X })]);
        let mut console = ScriptedConsole::default();

        let end = run_game(&mut link, &mut console, ClientSession::new("Ada"), TICK)
            .await
            .unwrap();

        assert_eq!(end, GameEnd::Over("Connection closed by server.".into()));
    }

    #[tokio::test]
    async fn test_read_timeout_keeps_waiting() {
        // Arrange – two empty polls before the game actually starts
        let mut link = ScriptedLink::new(vec![
            msg(GameMessage::Assign { symbol: Symbol::X }),
            Ok(None),
            Ok(None),
            msg(board(Some(Symbol::X))),
            msg(board(Some(Symbol::X))),
        ]);
        let mut console = ScriptedConsole {
            moves: VecDeque::from([PlayerInput::Move(4), PlayerInput::Quit]),
            ..ScriptedConsole::default()
        };

        // Act
        let end = run_game(&mut link, &mut console, ClientSession::new("Ada"), TICK)
            .await
            .unwrap();

        // Assert
        assert_eq!(end, GameEnd::Quit);
        assert_eq!(link.sent[1], GameMessage::MoveRequest { cell: 4 });
    }

    #[tokio::test]
    async fn test_failed_move_send_still_shows_queued_disconnect() {
        // Arrange – Join goes through, the move does not, and the server had
        // already queued the disconnect notice.
        let mut link = ScriptedLink::new(vec![
            msg(GameMessage::Assign { symbol: Symbol::X }),
            msg(board(Some(Symbol::X))),
            msg(GameMessage::OpponentDisconnected),
        ]);
        link.send_budget = Some(1);
        let mut console = ScriptedConsole {
            moves: VecDeque::from([PlayerInput::Move(0)]),
            ..ScriptedConsole::default()
        };

        // Act
        let end = run_game(&mut link, &mut console, ClientSession::new("Ada"), TICK)
            .await
            .unwrap();

        // Assert
        assert_eq!(end, GameEnd::Over("Your opponent disconnected.".into()));
        assert_eq!(
            console.lines.last().map(String::as_str),
            Some("Your opponent disconnected.")
        );
    }

    #[tokio::test]
    async fn test_failed_move_send_with_nothing_queued_reports_close() {
        let mut link = ScriptedLink::new(vec![
            msg(GameMessage::Assign { symbol: Symbol::X }),
            msg(board(Some(Symbol::X))),
        ]);
        link.send_budget = Some(1);
        let mut console = ScriptedConsole {
            moves: VecDeque::from([PlayerInput::Move(0)]),
            ..ScriptedConsole::default()
        };

        let end = run_game(&mut link, &mut console, ClientSession::new("Ada"), TICK)
            .await
            .unwrap();

        assert_eq!(end, GameEnd::Over("Connection closed by server.".into()));
    }

    #[tokio::test]
    async fn test_game_over_keeps_the_loop_running() {
        let mut link = ScriptedLink::new(vec![
            msg(GameMessage::Assign { symbol: Symbol::O }),
            msg(GameMessage::GameOver(GameOutcome::Draw)),
            msg(GameMessage::OpponentDisconnected),
        ]);
        let mut console = ScriptedConsole::default();

        let end = run_game(&mut link, &mut console, ClientSession::new("Bo"), TICK)
            .await
            .unwrap();

        assert!(console.lines.iter().any(|l| l == "It's a draw."));
        assert_eq!(end, GameEnd::Over("Your opponent disconnected.".into()));
    }

    #[tokio::test]
    async fn test_read_failure_is_an_error() {
        let mut link = ScriptedLink::new(vec![Err(LinkError::Failed("reset".into()))]);
        let mut console = ScriptedConsole::default();

        let result = run_game(&mut link, &mut console, ClientSession::new("Ada"), TICK).await;

        assert!(matches!(result, Err(GameLoopError::Link(LinkError::Failed(_)))));
    }
}
