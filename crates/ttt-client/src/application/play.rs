//! ClientSession: what the player sees and does in response to the server.
//!
//! The console loop feeds every received [`GameMessage`] to
//! [`ClientSession::handle`] and carries out the returned [`Step`]s in order.
//! A move is only ever prompted for when the latest board says it is this
//! player's turn.

use thiserror::Error;

use ttt_core::protocol::messages::{BoardStateMessage, ErrorCode, GameOutcome};
use ttt_core::{GameMessage, Symbol, BOARD_CELLS};

/// Something the player typed at the move prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerInput {
    Move(u8),
    Quit,
}

impl PlayerInput {
    /// The message to send the server for this input.
    pub fn into_message(self) -> GameMessage {
        match self {
            PlayerInput::Move(cell) => GameMessage::MoveRequest { cell },
            PlayerInput::Quit => GameMessage::Quit,
        }
    }
}

/// Why typed text is not a usable move.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("enter a cell number 0-8, or 'quit'")]
    Empty,
    #[error("'{0}' is not a cell number")]
    NotANumber(String),
    #[error("cell {0} is off the board; use 0-8")]
    OutOfRange(u32),
}

/// Parses a move prompt answer: a cell index `0`–`8`, or `quit` / `q`.
///
/// # Errors
///
/// Returns an [`InputError`] describing what to fix.
pub fn parse_move_input(raw: &str) -> Result<PlayerInput, InputError> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(InputError::Empty);
    }
    if text.eq_ignore_ascii_case("quit") || text.eq_ignore_ascii_case("q") {
        return Ok(PlayerInput::Quit);
    }
    let cell: u32 = text
        .parse()
        .map_err(|_| InputError::NotANumber(text.to_string()))?;
    if cell as usize >= BOARD_CELLS {
        return Err(InputError::OutOfRange(cell));
    }
    Ok(PlayerInput::Move(cell as u8))
}

/// One thing the console loop should do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Send this message to the server.
    Send(GameMessage),
    /// Print a status line.
    Status(String),
    /// Draw the board.
    Render(BoardStateMessage),
    /// Ask the player for a move and send it.
    PromptMove,
    /// Print this line and stop.
    Finish(String),
}

/// Line shown between rounds.
pub const WAITING_FOR_NEW_GAME: &str = "Game over. Waiting for new game...";

/// Client-side view of the game.
#[derive(Debug, Clone)]
pub struct ClientSession {
    name: String,
    symbol: Option<Symbol>,
    opponent: Option<String>,
}

impl ClientSession {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            symbol: None,
            opponent: None,
        }
    }

    /// The symbol the server assigned, once known.
    pub fn symbol(&self) -> Option<Symbol> {
        self.symbol
    }

    /// Decides what to do about one server message.
    pub fn handle(&mut self, msg: GameMessage) -> Vec<Step> {
        match msg {
            GameMessage::Assign { symbol } => {
                if self.symbol.is_some() {
                    return Vec::new();
                }
                self.symbol = Some(symbol);
                vec![
                    Step::Status(format!("You are {symbol}. Waiting for an opponent...")),
                    Step::Send(GameMessage::Join {
                        name: self.name.clone(),
                    }),
                ]
            }
            GameMessage::OpponentJoined { name } => {
                let line = format!("Your opponent is {name}.");
                self.opponent = Some(name);
                vec![Step::Status(line)]
            }
            GameMessage::GameStart { x_name, o_name } => {
                vec![Step::Status(format!(
                    "Game started: {x_name} (X) vs {o_name} (O)"
                ))]
            }
            GameMessage::BoardState(board) => self.on_board(board),
            GameMessage::GameOver(outcome) => {
                let verdict = match outcome {
                    GameOutcome::Win { symbol, .. } if Some(symbol) == self.symbol => {
                        "You win!".to_string()
                    }
                    GameOutcome::Win { symbol, name } => format!("{name} ({symbol}) wins."),
                    GameOutcome::Draw => "It's a draw.".to_string(),
                };
                vec![
                    Step::Status(verdict),
                    Step::Status(WAITING_FOR_NEW_GAME.to_string()),
                ]
            }
            GameMessage::OpponentDisconnected => {
                vec![Step::Finish("Your opponent disconnected.".to_string())]
            }
            GameMessage::Error(e) if e.code == ErrorCode::ServerFull => vec![Step::Finish(
                "The server already has two players. Try again later.".to_string(),
            )],
            GameMessage::Error(e) => vec![Step::Status(format!("Server error: {}", e.description))],
            GameMessage::Join { .. } | GameMessage::MoveRequest { .. } | GameMessage::Quit => {
                Vec::new()
            }
        }
    }

    /// What to do when the server closes the connection.
    pub fn handle_closed(&self) -> Vec<Step> {
        vec![Step::Finish("Connection closed by server.".to_string())]
    }

    fn on_board(&self, board: BoardStateMessage) -> Vec<Step> {
        let mut steps = vec![Step::Render(board)];
        match board.to_move {
            Some(turn) if Some(turn) == self.symbol => steps.push(Step::PromptMove),
            Some(_) => steps.push(Step::Status(format!(
                "Waiting for {} to move...",
                self.opponent.as_deref().unwrap_or("your opponent")
            ))),
            None => {}
        }
        steps
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn board(to_move: Option<Symbol>) -> BoardStateMessage {
        BoardStateMessage {
            cells: [None; BOARD_CELLS],
            to_move,
        }
    }

    // ── parse_move_input ──────────────────────────────────────────────────────

    #[test]
    fn test_parse_accepts_every_cell() {
        for cell in 0..9u8 {
            assert_eq!(
                parse_move_input(&format!(" {cell}\n")),
                Ok(PlayerInput::Move(cell))
            );
        }
    }

    #[test]
    fn test_parse_quit_in_any_case() {
        assert_eq!(parse_move_input("quit"), Ok(PlayerInput::Quit));
        assert_eq!(parse_move_input("QUIT"), Ok(PlayerInput::Quit));
        assert_eq!(parse_move_input("q"), Ok(PlayerInput::Quit));
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert_eq!(parse_move_input("   "), Err(InputError::Empty));
        assert_eq!(parse_move_input("9"), Err(InputError::OutOfRange(9)));
        assert_eq!(
            parse_move_input("-1"),
            Err(InputError::NotANumber("-1".to_string()))
        );
        assert_eq!(
            parse_move_input("middle"),
            Err(InputError::NotANumber("middle".to_string()))
        );
    }

    #[test]
    fn test_player_input_maps_to_messages() {
        assert_eq!(
            PlayerInput::Move(3).into_message(),
            GameMessage::MoveRequest { cell: 3 }
        );
        assert_eq!(PlayerInput::Quit.into_message(), GameMessage::Quit);
    }

    // ── ClientSession ─────────────────────────────────────────────────────────

    #[test]
    fn test_assign_records_symbol_and_sends_join() {
        // Arrange
        let mut session = ClientSession::new("Alice");

        // Act
        let steps = session.handle(GameMessage::Assign { symbol: Symbol::O });

        // Assert
        assert_eq!(session.symbol(), Some(Symbol::O));
        assert_eq!(
            steps.last(),
            Some(&Step::Send(GameMessage::Join {
                name: "Alice".into()
            }))
        );
    }

    #[test]
    fn test_board_prompts_only_on_own_turn() {
        let mut session = ClientSession::new("Alice");
        session.handle(GameMessage::Assign { symbol: Symbol::X });
        session.handle(GameMessage::OpponentJoined { name: "Bob".into() });

        let mine = session.handle(GameMessage::BoardState(board(Some(Symbol::X))));
        assert_eq!(mine, vec![Step::Render(board(Some(Symbol::X))), Step::PromptMove]);

        let theirs = session.handle(GameMessage::BoardState(board(Some(Symbol::O))));
        assert_eq!(
            theirs,
            vec![
                Step::Render(board(Some(Symbol::O))),
                Step::Status("Waiting for Bob to move...".into())
            ]
        );

        let finished = session.handle(GameMessage::BoardState(board(None)));
        assert_eq!(finished, vec![Step::Render(board(None))]);
    }

    #[test]
    fn test_game_over_reports_outcome_and_waits() {
        let mut session = ClientSession::new("Bob");
        session.handle(GameMessage::Assign { symbol: Symbol::O });

        let lost = session.handle(GameMessage::GameOver(GameOutcome::Win {
            symbol: Symbol::X,
            name: "Alice".into(),
        }));
        assert_eq!(
            lost,
            vec![
                Step::Status("Alice (X) wins.".into()),
                Step::Status(WAITING_FOR_NEW_GAME.into())
            ]
        );

        let won = session.handle(GameMessage::GameOver(GameOutcome::Win {
            symbol: Symbol::O,
            name: "Bob".into(),
        }));
        assert_eq!(won[0], Step::Status("You win!".into()));
    }

    #[test]
    fn test_opponent_disconnect_and_server_full_finish() {
        let mut session = ClientSession::new("Alice");
        assert!(matches!(
            session.handle(GameMessage::OpponentDisconnected).as_slice(),
            [Step::Finish(_)]
        ));
        assert!(matches!(
            session.handle(GameMessage::server_full()).as_slice(),
            [Step::Finish(_)]
        ));
    }

    #[test]
    fn test_client_only_messages_are_ignored() {
        let mut session = ClientSession::new("Alice");
        assert!(session.handle(GameMessage::Quit).is_empty());
        assert!(session
            .handle(GameMessage::MoveRequest { cell: 1 })
            .is_empty());
    }
}
