//! Turn state for one round on a [`Board`].
//!
//! A round runs from an empty board to a win or a draw.  `X` always opens.
//! A move is accepted iff the round is in progress, the cell index is on the
//! board, the cell is empty, and the mover holds the turn.

use crate::domain::board::{Board, MoveError, Symbol};

/// Whether the round is still being played.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundStatus {
    InProgress,
    Won(Symbol),
    Drawn,
}

/// Result of an accepted move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Play continues; the turn has passed to the opponent.
    Continue,
    /// The mover completed a triple.
    Win(Symbol),
    /// The board filled up without a triple.
    Draw,
}

/// Board plus whose turn it is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Round {
    board: Board,
    to_move: Symbol,
    status: RoundStatus,
}

impl Default for Round {
    fn default() -> Self {
        Self {
            board: Board::new(),
            to_move: Symbol::X,
            status: RoundStatus::InProgress,
        }
    }
}

impl Round {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn status(&self) -> RoundStatus {
        self.status
    }

    pub fn is_in_progress(&self) -> bool {
        self.status == RoundStatus::InProgress
    }

    /// The symbol allowed to move next, or `None` once the round is over.
    pub fn to_move(&self) -> Option<Symbol> {
        self.is_in_progress().then_some(self.to_move)
    }

    /// Validates and applies a move by `symbol` on `cell`.
    ///
    /// The win check runs for the mover first; only a full board with no
    /// triple is a draw.
    ///
    /// # Errors
    ///
    /// Returns a [`MoveError`] and leaves the round untouched when the round
    /// is over, the mover is out of turn, or the cell is invalid/occupied.
    pub fn apply_move(&mut self, symbol: Symbol, cell: u8) -> Result<MoveOutcome, MoveError> {
        if !self.is_in_progress() {
            return Err(MoveError::RoundOver);
        }
        if symbol != self.to_move {
            return Err(MoveError::NotYourTurn {
                expected: self.to_move,
                attempted: symbol,
            });
        }
        self.board.place(cell, symbol)?;

        if self.board.has_triple(symbol) {
            self.status = RoundStatus::Won(symbol);
            Ok(MoveOutcome::Win(symbol))
        } else if self.board.is_full() {
            self.status = RoundStatus::Drawn;
            Ok(MoveOutcome::Draw)
        } else {
            self.to_move = symbol.opponent();
            Ok(MoveOutcome::Continue)
        }
    }

    /// Clears the board for a fresh round with `X` to move.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn play(round: &mut Round, moves: &[(Symbol, u8)]) -> Vec<Result<MoveOutcome, MoveError>> {
        moves
            .iter()
            .map(|&(symbol, cell)| round.apply_move(symbol, cell))
            .collect()
    }

    #[test]
    fn test_new_round_has_x_to_move() {
        let round = Round::new();
        assert_eq!(round.to_move(), Some(Symbol::X));
        assert_eq!(round.status(), RoundStatus::InProgress);
    }

    #[test]
    fn test_accepted_move_flips_turn() {
        let mut round = Round::new();
        assert_eq!(round.apply_move(Symbol::X, 4), Ok(MoveOutcome::Continue));
        assert_eq!(round.to_move(), Some(Symbol::O));
    }

    #[test]
    fn test_out_of_turn_move_is_rejected_without_change() {
        // Arrange
        let mut round = Round::new();
        let before = round.clone();

        // Act
        let result = round.apply_move(Symbol::O, 0);

        // Assert
        assert_eq!(
            result,
            Err(MoveError::NotYourTurn {
                expected: Symbol::X,
                attempted: Symbol::O
            })
        );
        assert_eq!(round, before);
    }

    #[test]
    fn test_move_accepted_iff_cell_empty_and_mover_holds_turn() {
        // Exhaustive over every cell and both symbols on a half-filled board.
        let mut base = Round::new();
        play(&mut base, &[(Symbol::X, 4), (Symbol::O, 0), (Symbol::X, 8)]);
        for cell in 0..=9u8 {
            for symbol in [Symbol::X, Symbol::O] {
                let mut round = base.clone();
                let expected = symbol == Symbol::O && base.board().cells().get(cell as usize) == Some(&None);
                let result = round.apply_move(symbol, cell);
                assert_eq!(result.is_ok(), expected, "cell {cell}, {symbol}");
                if result.is_err() {
                    assert_eq!(round, base, "rejected move must not change the round");
                }
            }
        }
    }

    #[test]
    fn test_scripted_sequence_rejects_occupied_cell_then_detects_column() {
        let mut round = Round::new();

        let results = play(
            &mut round,
            &[(Symbol::X, 4), (Symbol::O, 0), (Symbol::X, 8), (Symbol::O, 2)],
        );
        assert!(results.iter().all(|r| *r == Ok(MoveOutcome::Continue)));

        // Cell 0 belongs to O.
        assert_eq!(round.apply_move(Symbol::X, 0), Err(MoveError::Occupied(0)));
        assert_eq!(round.to_move(), Some(Symbol::X));

        assert_eq!(round.apply_move(Symbol::X, 1), Ok(MoveOutcome::Continue));
        assert_eq!(round.apply_move(Symbol::O, 6), Ok(MoveOutcome::Continue));
        assert!(!round.board().has_triple(Symbol::O));

        // X now holds 1 and 4; 7 completes the middle column.
        assert_eq!(round.apply_move(Symbol::X, 7), Ok(MoveOutcome::Win(Symbol::X)));
        assert_eq!(round.status(), RoundStatus::Won(Symbol::X));
        assert_eq!(round.to_move(), None);
    }

    #[test]
    fn test_draw_declared_only_on_full_board_without_triple() {
        let mut round = Round::new();
        // X O X / X O O / O X X
        let results = play(
            &mut round,
            &[
                (Symbol::X, 0),
                (Symbol::O, 1),
                (Symbol::X, 2),
                (Symbol::O, 4),
                (Symbol::X, 3),
                (Symbol::O, 5),
                (Symbol::X, 7),
                (Symbol::O, 6),
            ],
        );
        assert!(results.iter().all(|r| *r == Ok(MoveOutcome::Continue)));
        assert_eq!(round.apply_move(Symbol::X, 8), Ok(MoveOutcome::Draw));
        assert_eq!(round.status(), RoundStatus::Drawn);
    }

    #[test]
    fn test_win_on_last_cell_is_a_win_not_a_draw() {
        let mut round = Round::new();
        // X X O / O X X / O O X with X completing the diagonal on the last cell.
        play(
            &mut round,
            &[
                (Symbol::X, 0),
                (Symbol::O, 2),
                (Symbol::X, 1),
                (Symbol::O, 3),
                (Symbol::X, 4),
                (Symbol::O, 7),
                (Symbol::X, 5),
                (Symbol::O, 6),
            ],
        );
        assert_eq!(round.apply_move(Symbol::X, 8), Ok(MoveOutcome::Win(Symbol::X)));
        assert!(round.board().is_full());
    }

    #[test]
    fn test_moves_after_round_end_are_rejected() {
        let mut round = Round::new();
        play(
            &mut round,
            &[
                (Symbol::X, 0),
                (Symbol::O, 3),
                (Symbol::X, 1),
                (Symbol::O, 4),
                (Symbol::X, 2),
            ],
        );
        assert_eq!(round.status(), RoundStatus::Won(Symbol::X));
        assert_eq!(round.apply_move(Symbol::O, 5), Err(MoveError::RoundOver));
    }

    #[test]
    fn test_reset_clears_board_and_restores_x() {
        let mut round = Round::new();
        play(&mut round, &[(Symbol::X, 0), (Symbol::O, 1)]);
        round.reset();
        assert_eq!(round, Round::new());
    }
}
