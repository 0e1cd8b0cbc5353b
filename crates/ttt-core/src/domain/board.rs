//! The 3x3 board.
//!
//! Cells are addressed by index, row-major:
//!
//! ```text
//!  0 | 1 | 2
//! -----------
//!  3 | 4 | 5
//! -----------
//!  6 | 7 | 8
//! ```
//!
//! A cell is either empty (`None`) or holds a [`Symbol`].  Once filled, a cell
//! is never overwritten; [`Board::place`] refuses instead.

use std::fmt;

use thiserror::Error;

/// Number of cells on the board.
pub const BOARD_CELLS: usize = 9;

/// The eight fixed lines checked for three-in-a-row: 3 rows, 3 columns, 2 diagonals.
pub const TRIPLES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

/// A player's mark.  `X` always moves first in a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Symbol {
    X = 0x01,
    O = 0x02,
}

impl Symbol {
    /// Returns the other player's symbol.
    pub fn opponent(self) -> Self {
        match self {
            Symbol::X => Symbol::O,
            Symbol::O => Symbol::X,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Symbol::X => 'X',
            Symbol::O => 'O',
        }
    }
}

impl TryFrom<u8> for Symbol {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x01 => Ok(Symbol::X),
            0x02 => Ok(Symbol::O),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Reasons a move is refused.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum MoveError {
    #[error("cell {0} is outside the board (0-8)")]
    OutOfRange(u8),
    #[error("cell {0} is already taken")]
    Occupied(u8),
    #[error("it is {expected}'s turn, not {attempted}'s")]
    NotYourTurn { expected: Symbol, attempted: Symbol },
    #[error("the round is over")]
    RoundOver,
}

/// Nine cells, each empty or marked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Board {
    cells: [Option<Symbol>; BOARD_CELLS],
}

impl Board {
    /// Creates an all-empty board.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cells(&self) -> &[Option<Symbol>; BOARD_CELLS] {
        &self.cells
    }

    /// Marks `index` with `symbol`.
    ///
    /// # Errors
    ///
    /// [`MoveError::OutOfRange`] for an index above 8, [`MoveError::Occupied`]
    /// if the cell already holds a symbol.  The board is unchanged on error.
    pub fn place(&mut self, index: u8, symbol: Symbol) -> Result<(), MoveError> {
        let slot = self
            .cells
            .get_mut(index as usize)
            .ok_or(MoveError::OutOfRange(index))?;
        if slot.is_some() {
            return Err(MoveError::Occupied(index));
        }
        *slot = Some(symbol);
        Ok(())
    }

    /// True iff one of the eight [`TRIPLES`] is uniformly `symbol`.
    pub fn has_triple(&self, symbol: Symbol) -> bool {
        TRIPLES
            .iter()
            .any(|line| line.iter().all(|&i| self.cells[i] == Some(symbol)))
    }

    pub fn is_full(&self) -> bool {
        self.cells.iter().all(Option::is_some)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
