//! TicTacToe board for the search engine
//!
//! A small perfect-information game used to exercise the search end to end:
//! proven wins and losses show up within a few plies, so score bounds and
//! pruning have something to do.
//!
//! # Usage
//!
//! ```rust
//! use engine_core::{Board, CallSite};
//! use games_tictactoe::TicTacToe;
//!
//! let mut board = TicTacToe::new();
//! board.apply(&4);
//! assert_eq!(board.current_player(), 1);
//! assert_eq!(board.legal_moves(CallSite::TreePolicy).len(), 8);
//! ```

use engine_core::game_utils::{draw, win_for};
use engine_core::{Board, CallSite, PlayerId, Scores};
use thiserror::Error;

/// Winning positions (rows, columns, diagonals)
const LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8], // rows
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8], // columns
    [0, 4, 8],
    [2, 4, 6], // diagonals
];

/// Error parsing a board diagram.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Expected 3 rows of 3 cells, got {0:?}")]
    Shape(String),

    #[error("Invalid cell {0:?}, expected 'X', 'O' or '.'")]
    Cell(char),

    #[error("Piece counts X={x} O={o} cannot occur in a game")]
    Counts { x: usize, o: usize },
}

/// TicTacToe position.
///
/// Player 0 plays X and always moves first; player 1 plays O. Moves are the
/// cell index 0-8, row by row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TicTacToe {
    /// 0=empty, 1=X, 2=O
    cells: [u8; 9],
    /// Current player: 1=X, 2=O
    to_move: u8,
    /// Winner: 0=none/ongoing, 1=X, 2=O, 3=draw
    winner: u8,
}

impl TicTacToe {
    /// Empty board, X to move.
    pub fn new() -> Self {
        Self {
            cells: [0; 9],
            to_move: 1,
            winner: 0,
        }
    }

    /// Build a position from three rows of `X`, `O` and `.`.
    ///
    /// The player to move follows from the piece counts.
    pub fn from_rows(rows: [&str; 3]) -> Result<Self, ParseError> {
        let mut cells = [0u8; 9];
        for (r, row) in rows.iter().enumerate() {
            let chars: Vec<char> = row.chars().collect();
            if chars.len() != 3 {
                return Err(ParseError::Shape(rows.join("/")));
            }
            for (c, ch) in chars.into_iter().enumerate() {
                cells[r * 3 + c] = match ch {
                    'X' | 'x' => 1,
                    'O' | 'o' => 2,
                    '.' => 0,
                    other => return Err(ParseError::Cell(other)),
                };
            }
        }

        let x = cells.iter().filter(|&&c| c == 1).count();
        let o = cells.iter().filter(|&&c| c == 2).count();
        if x != o && x != o + 1 {
            return Err(ParseError::Counts { x, o });
        }

        Ok(Self {
            cells,
            to_move: if x == o { 1 } else { 2 },
            winner: Self::check_winner(&cells),
        })
    }

    /// Cell contents: 0=empty, 1=X, 2=O.
    pub fn cells(&self) -> &[u8; 9] {
        &self.cells
    }

    /// `Some(player)` for a win, `None` for a draw or an unfinished game.
    pub fn winner(&self) -> Option<PlayerId> {
        match self.winner {
            1 | 2 => Some(usize::from(self.winner - 1)),
            _ => None,
        }
    }

    /// Check for winner on the board
    fn check_winner(cells: &[u8; 9]) -> u8 {
        for line in &LINES {
            let [a, b, c] = *line;
            if cells[a] != 0 && cells[a] == cells[b] && cells[b] == cells[c] {
                return cells[a];
            }
        }

        if cells.iter().all(|&cell| cell != 0) {
            return 3;
        }

        0
    }
}

impl Default for TicTacToe {
    fn default() -> Self {
        Self::new()
    }
}

impl Board for TicTacToe {
    type Move = u8;

    fn current_player(&self) -> PlayerId {
        usize::from(self.to_move - 1)
    }

    fn player_count(&self) -> usize {
        2
    }

    fn legal_moves(&self, _site: CallSite) -> Vec<u8> {
        if self.is_terminal() {
            return Vec::new();
        }
        (0..9u8).filter(|&pos| self.cells[pos as usize] == 0).collect()
    }

    fn apply(&mut self, mv: &u8) {
        let pos = usize::from(*mv);
        debug_assert!(pos < 9 && self.cells[pos] == 0, "illegal move {mv}");
        if self.is_terminal() || pos >= 9 || self.cells[pos] != 0 {
            return;
        }

        self.cells[pos] = self.to_move;
        self.winner = Self::check_winner(&self.cells);
        if self.winner == 0 {
            self.to_move = if self.to_move == 1 { 2 } else { 1 };
        }
    }

    fn is_terminal(&self) -> bool {
        self.winner != 0
    }

    fn scores(&self) -> Scores {
        match self.winner() {
            Some(player) => win_for(player, 2),
            None => draw(2),
        }
    }
}
