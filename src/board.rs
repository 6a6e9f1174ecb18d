use std::fmt;

use crate::constants::N;
use crate::error::{GameError, Result};
use crate::piece::{Attribute, Piece};

/// A board coordinate as `(row, col)`.
pub type Cell = (usize, usize);

/// Rows, then columns, then the main diagonal and the anti-diagonal.
const LINES: [[Cell; N]; 2 * N + 2] = [
    [(0, 0), (0, 1), (0, 2), (0, 3)],
    [(1, 0), (1, 1), (1, 2), (1, 3)],
    [(2, 0), (2, 1), (2, 2), (2, 3)],
    [(3, 0), (3, 1), (3, 2), (3, 3)],
    [(0, 0), (1, 0), (2, 0), (3, 0)],
    [(0, 1), (1, 1), (2, 1), (3, 1)],
    [(0, 2), (1, 2), (2, 2), (3, 2)],
    [(0, 3), (1, 3), (2, 3), (3, 3)],
    [(0, 0), (1, 1), (2, 2), (3, 3)],
    [(0, 3), (1, 2), (2, 1), (3, 0)],
];

/// The 4x4 playing surface. A cell, once filled, is never cleared.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Board {
    cells: [[Option<Piece>; N]; N],
}

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, row: usize, col: usize) -> Result<Option<Piece>> {
        if row >= N || col >= N {
            return Err(GameError::OutOfBounds { row, col });
        }
        Ok(self.cells[row][col])
    }

    /// Put a piece on an empty cell.
    pub fn place(&mut self, piece: Piece, row: usize, col: usize) -> Result<()> {
        if self.get(row, col)?.is_some() {
            return Err(GameError::CellOccupied { row, col });
        }
        self.cells[row][col] = Some(piece);
        Ok(())
    }

    pub fn is_full(&self) -> bool {
        self.cells.iter().flatten().all(Option::is_some)
    }

    pub fn filled(&self) -> usize {
        self.cells.iter().flatten().filter(|c| c.is_some()).count()
    }

    /// Empty cells in row-major order.
    pub fn empty_cells(&self) -> impl Iterator<Item = Cell> + '_ {
        (0..N)
            .flat_map(|row| (0..N).map(move |col| (row, col)))
            .filter(|&(row, col)| self.cells[row][col].is_none())
    }

    /// The first winning line in scan order, if any.
    pub fn winning_line(&self) -> Option<[Cell; N]> {
        LINES.into_iter().find(|line| {
            let mut pieces = [None; N];
            for (slot, &(row, col)) in pieces.iter_mut().zip(line) {
                *slot = self.cells[row][col];
            }
            line_wins(&pieces)
        })
    }

    pub fn has_winning_line(&self) -> bool {
        self.winning_line().is_some()
    }
}

/// A line wins when it is full and some attribute is constant along it.
fn line_wins(pieces: &[Option<Piece>; N]) -> bool {
    let [Some(a), Some(b), Some(c), Some(d)] = *pieces else {
        return false;
    };
    Attribute::ALL.iter().any(|&attr| {
        let first = a.attribute(attr);
        [b, c, d].iter().all(|p| p.attribute(attr) == first)
    })
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.cells {
            for cell in row {
                match cell {
                    Some(piece) => write!(f, "{piece} ")?,
                    None => write!(f, "   .    ")?,
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
