//! Quarto game state and turn mechanics.
//!
//! A turn has two phases. The player *not* on move picks a piece from the
//! pool ([`GameState::select_piece`]) and hands it over; the player on move
//! places it ([`GameState::place_piece`]), which passes the turn. Selecting
//! never changes `current_player`.
//!
//! `GameState` is a plain value: cloning it gives a fully independent
//! snapshot, which is how every search strategy explores hypothetical moves.

use crate::board::{Board, Cell};
use crate::constants::N;
use crate::error::{GameError, Result};
use crate::piece::Piece;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameState {
    board: Board,
    /// Pieces not yet selected, in their original relative order.
    available: Vec<Piece>,
    /// Piece handed to the player on move but not placed yet.
    selected: Option<Piece>,
    current_player: usize,
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

impl GameState {
    /// A fresh game: empty board, all 16 pieces available, player 0 on move.
    pub fn new() -> Self {
        Self {
            board: Board::new(),
            available: Piece::full_set(),
            selected: None,
            current_player: 0,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn available_pieces(&self) -> &[Piece] {
        &self.available
    }

    pub fn selected_piece(&self) -> Option<Piece> {
        self.selected
    }

    /// The player who places the next piece (0 or 1).
    pub fn current_player(&self) -> usize {
        self.current_player
    }

    /// Move the piece at `index` of the pool into the pending slot.
    pub fn select_piece(&mut self, index: usize) -> Result<()> {
        if self.selected.is_some() {
            return Err(GameError::IllegalState("a piece is already selected"));
        }
        if index >= self.available.len() {
            return Err(GameError::InvalidIndex {
                index,
                available: self.available.len(),
            });
        }
        self.selected = Some(self.available.remove(index));
        Ok(())
    }

    /// Place the pending piece and pass the turn.
    pub fn place_piece(&mut self, row: usize, col: usize) -> Result<()> {
        let piece = self.check_placement(row, col)?;
        self.board.place(piece, row, col)?;
        self.selected = None;
        self.current_player = 1 - self.current_player;
        Ok(())
    }

    /// Validate a placement without applying it, returning the pending piece.
    fn check_placement(&self, row: usize, col: usize) -> Result<Piece> {
        let piece = self
            .selected
            .ok_or(GameError::IllegalState("no piece selected"))?;
        if self.board.get(row, col)?.is_some() {
            return Err(GameError::CellOccupied { row, col });
        }
        Ok(piece)
    }

    pub fn check_win(&self) -> bool {
        self.board.has_winning_line()
    }

    pub fn is_game_over(&self) -> bool {
        self.check_win() || self.board.is_full()
    }

    /// Snapshot of the state after placing the pending piece at `(row, col)`,
    /// or `None` if that placement is rejected.
    pub fn after_placement(&self, row: usize, col: usize) -> Option<GameState> {
        self.check_placement(row, col).ok()?;
        let mut next = self.clone();
        next.place_piece(row, col).ok()?;
        Some(next)
    }

    /// Snapshot of the state after selecting piece `index`, or `None` if that
    /// selection is rejected.
    pub fn after_selection(&self, index: usize) -> Option<GameState> {
        let mut next = self.clone();
        next.select_piece(index).ok()?;
        Some(next)
    }

    /// Every cell a placement would currently succeed on, row-major.
    ///
    /// Empty when no piece is pending.
    pub fn legal_placements(&self) -> Vec<Cell> {
        (0..N)
            .flat_map(|row| (0..N).map(move |col| (row, col)))
            .filter(|&(row, col)| self.check_placement(row, col).is_ok())
            .collect()
    }

    /// Placements made so far.
    pub fn placed(&self) -> usize {
        self.board.filled()
    }
}
