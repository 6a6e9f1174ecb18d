//! Quarto-Engine: rules and AI strategies for the board game Quarto.
//!
//! Quarto is played on a 4x4 board with 16 pieces, each tall or short, solid
//! or hollow, square or circular, dark or light. Players take turns handing
//! the opponent a piece, which the opponent must place. Completing a line of
//! four pieces sharing any one attribute wins.
//!
//! ## Modules
//!
//! - [`constants`] - Board dimensions and engine parameters
//! - [`piece`], [`board`], [`game`] - Core game rules
//! - [`minimax`] - Depth-limited adversarial search
//! - [`mcts`] - UCT tree search and flat parallel rollouts
//! - [`playout`] - Random game simulation for position evaluation
//! - [`evolution`] - Genetic optimization of weight-vector strategies
//! - [`player`] - Strategy selection and AI-vs-AI games
//! - [`trace`] - Optional structured event sink
//!
//! ## Example
//!
//! ```
//! use quarto_engine::player::{AiPlayer, Strategy};
//!
//! let mut game = quarto_engine::new_game();
//! let mut ai = AiPlayer::new(Strategy::Minimax).unwrap();
//!
//! // The AI hands us a piece, we place it.
//! let index = quarto_engine::ai_select_piece(&mut ai, &game).unwrap();
//! quarto_engine::select_piece(&mut game, index).unwrap();
//! quarto_engine::place_piece(&mut game, 0, 0).unwrap();
//! assert!(!quarto_engine::is_game_over(&game));
//! ```

pub mod board;
pub mod constants;
pub mod error;
pub mod evolution;
pub mod game;
pub mod mcts;
pub mod minimax;
pub mod piece;
pub mod player;
pub mod playout;
pub mod trace;

use crate::board::Cell;
use crate::error::Result;
use crate::game::GameState;
use crate::player::AiPlayer;

pub fn new_game() -> GameState {
    GameState::new()
}

pub fn select_piece(state: &mut GameState, index: usize) -> Result<()> {
    state.select_piece(index)
}

pub fn place_piece(state: &mut GameState, row: usize, col: usize) -> Result<()> {
    state.place_piece(row, col)
}

pub fn check_win(state: &GameState) -> bool {
    state.check_win()
}

pub fn is_game_over(state: &GameState) -> bool {
    state.is_game_over()
}

/// Ask `player` which piece to hand over next.
pub fn ai_select_piece(player: &mut AiPlayer, state: &GameState) -> Result<usize> {
    player.select_piece(state)
}

/// Ask `player` where to place the pending piece.
pub fn ai_make_move(player: &mut AiPlayer, state: &GameState) -> Result<Cell> {
    player.make_move(state)
}

/// The first candidate with the highest finite score.
///
/// Later candidates replace the current best only when strictly better, so
/// ties keep the first one seen.
pub(crate) fn first_best<T>(candidates: impl IntoIterator<Item = (T, f64)>) -> Option<(T, f64)> {
    let mut best: Option<(T, f64)> = None;
    for (item, score) in candidates {
        if !score.is_finite() {
            continue;
        }
        if best.as_ref().is_none_or(|&(_, top)| score > top) {
            best = Some((item, score));
        }
    }
    best
}
