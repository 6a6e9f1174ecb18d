//! Depth-limited minimax over placements.
//!
//! Scores are from a fixed point of view: a won position is worth `+1` when
//! player 0 is on move (player 1 placed the winning piece) and `-1` when
//! player 1 is on move. [`select_move_minimax`] and [`select_piece_minimax`]
//! therefore play for player 1, the side that places second.
//!
//! The recursion only enumerates placements. A node with nothing pending has
//! no legal placement, so unless it is already terminal it evaluates to the
//! identity of its aggregator (`-inf` when maximizing, `+inf` when
//! minimizing). Non-finite values are treated as pruned branches and never
//! become candidates.
//!
//! [`select_move_minimax_as`] and [`select_piece_minimax_as`] search for
//! either player: for player 0 the opponent maximizes below the root and root
//! scores are negated, so a returned score is from the deciding player's
//! point of view. [`evaluate`] itself never changes sign.

use crate::board::Cell;
use crate::first_best;
use crate::game::GameState;

/// Static evaluation of a position.
pub fn evaluate(state: &GameState) -> f64 {
    if !state.check_win() {
        0.0
    } else if state.current_player() == 0 {
        1.0
    } else {
        -1.0
    }
}

pub fn minimax(state: &GameState, depth: usize, maximizing: bool) -> f64 {
    if depth == 0 || state.is_game_over() {
        return evaluate(state);
    }

    let children = state
        .legal_placements()
        .into_iter()
        .filter_map(|(row, col)| state.after_placement(row, col))
        .map(|child| minimax(&child, depth - 1, !maximizing))
        .filter(|score| score.is_finite());

    if maximizing {
        children.fold(f64::NEG_INFINITY, f64::max)
    } else {
        children.fold(f64::INFINITY, f64::min)
    }
}

/// Best placement for the pending piece and its score, searching for
/// player 1.
///
/// `None` when no placement yields a finite score.
pub fn select_move_minimax(state: &GameState, depth: usize) -> Option<(Cell, f64)> {
    select_move_minimax_as(state, depth, 1)
}

/// Best piece index to hand over and its score, searching for player 1.
///
/// `None` when nothing can be selected or no piece yields a finite score.
pub fn select_piece_minimax(state: &GameState, depth: usize) -> Option<(usize, f64)> {
    select_piece_minimax_as(state, depth, 1)
}

#[inline]
fn perspective(player: usize) -> f64 {
    if player == 1 { 1.0 } else { -1.0 }
}

/// Best placement for the pending piece as seen by `player`.
pub fn select_move_minimax_as(
    state: &GameState,
    depth: usize,
    player: usize,
) -> Option<(Cell, f64)> {
    let sign = perspective(player);
    first_best(state.legal_placements().into_iter().filter_map(|cell| {
        let child = state.after_placement(cell.0, cell.1)?;
        Some((cell, sign * minimax(&child, depth.saturating_sub(1), player != 1)))
    }))
}

/// Best piece index to hand over as seen by `player`.
pub fn select_piece_minimax_as(
    state: &GameState,
    depth: usize,
    player: usize,
) -> Option<(usize, f64)> {
    let sign = perspective(player);
    first_best((0..state.available_pieces().len()).filter_map(|index| {
        let child = state.after_selection(index)?;
        Some((index, sign * minimax(&child, depth.saturating_sub(1), player != 1)))
    }))
}
