//! Monte Carlo playouts (random game simulation).
//!
//! A playout alternates uniformly random placements and selections until the
//! game ends, then scores the result. Both Monte Carlo algorithms in
//! [`crate::mcts`] use it.

use crate::game::GameState;

/// Signed outcome of a finished playout.
///
/// The sign is read when a win is detected, *after* the winning placement has
/// passed the turn: `+1` when player 1 is on move (player 0 placed the winning
/// piece), `-1` when player 0 is on move, `0` for a draw.
pub fn outcome(state: &GameState) -> i32 {
    if !state.check_win() {
        0
    } else if state.current_player() == 1 {
        1
    } else {
        -1
    }
}

/// Play random moves on `state` until the game ends and return [`outcome`].
///
/// A piece is selected at random whenever nothing is pending, so the playout
/// can start from either phase of a turn.
pub fn random_playout(state: &mut GameState, rng: &mut fastrand::Rng) -> i32 {
    loop {
        if state.check_win() || state.board().is_full() {
            return outcome(state);
        }

        if state.selected_piece().is_none() {
            let remaining = state.available_pieces().len();
            if remaining == 0 || state.select_piece(rng.usize(..remaining)).is_err() {
                return 0;
            }
        }

        let moves = state.legal_placements();
        if moves.is_empty() {
            return 0;
        }
        let (row, col) = moves[rng.usize(..moves.len())];
        if state.place_piece(row, col).is_err() {
            return 0;
        }
    }
}
