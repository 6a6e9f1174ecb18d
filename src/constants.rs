//! Constants for board geometry and default engine parameters.
//!
//! Every tunable of the search strategies has its default here. The runtime
//! configuration structs ([`crate::mcts::MctsConfig`],
//! [`crate::evolution::EvolutionConfig`], [`crate::player::PlayerConfig`])
//! start from these values.

use std::time::Duration;

// =============================================================================
// Board Geometry
// =============================================================================

/// Board size (NxN). Quarto is always played on 4x4.
pub const N: usize = 4;

/// Number of cells on the board.
pub const CELLS: usize = N * N;

/// Number of distinct pieces (one per combination of 4 binary attributes).
pub const PIECE_COUNT: usize = 16;

// =============================================================================
// Minimax Parameters
// =============================================================================

/// Default search depth in plies.
pub const MINIMAX_DEPTH: usize = 2;

// =============================================================================
// MCTS (Monte Carlo Tree Search) Parameters
// =============================================================================

/// Default wall-clock budget for a placement search.
pub const MCTS_TIME_BUDGET: Duration = Duration::from_secs(1);

/// Random playouts per candidate piece in the flat piece estimator.
pub const SIMULATIONS_PER_PIECE: usize = 10;

/// Upper bound on the worker pool size.
pub const MAX_WORKERS: usize = 32;

/// Constant inside the UCT exploration term: `sqrt(C * ln(N) / n)`.
pub const UCT_EXPLORATION: f64 = 2.0;

// =============================================================================
// Evolutionary Strategy Parameters
// =============================================================================

/// Genome length: 16 piece weights followed by a 4x4 placement grid.
pub const GENOME_LEN: usize = PIECE_COUNT + CELLS;

/// Default number of individuals per generation.
pub const POPULATION_SIZE: usize = 50;

/// Default number of generations trained at construction.
pub const GENERATIONS: usize = 20;

/// Individuals drawn per tournament.
pub const TOURNAMENT_SIZE: usize = 5;

/// Per-gene probability of being replaced after crossover.
pub const MUTATION_RATE: f64 = 0.1;

/// Self-play games per fitness evaluation.
pub const FITNESS_GAMES: usize = 5;

/// Score bonus for a placement that wins, or a piece that lets the next
/// placement win.
pub const WIN_BONUS: f64 = 1.0;

/// Score penalty for a placement that leaves the opponent a winning piece.
pub const OPPORTUNITY_PENALTY: f64 = 0.5;

/// Default worker pool size: twice the available parallelism, capped at
/// [`MAX_WORKERS`].
pub fn default_workers() -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    (cores * 2).min(MAX_WORKERS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_genome_layout() {
        assert_eq!(GENOME_LEN, 32);
        assert_eq!(CELLS, PIECE_COUNT);
    }

    #[test]
    fn test_default_workers_bounded() {
        let w = default_workers();
        assert!(w >= 1);
        assert!(w <= MAX_WORKERS);
    }
}
