//! Monte Carlo Tree Search (MCTS) for placements, plus a flat rollout
//! estimator for piece selection.
//!
//! This module implements:
//! - UCT selection (`wins/visits + sqrt(2 ln(parent visits) / visits)`)
//! - Incremental expansion, one untried placement per iteration
//! - Random playouts for value estimation, see [`crate::playout`]
//! - Flat parallel rollouts to rank candidate pieces
//!
//! The tree lives in an arena ([`SearchTree`]) and nodes refer to their parent
//! by [`NodeId`], so there are no ownership cycles.
//!
//! ## Concurrency
//!
//! Only rollouts run in parallel. Each batch, the calling thread selects and
//! expands `batch_size` leaves, the worker pool plays one playout per leaf on
//! its own copy of the state, and the results are backpropagated in
//! submission order once the batch is done. Every rollout gets its own seed
//! drawn up front, so a search is reproducible for a given seed and batch size
//! regardless of the number of worker threads.
//!
//! A time budget is checked between batches only. A batch is dispatched to
//! the pool as a whole and always runs to completion, so a search can overrun
//! its deadline by one batch.
//!
//! Backpropagation adds the raw signed playout result to every node on the
//! path, without flipping it per level.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use rayon::ThreadPool;
use rayon::prelude::*;

use crate::board::Cell;
use crate::constants::{MCTS_TIME_BUDGET, SIMULATIONS_PER_PIECE, UCT_EXPLORATION, default_workers};
use crate::error::EngineError;
use crate::first_best;
use crate::game::GameState;
use crate::playout::random_playout;

/// How long a placement search runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Budget {
    /// Stop submitting batches once this much wall-clock time has passed.
    /// The batch in flight at the deadline still completes.
    Time(Duration),
    /// Run exactly this many iterations.
    Iterations(usize),
}

/// MCTS configuration parameters.
#[derive(Clone, Debug)]
pub struct MctsConfig {
    pub budget: Budget,
    /// Random playouts per candidate piece in [`MonteCarlo::select_piece`].
    pub simulations_per_piece: usize,
    /// Worker pool size.
    pub workers: usize,
    /// Iterations dispatched per batch.
    pub batch_size: usize,
    /// Constant inside the UCT exploration square root.
    pub exploration: f64,
}

impl Default for MctsConfig {
    fn default() -> Self {
        let workers = default_workers();
        Self {
            budget: Budget::Time(MCTS_TIME_BUDGET),
            simulations_per_piece: SIMULATIONS_PER_PIECE,
            workers,
            batch_size: workers,
            exploration: UCT_EXPLORATION,
        }
    }
}

impl MctsConfig {
    /// Create a config running a fixed number of iterations.
    pub fn with_iterations(iterations: usize) -> Self {
        Self {
            budget: Budget::Iterations(iterations),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.workers == 0 {
            return Err(EngineError::Validation("workers must be > 0".to_string()));
        }
        if self.batch_size == 0 {
            return Err(EngineError::Validation("batch_size must be > 0".to_string()));
        }
        if self.simulations_per_piece == 0 {
            return Err(EngineError::Validation(
                "simulations_per_piece must be > 0".to_string(),
            ));
        }
        if !(self.exploration >= 0.0 && self.exploration.is_finite()) {
            return Err(EngineError::Validation(
                "exploration must be finite and >= 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Build the bounded worker pool shared by the parallel strategies.
pub fn worker_pool(workers: usize) -> Result<ThreadPool, EngineError> {
    Ok(rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("quarto-worker-{i}"))
        .build()?)
}

/// Handle of a node inside a [`SearchTree`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);
}

/// A node in the MCTS search tree.
#[derive(Clone, Debug)]
pub struct Node {
    /// The game state at this node
    pub state: GameState,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// Number of visits
    pub visits: u32,
    /// Sum of signed playout results
    pub wins: f64,
    /// Legal placements not yet expanded into children
    pub untried: Vec<Cell>,
}

impl Node {
    fn new(state: GameState, parent: Option<NodeId>) -> Self {
        let untried = state.legal_placements();
        Self {
            state,
            parent,
            children: Vec::new(),
            visits: 0,
            wins: 0.0,
            untried,
        }
    }

    #[inline]
    pub fn win_rate(&self) -> f64 {
        if self.visits > 0 {
            self.wins / self.visits as f64
        } else {
            0.0
        }
    }
}

/// Arena-allocated MCTS tree.
#[derive(Clone, Debug)]
pub struct SearchTree {
    nodes: Vec<Node>,
    exploration: f64,
}

impl SearchTree {
    pub fn new(state: GameState) -> Self {
        Self::with_exploration(state, UCT_EXPLORATION)
    }

    pub fn with_exploration(state: GameState, exploration: f64) -> Self {
        Self {
            nodes: vec![Node::new(state, None)],
            exploration,
        }
    }

    /// # Panics
    /// Panics if the NodeId does not belong to this tree.
    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn root(&self) -> &Node {
        self.get(NodeId::ROOT)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false: the root exists from construction.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn children(&self, id: NodeId) -> impl Iterator<Item = &Node> + '_ {
        self.get(id).children.iter().map(|&child| self.get(child))
    }

    /// UCT score of a node. Unvisited nodes are maximally urgent.
    fn uct(&self, id: NodeId) -> f64 {
        let node = self.get(id);
        if node.visits == 0 {
            return f64::INFINITY;
        }
        let parent_visits = node
            .parent
            .map_or(0, |parent| self.get(parent).visits)
            .max(1);
        node.win_rate()
            + (self.exploration * (parent_visits as f64).ln() / node.visits as f64).sqrt()
    }

    /// Child with the highest UCT score, first in enumeration order on ties.
    fn most_urgent(&self, id: NodeId) -> Option<NodeId> {
        let mut best: Option<(NodeId, f64)> = None;
        for &child in &self.get(id).children {
            let score = self.uct(child);
            if best.is_none_or(|(_, top)| score > top) {
                best = Some((child, score));
            }
        }
        best.map(|(child, _)| child)
    }

    /// Descend from the root while the node is fully expanded and has
    /// children.
    pub fn select(&self) -> NodeId {
        let mut id = NodeId::ROOT;
        loop {
            let node = self.get(id);
            if !node.untried.is_empty() {
                return id;
            }
            match self.most_urgent(id) {
                Some(child) => id = child,
                None => return id,
            }
        }
    }

    /// Expand one untried placement of `id`, chosen uniformly at random.
    ///
    /// Returns `None` when the node has nothing left to expand.
    pub fn expand(&mut self, id: NodeId, rng: &mut fastrand::Rng) -> Option<NodeId> {
        let node = &mut self.nodes[id.0];
        if node.untried.is_empty() {
            return None;
        }
        let (row, col) = node.untried.swap_remove(rng.usize(..node.untried.len()));
        let state = node.state.after_placement(row, col)?;

        let child = NodeId(self.nodes.len());
        self.nodes.push(Node::new(state, Some(id)));
        self.nodes[id.0].children.push(child);
        Some(child)
    }

    /// Add one visit and `result` to `from` and all its ancestors.
    pub fn backpropagate(&mut self, from: NodeId, result: i32) {
        let mut cursor = Some(from);
        while let Some(id) = cursor {
            let node = &mut self.nodes[id.0];
            node.visits += 1;
            node.wins += f64::from(result);
            cursor = node.parent;
        }
    }

    /// The most visited root child, first in enumeration order on ties.
    pub fn best_child(&self) -> Option<&Node> {
        first_best(
            self.children(NodeId::ROOT)
                .map(|child| (child, f64::from(child.visits))),
        )
        .map(|(child, _)| child)
    }
}

/// Summary of one placement search.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchStats {
    pub iterations: usize,
    pub root_visits: u32,
    pub tree_size: usize,
    pub child_visits: Vec<u32>,
}

/// Monte Carlo engine: owns its configuration and worker pool.
pub struct MonteCarlo {
    config: MctsConfig,
    pool: ThreadPool,
}

impl MonteCarlo {
    pub fn new(config: MctsConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let pool = worker_pool(config.workers)?;
        Ok(Self { config, pool })
    }

    pub fn config(&self) -> &MctsConfig {
        &self.config
    }

    /// Winning playouts per available piece.
    ///
    /// Every piece gets `simulations_per_piece` independent playouts, each
    /// starting by selecting that piece on a private copy of `state`. A
    /// playout counts when it scores `+1`. Empty when a piece is already
    /// pending.
    pub fn estimate_pieces(&self, state: &GameState, seed: u64) -> Vec<u32> {
        if state.selected_piece().is_some() {
            return Vec::new();
        }
        let pieces = state.available_pieces().len();
        let per_piece = self.config.simulations_per_piece;
        let wins: Vec<AtomicU32> = (0..pieces).map(|_| AtomicU32::new(0)).collect();

        self.pool.install(|| {
            (0..pieces * per_piece).into_par_iter().for_each(|trial| {
                let piece = trial / per_piece;
                let Some(mut sim) = state.after_selection(piece) else {
                    return;
                };
                let mut rng = fastrand::Rng::with_seed(trial_seed(seed, trial));
                if random_playout(&mut sim, &mut rng) == 1 {
                    wins[piece].fetch_add(1, Ordering::Relaxed);
                }
            });
        });

        wins.into_iter().map(AtomicU32::into_inner).collect()
    }

    /// Piece with the most winning playouts, with the full tally.
    pub fn select_piece(&self, state: &GameState, seed: u64) -> Option<(usize, Vec<u32>)> {
        let wins = self.estimate_pieces(state, seed);
        let (index, _) = first_best(
            wins.iter()
                .enumerate()
                .map(|(index, &w)| (index, f64::from(w))),
        )?;
        Some((index, wins))
    }

    /// Grow a search tree rooted at a copy of `state` until the budget runs
    /// out. Returns the tree and the number of completed iterations.
    pub fn search(&self, state: &GameState, rng: &mut fastrand::Rng) -> (SearchTree, usize) {
        let mut tree = SearchTree::with_exploration(state.clone(), self.config.exploration);
        let started = Instant::now();
        let mut iterations = 0;

        loop {
            let batch = match self.config.budget {
                Budget::Time(limit) if started.elapsed() >= limit => 0,
                Budget::Time(_) => self.config.batch_size,
                Budget::Iterations(total) => self.config.batch_size.min(total - iterations),
            };
            if batch == 0 {
                break;
            }

            // Select and expand on this thread; fully expanded leaves are
            // simulated from themselves.
            let leaves: Vec<(NodeId, GameState, u64)> = (0..batch)
                .map(|_| {
                    let selected = tree.select();
                    let leaf = tree.expand(selected, rng).unwrap_or(selected);
                    (leaf, tree.get(leaf).state.clone(), rng.u64(..))
                })
                .collect();

            let results: Vec<(NodeId, i32)> = self.pool.install(|| {
                leaves
                    .into_par_iter()
                    .map(|(leaf, mut sim, seed)| {
                        let mut rng = fastrand::Rng::with_seed(seed);
                        (leaf, random_playout(&mut sim, &mut rng))
                    })
                    .collect()
            });

            for (leaf, result) in results {
                tree.backpropagate(leaf, result);
            }
            iterations += batch;
        }

        (tree, iterations)
    }

    /// Run a search and return the placement leading to the most visited root
    /// child, along with search statistics.
    pub fn best_move(&self, state: &GameState, rng: &mut fastrand::Rng) -> (Option<Cell>, SearchStats) {
        let (tree, iterations) = self.search(state, rng);
        let stats = SearchStats {
            iterations,
            root_visits: tree.root().visits,
            tree_size: tree.len(),
            child_visits: tree.children(NodeId::ROOT).map(|c| c.visits).collect(),
        };
        let mv = tree
            .best_child()
            .and_then(|best| match_placement(state, &best.state));
        (mv, stats)
    }
}

/// Recover the placement that turns `state` into `target` by trying every
/// legal placement and comparing boards.
pub fn match_placement(state: &GameState, target: &GameState) -> Option<Cell> {
    state.legal_placements().into_iter().find(|&(row, col)| {
        state
            .after_placement(row, col)
            .is_some_and(|next| next.board() == target.board())
    })
}

fn trial_seed(seed: u64, trial: usize) -> u64 {
    seed ^ (trial as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending_game() -> GameState {
        let mut game = GameState::new();
        game.select_piece(0).unwrap();
        game.place_piece(1, 1).unwrap();
        game.select_piece(3).unwrap();
        game
    }

    /// Place pieces by bits in row-major order from the top-left corner.
    fn fill(bits: &[u8]) -> GameState {
        let mut game = GameState::new();
        for (cell, &b) in bits.iter().enumerate() {
            let idx = game
                .available_pieces()
                .iter()
                .position(|p| p.bits() == b)
                .unwrap();
            game.select_piece(idx).unwrap();
            game.place_piece(cell / 4, cell % 4).unwrap();
        }
        game
    }

    fn engine(iterations: usize, workers: usize, batch_size: usize) -> MonteCarlo {
        MonteCarlo::new(MctsConfig {
            budget: Budget::Iterations(iterations),
            workers,
            batch_size,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_node_untried_moves() {
        let tree = SearchTree::new(pending_game());
        assert_eq!(tree.root().untried.len(), 15);
        assert!(!tree.root().untried.contains(&(1, 1)));

        // Nothing pending: no placement succeeds.
        let tree = SearchTree::new(GameState::new());
        assert!(tree.root().untried.is_empty());
    }

    #[test]
    fn test_expand_moves_placement_to_child() {
        let mut tree = SearchTree::new(pending_game());
        let mut rng = fastrand::Rng::with_seed(1);
        let child = tree.expand(NodeId::ROOT, &mut rng).unwrap();

        assert_eq!(tree.len(), 2);
        assert_eq!(tree.root().untried.len(), 14);
        assert_eq!(tree.root().children, vec![child]);
        assert_eq!(tree.get(child).parent, Some(NodeId::ROOT));
        assert_eq!(tree.get(child).state.placed(), 2);
        // The child has nothing pending, so it cannot expand further.
        assert!(tree.expand(child, &mut rng).is_none());
    }

    #[test]
    fn test_backpropagate_raw_sign() {
        let mut tree = SearchTree::new(pending_game());
        let mut rng = fastrand::Rng::with_seed(2);
        let child = tree.expand(NodeId::ROOT, &mut rng).unwrap();

        tree.backpropagate(child, 1);
        tree.backpropagate(child, -1);
        tree.backpropagate(child, 1);
        assert_eq!(tree.get(child).visits, 3);
        assert_eq!(tree.get(child).wins, 1.0);
        assert_eq!(tree.root().visits, 3);
        assert_eq!(tree.root().wins, 1.0);
    }

    #[test]
    fn test_select_prefers_untried_then_urgent() {
        let mut tree = SearchTree::new(pending_game());
        let mut rng = fastrand::Rng::with_seed(3);
        assert_eq!(tree.select(), NodeId::ROOT);

        while tree.expand(NodeId::ROOT, &mut rng).is_some() {}
        let children = tree.root().children.clone();
        // Visit every child once except the last: the unvisited one wins.
        for &child in &children[..children.len() - 1] {
            tree.backpropagate(child, 0);
        }
        assert_eq!(tree.select(), children[children.len() - 1]);
    }

    #[test]
    fn test_uct_formula() {
        let mut tree = SearchTree::new(pending_game());
        let mut rng = fastrand::Rng::with_seed(4);
        let a = tree.expand(NodeId::ROOT, &mut rng).unwrap();
        let b = tree.expand(NodeId::ROOT, &mut rng).unwrap();
        tree.backpropagate(a, 1);
        tree.backpropagate(a, 1);
        tree.backpropagate(b, -1);

        let expected = 1.0 + (2.0 * 3f64.ln() / 2.0).sqrt();
        assert!((tree.uct(a) - expected).abs() < 1e-12);
        assert!(tree.uct(a) > tree.uct(b));
    }

    #[test]
    fn test_root_visits_match_iterations() {
        let mc = engine(64, 2, 8);
        let mut rng = fastrand::Rng::with_seed(5);
        let (tree, iterations) = mc.search(&pending_game(), &mut rng);

        assert_eq!(iterations, 64);
        assert_eq!(tree.root().visits, 64);
        let child_total: u32 = tree.children(NodeId::ROOT).map(|c| c.visits).sum();
        assert_eq!(child_total, 64);
        assert_eq!(tree.root().children.len(), 15);
        assert!(tree.root().wins.is_finite());
    }

    #[test]
    fn test_search_independent_of_thread_count() {
        let state = pending_game();
        let single = engine(96, 1, 4);
        let multi = engine(96, 4, 4);

        let (a, _) = single.search(&state, &mut fastrand::Rng::with_seed(9));
        let (b, _) = multi.search(&state, &mut fastrand::Rng::with_seed(9));

        let visits = |t: &SearchTree| t.children(NodeId::ROOT).map(|c| c.visits).collect::<Vec<_>>();
        let wins = |t: &SearchTree| t.children(NodeId::ROOT).map(|c| c.wins).collect::<Vec<_>>();
        assert_eq!(a.root().visits, b.root().visits);
        assert_eq!(visits(&a), visits(&b));
        assert_eq!(wins(&a), wins(&b));
    }

    #[test]
    fn test_search_without_pending_piece() {
        let mc = engine(10, 1, 5);
        let (tree, iterations) = mc.search(&GameState::new(), &mut fastrand::Rng::with_seed(6));
        assert_eq!(iterations, 10);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.root().visits, 10);

        let (mv, stats) = mc.best_move(&GameState::new(), &mut fastrand::Rng::with_seed(6));
        assert_eq!(mv, None);
        assert!(stats.child_visits.is_empty());
    }

    #[test]
    fn test_best_move_is_most_visited() {
        let mc = engine(200, 2, 4);
        let state = pending_game();
        let (mv, stats) = mc.best_move(&state, &mut fastrand::Rng::with_seed(8));
        let (row, col) = mv.unwrap();
        assert!(state.legal_placements().contains(&(row, col)));
        assert_eq!(stats.root_visits, 200);
        assert_eq!(stats.child_visits.iter().sum::<u32>(), 200);
        assert_eq!(stats.tree_size, 16);
    }

    #[test]
    fn test_time_budget_stops() {
        let mc = MonteCarlo::new(MctsConfig {
            budget: Budget::Time(Duration::from_millis(30)),
            workers: 2,
            batch_size: 2,
            ..Default::default()
        })
        .unwrap();
        let started = Instant::now();
        let (tree, iterations) = mc.search(&pending_game(), &mut fastrand::Rng::with_seed(7));
        assert!(iterations > 0);
        assert_eq!(tree.root().visits as usize, iterations);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_match_placement() {
        let state = pending_game();
        let target = state.after_placement(2, 3).unwrap();
        assert_eq!(match_placement(&state, &target), Some((2, 3)));
        assert_eq!(match_placement(&state, &state), None);
    }

    #[test]
    fn test_estimate_pieces() {
        let mc = engine(1, 2, 1);
        let mut state = GameState::new();
        state.select_piece(0).unwrap();
        state.place_piece(0, 0).unwrap();

        let wins = mc.estimate_pieces(&state, 42);
        assert_eq!(wins.len(), 15);
        assert!(wins.iter().all(|&w| w <= SIMULATIONS_PER_PIECE as u32));
        // Same seed, same tally.
        assert_eq!(mc.estimate_pieces(&state, 42), wins);

        let (index, tally) = mc.select_piece(&state, 42).unwrap();
        let top = *tally.iter().max().unwrap();
        assert_eq!(tally[index], top);
        assert_eq!(tally.iter().position(|&w| w == top), Some(index));
    }

    #[test]
    fn test_estimate_pieces_counts_player_zero_wins() {
        let mc = engine(1, 2, 1);
        let all = SIMULATIONS_PER_PIECE as u32;

        // Two cells and two pieces left; every placement completes a line,
        // and player 0 makes it.
        let state = fill(&[14, 4, 9, 6, 12, 5, 13, 3, 11, 7, 8, 2, 1, 10]);
        assert_eq!(state.current_player(), 0);
        assert_eq!(mc.estimate_pieces(&state, 3), vec![all, all]);
        // Equal tallies keep the first piece.
        assert_eq!(mc.select_piece(&state, 3), Some((0, vec![all, all])));

        // One cell and one piece left; the forced placement wins for player 1.
        let state = fill(&[4, 10, 1, 14, 15, 12, 5, 11, 9, 3, 13, 8, 0, 7, 6]);
        assert_eq!(state.current_player(), 1);
        assert_eq!(mc.estimate_pieces(&state, 3), vec![0]);
        let mut last = state.after_selection(0).unwrap();
        last.place_piece(3, 3).unwrap();
        assert!(last.check_win());
    }

    #[test]
    fn test_estimate_pieces_with_pending_piece() {
        let mc = engine(1, 1, 1);
        assert!(mc.estimate_pieces(&pending_game(), 1).is_empty());
        assert_eq!(mc.select_piece(&pending_game(), 1), None);
    }

    #[test]
    fn test_config_validation() {
        let config = MctsConfig {
            workers: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(EngineError::Validation(_))));

        let config = MctsConfig {
            batch_size: 0,
            ..Default::default()
        };
        assert!(MonteCarlo::new(config).is_err());
        assert!(MctsConfig::with_iterations(10).validate().is_ok());
    }
}
