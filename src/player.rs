//! AI players: strategy selection, decision dispatch and AI-vs-AI games.
//!
//! An [`AiPlayer`] answers the two questions of a Quarto turn: which piece to
//! hand over ([`AiPlayer::select_piece`]) and where to place the piece it was
//! handed ([`AiPlayer::make_move`]). It never mutates the caller's game; the
//! caller applies the returned decision.
//!
//! Constructing an [`Strategy::Evolutionary`] player trains its population
//! before returning, which can take several seconds with the default
//! configuration.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::board::Cell;
use crate::constants::MINIMAX_DEPTH;
use crate::error::{EngineError, GameError, Result};
use crate::evolution::{Evolution, EvolutionConfig, Individual};
use crate::game::GameState;
use crate::mcts::{MctsConfig, MonteCarlo, worker_pool};
use crate::minimax::{select_move_minimax_as, select_piece_minimax_as};
use crate::trace::{Event, EventSink};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum Strategy {
    /// Random piece, first free cell
    Simple,
    /// Depth-limited minimax
    Minimax,
    /// Monte Carlo tree search and flat rollouts
    Mcts,
    /// Evolved weight vector
    Evolutionary,
}

impl Strategy {
    pub const ALL: [Strategy; 4] = [
        Strategy::Simple,
        Strategy::Minimax,
        Strategy::Mcts,
        Strategy::Evolutionary,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Strategy::Simple => "simple",
            Strategy::Minimax => "minimax",
            Strategy::Mcts => "mcts",
            Strategy::Evolutionary => "evolutionary",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Strategy {
    type Err = EngineError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let tag = s.trim().to_lowercase();
        Strategy::ALL
            .into_iter()
            .find(|strategy| strategy.name() == tag)
            .ok_or_else(|| EngineError::Validation(format!("unknown strategy: {s}")))
    }
}

/// Settings for every strategy; only the chosen strategy's part is used.
#[derive(Clone, Debug)]
pub struct PlayerConfig {
    pub minimax_depth: usize,
    pub mcts: MctsConfig,
    pub evolution: EvolutionConfig,
    /// Seed for all random decisions. `None` seeds from the system.
    pub seed: Option<u64>,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            minimax_depth: MINIMAX_DEPTH,
            mcts: MctsConfig::default(),
            evolution: EvolutionConfig::default(),
            seed: None,
        }
    }
}

pub struct AiPlayer {
    strategy: Strategy,
    config: PlayerConfig,
    rng: fastrand::Rng,
    monte_carlo: Option<MonteCarlo>,
    evolution: Option<Evolution>,
    sink: Option<Arc<dyn EventSink>>,
}

impl AiPlayer {
    pub fn new(strategy: Strategy) -> std::result::Result<Self, EngineError> {
        Self::with_config(strategy, PlayerConfig::default())
    }

    pub fn with_config(
        strategy: Strategy,
        config: PlayerConfig,
    ) -> std::result::Result<Self, EngineError> {
        Self::with_sink(strategy, config, None)
    }

    /// Build a player reporting its decisions to `sink`.
    pub fn with_sink(
        strategy: Strategy,
        config: PlayerConfig,
        sink: Option<Arc<dyn EventSink>>,
    ) -> std::result::Result<Self, EngineError> {
        let mut rng = match config.seed {
            Some(seed) => fastrand::Rng::with_seed(seed),
            None => fastrand::Rng::new(),
        };

        let monte_carlo = match strategy {
            Strategy::Mcts => Some(MonteCarlo::new(config.mcts.clone())?),
            _ => None,
        };

        let evolution = match strategy {
            Strategy::Evolutionary => {
                config.evolution.validate()?;
                let pool = worker_pool(config.evolution.workers)?;
                let mut evolution = Evolution::new(config.evolution.clone(), &mut rng)?;
                evolution.run(&pool, &mut rng, sink.as_deref());
                Some(evolution)
            }
            _ => None,
        };

        Ok(Self {
            strategy,
            config,
            rng,
            monte_carlo,
            evolution,
            sink,
        })
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// The evolved individual used for decisions, if training produced one.
    pub fn best_individual(&self) -> Option<&Individual> {
        self.evolution.as_ref().and_then(Evolution::best)
    }

    fn emit(&self, event: Event) {
        if let Some(sink) = &self.sink {
            sink.record(&event);
        }
    }

    fn fallback(&self, reason: &'static str) {
        self.emit(Event::Fallback {
            strategy: self.strategy,
            reason,
        });
    }

    fn random_piece(&mut self, state: &GameState) -> usize {
        self.rng.usize(..state.available_pieces().len())
    }

    /// Choose the index of the piece to hand to the opponent.
    pub fn select_piece(&mut self, state: &GameState) -> Result<usize> {
        if state.selected_piece().is_some() {
            return Err(GameError::IllegalState("a piece is already selected"));
        }
        if state.available_pieces().is_empty() {
            return Err(GameError::IllegalState("no pieces left to select"));
        }

        let index = match self.strategy {
            Strategy::Simple => self.random_piece(state),
            Strategy::Minimax => match select_piece_minimax_as(
                state,
                self.config.minimax_depth,
                1 - state.current_player(),
            ) {
                Some((index, _)) => index,
                None => {
                    self.fallback("no finite minimax score");
                    self.random_piece(state)
                }
            },
            Strategy::Mcts => {
                let seed = self.rng.u64(..);
                let choice = self
                    .monte_carlo
                    .as_ref()
                    .and_then(|mc| mc.select_piece(state, seed));
                match choice {
                    Some((index, wins)) => {
                        self.emit(Event::PieceTally { wins });
                        index
                    }
                    None => {
                        self.fallback("no rollout tally");
                        self.random_piece(state)
                    }
                }
            }
            Strategy::Evolutionary => {
                match self.best_individual().and_then(|best| best.choose_piece(state)) {
                    Some(index) => index,
                    None => {
                        self.fallback("no evolved individual");
                        self.random_piece(state)
                    }
                }
            }
        };

        self.emit(Event::PieceChosen {
            strategy: self.strategy,
            index,
            piece: state.available_pieces()[index],
        });
        Ok(index)
    }

    /// Choose where to place the pending piece.
    pub fn make_move(&mut self, state: &GameState) -> Result<Cell> {
        if state.selected_piece().is_none() {
            return Err(GameError::IllegalState("no piece selected"));
        }
        let legal = state.legal_placements();
        let Some(&first_free) = legal.first() else {
            return Err(GameError::IllegalState("no legal placement"));
        };

        let (row, col) = match self.strategy {
            Strategy::Simple => first_free,
            Strategy::Minimax => match select_move_minimax_as(
                state,
                self.config.minimax_depth,
                state.current_player(),
            ) {
                Some((cell, _)) => cell,
                None => {
                    self.fallback("no finite minimax score");
                    first_free
                }
            },
            Strategy::Mcts => {
                let outcome = match &self.monte_carlo {
                    Some(mc) => Some(mc.best_move(state, &mut self.rng)),
                    None => None,
                };
                let chosen = outcome.and_then(|(mv, stats)| {
                    self.emit(Event::SearchFinished {
                        iterations: stats.iterations,
                        root_visits: stats.root_visits,
                        tree_size: stats.tree_size,
                        child_visits: stats.child_visits,
                    });
                    mv
                });
                chosen.unwrap_or_else(|| {
                    self.fallback("search found no move");
                    first_free
                })
            }
            Strategy::Evolutionary => {
                match self.best_individual().and_then(|best| best.choose_placement(state)) {
                    Some(cell) => cell,
                    None => {
                        self.fallback("no evolved individual");
                        legal[self.rng.usize(..legal.len())]
                    }
                }
            }
        };

        self.emit(Event::MoveChosen {
            strategy: self.strategy,
            row,
            col,
        });
        Ok((row, col))
    }
}

/// Result of a finished game.
#[derive(Clone, Debug)]
pub struct GameRecord {
    /// The player who placed the winning piece, `None` on a draw.
    pub winner: Option<usize>,
    pub placements: usize,
    pub final_state: GameState,
}

/// Play a full game from an empty board.
///
/// `players[p]` places pieces while player `p` is on move and selects the
/// pieces its opponent has to place.
///
/// Minimax decides for whichever seat it sits in. MCTS scores playouts from
/// player 0's point of view (a playout counts as won when player 0 placed
/// the winning piece), so it only plays to win from seat 0.
pub fn play_game(players: [&mut AiPlayer; 2]) -> Result<GameRecord> {
    let mut game = GameState::new();
    let mut placements = 0;

    while !game.is_game_over() {
        let placer = game.current_player();
        let index = players[1 - placer].select_piece(&game)?;
        game.select_piece(index)?;
        let (row, col) = players[placer].make_move(&game)?;
        game.place_piece(row, col)?;
        placements += 1;
    }

    let winner = game.check_win().then(|| 1 - game.current_player());
    Ok(GameRecord {
        winner,
        placements,
        final_state: game,
    })
}
