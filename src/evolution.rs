//! Evolutionary strategy: a genetic algorithm over weight-vector genomes.
//!
//! A genome holds 16 piece-preference weights, indexed by position in the
//! current list of available pieces, followed by a row-major 4x4 grid of
//! placement weights. Decisions add a small lookahead bonus or penalty to the
//! weight and take the best score, first candidate on ties.
//!
//! Fitness is measured by self-play: the individual makes every decision for
//! both sides, and fitness is the fraction of games that end with a win right
//! after a placement. There is no separate opponent model.

use rayon::ThreadPool;
use rayon::prelude::*;

use crate::board::Cell;
use crate::constants::{
    FITNESS_GAMES, GENERATIONS, GENOME_LEN, MUTATION_RATE, N, OPPORTUNITY_PENALTY, PIECE_COUNT,
    POPULATION_SIZE, TOURNAMENT_SIZE, WIN_BONUS, default_workers,
};
use crate::error::EngineError;
use crate::first_best;
use crate::game::GameState;
use crate::trace::{Event, EventSink};

#[derive(Clone, Debug, PartialEq)]
pub struct Individual {
    pub genes: [f64; GENOME_LEN],
    /// Fitness from the last evaluation (0 until evaluated).
    pub fitness: f64,
}

impl Individual {
    /// Genes drawn uniformly from [0, 1).
    pub fn random(rng: &mut fastrand::Rng) -> Self {
        let mut genes = [0.0; GENOME_LEN];
        for gene in &mut genes {
            *gene = rng.f64();
        }
        Self::from_genes(genes)
    }

    pub fn from_genes(genes: [f64; GENOME_LEN]) -> Self {
        Self {
            genes,
            fitness: 0.0,
        }
    }

    /// Replace each gene with a fresh uniform value with probability `rate`.
    pub fn mutate(&mut self, rate: f64, rng: &mut fastrand::Rng) {
        for gene in &mut self.genes {
            if rng.f64() < rate {
                *gene = rng.f64();
            }
        }
    }

    #[inline]
    pub fn piece_weight(&self, index: usize) -> f64 {
        self.genes[index]
    }

    #[inline]
    pub fn placement_weight(&self, row: usize, col: usize) -> f64 {
        self.genes[PIECE_COUNT + row * N + col]
    }

    /// Index of the piece to hand over.
    ///
    /// A piece that would let the next placement win gets [`WIN_BONUS`].
    pub fn choose_piece(&self, state: &GameState) -> Option<usize> {
        first_best((0..state.available_pieces().len()).filter_map(|index| {
            let child = state.after_selection(index)?;
            let bonus = if leads_to_win(&child) { WIN_BONUS } else { 0.0 };
            Some((index, self.piece_weight(index) + bonus))
        }))
        .map(|(index, _)| index)
    }

    /// Cell for the pending piece.
    ///
    /// A winning placement gets [`WIN_BONUS`]; otherwise a placement after
    /// which some available piece lets the opponent win loses
    /// [`OPPORTUNITY_PENALTY`].
    pub fn choose_placement(&self, state: &GameState) -> Option<Cell> {
        first_best(
            state
                .legal_placements()
                .into_iter()
                .filter_map(|(row, col)| {
                    let child = state.after_placement(row, col)?;
                    let mut score = self.placement_weight(row, col);
                    if child.check_win() {
                        score += WIN_BONUS;
                    } else if creates_winning_opportunity(&child) {
                        score -= OPPORTUNITY_PENALTY;
                    }
                    Some(((row, col), score))
                }),
        )
        .map(|(cell, _)| cell)
    }
}

/// Uniform crossover: each gene comes from either parent with equal odds.
pub fn crossover(a: &Individual, b: &Individual, rng: &mut fastrand::Rng) -> Individual {
    let mut genes = [0.0; GENOME_LEN];
    for (i, gene) in genes.iter_mut().enumerate() {
        *gene = if rng.bool() { a.genes[i] } else { b.genes[i] };
    }
    Individual::from_genes(genes)
}

/// Whether some placement of the pending piece wins immediately.
pub fn leads_to_win(state: &GameState) -> bool {
    state.legal_placements().into_iter().any(|(row, col)| {
        state
            .after_placement(row, col)
            .is_some_and(|next| next.check_win())
    })
}

/// Whether some available piece, once handed over, can be placed to win.
pub fn creates_winning_opportunity(state: &GameState) -> bool {
    (0..state.available_pieces().len()).any(|index| {
        state
            .after_selection(index)
            .is_some_and(|next| leads_to_win(&next))
    })
}

/// Play one game in which `individual` makes every decision.
///
/// Returns true when the game ends with a win after a placement.
pub fn self_play(individual: &Individual) -> bool {
    let mut game = GameState::new();
    while !game.is_game_over() {
        if game.selected_piece().is_none() {
            let Some(index) = individual.choose_piece(&game) else {
                return false;
            };
            if game.select_piece(index).is_err() {
                return false;
            }
        }
        let Some((row, col)) = individual.choose_placement(&game) else {
            return false;
        };
        if game.place_piece(row, col).is_err() {
            return false;
        }
        if game.check_win() {
            return true;
        }
    }
    false
}

/// Fraction of `games` self-play games that end in a win.
///
/// Self-play uses no randomness, so every game of one genome plays out the
/// same way and the fitness is always 0 or 1.
pub fn evaluate(individual: &Individual, games: usize) -> f64 {
    if games == 0 {
        return 0.0;
    }
    let wins = (0..games).filter(|_| self_play(individual)).count();
    wins as f64 / games as f64
}

/// Genetic algorithm parameters.
#[derive(Clone, Debug)]
pub struct EvolutionConfig {
    pub population_size: usize,
    pub generations: usize,
    pub tournament_size: usize,
    pub mutation_rate: f64,
    /// Self-play games per fitness evaluation.
    pub fitness_games: usize,
    /// Worker pool size for fitness evaluation.
    pub workers: usize,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            population_size: POPULATION_SIZE,
            generations: GENERATIONS,
            tournament_size: TOURNAMENT_SIZE,
            mutation_rate: MUTATION_RATE,
            fitness_games: FITNESS_GAMES,
            workers: default_workers(),
        }
    }
}

impl EvolutionConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.population_size == 0 {
            return Err(EngineError::Validation(
                "population_size must be > 0".to_string(),
            ));
        }
        if self.tournament_size == 0 || self.tournament_size > self.population_size {
            return Err(EngineError::Validation(format!(
                "tournament_size must be in 1..={}",
                self.population_size
            )));
        }
        if !(0.0..=1.0).contains(&self.mutation_rate) {
            return Err(EngineError::Validation(
                "mutation_rate must be in [0, 1]".to_string(),
            ));
        }
        if self.fitness_games == 0 {
            return Err(EngineError::Validation(
                "fitness_games must be > 0".to_string(),
            ));
        }
        if self.workers == 0 {
            return Err(EngineError::Validation("workers must be > 0".to_string()));
        }
        Ok(())
    }
}

/// Fitness statistics of one evaluated generation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GenerationSummary {
    pub generation: usize,
    pub best_fitness: f64,
    pub mean_fitness: f64,
}

/// A population under evolution.
pub struct Evolution {
    config: EvolutionConfig,
    population: Vec<Individual>,
    best: Option<Individual>,
    generation: usize,
}

impl Evolution {
    pub fn new(config: EvolutionConfig, rng: &mut fastrand::Rng) -> Result<Self, EngineError> {
        config.validate()?;
        let population = (0..config.population_size)
            .map(|_| Individual::random(rng))
            .collect();
        Ok(Self {
            config,
            population,
            best: None,
            generation: 0,
        })
    }

    pub fn population(&self) -> &[Individual] {
        &self.population
    }

    /// The fittest evaluated individual seen in any generation so far.
    pub fn best(&self) -> Option<&Individual> {
        self.best.as_ref()
    }

    /// Generations completed.
    pub fn generation(&self) -> usize {
        self.generation
    }

    /// Compute the fitness of every individual on the worker pool.
    pub fn evaluate_population(&mut self, pool: &ThreadPool) {
        let games = self.config.fitness_games;
        pool.install(|| {
            self.population
                .par_iter_mut()
                .for_each(|individual| individual.fitness = evaluate(individual, games));
        });
    }

    /// Fittest of `tournament_size` distinct individuals drawn uniformly.
    pub fn tournament_select(&self, rng: &mut fastrand::Rng) -> Option<&Individual> {
        let n = self.population.len();
        let k = self.config.tournament_size.min(n);
        let mut indices: Vec<usize> = (0..n).collect();
        for i in 0..k {
            let j = rng.usize(i..n);
            indices.swap(i, j);
        }
        first_best(
            indices[..k]
                .iter()
                .map(|&i| (&self.population[i], self.population[i].fitness)),
        )
        .map(|(individual, _)| individual)
    }

    /// A full new population bred from the current one.
    pub fn breed(&self, rng: &mut fastrand::Rng) -> Vec<Individual> {
        let mut next = Vec::with_capacity(self.config.population_size);
        while next.len() < self.config.population_size {
            let (Some(a), Some(b)) = (self.tournament_select(rng), self.tournament_select(rng))
            else {
                break;
            };
            let mut child = crossover(a, b, rng);
            child.mutate(self.config.mutation_rate, rng);
            next.push(child);
        }
        next
    }

    /// Evaluate the current population, remember its fittest individual and
    /// replace it with the next generation.
    pub fn step(&mut self, pool: &ThreadPool, rng: &mut fastrand::Rng) -> GenerationSummary {
        self.evaluate_population(pool);

        let mut best_fitness = f64::NEG_INFINITY;
        let mut total = 0.0;
        for individual in &self.population {
            best_fitness = best_fitness.max(individual.fitness);
            total += individual.fitness;
            if self
                .best
                .as_ref()
                .is_none_or(|best| individual.fitness > best.fitness)
            {
                self.best = Some(individual.clone());
            }
        }
        let summary = GenerationSummary {
            generation: self.generation,
            best_fitness,
            mean_fitness: total / self.population.len() as f64,
        };

        self.population = self.breed(rng);
        self.generation += 1;
        summary
    }

    /// Run every configured generation and return the best individual.
    pub fn run(
        &mut self,
        pool: &ThreadPool,
        rng: &mut fastrand::Rng,
        sink: Option<&dyn EventSink>,
    ) -> Option<&Individual> {
        for _ in 0..self.config.generations {
            let summary = self.step(pool, rng);
            if let Some(sink) = sink {
                sink.record(&Event::GenerationEvaluated {
                    generation: summary.generation,
                    best_fitness: summary.best_fitness,
                    mean_fitness: summary.mean_fitness,
                });
            }
        }
        if let Some(sink) = sink {
            sink.record(&Event::TrainingFinished {
                generations: self.generation,
                best_fitness: self.best.as_ref().map(|best| best.fitness),
            });
        }
        self.best()
    }
}
