//! Optional structured event sink.
//!
//! The engine never logs on its own. Strategies report what they decided to an
//! [`EventSink`] when one is attached and behave identically without one.
//! [`LogSink`] forwards events to the `log` facade; [`MemorySink`] keeps them
//! for inspection.

use std::fmt;
use std::sync::Mutex;

use crate::piece::Piece;
use crate::player::Strategy;

#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    PieceChosen {
        strategy: Strategy,
        index: usize,
        piece: Piece,
    },
    MoveChosen {
        strategy: Strategy,
        row: usize,
        col: usize,
    },
    /// A search produced no candidate and the simple strategy decided instead.
    Fallback {
        strategy: Strategy,
        reason: &'static str,
    },
    /// Winning playouts per candidate piece from the flat rollout estimator.
    PieceTally { wins: Vec<u32> },
    SearchFinished {
        iterations: usize,
        root_visits: u32,
        tree_size: usize,
        child_visits: Vec<u32>,
    },
    GenerationEvaluated {
        generation: usize,
        best_fitness: f64,
        mean_fitness: f64,
    },
    TrainingFinished {
        generations: usize,
        best_fitness: Option<f64>,
    },
}

impl Event {
    /// Events worth showing at the default log level.
    pub fn is_summary(&self) -> bool {
        matches!(
            self,
            Event::GenerationEvaluated { .. } | Event::TrainingFinished { .. }
        )
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::PieceChosen {
                strategy,
                index,
                piece,
            } => write!(f, "{strategy}: selected piece {index} ({piece})"),
            Event::MoveChosen { strategy, row, col } => {
                write!(f, "{strategy}: placed at ({row}, {col})")
            }
            Event::Fallback { strategy, reason } => {
                write!(f, "{strategy}: falling back to simple strategy ({reason})")
            }
            Event::PieceTally { wins } => write!(f, "rollout wins per piece: {wins:?}"),
            Event::SearchFinished {
                iterations,
                root_visits,
                tree_size,
                child_visits,
            } => write!(
                f,
                "mcts: {iterations} iterations, root visits {root_visits}, \
                 {tree_size} nodes, child visits {child_visits:?}"
            ),
            Event::GenerationEvaluated {
                generation,
                best_fitness,
                mean_fitness,
            } => write!(
                f,
                "generation {generation}: best fitness {best_fitness:.2}, mean {mean_fitness:.3}"
            ),
            Event::TrainingFinished {
                generations,
                best_fitness,
            } => match best_fitness {
                Some(fit) => write!(f, "trained {generations} generations, best fitness {fit:.2}"),
                None => write!(f, "trained {generations} generations, no individual evaluated"),
            },
        }
    }
}

/// Receiver of engine events.
pub trait EventSink: Send + Sync {
    fn record(&self, event: &Event);
}

/// Forwards events to the `log` facade.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogSink;

impl EventSink for LogSink {
    fn record(&self, event: &Event) {
        if event.is_summary() {
            log::info!("{event}");
        } else {
            log::debug!("{event}");
        }
    }
}

/// Collects events in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<Event>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of every event recorded so far.
    pub fn events(&self) -> Vec<Event> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl EventSink for MemorySink {
    fn record(&self, event: &Event) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}
