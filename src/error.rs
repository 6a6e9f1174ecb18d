//! Error types for game rules and engine setup.

/// A rejected game action. All variants are recoverable: the state is left
/// untouched when one is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("invalid piece index {index} ({available} pieces available)")]
    InvalidIndex { index: usize, available: usize },

    #[error("illegal state: {0}")]
    IllegalState(&'static str),

    #[error("position ({row}, {col}) is off the board")]
    OutOfBounds { row: usize, col: usize },

    #[error("position ({row}, {col}) is already occupied")]
    CellOccupied { row: usize, col: usize },
}

/// Errors raised while constructing a strategy.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("failed to build worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    #[error("config validation error: {0}")]
    Validation(String),
}

/// Convenience Result type for game actions.
pub type Result<T> = std::result::Result<T, GameError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_error_display() {
        let err = GameError::CellOccupied { row: 1, col: 2 };
        assert_eq!(err.to_string(), "position (1, 2) is already occupied");

        let err = GameError::InvalidIndex {
            index: 7,
            available: 3,
        };
        assert_eq!(err.to_string(), "invalid piece index 7 (3 pieces available)");
    }

    #[test]
    fn test_engine_error_display() {
        let err = EngineError::Validation("mutation_rate must be in [0, 1]".to_string());
        assert_eq!(
            err.to_string(),
            "config validation error: mutation_rate must be in [0, 1]"
        );
    }
}
