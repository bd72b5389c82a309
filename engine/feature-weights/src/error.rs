//! Error types for feature-weight training

use thiserror::Error;

/// Result type alias for training operations
pub type Result<T> = std::result::Result<T, TrainingError>;

/// Errors that can occur while building examples, training, or validating
#[derive(Error, Debug)]
pub enum TrainingError {
    /// Caller supplied inputs that violate an operation's contract
    #[error("Precondition violated: {0}")]
    Precondition(String),

    /// Feature names and vector widths disagree
    #[error("Feature schema mismatch: expected {expected} features, got {actual}")]
    SchemaMismatch { expected: usize, actual: usize },

    /// k-fold validation requested with fewer examples than folds
    #[error("Cannot run {folds}-fold cross-validation on {examples} examples")]
    TooFewExamplesForFolds { examples: usize, folds: usize },

    /// No completed games in the requested training window
    #[error("No completed games found for season {season}, weeks {min_week}-{max_week}")]
    NoCompletedGames { season: i32, min_week: u32, max_week: u32 },

    /// Games exist but no record produced a usable training example
    #[error(
        "No training examples for season {season}, weeks {min_week}-{max_week} \
         ({candidates} candidate stat records, {excluded} excluded)"
    )]
    EmptyTrainingSet {
        season: i32,
        min_week: u32,
        max_week: u32,
        candidates: usize,
        excluded: usize,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

impl TrainingError {
    /// Create a new precondition error
    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::Precondition(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
