//! Error types for the projection engine

use thiserror::Error;

/// Result type alias for projection operations
pub type Result<T> = std::result::Result<T, FloorsError>;

/// Errors that abort a projection or training request
#[derive(Error, Debug)]
pub enum FloorsError {
    /// I/O errors reading or writing documents
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested game does not exist
    #[error("Game not found: {0}")]
    GameNotFound(String),

    /// Game exists but cannot be projected (missing team, wrong state)
    #[error("Invalid game {game_id}: {reason}")]
    InvalidGame { game_id: String, reason: String },

    /// Feature-weight training failed
    #[error(transparent)]
    Training(#[from] feature_weights::TrainingError),
}

impl FloorsError {
    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new invalid game error
    pub fn invalid_game(game_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidGame { game_id: game_id.into(), reason: reason.into() }
    }
}

impl From<config::ConfigError> for FloorsError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for FloorsError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Config(err.to_string())
    }
}
