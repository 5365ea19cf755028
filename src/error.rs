//! Error types for estimation, training and storage

use thiserror::Error;

/// Result alias used across the crate.
pub type EstateResult<T> = Result<T, EstateError>;

#[derive(Debug, Error)]
pub enum EstateError {
    /// Bad or empty dataset, invalid hyperparameters, unusable network.
    /// Fatal at startup.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A query field could not be parsed as a finite number.
    #[error("Invalid input values")]
    InvalidInput { field: &'static str },

    /// The network produced no output or a non-finite one.
    #[error("Invalid Prediction")]
    InvalidPrediction,

    /// Prediction requested before a model was trained or restored.
    #[error("Model not loaded")]
    ModelNotReady,

    /// A retrain was requested while another one is still running.
    #[error("Training already in progress")]
    TrainingInProgress,

    #[error("Model store error: {0}")]
    Store(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EstateError {
    /// Errors that are shown to the user in place of a prediction.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            EstateError::InvalidInput { .. }
                | EstateError::InvalidPrediction
                | EstateError::ModelNotReady
                | EstateError::TrainingInProgress
        )
    }
}
