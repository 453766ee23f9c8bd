//! Error types for fugue-es
//!
//! This module defines all error types used throughout the library.

use thiserror::Error;

/// Error type for checkpoint operations
#[derive(Debug, Error)]
pub enum CheckpointError {
    /// IO error during checkpoint
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Deserialization error
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// Checkpoint version mismatch
    #[error("Version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },

    /// Checkpoint file not found
    #[error("Checkpoint not found: {0}")]
    NotFound(String),

    /// Corrupted checkpoint data
    #[error("Corrupted checkpoint: {0}")]
    Corrupted(String),
}

/// Top-level error type for strategy operations
#[derive(Debug, Error)]
pub enum StrategyError {
    /// Invalid static parameters, raised when a strategy is initialized
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// Population or fitness dimensions disagree with the parameters
    #[error("Shape mismatch for {what}: expected {expected}, got {actual}")]
    ShapeMismatch {
        what: &'static str,
        expected: String,
        actual: String,
    },

    /// A fitness entry was NaN or infinite
    #[error("Non-finite fitness {value} at index {index}")]
    NonFiniteFitness { index: usize, value: f64 },

    /// The distribution could not be kept finite and valid
    #[error("Numerical instability: {0}")]
    NumericalInstability(String),

    /// Checkpoint error
    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),
}

impl StrategyError {
    /// Shape mismatch for a matrix-like quantity
    pub fn shape(what: &'static str, expected: (usize, usize), actual: (usize, usize)) -> Self {
        Self::ShapeMismatch {
            what,
            expected: format!("{}x{}", expected.0, expected.1),
            actual: format!("{}x{}", actual.0, actual.1),
        }
    }

    /// Shape mismatch for a length
    pub fn length(what: &'static str, expected: usize, actual: usize) -> Self {
        Self::ShapeMismatch {
            what,
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}

/// Result type alias for strategy operations
pub type EsResult<T> = Result<T, StrategyError>;
