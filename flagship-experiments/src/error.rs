//! Experiment error types

use thiserror::Error;

/// Errors that can occur while analysing an experiment
#[derive(Debug, Error)]
pub enum ExperimentError {
    /// Input counts violate an invariant (e.g. more conversions than users)
    #[error("Invalid experiment data: {0}")]
    InvalidData(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    InvalidConfig(String),

    /// A computation exceeded its deadline
    #[error("Experiment {experiment} timed out after {after_ms}ms")]
    Timeout { experiment: String, after_ms: u64 },

    /// The worker running a computation panicked or was cancelled
    #[error("Computation task failed: {0}")]
    Task(String),

    /// The summary writer rejected a result
    #[error("Summary writer error: {0}")]
    Writer(String),
}

impl From<tokio::task::JoinError> for ExperimentError {
    fn from(err: tokio::task::JoinError) -> Self {
        ExperimentError::Task(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ExperimentError>;
