//! Flag evaluation error types

use thiserror::Error;

/// Errors raised by the evaluation engine and its collaborators
#[derive(Debug, Error)]
pub enum FeatureError {
    /// A flag reached selection with an empty variant list
    #[error("Flag has no variants")]
    NoVariants,

    /// A flag definition violates an invariant (rollout range, weights)
    #[error("Invalid flag definition: {0}")]
    InvalidFlag(String),

    /// The store refused to hand out this flag to the caller
    #[error("Access denied to flag: {0}")]
    AccessDenied(String),

    /// Flag store failure
    #[error("Flag store error: {0}")]
    Store(String),

    /// Exposure sink failure (always swallowed by the evaluator)
    #[error("Exposure sink error: {0}")]
    Exposure(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for FeatureError {
    fn from(err: serde_json::Error) -> Self {
        FeatureError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, FeatureError>;
