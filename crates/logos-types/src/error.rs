//! Error types for the LOGOS learning core

use thiserror::Error;

/// Main error type for the LOGOS crates
#[derive(Error, Debug)]
pub enum LogosError {
    /// IO related errors
    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// Serialization/deserialization errors
    #[error("Serialization error: {source}")]
    Serialization {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Parameter outside its documented domain, rejected at the boundary
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Numeric singularity (zero Hessian, zero likelihood sum)
    #[error("Numeric singularity: {0}")]
    NumericSingularity(String),

    /// State that violates a model invariant beyond tolerance
    #[error("Inconsistent state: {0}")]
    InconsistentState(String),

    /// Content oracle timed out or errored
    #[error("Oracle unavailable: {0}")]
    OracleUnavailable(String),

    /// A scoring-step transaction could not commit
    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Item not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Lock acquisition errors
    #[error("Lock error: {0}")]
    LockError(String),
}

impl From<serde_json::Error> for LogosError {
    fn from(error: serde_json::Error) -> Self {
        LogosError::Serialization {
            source: Box::new(error),
        }
    }
}

impl From<std::num::ParseIntError> for LogosError {
    fn from(error: std::num::ParseIntError) -> Self {
        LogosError::InvalidInput(format!("Failed to parse integer: {}", error))
    }
}

impl From<std::num::ParseFloatError> for LogosError {
    fn from(error: std::num::ParseFloatError) -> Self {
        LogosError::InvalidInput(format!("Failed to parse float: {}", error))
    }
}

impl From<anyhow::Error> for LogosError {
    fn from(error: anyhow::Error) -> Self {
        LogosError::InconsistentState(format!("{}", error))
    }
}

/// Result type for the LOGOS crates
pub type Result<T> = std::result::Result<T, LogosError>;
