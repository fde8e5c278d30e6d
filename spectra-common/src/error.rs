//! Common error types for spectra

use thiserror::Error;

/// Common result type for spectra operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across spectra crates
#[derive(Error, Debug)]
pub enum Error {
    /// Storage engine error (wraps sqlx::Error)
    #[error("Store error: {0}")]
    Store(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Record (de)serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),
}
