//! Error types for playout.

use thiserror::Error;

/// Main error type for playout operations.
#[derive(Error, Debug)]
pub enum PlayoutError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Thread error: {0}")]
    Thread(String),

    #[error("Not running")]
    NotRunning,
}

/// Result type alias for playout operations.
pub type Result<T> = std::result::Result<T, PlayoutError>;
