//! Error types and handling
//!
//! Errors raised while setting up the recorder.

use crate::location::LocationError;
use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Location error: {0}")]
    Location(#[from] LocationError),
}

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;
