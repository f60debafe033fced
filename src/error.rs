//! Error types for the ShiftLag engine

use thiserror::Error;

/// Errors that can occur while loading records or computing scores
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Failed to parse record: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Date parse error: {0}")]
    DateParseError(String),

    #[error("Data source error: {0}")]
    DataSource(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
