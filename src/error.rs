//! Error types for the advisor agents

use thiserror::Error;

/// Result type alias for advisor operations
pub type Result<T> = std::result::Result<T, AdvisorError>;

#[derive(Error, Debug)]
pub enum AdvisorError {

    // =============================
    // Agent Surface Errors
    // =============================

    #[error("Market data error: {0}")]
    MarketData(String),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Invalid tool input: {0}")]
    InvalidToolInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Conversation state error: {0}")]
    State(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
