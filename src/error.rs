//! Error types for Kampus

use thiserror::Error;

/// Result type alias for Kampus operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in Kampus
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Tool error: {0}")]
    Tool(String),

    #[error("Retrieval error: {0}")]
    Retrieval(String),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("School is not registered: {0}")]
    SchoolNotRegistered(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}
