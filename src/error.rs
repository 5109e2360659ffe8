//! Error types for openai-blocks.

use async_openai::error::OpenAIError;
use thiserror::Error;

/// Library-level error type for block and request operations.
#[derive(Error, Debug)]
pub enum BlocksError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No {block_type} block named '{name}'")]
    BlockNotFound { block_type: String, name: String },

    #[error("Invalid {block_type} block '{name}': {reason}")]
    InvalidBlock {
        block_type: String,
        name: String,
        reason: String,
    },

    #[error("Invalid request parameters: {0}")]
    InvalidRequest(String),

    #[error("OpenAI API error: {0}")]
    OpenAI(#[from] OpenAIError),

    #[error("Empty response from OpenAI: {0}")]
    EmptyResponse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl BlocksError {
    pub(crate) fn not_found(block_type: &str, name: &str) -> Self {
        BlocksError::BlockNotFound {
            block_type: block_type.to_string(),
            name: name.to_string(),
        }
    }

    pub(crate) fn invalid(block_type: &str, name: &str, reason: impl ToString) -> Self {
        BlocksError::InvalidBlock {
            block_type: block_type.to_string(),
            name: name.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Result type alias for openai-blocks operations.
pub type Result<T> = std::result::Result<T, BlocksError>;
