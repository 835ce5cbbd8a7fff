/// Error types for the sync core
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("network error: {0}")]
    Network(String),

    #[error("authentication required: {0}")]
    Auth(String),

    #[error("message has no content and no images")]
    EmptyMessage,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

impl ChatError {
    /// Whether the caller may retry the failed operation as-is.
    /// Validation and auth failures need user or credential action first.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ChatError::Network(_))
    }
}

pub type Result<T> = std::result::Result<T, ChatError>;
