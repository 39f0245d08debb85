//! Error types for the synchronizers

use thiserror::Error;

/// Result type for sync operations
pub type Result<T> = std::result::Result<T, SyncError>;

/// Sync error type
#[derive(Debug, Error)]
pub enum SyncError {
    /// Transport failure or non-success HTTP status
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote API answered with an explicit failure
    #[error("API error {code}: {message}")]
    Api { code: String, message: String },

    /// Payload did not have the expected shape
    #[error("Parse error: {0}")]
    Parse(String),

    /// A referenced remote or local object does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Common(#[from] clay_common::Error),
}

impl From<roxmltree::Error> for SyncError {
    fn from(err: roxmltree::Error) -> Self {
        SyncError::Parse(format!("Malformed XML: {}", err))
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Parse(format!("Malformed JSON: {}", err))
    }
}
