//! Errors raised below the synchronizers and the web layer

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Root folder, database directory or config file access
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// `clay.toml` exists but does not parse
    #[error("Malformed clay.toml: {0}")]
    Config(#[from] toml::de::Error),

    /// A remote timestamp (GData, unix seconds) that cannot be read
    #[error("Bad timestamp {value:?}: {reason}")]
    BadTimestamp { value: String, reason: String },

    /// A page fragment that cannot be stored as cache JSON
    #[error("Cannot cache {key:?}: {source}")]
    CacheEncode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

impl Error {
    pub(crate) fn bad_timestamp(value: &str, reason: impl ToString) -> Self {
        Error::BadTimestamp {
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}
