//! Error types for shelfcheck

use thiserror::Error;

/// Result type alias using shelfcheck Error
pub type Result<T> = std::result::Result<T, Error>;

/// Shelfcheck error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Row not found: {kind} keyed by {key}")]
    NotFound { kind: String, key: String },

    #[error("Degraded fallback: {kind} write failed ({source_msg}), using row id {fallback_id}")]
    DegradedFallback {
        kind: String,
        source_msg: String,
        fallback_id: i64,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether this error represents a degraded-but-recovered write.
    pub fn is_degraded(&self) -> bool {
        matches!(self, Error::DegradedFallback { .. })
    }
}
