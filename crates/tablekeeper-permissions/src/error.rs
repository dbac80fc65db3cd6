//! Error types for the permissions core

use thiserror::Error;

/// Result type for permission operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the permissions core
#[derive(Error, Debug)]
pub enum Error {
    #[error("Permission denied: {reason}")]
    PermissionDenied { reason: String },

    #[error("Malformed target locator: {0}")]
    MalformedLocator(String),

    #[error("Ambiguous SQL statement: {0}")]
    SqlParseAmbiguous(String),

    #[error("Invalid permission record: {0}")]
    InvalidRecord(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}
