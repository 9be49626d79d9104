//! Error types for the memory engine.

use thiserror::Error;

/// Errors surfaced by storage and import operations.
///
/// Extraction and scheduling never fail; only the persistence boundary
/// produces these.
#[derive(Debug, Error)]
pub enum MemoryError {
    /// The backing key-value store rejected a read or write.
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An import payload that is not a JSON object.
    #[error("Malformed import: {0}")]
    MalformedImport(String),
}

pub type Result<T> = std::result::Result<T, MemoryError>;
