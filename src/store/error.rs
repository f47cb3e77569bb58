//! Store error types
//!
//! Defines all errors that can occur in the persistence layer.

use thiserror::Error;

/// Errors that can occur in the sample store
#[derive(Error, Debug)]
pub enum StoreError {
    /// Underlying SQLite error (connectivity, corruption, constraint other
    /// than the dedup uniqueness key)
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// I/O operation failed (creating the data directory, opening the file)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A sample failed a store-level invariant before insert
    #[error("invalid sample: {0}")]
    InvalidSample(String),

    /// Invalid date window (start after end)
    #[error("invalid date window: start must not be after end")]
    InvalidWindow,
}

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;
