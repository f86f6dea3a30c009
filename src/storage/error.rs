//! Storage module error types
//!
//! Provides error types for database operations.

use thiserror::Error;

/// Storage operation error type
#[derive(Error, Debug)]
pub enum StorageError {
    /// Database connection or query error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Requested row does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Lock error when accessing database
    #[error("Database lock error")]
    LockError,

    /// Invalid input parameters
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
