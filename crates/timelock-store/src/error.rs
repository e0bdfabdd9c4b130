//! Error types for the store module.

use thiserror::Error;
use timelock_core::RecordId;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A stored row does not form a valid record.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// A value does not fit the storage column type.
    #[error("value out of range for column {column}: {value}")]
    OutOfRange { column: &'static str, value: u64 },

    /// The store refused the id handed to it.
    #[error("record id conflict: {id} (next free id is {expected})")]
    IdConflict { id: RecordId, expected: RecordId },

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// A lock guarding in-process state was poisoned by a panicking writer.
    #[error("store lock poisoned: {0}")]
    LockPoisoned(String),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
