//! Error types for the registry core.

use thiserror::Error;

use crate::types::{RecordId, Timestamp};

/// Core errors for value parsing.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),
}

/// Structural violations of the record model.
///
/// These surface when a record is constructed from untrusted parts, for
/// example when a storage backend hands back a row.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("unlock time {unlock} is not after {now}")]
    UnlockNotInFuture { unlock: Timestamp, now: Timestamp },

    #[error("record {id}: grant flag and recipient disagree")]
    GrantMismatch { id: RecordId },
}
