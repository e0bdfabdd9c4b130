//! Error types for the registry.

use timelock_core::{Address, RecordId, Timestamp};
use timelock_store::StoreError;
use thiserror::Error;

/// Errors that can occur during registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Unlock time at or before the current time.
    #[error("unlock time must be in the future (unlock {unlock}, now {now})")]
    InvalidUnlockTime { unlock: Timestamp, now: Timestamp },

    /// No record with this id was ever created.
    #[error("message not found: {0}")]
    NotFound(RecordId),

    /// Caller is not the record's creator.
    #[error("only creator can allow (message {id}, caller {caller})")]
    Unauthorized { id: RecordId, caller: Address },

    /// Unlock time not reached yet.
    #[error("unlock time not reached (message {id}, unlock {unlock}, now {now})")]
    TooEarly {
        id: RecordId,
        unlock: Timestamp,
        now: Timestamp,
    },

    /// Access was already granted for this record.
    #[error("already allowed: {0}")]
    AlreadyGranted(RecordId),

    /// The proof verifier rejected the recipient handle.
    #[error("invalid input proof for encrypted recipient")]
    InvalidProof,

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// The registry service task has stopped.
    #[error("registry service unavailable")]
    ServiceUnavailable,
}

/// Fieldless discriminant of [`RegistryError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidUnlockTime,
    NotFound,
    Unauthorized,
    TooEarly,
    AlreadyGranted,
    InvalidProof,
    Store,
    ServiceUnavailable,
}

impl RegistryError {
    /// Which kind of failure this is.
    pub fn kind(&self) -> ErrorKind {
        match self {
            RegistryError::InvalidUnlockTime { .. } => ErrorKind::InvalidUnlockTime,
            RegistryError::NotFound(_) => ErrorKind::NotFound,
            RegistryError::Unauthorized { .. } => ErrorKind::Unauthorized,
            RegistryError::TooEarly { .. } => ErrorKind::TooEarly,
            RegistryError::AlreadyGranted(_) => ErrorKind::AlreadyGranted,
            RegistryError::InvalidProof => ErrorKind::InvalidProof,
            RegistryError::Store(_) => ErrorKind::Store,
            RegistryError::ServiceUnavailable => ErrorKind::ServiceUnavailable,
        }
    }

    /// Whether the call was rejected by a registry rule, as opposed to an
    /// infrastructure failure.
    pub fn is_rejection(&self) -> bool {
        !matches!(
            self,
            RegistryError::Store(_) | RegistryError::ServiceUnavailable
        )
    }
}

/// Result type for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_reason() {
        let err = RegistryError::TooEarly {
            id: RecordId::new(0),
            unlock: Timestamp::from_secs(10),
            now: Timestamp::from_secs(5),
        };
        assert!(err.to_string().starts_with("unlock time not reached"));

        let err = RegistryError::AlreadyGranted(RecordId::new(3));
        assert_eq!(err.to_string(), "already allowed: 3");
        assert_eq!(err.kind(), ErrorKind::AlreadyGranted);
    }

    #[test]
    fn test_rejection_vs_failure() {
        assert!(RegistryError::InvalidProof.is_rejection());
        assert!(RegistryError::NotFound(RecordId::new(1)).is_rejection());
        assert!(!RegistryError::ServiceUnavailable.is_rejection());
        assert!(!RegistryError::Store(StoreError::InvalidData("x".into())).is_rejection());
    }
}
