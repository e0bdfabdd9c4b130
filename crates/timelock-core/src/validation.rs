//! Precondition checks shared by the registry and storage backends.

use crate::error::ValidationError;
use crate::types::Timestamp;

/// Check that an unlock time lies strictly after `now`.
pub fn validate_unlock(unlock: Timestamp, now: Timestamp) -> Result<(), ValidationError> {
    if unlock <= now {
        return Err(ValidationError::UnlockNotInFuture { unlock, now });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unlock_strictly_in_future() {
        let now = Timestamp::from_secs(1_000);

        assert!(validate_unlock(Timestamp::from_secs(1_001), now).is_ok());
        assert!(validate_unlock(Timestamp::from_secs(1_000), now).is_err()); // Equal
        assert!(validate_unlock(Timestamp::from_secs(999), now).is_err()); // Past
    }
}
