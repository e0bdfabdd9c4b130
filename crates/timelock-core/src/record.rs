//! Records: one per created message.
//!
//! A record is immutable except for its grant, which goes from absent to
//! present exactly once. The grant is stored as `Option<Address>` so the
//! "flag set iff recipient set" rule cannot be broken by construction.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::crypto::{EncryptedHandle, InputProof};
use crate::error::ValidationError;
use crate::types::{Address, RecordId, Timestamp};
use crate::validation::validate_unlock;

/// Caller-supplied inputs for creating a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateMessage {
    /// Plaintext title. Unvalidated, may be empty.
    pub title: String,

    /// Ciphertext of the message body, never interpreted.
    pub encrypted_content: Bytes,

    /// Encrypted recipient handle from the encryption service.
    pub encrypted_recipient: EncryptedHandle,

    /// Proof accompanying `encrypted_recipient`.
    pub input_proof: InputProof,

    /// Earliest time at which the creator may grant access.
    pub unlock_timestamp: Timestamp,
}

impl CreateMessage {
    /// Create a new request.
    pub fn new(
        title: impl Into<String>,
        encrypted_content: impl Into<Bytes>,
        encrypted_recipient: EncryptedHandle,
        input_proof: InputProof,
        unlock_timestamp: Timestamp,
    ) -> Self {
        Self {
            title: title.into(),
            encrypted_content: encrypted_content.into(),
            encrypted_recipient,
            input_proof,
            unlock_timestamp,
        }
    }
}

/// A stored message record.
///
/// Everything except the grant is fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    id: RecordId,
    creator: Address,
    title: String,
    encrypted_content: Bytes,
    encrypted_recipient: EncryptedHandle,
    created_at: Timestamp,
    unlock_timestamp: Timestamp,
    granted_recipient: Option<Address>,
}

/// Raw parts of a record, as a storage backend reads them back.
#[derive(Debug, Clone)]
pub struct RecordParts {
    pub id: RecordId,
    pub creator: Address,
    pub title: String,
    pub encrypted_content: Bytes,
    pub encrypted_recipient: EncryptedHandle,
    pub created_at: Timestamp,
    pub unlock_timestamp: Timestamp,
    pub access_granted: bool,
    pub granted_recipient: Option<Address>,
}

impl Record {
    /// Build a fresh, ungranted record.
    ///
    /// Fails if the unlock time is not strictly after `created_at`. The input
    /// proof is not kept; it only matters at creation time.
    pub fn new(
        id: RecordId,
        creator: Address,
        request: CreateMessage,
        created_at: Timestamp,
    ) -> Result<Self, ValidationError> {
        validate_unlock(request.unlock_timestamp, created_at)?;

        Ok(Self {
            id,
            creator,
            title: request.title,
            encrypted_content: request.encrypted_content,
            encrypted_recipient: request.encrypted_recipient,
            created_at,
            unlock_timestamp: request.unlock_timestamp,
            granted_recipient: None,
        })
    }

    /// Rebuild a record from stored parts, checking its invariants.
    pub fn from_parts(parts: RecordParts) -> Result<Self, ValidationError> {
        validate_unlock(parts.unlock_timestamp, parts.created_at)?;

        if parts.access_granted != parts.granted_recipient.is_some() {
            return Err(ValidationError::GrantMismatch { id: parts.id });
        }

        Ok(Self {
            id: parts.id,
            creator: parts.creator,
            title: parts.title,
            encrypted_content: parts.encrypted_content,
            encrypted_recipient: parts.encrypted_recipient,
            created_at: parts.created_at,
            unlock_timestamp: parts.unlock_timestamp,
            granted_recipient: parts.granted_recipient,
        })
    }

    /// Sequential identifier.
    pub fn id(&self) -> RecordId {
        self.id
    }

    /// Who created the record.
    pub fn creator(&self) -> Address {
        self.creator
    }

    /// Plaintext title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Opaque ciphertext.
    pub fn encrypted_content(&self) -> &Bytes {
        &self.encrypted_content
    }

    /// Opaque encrypted recipient identity.
    pub fn encrypted_recipient(&self) -> EncryptedHandle {
        self.encrypted_recipient
    }

    /// Ledger time at creation.
    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// Earliest time the creator may grant access.
    pub fn unlock_timestamp(&self) -> Timestamp {
        self.unlock_timestamp
    }

    /// Whether decryption access has been granted.
    pub fn access_granted(&self) -> bool {
        self.granted_recipient.is_some()
    }

    /// The granted recipient, if any.
    pub fn granted_recipient(&self) -> Option<Address> {
        self.granted_recipient
    }

    /// Whether the unlock time has been reached at `now`.
    pub fn unlock_reached(&self, now: Timestamp) -> bool {
        now >= self.unlock_timestamp
    }

    /// Record the grant.
    ///
    /// Returns `false` and leaves the record untouched if it was already
    /// granted.
    pub fn grant(&mut self, recipient: Address) -> bool {
        if self.granted_recipient.is_some() {
            return false;
        }
        self.granted_recipient = Some(recipient);
        true
    }

    /// Snapshot this record as seen at `now`.
    pub fn view(&self, now: Timestamp) -> MessageView {
        MessageView {
            id: self.id,
            creator: self.creator,
            title: self.title.clone(),
            encrypted_content: self.encrypted_content.clone(),
            encrypted_recipient: self.encrypted_recipient,
            created_at: self.created_at,
            unlock_timestamp: self.unlock_timestamp,
            access_granted: self.access_granted(),
            granted_recipient: self.granted_recipient,
            unlock_reached: self.unlock_reached(now),
        }
    }
}

/// Where a record sits in its lifecycle.
///
/// `Unlockable` is never stored; it is derived from the clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageStatus {
    /// Unlock time not reached.
    Locked,
    /// Unlock time reached, no grant yet.
    Unlockable,
    /// Access granted. Terminal.
    Granted,
}

/// A read-only snapshot of a record returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageView {
    pub id: RecordId,
    pub creator: Address,
    pub title: String,
    pub encrypted_content: Bytes,
    pub encrypted_recipient: EncryptedHandle,
    pub created_at: Timestamp,
    pub unlock_timestamp: Timestamp,
    pub access_granted: bool,
    pub granted_recipient: Option<Address>,
    /// Computed at read time, not persisted.
    pub unlock_reached: bool,
}

impl MessageView {
    /// Lifecycle status at the time the snapshot was taken.
    pub fn status(&self) -> MessageStatus {
        if self.access_granted {
            MessageStatus::Granted
        } else if self.unlock_reached {
            MessageStatus::Unlockable
        } else {
            MessageStatus::Locked
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(unlock: u64) -> CreateMessage {
        CreateMessage::new(
            "Hello",
            b"cipher-body".to_vec(),
            EncryptedHandle::from_bytes([7; 32]),
            InputProof::empty(),
            Timestamp::from_secs(unlock),
        )
    }

    #[test]
    fn test_new_record_is_ungranted() {
        let creator = Address::from_bytes([1; 20]);
        let record = Record::new(RecordId::FIRST, creator, request(200), Timestamp::from_secs(100))
            .unwrap();

        assert!(!record.access_granted());
        assert_eq!(record.granted_recipient(), None);
        assert_eq!(record.creator(), creator);
        assert_eq!(record.title(), "Hello");
        assert_eq!(record.unlock_timestamp(), Timestamp::from_secs(200));
        assert_eq!(record.created_at(), Timestamp::from_secs(100));
    }

    #[test]
    fn test_unlock_must_be_after_creation() {
        let creator = Address::from_bytes([1; 20]);
        let err = Record::new(RecordId::FIRST, creator, request(100), Timestamp::from_secs(100))
            .unwrap_err();
        assert!(matches!(err, ValidationError::UnlockNotInFuture { .. }));
    }

    #[test]
    fn test_grant_is_single_use() {
        let mut record = Record::new(
            RecordId::FIRST,
            Address::from_bytes([1; 20]),
            request(200),
            Timestamp::from_secs(100),
        )
        .unwrap();
        let first = Address::from_bytes([2; 20]);
        let second = Address::from_bytes([3; 20]);

        assert!(record.grant(first));
        assert!(!record.grant(second));
        assert_eq!(record.granted_recipient(), Some(first));
    }

    #[test]
    fn test_view_status() {
        let mut record = Record::new(
            RecordId::FIRST,
            Address::from_bytes([1; 20]),
            request(200),
            Timestamp::from_secs(100),
        )
        .unwrap();

        assert_eq!(record.view(Timestamp::from_secs(199)).status(), MessageStatus::Locked);
        assert_eq!(record.view(Timestamp::from_secs(200)).status(), MessageStatus::Unlockable);

        record.grant(Address::from_bytes([2; 20]));
        let view = record.view(Timestamp::from_secs(300));
        assert_eq!(view.status(), MessageStatus::Granted);
        assert!(view.unlock_reached);
    }

    #[test]
    fn test_from_parts_rejects_grant_mismatch() {
        let parts = RecordParts {
            id: RecordId::new(3),
            creator: Address::from_bytes([1; 20]),
            title: String::new(),
            encrypted_content: Bytes::new(),
            encrypted_recipient: EncryptedHandle::from_bytes([0; 32]),
            created_at: Timestamp::from_secs(1),
            unlock_timestamp: Timestamp::from_secs(2),
            access_granted: true,
            granted_recipient: None,
        };
        assert_eq!(
            Record::from_parts(parts).unwrap_err(),
            ValidationError::GrantMismatch { id: RecordId::new(3) }
        );
    }
}
