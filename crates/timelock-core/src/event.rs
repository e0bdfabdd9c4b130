//! Registry events.
//!
//! Events are the only notifications the registry emits besides query
//! responses. Observers can rebuild the full registry history from them.

use serde::{Deserialize, Serialize};

use crate::types::{Address, RecordId, Timestamp};

/// A notification emitted after a successful mutation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegistryEvent {
    /// A record was created.
    MessageCreated {
        id: RecordId,
        creator: Address,
        unlock_timestamp: Timestamp,
        created_at: Timestamp,
    },

    /// The creator granted decryption access.
    DecryptionAllowed { id: RecordId, recipient: Address },
}

impl RegistryEvent {
    /// The record this event concerns.
    pub fn record_id(&self) -> RecordId {
        match self {
            RegistryEvent::MessageCreated { id, .. } => *id,
            RegistryEvent::DecryptionAllowed { id, .. } => *id,
        }
    }

    /// Short event name, as observers index it.
    pub fn name(&self) -> &'static str {
        match self {
            RegistryEvent::MessageCreated { .. } => "MessageCreated",
            RegistryEvent::DecryptionAllowed { .. } => "DecryptionAllowed",
        }
    }
}
