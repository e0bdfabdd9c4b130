//! # Timelock Registry
//!
//! A registry of time-locked encrypted messages.
//!
//! ## Overview
//!
//! A creator stores an encrypted message together with an encrypted
//! recipient handle and an unlock time. Until the unlock time passes, nobody
//! can be granted decryption access. After it, the creator may grant access
//! exactly once, which tells the encryption service that the recipient may
//! decrypt the handle.
//!
//! ## Key Concepts
//!
//! - **Record**: a stored message. Never deleted, never edited except for
//!   the one-time grant.
//! - **Creator index**: per-creator list of record ids, in creation order.
//! - **Grant**: creator-only, after the unlock time, at most once.
//! - **Events**: `MessageCreated` and `DecryptionAllowed`, emitted only for
//!   committed mutations.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use timelock_registry::{MessageRegistry, RegistryConfig};
//! use timelock_registry::core::{Address, CreateMessage, EncryptedHandle, InputProof, Timestamp};
//! use timelock_registry::store::SqliteStore;
//!
//! fn example() -> timelock_registry::Result<()> {
//!     let store = SqliteStore::open("messages.db")?;
//!     let mut registry = MessageRegistry::new(store, RegistryConfig::default());
//!
//!     let creator = Address::from_bytes([1; 20]);
//!     let request = CreateMessage::new(
//!         "Hello",
//!         b"ciphertext".to_vec(),
//!         EncryptedHandle::from_bytes([7; 32]),
//!         InputProof::empty(),
//!         registry.now().saturating_add(3600),
//!     );
//!     let id = registry.create(creator, request)?;
//!
//!     // An hour later:
//!     // registry.allow(creator, id, recipient)?;
//!     let view = registry.get_message(id)?;
//!     println!("{} unlocks at {}", view.title, view.unlock_timestamp);
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `timelock_registry::core` - Core types (Record, Address, Clock, ...)
//! - `timelock_registry::store` - Storage abstraction and SQLite
//! - `timelock_registry::access` - Proof verification and handle ACL

pub mod error;
pub mod events;
pub mod registry;
pub mod service;

// Re-export component crates
pub use timelock_access as access;
pub use timelock_core as core;
pub use timelock_store as store;

// Re-export main types for convenience
pub use error::{ErrorKind, RegistryError, Result};
pub use events::{BroadcastSink, EventLog, EventSink, NoopSink};
pub use registry::{MessageRegistry, RegistryBuilder, RegistryConfig};
pub use service::{RegistryHandle, RegistryService};

// Re-export commonly used core types
pub use timelock_core::{
    Address, CreateMessage, EncryptedHandle, InputProof, MessageStatus, MessageView, RecordId,
    RegistryEvent, Timestamp,
};
