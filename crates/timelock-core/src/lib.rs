//! # Timelock Core
//!
//! Pure primitives for the time-locked message registry: records, account
//! identities, opaque ciphertext handles, events and clocks.
//!
//! This crate contains no I/O, no storage, no networking.
//!
//! ## Key Types
//!
//! - [`Record`] - One stored message with its single-use grant
//! - [`MessageView`] - Read snapshot including the live `unlock_reached` flag
//! - [`Address`] - 20-byte caller / recipient identity
//! - [`EncryptedHandle`] and [`InputProof`] - Opaque encryption-service output
//! - [`RegistryEvent`] - `MessageCreated` / `DecryptionAllowed` notifications
//! - [`Clock`] - Source of ledger timestamps

pub mod clock;
pub mod crypto;
pub mod error;
pub mod event;
pub mod record;
pub mod types;
pub mod validation;

pub use clock::{Clock, ManualClock, SystemClock};
pub use crypto::{Ed25519PublicKey, EncryptedHandle, InputProof, Keypair};
pub use error::{CoreError, ValidationError};
pub use event::RegistryEvent;
pub use record::{CreateMessage, MessageStatus, MessageView, Record, RecordParts};
pub use types::{Address, RecordId, Timestamp};
pub use validation::validate_unlock;
