//! # Timelock Store
//!
//! Storage abstraction for the message registry. Provides a trait-based
//! interface for record persistence with SQLite and in-memory
//! implementations.
//!
//! ## Overview
//!
//! The store module abstracts record storage behind the [`Store`] trait,
//! allowing the registry to be storage-agnostic. The primary implementation
//! is [`SqliteStore`], with [`MemoryStore`] for testing.
//!
//! ## Key Types
//!
//! - [`Store`] - The trait for all storage operations
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage for tests
//! - [`InsertResult`] - Result of inserting a record
//! - [`GrantResult`] - Result of recording a grant
//!
//! ## Usage
//!
//! ```rust,no_run
//! use timelock_store::{SqliteStore, Store, StoreExt};
//!
//! let store = SqliteStore::open("messages.db").unwrap();
//! let next = store.next_record_id().unwrap();
//! println!("next message id: {}", next);
//! ```
//!
//! ## Design Notes
//!
//! - **Dense ids**: a record is only accepted at the next free id
//! - **Atomic writes**: record row and creator-index entry commit together
//! - **Single grant**: a second grant never overwrites the first

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{GrantResult, InsertResult, Store, StoreExt};
