//! Store trait: the abstract interface for record persistence.
//!
//! This trait allows the registry to be storage-agnostic. Implementations
//! include SQLite (primary) and in-memory (for tests).

use timelock_core::{Address, Record, RecordId};

use crate::error::Result;

/// Result of inserting a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertResult {
    /// Record and creator-index entry were written.
    Inserted,
    /// A record with this id already exists. Nothing was written.
    AlreadyExists,
    /// The id is not the next dense id. Nothing was written.
    OutOfOrder {
        /// The id the store expected next.
        expected: RecordId,
    },
}

/// Result of recording a grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrantResult {
    /// The grant was recorded.
    Granted,
    /// The record already carried a grant. It was left untouched.
    AlreadyGranted {
        /// The recipient from the earlier grant.
        recipient: Address,
    },
    /// No such record.
    NotFound,
}

/// The Store trait: synchronous interface for record persistence.
///
/// # Design Notes
///
/// - **Dense ids**: `insert_record` only accepts `record_count()` as the id.
/// - **Atomic inserts**: the record row and its creator-index entry are
///   written together or not at all.
/// - **Single grant**: `record_grant` is a compare-and-set on the grant; it
///   never overwrites an existing recipient.
/// - **No deletes**: records and index entries are never removed.
pub trait Store: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Record Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert a new, ungranted record and append it to its creator's index.
    fn insert_record(&self, record: &Record) -> Result<InsertResult>;

    /// Get a record by id.
    fn get_record(&self, id: RecordId) -> Result<Option<Record>>;

    /// Number of records stored. Also the next id to allocate.
    fn record_count(&self) -> Result<u64>;

    /// Set the grant on a record if it has none yet.
    fn record_grant(&self, id: RecordId, recipient: Address) -> Result<GrantResult>;

    // ─────────────────────────────────────────────────────────────────────────
    // Creator Index
    // ─────────────────────────────────────────────────────────────────────────

    /// Ids created by `creator`, in creation order.
    fn record_ids_by_creator(&self, creator: &Address) -> Result<Vec<RecordId>>;
}

/// Extension trait for common store patterns.
pub trait StoreExt: Store {
    /// The next id `insert_record` will accept.
    fn next_record_id(&self) -> Result<RecordId> {
        Ok(RecordId::new(self.record_count()?))
    }

    /// Full records created by `creator`, in creation order.
    fn records_by_creator(&self, creator: &Address) -> Result<Vec<Record>> {
        let mut records = Vec::new();
        for id in self.record_ids_by_creator(creator)? {
            if let Some(record) = self.get_record(id)? {
                records.push(record);
            }
        }
        Ok(records)
    }
}

impl<S: Store + ?Sized> StoreExt for S {}
