//! In-memory implementation of the Store trait.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use timelock_core::{Address, Record, RecordId};

use crate::error::{Result, StoreError};
use crate::traits::{GrantResult, InsertResult, Store};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    /// Records, indexed by id. Ids are dense so the position is the id.
    records: Vec<Record>,

    /// Creator index: creator -> ids in creation order.
    by_creator: HashMap<Address, Vec<RecordId>>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner::default()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryStoreInner>> {
        self.inner
            .read()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryStoreInner>> {
        self.inner
            .write()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Slot index for a record id, if it fits in memory addressing.
fn slot(id: RecordId) -> Option<usize> {
    usize::try_from(id.get()).ok()
}

impl Store for MemoryStore {
    fn insert_record(&self, record: &Record) -> Result<InsertResult> {
        let mut inner = self.write()?;

        let expected = RecordId::new(inner.records.len() as u64);
        if record.id() < expected {
            return Ok(InsertResult::AlreadyExists);
        }
        if record.id() != expected {
            return Ok(InsertResult::OutOfOrder { expected });
        }

        inner.records.push(record.clone());
        inner
            .by_creator
            .entry(record.creator())
            .or_default()
            .push(record.id());

        Ok(InsertResult::Inserted)
    }

    fn get_record(&self, id: RecordId) -> Result<Option<Record>> {
        let inner = self.read()?;
        Ok(slot(id).and_then(|i| inner.records.get(i)).cloned())
    }

    fn record_count(&self) -> Result<u64> {
        let inner = self.read()?;
        Ok(inner.records.len() as u64)
    }

    fn record_grant(&self, id: RecordId, recipient: Address) -> Result<GrantResult> {
        let mut inner = self.write()?;

        let Some(record) = slot(id).and_then(|i| inner.records.get_mut(i)) else {
            return Ok(GrantResult::NotFound);
        };

        if let Some(existing) = record.granted_recipient() {
            return Ok(GrantResult::AlreadyGranted {
                recipient: existing,
            });
        }

        record.grant(recipient);
        Ok(GrantResult::Granted)
    }

    fn record_ids_by_creator(&self, creator: &Address) -> Result<Vec<RecordId>> {
        let inner = self.read()?;
        Ok(inner.by_creator.get(creator).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::StoreExt;
    use timelock_core::{CreateMessage, EncryptedHandle, InputProof, Timestamp};

    fn make_record(id: u64, creator: Address) -> Record {
        let request = CreateMessage::new(
            format!("message {}", id),
            format!("cipher {}", id).into_bytes(),
            EncryptedHandle::from_bytes([id as u8; 32]),
            InputProof::empty(),
            Timestamp::from_secs(2_000),
        );
        Record::new(RecordId::new(id), creator, request, Timestamp::from_secs(1_000)).unwrap()
    }

    #[test]
    fn test_memory_store_basic() {
        let store = MemoryStore::new();
        let creator = Address::from_bytes([1; 20]);
        let record = make_record(0, creator);

        // Insert
        assert_eq!(store.insert_record(&record).unwrap(), InsertResult::Inserted);

        // Get
        let retrieved = store.get_record(RecordId::new(0)).unwrap().unwrap();
        assert_eq!(retrieved, record);
        assert_eq!(store.record_count().unwrap(), 1);
    }

    #[test]
    fn test_memory_store_dense_ids() {
        let store = MemoryStore::new();
        let creator = Address::from_bytes([1; 20]);

        store.insert_record(&make_record(0, creator)).unwrap();

        assert_eq!(
            store.insert_record(&make_record(0, creator)).unwrap(),
            InsertResult::AlreadyExists
        );
        assert_eq!(
            store.insert_record(&make_record(5, creator)).unwrap(),
            InsertResult::OutOfOrder {
                expected: RecordId::new(1)
            }
        );
        assert_eq!(store.record_count().unwrap(), 1);
        assert_eq!(store.next_record_id().unwrap(), RecordId::new(1));
    }

    #[test]
    fn test_memory_store_grant_once() {
        let store = MemoryStore::new();
        let creator = Address::from_bytes([1; 20]);
        let first = Address::from_bytes([2; 20]);
        let second = Address::from_bytes([3; 20]);
        store.insert_record(&make_record(0, creator)).unwrap();

        assert_eq!(
            store.record_grant(RecordId::new(0), first).unwrap(),
            GrantResult::Granted
        );
        assert_eq!(
            store.record_grant(RecordId::new(0), second).unwrap(),
            GrantResult::AlreadyGranted { recipient: first }
        );
        assert_eq!(
            store.record_grant(RecordId::new(9), first).unwrap(),
            GrantResult::NotFound
        );

        let record = store.get_record(RecordId::new(0)).unwrap().unwrap();
        assert_eq!(record.granted_recipient(), Some(first));
    }

    #[test]
    fn test_memory_store_creator_index() {
        let store = MemoryStore::new();
        let alice = Address::from_bytes([1; 20]);
        let bob = Address::from_bytes([2; 20]);

        store.insert_record(&make_record(0, alice)).unwrap();
        store.insert_record(&make_record(1, bob)).unwrap();
        store.insert_record(&make_record(2, alice)).unwrap();

        assert_eq!(
            store.record_ids_by_creator(&alice).unwrap(),
            vec![RecordId::new(0), RecordId::new(2)]
        );
        assert_eq!(store.record_ids_by_creator(&bob).unwrap(), vec![RecordId::new(1)]);
        assert!(store
            .record_ids_by_creator(&Address::from_bytes([9; 20]))
            .unwrap()
            .is_empty());

        let titles: Vec<_> = store
            .records_by_creator(&alice)
            .unwrap()
            .into_iter()
            .map(|r| r.title().to_string())
            .collect();
        assert_eq!(titles, vec!["message 0", "message 2"]);
    }
}
