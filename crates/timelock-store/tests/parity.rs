//! The in-memory and SQLite backends must agree on every observable result.

use proptest::prelude::*;

use timelock_core::{
    Address, CreateMessage, EncryptedHandle, InputProof, Record, RecordId, Timestamp,
};
use timelock_store::{InsertResult, MemoryStore, SqliteStore, Store};

fn record(id: u64, creator: u8, unlock: u64) -> Record {
    let request = CreateMessage::new(
        format!("m{}", id),
        vec![creator; 4],
        EncryptedHandle::from_bytes([creator; 32]),
        InputProof::empty(),
        Timestamp::from_secs(unlock),
    );
    Record::new(
        RecordId::new(id),
        Address::from_bytes([creator; 20]),
        request,
        Timestamp::from_secs(5),
    )
    .unwrap()
}

/// Unlock times on both sides of the `i64` boundary.
fn unlock_time() -> impl Strategy<Value = u64> {
    prop_oneof![
        6u64..1_000,
        Just(i64::MAX as u64),
        Just(i64::MAX as u64 + 1),
        Just(u64::MAX),
        (i64::MAX as u64)..=u64::MAX,
    ]
}

#[derive(Debug, Clone)]
enum Op {
    Insert { creator: u8, unlock: u64 },
    Grant { id: u64, recipient: u8 },
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u8..4, unlock_time()).prop_map(|(creator, unlock)| Op::Insert { creator, unlock }),
        (0u64..12, 0u8..4).prop_map(|(id, recipient)| Op::Grant { id, recipient }),
    ]
}

proptest! {
    #[test]
    fn memory_and_sqlite_agree(ops in prop::collection::vec(op(), 0..24)) {
        let memory = MemoryStore::new();
        let sqlite = SqliteStore::open_memory().unwrap();

        for op in ops {
            match op {
                Op::Insert { creator, unlock } => {
                    let next = memory.record_count().unwrap();
                    let r = record(next, creator, unlock);
                    prop_assert_eq!(memory.insert_record(&r).unwrap(), sqlite.insert_record(&r).unwrap());
                }
                Op::Grant { id, recipient } => {
                    let id = RecordId::new(id);
                    let to = Address::from_bytes([recipient; 20]);
                    prop_assert_eq!(memory.record_grant(id, to).unwrap(), sqlite.record_grant(id, to).unwrap());
                }
            }
        }

        prop_assert_eq!(memory.record_count().unwrap(), sqlite.record_count().unwrap());
        for creator in 0u8..4 {
            let addr = Address::from_bytes([creator; 20]);
            prop_assert_eq!(
                memory.record_ids_by_creator(&addr).unwrap(),
                sqlite.record_ids_by_creator(&addr).unwrap()
            );
        }
        for id in 0..memory.record_count().unwrap() {
            let id = RecordId::new(id);
            prop_assert_eq!(memory.get_record(id).unwrap(), sqlite.get_record(id).unwrap());
        }
    }
}

#[test]
fn unlock_beyond_i64_is_stored_by_both() {
    let memory = MemoryStore::new();
    let sqlite = SqliteStore::open_memory().unwrap();

    for (id, unlock) in [i64::MAX as u64 + 1, u64::MAX].into_iter().enumerate() {
        let r = record(id as u64, 1, unlock);
        assert_eq!(memory.insert_record(&r).unwrap(), InsertResult::Inserted);
        assert_eq!(sqlite.insert_record(&r).unwrap(), InsertResult::Inserted);

        let stored = sqlite.get_record(r.id()).unwrap().unwrap();
        assert_eq!(stored.unlock_timestamp(), Timestamp::from_secs(unlock));
        assert_eq!(memory.get_record(r.id()).unwrap(), Some(stored));
    }
}
