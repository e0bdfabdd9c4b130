//! SQLite implementation of the Store trait.
//!
//! This is the primary storage backend. It uses rusqlite with bundled
//! SQLite. Every mutation runs inside a single transaction.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use bytes::Bytes;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use timelock_core::{Address, EncryptedHandle, Record, RecordId, RecordParts, Timestamp};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{GrantResult, InsertResult, Store};

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex.
pub struct SqliteStore {
    /// The SQLite connection, protected by a mutex.
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }
}

/// Columns as SQLite hands them back, before invariant checks.
struct RawRow {
    id: i64,
    creator: Vec<u8>,
    title: String,
    encrypted_content: Vec<u8>,
    encrypted_recipient: Vec<u8>,
    created_at: Vec<u8>,
    unlock_timestamp: Vec<u8>,
    access_granted: bool,
    granted_recipient: Option<Vec<u8>>,
}

const SELECT_MESSAGE: &str = "SELECT id, creator, title, encrypted_content, encrypted_recipient,
        created_at, unlock_timestamp, access_granted, granted_recipient
 FROM messages WHERE id = ?1";

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRow> {
    Ok(RawRow {
        id: row.get("id")?,
        creator: row.get("creator")?,
        title: row.get("title")?,
        encrypted_content: row.get("encrypted_content")?,
        encrypted_recipient: row.get("encrypted_recipient")?,
        created_at: row.get("created_at")?,
        unlock_timestamp: row.get("unlock_timestamp")?,
        access_granted: row.get("access_granted")?,
        granted_recipient: row.get("granted_recipient")?,
    })
}

fn address_from_blob(column: &str, bytes: &[u8]) -> Result<Address> {
    Address::try_from(bytes).map_err(|_| {
        StoreError::InvalidData(format!("{} has {} bytes, expected 20", column, bytes.len()))
    })
}

fn from_sql_int(column: &'static str, value: i64) -> Result<u64> {
    u64::try_from(value)
        .map_err(|_| StoreError::InvalidData(format!("{} is negative: {}", column, value)))
}

fn to_sql_int(column: &'static str, value: u64) -> Result<i64> {
    i64::try_from(value).map_err(|_| StoreError::OutOfRange { column, value })
}

/// Timestamps are stored as 8-byte big-endian blobs. The full `u64` range
/// fits and SQLite's bytewise blob comparison matches numeric order.
fn timestamp_to_blob(ts: Timestamp) -> [u8; 8] {
    ts.as_secs().to_be_bytes()
}

fn timestamp_from_blob(column: &str, bytes: &[u8]) -> Result<Timestamp> {
    let raw: [u8; 8] = bytes.try_into().map_err(|_| {
        StoreError::InvalidData(format!("{} has {} bytes, expected 8", column, bytes.len()))
    })?;
    Ok(Timestamp::from_secs(u64::from_be_bytes(raw)))
}

/// Convert a raw row into a record, checking record invariants.
fn into_record(raw: RawRow) -> Result<Record> {
    let encrypted_recipient = EncryptedHandle::try_from(raw.encrypted_recipient.as_slice())
        .map_err(|_| {
            StoreError::InvalidData(format!(
                "encrypted_recipient has {} bytes, expected 32",
                raw.encrypted_recipient.len()
            ))
        })?;

    let granted_recipient = raw
        .granted_recipient
        .as_deref()
        .map(|b| address_from_blob("granted_recipient", b))
        .transpose()?;

    let parts = RecordParts {
        id: RecordId::new(from_sql_int("id", raw.id)?),
        creator: address_from_blob("creator", &raw.creator)?,
        title: raw.title,
        encrypted_content: Bytes::from(raw.encrypted_content),
        encrypted_recipient,
        created_at: timestamp_from_blob("created_at", &raw.created_at)?,
        unlock_timestamp: timestamp_from_blob("unlock_timestamp", &raw.unlock_timestamp)?,
        access_granted: raw.access_granted,
        granted_recipient,
    };

    Record::from_parts(parts).map_err(|e| StoreError::InvalidData(e.to_string()))
}

fn count_messages(conn: &Connection) -> Result<u64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM messages", [], |row| row.get(0))?;
    from_sql_int("count", count)
}

impl Store for SqliteStore {
    fn insert_record(&self, record: &Record) -> Result<InsertResult> {
        if record.access_granted() {
            return Err(StoreError::InvalidData(format!(
                "record {} is already granted at insert",
                record.id()
            )));
        }

        let id = to_sql_int("id", record.id().get())?;
        let created_at = timestamp_to_blob(record.created_at());
        let unlock = timestamp_to_blob(record.unlock_timestamp());
        let creator = record.creator();

        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let expected = RecordId::new(count_messages(&tx)?);
        if record.id() < expected {
            return Ok(InsertResult::AlreadyExists);
        }
        if record.id() != expected {
            return Ok(InsertResult::OutOfOrder { expected });
        }

        tx.execute(
            "INSERT INTO messages (
                id, creator, title, encrypted_content, encrypted_recipient,
                created_at, unlock_timestamp, access_granted, granted_recipient
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, NULL)",
            params![
                id,
                creator.as_bytes().as_slice(),
                record.title(),
                record.encrypted_content().as_ref(),
                record.encrypted_recipient().as_bytes().as_slice(),
                created_at.as_slice(),
                unlock.as_slice(),
            ],
        )?;

        let position: i64 = tx.query_row(
            "SELECT COUNT(*) FROM creator_messages WHERE creator = ?1",
            params![creator.as_bytes().as_slice()],
            |row| row.get(0),
        )?;

        tx.execute(
            "INSERT INTO creator_messages (creator, position, message_id) VALUES (?1, ?2, ?3)",
            params![creator.as_bytes().as_slice(), position, id],
        )?;

        tx.commit()?;
        Ok(InsertResult::Inserted)
    }

    fn get_record(&self, id: RecordId) -> Result<Option<Record>> {
        let Ok(id) = i64::try_from(id.get()) else {
            return Ok(None);
        };

        let conn = self.lock()?;
        let raw = conn
            .query_row(SELECT_MESSAGE, params![id], read_row)
            .optional()?;

        raw.map(into_record).transpose()
    }

    fn record_count(&self) -> Result<u64> {
        let conn = self.lock()?;
        count_messages(&conn)
    }

    fn record_grant(&self, id: RecordId, recipient: Address) -> Result<GrantResult> {
        let Ok(id) = i64::try_from(id.get()) else {
            return Ok(GrantResult::NotFound);
        };

        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let changed = tx.execute(
            "UPDATE messages SET access_granted = 1, granted_recipient = ?2
             WHERE id = ?1 AND access_granted = 0",
            params![id, recipient.as_bytes().as_slice()],
        )?;

        let result = if changed == 1 {
            GrantResult::Granted
        } else {
            let existing: Option<Option<Vec<u8>>> = tx
                .query_row(
                    "SELECT granted_recipient FROM messages WHERE id = ?1",
                    params![id],
                    |row| row.get(0),
                )
                .optional()?;

            match existing {
                None => GrantResult::NotFound,
                Some(Some(bytes)) => GrantResult::AlreadyGranted {
                    recipient: address_from_blob("granted_recipient", &bytes)?,
                },
                Some(None) => {
                    return Err(StoreError::InvalidData(format!(
                        "message {} is marked granted without a recipient",
                        id
                    )))
                }
            }
        };

        tx.commit()?;
        Ok(result)
    }

    fn record_ids_by_creator(&self, creator: &Address) -> Result<Vec<RecordId>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT message_id FROM creator_messages WHERE creator = ?1 ORDER BY position",
        )?;

        let ids = stmt
            .query_map(params![creator.as_bytes().as_slice()], |row| {
                row.get::<_, i64>(0)
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        ids.into_iter()
            .map(|id| from_sql_int("message_id", id).map(RecordId::new))
            .collect()
    }
}
