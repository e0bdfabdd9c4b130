//! Database schema migrations for SQLite.
//!
//! We use a simple versioned migration system. Each migration is a SQL string
//! that transforms the schema from version N to N+1.

use rusqlite::Connection;

use crate::error::{Result, StoreError};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Initialize or migrate the database schema.
///
/// This function is idempotent - it can be called multiple times safely.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    if current > CURRENT_VERSION {
        return Err(StoreError::Migration(format!(
            "database schema version {} is newer than supported version {}",
            current, CURRENT_VERSION
        )));
    }

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, now_secs()],
            )?;
            tracing::debug!(version, "applied schema migration");
        }

        tx.commit()?;
    }

    Ok(())
}

/// Apply a specific migration version.
fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        _ => Err(StoreError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// Migration v1: Initial schema.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- One row per created message
        CREATE TABLE messages (
            id INTEGER PRIMARY KEY,             -- sequential, starts at 0
            creator BLOB NOT NULL,              -- 20 bytes
            title TEXT NOT NULL,                -- unvalidated, may be empty
            encrypted_content BLOB NOT NULL,    -- opaque ciphertext
            encrypted_recipient BLOB NOT NULL,  -- 32 bytes, opaque handle
            created_at BLOB NOT NULL,           -- Unix seconds, 8 bytes big-endian
            unlock_timestamp BLOB NOT NULL,     -- same encoding, > created_at
            access_granted INTEGER NOT NULL DEFAULT 0,
            granted_recipient BLOB,             -- 20 bytes, NULL until granted

            CHECK (length(created_at) = 8 AND length(unlock_timestamp) = 8),
            CHECK (unlock_timestamp > created_at),
            CHECK ((access_granted = 0 AND granted_recipient IS NULL)
                OR (access_granted = 1 AND granted_recipient IS NOT NULL))
        );

        -- Creator index, append-only
        CREATE TABLE creator_messages (
            creator BLOB NOT NULL,
            position INTEGER NOT NULL,          -- 0-based, creation order
            message_id INTEGER NOT NULL REFERENCES messages(id),
            PRIMARY KEY (creator, position)
        );

        CREATE INDEX idx_messages_creator ON messages(creator);
        "#,
    )?;

    Ok(())
}

/// Get current time in seconds.
fn now_secs() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
