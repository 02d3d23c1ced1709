//! SQLite implementation of the GraphStore trait.
//!
//! This is the persistent storage backend for Natural Rights. It uses
//! rusqlite with bundled SQLite, wrapped in async via tokio::spawn_blocking.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use tracing::debug;

use natural_rights_core::AccountId;

use crate::error::{Result, StoreError};
use crate::migration::{self, now_millis};
use crate::records::{AccountRecord, GroupRecord, Record, RecordKey, Versioned};
use crate::traits::{CommitResult, GraphStore, Write, WriteBatch};

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a blocking operation on the connection off the async runtime.
    async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| StoreError::Poisoned(e.to_string()))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

fn encode_body(record: &Record) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(record, &mut buf)
        .map_err(|e| StoreError::Serialization(e.to_string()))?;
    Ok(buf)
}

fn decode_body(body: &[u8]) -> Result<Record> {
    ciborium::from_reader(body).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn decode_account(version: u64, body: &[u8]) -> Result<Versioned<AccountRecord>> {
    match decode_body(body)? {
        Record::Account(account) => Ok(Versioned::new(version, account)),
        other => Err(StoreError::InvalidData(format!(
            "account index points at {} record {}",
            other.kind(),
            other.key()
        ))),
    }
}

fn decode_group(version: u64, body: &[u8]) -> Result<Versioned<GroupRecord>> {
    match decode_body(body)? {
        Record::Group(group) => Ok(Versioned::new(version, group)),
        other => Err(StoreError::InvalidData(format!(
            "membership index points at {} record {}",
            other.kind(),
            other.key()
        ))),
    }
}

fn current_version(tx: &Transaction<'_>, key: &RecordKey) -> Result<Option<u64>> {
    Ok(tx
        .query_row(
            "SELECT version FROM records WHERE kind = ?1 AND id = ?2",
            params![key.kind.as_str(), key.id],
            |row| row.get(0),
        )
        .optional()?)
}

/// Check one write's expectations inside the commit transaction.
fn check_write(tx: &Transaction<'_>, write: &Write) -> Result<Option<RecordKey>> {
    let key = write.record.key();
    if current_version(tx, &key)? != write.expected_version {
        return Ok(Some(key));
    }

    if let Record::Account(account) = &write.record {
        let owner: Option<String> = tx
            .query_row(
                "SELECT account_id FROM account_keys WHERE crypt_pub_key = ?1",
                params![account.crypt_pub_key],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(owner) = owner.filter(|o| o != account.id.as_str()) {
            return Ok(Some(RecordKey::account(&AccountId::new(owner))));
        }
    }

    Ok(None)
}

/// Apply one already-checked write, keeping the lookup indexes in step.
fn apply_write(tx: &Transaction<'_>, write: &Write, now: i64) -> Result<()> {
    let key = write.record.key();
    let body = encode_body(&write.record)?;

    tx.execute(
        "INSERT INTO records (kind, id, version, body, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(kind, id) DO UPDATE SET
            version = excluded.version,
            body = excluded.body,
            updated_at = excluded.updated_at",
        params![key.kind.as_str(), key.id, write.next_version(), body, now],
    )?;

    match &write.record {
        Record::Account(account) => {
            tx.execute(
                "INSERT OR REPLACE INTO account_keys (crypt_pub_key, account_id) VALUES (?1, ?2)",
                params![account.crypt_pub_key, account.id.as_str()],
            )?;
        }
        Record::Group(group) => {
            tx.execute(
                "DELETE FROM group_members WHERE group_id = ?1",
                params![group.id.as_str()],
            )?;
            for member in group.members.keys() {
                tx.execute(
                    "INSERT INTO group_members (group_id, account_id) VALUES (?1, ?2)",
                    params![group.id.as_str(), member.as_str()],
                )?;
            }
        }
        Record::Client(_) | Record::Document(_) => {}
    }

    Ok(())
}

#[async_trait]
impl GraphStore for SqliteStore {
    async fn get_record(&self, key: &RecordKey) -> Result<Option<Versioned<Record>>> {
        let key = key.clone();

        self.run(move |conn| {
            let row: Option<(u64, Vec<u8>)> = conn
                .query_row(
                    "SELECT version, body FROM records WHERE kind = ?1 AND id = ?2",
                    params![key.kind.as_str(), key.id],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;

            row.map(|(version, body)| Ok(Versioned::new(version, decode_body(&body)?)))
                .transpose()
        })
        .await
    }

    async fn commit(&self, batch: WriteBatch) -> Result<CommitResult> {
        batch.check_distinct()?;

        self.run(move |conn| {
            let tx = conn.transaction()?;
            let now = now_millis();

            for guard in batch.guards() {
                if current_version(&tx, &guard.key)? != Some(guard.version) {
                    debug!(key = %guard.key, "guard conflict");
                    return Ok(CommitResult::Conflict {
                        key: guard.key.clone(),
                    });
                }
            }

            for write in batch.writes() {
                if let Some(key) = check_write(&tx, write)? {
                    debug!(%key, "commit conflict");
                    // Dropping the transaction rolls back earlier writes.
                    return Ok(CommitResult::Conflict { key });
                }
                apply_write(&tx, write, now)?;
            }

            tx.commit()?;
            debug!(writes = batch.len(), "committed");
            Ok(CommitResult::Committed)
        })
        .await
    }

    async fn account_by_crypt_pub_key(
        &self,
        crypt_pub_key: &str,
    ) -> Result<Option<Versioned<AccountRecord>>> {
        let crypt_pub_key = crypt_pub_key.to_owned();

        self.run(move |conn| {
            let row: Option<(u64, Vec<u8>)> = conn
                .query_row(
                    "SELECT r.version, r.body
                     FROM account_keys k
                     JOIN records r ON r.kind = 'account' AND r.id = k.account_id
                     WHERE k.crypt_pub_key = ?1",
                    params![crypt_pub_key],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;

            row.map(|(version, body)| decode_account(version, &body))
                .transpose()
        })
        .await
    }

    async fn groups_for_account(
        &self,
        account: &AccountId,
    ) -> Result<Vec<Versioned<GroupRecord>>> {
        let account = account.clone();

        self.run(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT r.version, r.body
                 FROM group_members m
                 JOIN records r ON r.kind = 'group' AND r.id = m.group_id
                 WHERE m.account_id = ?1
                 ORDER BY m.group_id",
            )?;

            let rows = stmt
                .query_map(params![account.as_str()], |row| {
                    Ok((row.get::<_, u64>(0)?, row.get::<_, Vec<u8>>(1)?))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            rows.iter()
                .map(|(version, body)| decode_group(*version, body))
                .collect()
        })
        .await
    }
}
