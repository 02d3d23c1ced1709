//! GraphStore trait: the abstract interface for key graph persistence.
//!
//! Handlers read the records they need, compute new versions of them, and
//! commit all writes of one action as a single batch. Every write names
//! the version it was computed from, so a concurrent writer that got there
//! first turns the whole batch into a [`CommitResult::Conflict`].

use std::collections::HashSet;
use std::future::Future;

use async_trait::async_trait;
use natural_rights_core::{AccountId, ClientId, DocumentId, GroupId};

use crate::error::{Result, StoreError};
use crate::records::{
    AccountRecord, ClientRecord, DocumentRecord, GroupRecord, Record, RecordKey, Versioned,
};

/// One record write with its expected current version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Write {
    /// `None` if the record must not exist yet.
    pub expected_version: Option<u64>,
    pub record: Record,
}

impl Write {
    /// The version the record will have once committed.
    pub fn next_version(&self) -> u64 {
        self.expected_version.map_or(1, |v| v + 1)
    }
}

/// A version a record must still have at commit, without being written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Guard {
    pub key: RecordKey,
    pub version: u64,
}

/// An ordered set of writes committed atomically.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    writes: Vec<Write>,
    guards: Vec<Guard>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a record that must not exist yet.
    pub fn insert(mut self, record: impl Into<Record>) -> Self {
        self.writes.push(Write {
            expected_version: None,
            record: record.into(),
        });
        self
    }

    /// Replace a record read at `version`.
    pub fn update(mut self, version: u64, record: impl Into<Record>) -> Self {
        self.writes.push(Write {
            expected_version: Some(version),
            record: record.into(),
        });
        self
    }

    /// Pin records the batch was authorized by. The commit conflicts if
    /// any of them changed since they were read.
    pub fn guarded_by(mut self, guards: impl IntoIterator<Item = Guard>) -> Self {
        self.guards.extend(guards);
        self
    }

    pub fn writes(&self) -> &[Write] {
        &self.writes
    }

    pub fn guards(&self) -> &[Guard] {
        &self.guards
    }

    /// Reject a batch that writes the same record twice.
    pub fn check_distinct(&self) -> Result<()> {
        let mut seen = HashSet::with_capacity(self.writes.len());
        for write in &self.writes {
            let key = write.record.key();
            if !seen.insert(key.clone()) {
                return Err(StoreError::InvalidData(format!(
                    "write batch touches {key} twice"
                )));
            }
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }
}

/// Result of committing a write batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitResult {
    /// All writes were applied.
    Committed,
    /// Nothing was applied: this record did not have the expected version.
    Conflict {
        key: RecordKey,
    },
}

/// The GraphStore trait: async interface for key graph persistence.
///
/// # Design Notes
///
/// - **Versioned records**: each record carries a version starting at 1,
///   incremented by every committed write.
/// - **Atomic batches**: a batch is applied entirely or not at all.
/// - **Guards**: a batch may pin records it only read; a changed guard is a
///   conflict like a stale write.
/// - **Short locks**: implementations hold their lock only for the duration
///   of one call. No caller-supplied code ever runs under it.
#[async_trait]
pub trait GraphStore: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Record Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Get a record and its version.
    async fn get_record(&self, key: &RecordKey) -> Result<Option<Versioned<Record>>>;

    /// Commit a batch of writes atomically.
    async fn commit(&self, batch: WriteBatch) -> Result<CommitResult>;

    // ─────────────────────────────────────────────────────────────────────────
    // Index Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Find the account owning a crypt public key.
    async fn account_by_crypt_pub_key(
        &self,
        crypt_pub_key: &str,
    ) -> Result<Option<Versioned<AccountRecord>>>;

    /// All groups the account is a member of, ordered by group id.
    async fn groups_for_account(&self, account: &AccountId)
        -> Result<Vec<Versioned<GroupRecord>>>;
}

/// Typed record access on top of [`GraphStore::get_record`].
pub trait GraphStoreExt: GraphStore {
    fn get_account(
        &self,
        id: &AccountId,
    ) -> impl Future<Output = Result<Option<Versioned<AccountRecord>>>> + Send;

    fn get_client(
        &self,
        id: &ClientId,
    ) -> impl Future<Output = Result<Option<Versioned<ClientRecord>>>> + Send;

    fn get_group(
        &self,
        id: &GroupId,
    ) -> impl Future<Output = Result<Option<Versioned<GroupRecord>>>> + Send;

    fn get_document(
        &self,
        id: &DocumentId,
    ) -> impl Future<Output = Result<Option<Versioned<DocumentRecord>>>> + Send;
}

impl<S: GraphStore + ?Sized> GraphStoreExt for S {
    async fn get_account(&self, id: &AccountId) -> Result<Option<Versioned<AccountRecord>>> {
        match self.get_record(&RecordKey::account(id)).await? {
            None => Ok(None),
            Some(Versioned {
                version,
                record: Record::Account(r),
            }) => Ok(Some(Versioned::new(version, r))),
            Some(other) => Err(unexpected_kind("account", &other.record)),
        }
    }

    async fn get_client(&self, id: &ClientId) -> Result<Option<Versioned<ClientRecord>>> {
        match self.get_record(&RecordKey::client(id)).await? {
            None => Ok(None),
            Some(Versioned {
                version,
                record: Record::Client(r),
            }) => Ok(Some(Versioned::new(version, r))),
            Some(other) => Err(unexpected_kind("client", &other.record)),
        }
    }

    async fn get_group(&self, id: &GroupId) -> Result<Option<Versioned<GroupRecord>>> {
        match self.get_record(&RecordKey::group(id)).await? {
            None => Ok(None),
            Some(Versioned {
                version,
                record: Record::Group(r),
            }) => Ok(Some(Versioned::new(version, r))),
            Some(other) => Err(unexpected_kind("group", &other.record)),
        }
    }

    async fn get_document(&self, id: &DocumentId) -> Result<Option<Versioned<DocumentRecord>>> {
        match self.get_record(&RecordKey::document(id)).await? {
            None => Ok(None),
            Some(Versioned {
                version,
                record: Record::Document(r),
            }) => Ok(Some(Versioned::new(version, r))),
            Some(other) => Err(unexpected_kind("document", &other.record)),
        }
    }
}

fn unexpected_kind(expected: &str, found: &Record) -> StoreError {
    StoreError::InvalidData(format!(
        "expected {expected} record, found {} record {}",
        found.kind(),
        found.key()
    ))
}

#[async_trait]
impl<S: GraphStore + ?Sized> GraphStore for std::sync::Arc<S> {
    async fn get_record(&self, key: &RecordKey) -> Result<Option<Versioned<Record>>> {
        (**self).get_record(key).await
    }

    async fn commit(&self, batch: WriteBatch) -> Result<CommitResult> {
        (**self).commit(batch).await
    }

    async fn account_by_crypt_pub_key(
        &self,
        crypt_pub_key: &str,
    ) -> Result<Option<Versioned<AccountRecord>>> {
        (**self).account_by_crypt_pub_key(crypt_pub_key).await
    }

    async fn groups_for_account(
        &self,
        account: &AccountId,
    ) -> Result<Vec<Versioned<GroupRecord>>> {
        (**self).groups_for_account(account).await
    }
}
