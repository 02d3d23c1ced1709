//! In-memory implementation of the GraphStore trait.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use tracing::debug;

use natural_rights_core::AccountId;

use crate::error::{Result, StoreError};
use crate::records::{AccountRecord, GroupRecord, Record, RecordKey, Versioned};
use crate::traits::{CommitResult, GraphStore, WriteBatch};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    /// Records indexed by key.
    records: HashMap<RecordKey, Versioned<Record>>,

    /// Crypt public key -> owning account.
    crypt_keys: HashMap<String, AccountId>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner::default()),
        }
    }

    /// Number of stored records.
    pub fn len(&self) -> Result<usize> {
        Ok(self.read()?.records.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryStoreInner>> {
        self.inner
            .read()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryStoreInner>> {
        self.inner
            .write()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStoreInner {
    /// First guard or write whose expectation does not hold, if any.
    fn find_conflict(&self, batch: &WriteBatch) -> Option<RecordKey> {
        for guard in batch.guards() {
            let current = self.records.get(&guard.key).map(|r| r.version);
            if current != Some(guard.version) {
                return Some(guard.key.clone());
            }
        }

        for write in batch.writes() {
            let key = write.record.key();
            let current = self.records.get(&key).map(|r| r.version);
            if current != write.expected_version {
                return Some(key);
            }

            if let Record::Account(account) = &write.record {
                match self.crypt_keys.get(&account.crypt_pub_key) {
                    Some(owner) if owner != &account.id => {
                        return Some(RecordKey::account(owner));
                    }
                    _ => {}
                }
            }
        }
        None
    }
}

#[async_trait]
impl GraphStore for MemoryStore {
    async fn get_record(&self, key: &RecordKey) -> Result<Option<Versioned<Record>>> {
        Ok(self.read()?.records.get(key).cloned())
    }

    async fn commit(&self, batch: WriteBatch) -> Result<CommitResult> {
        batch.check_distinct()?;
        let mut inner = self.write()?;

        if let Some(key) = inner.find_conflict(&batch) {
            debug!(%key, "commit conflict");
            return Ok(CommitResult::Conflict { key });
        }

        for write in batch.writes() {
            let version = write.next_version();
            if let Record::Account(account) = &write.record {
                inner
                    .crypt_keys
                    .insert(account.crypt_pub_key.clone(), account.id.clone());
            }
            inner.records.insert(
                write.record.key(),
                Versioned::new(version, write.record.clone()),
            );
        }

        debug!(writes = batch.len(), "committed");
        Ok(CommitResult::Committed)
    }

    async fn account_by_crypt_pub_key(
        &self,
        crypt_pub_key: &str,
    ) -> Result<Option<Versioned<AccountRecord>>> {
        let inner = self.read()?;
        let Some(account_id) = inner.crypt_keys.get(crypt_pub_key) else {
            return Ok(None);
        };

        match inner.records.get(&RecordKey::account(account_id)) {
            Some(Versioned {
                version,
                record: Record::Account(account),
            }) => Ok(Some(Versioned::new(*version, account.clone()))),
            _ => Ok(None),
        }
    }

    async fn groups_for_account(
        &self,
        account: &AccountId,
    ) -> Result<Vec<Versioned<GroupRecord>>> {
        let inner = self.read()?;
        let mut groups: Vec<Versioned<GroupRecord>> = inner
            .records
            .values()
            .filter_map(|v| match &v.record {
                Record::Group(group) if group.is_member(account) => {
                    Some(Versioned::new(v.version, group.clone()))
                }
                _ => None,
            })
            .collect();
        groups.sort_by(|a, b| a.record.id.cmp(&b.record.id));
        Ok(groups)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{ClientRecord, Membership};
    use crate::traits::{GraphStoreExt, Guard};
    use natural_rights_core::{ClientId, DocumentId, GroupId};
    use std::collections::BTreeMap;

    fn account(id: &str, crypt: &str) -> AccountRecord {
        AccountRecord {
            id: AccountId::from(id),
            sign_pub_key: format!("spub-{id}"),
            crypt_pub_key: crypt.into(),
            enc_sign_priv_key: "esk".into(),
            enc_crypt_priv_key: "eck".into(),
            root_document_id: DocumentId::from(format!("root-{id}")),
        }
    }

    fn group(id: &str, members: &[&str]) -> GroupRecord {
        GroupRecord {
            id: GroupId::from(id),
            sign_pub_key: "gs".into(),
            crypt_pub_key: "gc".into(),
            enc_sign_priv_key: "ges".into(),
            enc_crypt_priv_key: "gec".into(),
            members: members
                .iter()
                .map(|m| {
                    (
                        AccountId::from(*m),
                        Membership {
                            crypt_transform_key: None,
                            can_sign: false,
                        },
                    )
                })
                .collect(),
            admins: BTreeMap::new(),
        }
    }

    #[tokio::test]
    async fn test_memory_store_basic() {
        let store = MemoryStore::new();
        assert!(store.is_empty().unwrap());

        let result = store
            .commit(WriteBatch::new().insert(account("a1", "c1")))
            .await
            .unwrap();
        assert_eq!(result, CommitResult::Committed);

        let stored = store.get_account(&AccountId::from("a1")).await.unwrap().unwrap();
        assert_eq!(stored.version, 1);
        assert_eq!(stored.record.crypt_pub_key, "c1");

        let by_key = store.account_by_crypt_pub_key("c1").await.unwrap().unwrap();
        assert_eq!(by_key.record.id, AccountId::from("a1"));
        assert!(store.account_by_crypt_pub_key("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memory_store_stale_version_conflicts() {
        let store = MemoryStore::new();
        let client = ClientRecord::enrolled(ClientId::from("c1"));
        store
            .commit(WriteBatch::new().insert(client.clone()))
            .await
            .unwrap();

        // Two writers read version 1; only the first one wins.
        let mut revoked = client.clone();
        revoked.revoked = true;
        let first = store
            .commit(WriteBatch::new().update(1, revoked))
            .await
            .unwrap();
        let second = store
            .commit(WriteBatch::new().update(1, client.clone()))
            .await
            .unwrap();

        assert_eq!(first, CommitResult::Committed);
        assert_eq!(
            second,
            CommitResult::Conflict {
                key: RecordKey::client(&client.id)
            }
        );

        let stored = store.get_client(&client.id).await.unwrap().unwrap();
        assert_eq!(stored.version, 2);
        assert!(stored.record.revoked);
    }

    #[tokio::test]
    async fn test_memory_store_batch_is_atomic() {
        let store = MemoryStore::new();
        store
            .commit(WriteBatch::new().insert(account("a1", "c1")))
            .await
            .unwrap();

        // Second write conflicts, so the first must not land either.
        let result = store
            .commit(
                WriteBatch::new()
                    .insert(account("a2", "c2"))
                    .insert(account("a1", "c1")),
            )
            .await
            .unwrap();

        assert!(matches!(result, CommitResult::Conflict { .. }));
        assert!(store.get_account(&AccountId::from("a2")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memory_store_crypt_key_is_unique() {
        let store = MemoryStore::new();
        store
            .commit(WriteBatch::new().insert(account("a1", "shared")))
            .await
            .unwrap();

        let result = store
            .commit(WriteBatch::new().insert(account("a2", "shared")))
            .await
            .unwrap();
        assert_eq!(
            result,
            CommitResult::Conflict {
                key: RecordKey::account(&AccountId::from("a1"))
            }
        );
    }

    #[tokio::test]
    async fn test_memory_store_groups_for_account() {
        let store = MemoryStore::new();
        store
            .commit(
                WriteBatch::new()
                    .insert(group("g2", &["a1", "a2"]))
                    .insert(group("g1", &["a1"]))
                    .insert(group("g3", &["a2"])),
            )
            .await
            .unwrap();

        let groups = store.groups_for_account(&AccountId::from("a1")).await.unwrap();
        let ids: Vec<_> = groups.iter().map(|g| g.record.id.as_str()).collect();
        assert_eq!(ids, vec!["g1", "g2"]);
    }

    proptest::proptest! {
        #[test]
        fn test_version_advances_only_on_matching_expectation(
            expectations in proptest::collection::vec(proptest::option::of(0u64..4), 1..12),
        ) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            rt.block_on(async {
                let store = MemoryStore::new();
                let client = ClientRecord::enrolled(ClientId::from("c1"));
                let mut current: Option<u64> = None;

                for expected in expectations {
                    let write = WriteBatch::new();
                    let write = match expected {
                        None => write.insert(client.clone()),
                        Some(v) => write.update(v, client.clone()),
                    };
                    let result = store.commit(write).await.unwrap();

                    if expected == current {
                        proptest::prop_assert_eq!(result, CommitResult::Committed);
                        current = Some(current.map_or(1, |v| v + 1));
                    } else {
                        let is_conflict = matches!(result, CommitResult::Conflict { .. });
                        proptest::prop_assert!(is_conflict);
                    }
                }

                let stored = store.get_client(&client.id).await.unwrap();
                proptest::prop_assert_eq!(stored.map(|c| c.version), current);
                Ok::<(), proptest::test_runner::TestCaseError>(())
            })?;
        }
    }

    #[tokio::test]
    async fn test_memory_store_rejects_duplicate_keys() {
        let store = MemoryStore::new();
        let err = store
            .commit(
                WriteBatch::new()
                    .insert(account("a1", "c1"))
                    .update(1, account("a1", "c1")),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidData(_)));
    }

    #[tokio::test]
    async fn test_memory_store_stale_guard_conflicts() {
        let store = MemoryStore::new();
        store
            .commit(WriteBatch::new().insert(group("g1", &["a1"])))
            .await
            .unwrap();
        let g1 = RecordKey::group(&GroupId::from("g1"));
        let pinned = Guard {
            key: g1.clone(),
            version: 1,
        };

        store
            .commit(WriteBatch::new().update(1, group("g1", &["a2"])))
            .await
            .unwrap();

        let result = store
            .commit(
                WriteBatch::new()
                    .insert(account("a1", "c1"))
                    .guarded_by([pinned.clone()]),
            )
            .await
            .unwrap();
        assert_eq!(result, CommitResult::Conflict { key: g1.clone() });
        assert!(store.get_account(&AccountId::from("a1")).await.unwrap().is_none());

        let fresh = Guard { version: 2, ..pinned };
        let result = store
            .commit(WriteBatch::new().insert(account("a1", "c1")).guarded_by([fresh]))
            .await
            .unwrap();
        assert_eq!(result, CommitResult::Committed);
    }
}
