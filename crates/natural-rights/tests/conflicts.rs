//! Optimistic concurrency: a handler that loses a race fails with
//! `Conflict` and leaves the graph as the winner wrote it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use natural_rights::core::{
    AccountId, Action, AddAdminToGroupPayload, AddMemberToGroupPayload, GrantAccessPayload,
    GrantKind, GroupId, Request, RevokeAccessPayload,
};
use natural_rights::primitives::IdentityPrimitives;
use natural_rights::store::{
    AccountRecord, CommitResult, GraphStore, GraphStoreExt, Grantee, GroupRecord, MemoryStore,
    Record, RecordKey, Result as StoreResult, Versioned, WriteBatch,
};
use natural_rights::{ErrorKind, NaturalRightsService, ServiceConfig};
use natural_rights_testkit::{account_payload, document_payload, group_payload, TestClient};

/// A store that lets a competing writer in just before the next commit.
struct RacingStore {
    inner: MemoryStore,
    armed: AtomicBool,
    queued: Mutex<Option<WriteBatch>>,
}

impl RacingStore {
    fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            armed: AtomicBool::new(false),
            queued: Mutex::new(None),
        }
    }

    /// Bump every record the next batch updates.
    fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    /// Commit `competing` just before the next batch.
    fn arm_with(&self, competing: WriteBatch) {
        *self.queued.lock().unwrap() = Some(competing);
    }

    /// Rewrite every record the batch expects to update, bumping versions.
    async fn interfere(&self, batch: &WriteBatch) -> StoreResult<()> {
        let mut competing = WriteBatch::new();
        for write in batch.writes() {
            if let Some(version) = write.expected_version {
                competing = competing.update(version, write.record.clone());
            }
        }
        if !competing.is_empty() {
            self.inner.commit(competing).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl GraphStore for RacingStore {
    async fn get_record(&self, key: &RecordKey) -> StoreResult<Option<Versioned<Record>>> {
        self.inner.get_record(key).await
    }

    async fn commit(&self, batch: WriteBatch) -> StoreResult<CommitResult> {
        let queued = self.queued.lock().unwrap().take();
        if let Some(competing) = queued {
            self.inner.commit(competing).await?;
        }
        if self.armed.swap(false, Ordering::SeqCst) {
            self.interfere(&batch).await?;
        }
        self.inner.commit(batch).await
    }

    async fn account_by_crypt_pub_key(
        &self,
        crypt_pub_key: &str,
    ) -> StoreResult<Option<Versioned<AccountRecord>>> {
        self.inner.account_by_crypt_pub_key(crypt_pub_key).await
    }

    async fn groups_for_account(
        &self,
        account: &AccountId,
    ) -> StoreResult<Vec<Versioned<GroupRecord>>> {
        self.inner.groups_for_account(account).await
    }
}

async fn send(
    service: &NaturalRightsService<Arc<RacingStore>, IdentityPrimitives>,
    request: Request,
) -> natural_rights::Response {
    service.handle_request(&request).await.unwrap()
}

#[tokio::test]
async fn test_lost_race_reports_conflict() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let store = Arc::new(RacingStore::new());
    let service = NaturalRightsService::new(
        store.clone(),
        IdentityPrimitives::new(),
        ServiceConfig::default(),
    )
    .await
    .unwrap();

    let alice = TestClient::new("c1");
    let bob = TestClient::new("c2");
    let setup = send(
        &service,
        alice.request(&[
            Action::InitializeAccount(account_payload("a1")),
            Action::CreateGroup(group_payload("g1", "a1")),
        ]),
    )
    .await;
    assert!(setup.all_succeeded(), "{setup:?}");
    assert!(send(&service, bob.request(&[Action::InitializeAccount(account_payload("a2"))]))
        .await
        .all_succeeded());

    let before = store.get_group(&GroupId::from("g1")).await.unwrap().unwrap();

    store.arm();
    let add = Action::AddMemberToGroup(AddMemberToGroupPayload {
        group_id: GroupId::from("g1"),
        account_id: AccountId::from("a2"),
        crypt_transform_key: None,
        can_sign: false,
    });
    let response = send(&service, alice.request(&[add.clone()])).await;

    let result = &response.results[0];
    assert!(!result.success);
    assert_eq!(result.error_kind, Some(ErrorKind::Conflict));
    assert!(result.error.contains("group:g1"), "{}", result.error);

    // Only the competing write landed.
    let after = store.get_group(&GroupId::from("g1")).await.unwrap().unwrap();
    assert_eq!(after.version, before.version + 1);
    assert!(!after.record.is_member(&AccountId::from("a2")));

    // A retry reads the new version and succeeds.
    let response = send(&service, alice.request(&[add])).await;
    assert!(response.all_succeeded(), "{response:?}");
}

#[tokio::test]
async fn test_conflict_does_not_stop_the_batch() {
    let store = Arc::new(RacingStore::new());
    let service = NaturalRightsService::new(
        store.clone(),
        IdentityPrimitives::new(),
        ServiceConfig::default(),
    )
    .await
    .unwrap();

    let alice = TestClient::new("c1");
    let bob = TestClient::new("c2");
    let setup = send(
        &service,
        alice.request(&[
            Action::InitializeAccount(account_payload("a1")),
            Action::CreateGroup(group_payload("g1", "a1")),
        ]),
    )
    .await;
    assert!(setup.all_succeeded(), "{setup:?}");
    assert!(send(&service, bob.request(&[Action::InitializeAccount(account_payload("a2"))]))
        .await
        .all_succeeded());

    let add = |can_sign| {
        Action::AddMemberToGroup(AddMemberToGroupPayload {
            group_id: GroupId::from("g1"),
            account_id: AccountId::from("a2"),
            crypt_transform_key: None,
            can_sign,
        })
    };

    store.arm();
    let response = send(&service, alice.request(&[add(false), add(true)])).await;

    assert_eq!(response.results[0].error_kind, Some(ErrorKind::Conflict));
    assert!(response.results[1].success, "{}", response.results[1].error);

    let group = store.get_group(&GroupId::from("g1")).await.unwrap().unwrap();
    assert!(group.record.members[&AccountId::from("a2")].can_sign);
}

#[tokio::test]
async fn test_admin_demoted_mid_action_cannot_revoke() {
    let store = Arc::new(RacingStore::new());
    let service = NaturalRightsService::new(
        store.clone(),
        IdentityPrimitives::new(),
        ServiceConfig::default(),
    )
    .await
    .unwrap();

    let alice = TestClient::new("c1");
    let bob = TestClient::new("c2");
    assert!(send(&service, bob.request(&[Action::InitializeAccount(account_payload("a2"))]))
        .await
        .all_succeeded());

    let notes = document_payload("notes", "a1", "g1");
    let notes_id = notes.document_id();
    let setup = send(
        &service,
        alice.request(&[
            Action::InitializeAccount(account_payload("a1")),
            Action::CreateGroup(group_payload("g1", "a1")),
            Action::AddAdminToGroup(AddAdminToGroupPayload {
                group_id: GroupId::from("g1"),
                account_id: AccountId::from("a2"),
                enc_crypt_priv_key: group_payload("g1", "a2").enc_crypt_priv_key,
            }),
            Action::CreateDocument(notes),
            Action::GrantAccess(GrantAccessPayload {
                document_id: notes_id.clone(),
                kind: GrantKind::Account,
                id: "a2".into(),
                enc_crypt_priv_key: Some("notes-for-a2".into()),
                can_sign: false,
            }),
        ]),
    )
    .await;
    assert!(setup.all_succeeded(), "{setup:?}");

    // Bob demotes Alice while her revocation is in flight.
    let mut g1 = store.get_group(&GroupId::from("g1")).await.unwrap().unwrap();
    g1.record.admins.remove(&AccountId::from("a1"));
    store.arm_with(WriteBatch::new().update(g1.version, g1.record));

    let revoke = Action::RevokeAccess(RevokeAccessPayload {
        document_id: notes_id.clone(),
        kind: GrantKind::Account,
        id: "a2".into(),
    });
    let response = send(&service, alice.request(&[revoke.clone()])).await;
    assert_eq!(response.results[0].error_kind, Some(ErrorKind::Conflict));
    assert!(response.results[0].error.contains("group:g1"), "{}", response.results[0].error);

    let document = store.get_document(&notes_id).await.unwrap().unwrap();
    assert!(document
        .record
        .grant(&Grantee::account(&AccountId::from("a2")))
        .is_some());

    // Re-evaluated against the new admin set, the revocation is refused.
    let response = send(&service, alice.request(&[revoke])).await;
    assert_eq!(response.results[0].error_kind, Some(ErrorKind::Forbidden));
}
