//! Graph invariants under arbitrary action batches.

use proptest::prelude::*;

use natural_rights::core::{DocumentId, GroupId};
use natural_rights::store::GraphStoreExt;
use natural_rights::ErrorKind;
use natural_rights_testkit::{batch, document_payload, root_document_id, TestClient, TestFixture};

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
}

fn known_documents() -> Vec<DocumentId> {
    let mut ids = Vec::new();
    for account in ["a1", "a2", "a3"] {
        ids.push(root_document_id(account));
        for name in ["d1", "d2"] {
            ids.push(document_payload(name, account, account).document_id());
        }
    }
    ids
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn batches_keep_the_graph_consistent(
        first in batch(12),
        second in batch(12),
    ) {
        runtime().block_on(async {
            let fixture = TestFixture::new();
            let c1 = TestClient::new("c1");
            let c2 = TestClient::new("c2");

            for (client, actions) in [(&c1, first), (&c2, second)] {
                let count = actions.len();
                let response = fixture.send(client, actions).await;

                // One result per action, and failures are classified.
                prop_assert_eq!(response.results.len(), count);
                for result in &response.results {
                    if !result.success {
                        prop_assert!(result.error_kind.is_some());
                        prop_assert_ne!(result.error_kind, Some(ErrorKind::Internal));
                        prop_assert!(!result.error.is_empty());
                    }
                }
            }

            // Every group keeps an admin, and every admin is a member.
            for group in ["g1", "g2"] {
                if let Some(group) = fixture.store.get_group(&GroupId::from(group)).await.unwrap() {
                    prop_assert!(!group.record.admins.is_empty());
                    for admin in group.record.admins.keys() {
                        prop_assert!(group.record.is_member(admin));
                    }
                }
            }

            // Every document keeps a decryptable owner grant.
            for id in known_documents() {
                if let Some(document) = fixture.store.get_document(&id).await.unwrap() {
                    let owner = document.record.owner_grant();
                    prop_assert!(owner.is_some_and(|g| g.can_decrypt()), "{:?}", document);
                }
            }

            // Clients stay bound to at most one existing account.
            for client in [&c1, &c2] {
                let Some(record) = fixture.store.get_client(&client.id).await.unwrap() else {
                    continue;
                };
                if let Some(account) = record.record.account_id() {
                    prop_assert!(fixture.store.get_account(account).await.unwrap().is_some());
                }
            }
            Ok::<(), TestCaseError>(())
        })?;
    }
}
