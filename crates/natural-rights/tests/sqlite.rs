//! The service over a SQLite-backed graph survives a restart.

use std::sync::Arc;

use natural_rights::core::{
    Action, AddMemberToGroupPayload, DecryptDocumentResultPayload, DocumentRefPayload,
};
use natural_rights::primitives::IdentityPrimitives;
use natural_rights::store::SqliteStore;
use natural_rights::{ErrorKind, NaturalRightsService, ServiceConfig};
use natural_rights_testkit::{
    account_payload, document_payload, group_payload, transform_key, TestClient,
};

type Service = NaturalRightsService<SqliteStore, Arc<IdentityPrimitives>>;

fn open_service(path: &std::path::Path) -> anyhow::Result<Service> {
    Ok(NaturalRightsService::with_sign_keypair(
        SqliteStore::open(path)?,
        Arc::new(IdentityPrimitives::new()),
        IdentityPrimitives::sign_keypair("service"),
        ServiceConfig::default(),
    ))
}

#[tokio::test]
async fn test_graph_persists_across_restart() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let dir = tempfile::tempdir()?;
    let path = dir.path().join("rights.db");
    let alice = TestClient::new("c1");
    let bob = TestClient::new("c2");
    let notes = document_payload("notes", "a1", "g1");

    {
        let service = open_service(&path)?;
        for (client, account) in [(&alice, "a1"), (&bob, "a2")] {
            let response = service
                .handle_request(
                    &client.request(&[Action::InitializeAccount(account_payload(account))]),
                )
                .await?;
            assert!(response.all_succeeded(), "{response:?}");
        }

        let response = service
            .handle_request(&alice.request(&[
                Action::CreateGroup(group_payload("g1", "a1")),
                Action::AddMemberToGroup(AddMemberToGroupPayload {
                    group_id: "g1".into(),
                    account_id: "a2".into(),
                    crypt_transform_key: Some(transform_key("g1", "a2")),
                    can_sign: false,
                }),
                Action::CreateDocument(notes.clone()),
            ]))
            .await?;
        assert!(response.all_succeeded(), "{response:?}");
    }

    let service = open_service(&path)?;
    let decrypt = Action::DecryptDocument(DocumentRefPayload {
        document_id: notes.document_id(),
    });

    let response = service.handle_request(&bob.request(&[decrypt.clone()])).await?;
    let result: DecryptDocumentResultPayload = response.results[0].payload_as()?;
    assert_eq!(result.enc_crypt_priv_key, notes.enc_crypt_priv_key);

    // Bookkeeping survived too: replays still collide.
    let response = service
        .handle_request(&alice.request(&[Action::CreateDocument(notes)]))
        .await?;
    assert_eq!(response.results[0].error_kind, Some(ErrorKind::AlreadyExists));

    let stranger = TestClient::new("c3");
    let response = service.handle_request(&stranger.request(&[decrypt])).await?;
    assert_eq!(response.results[0].error_kind, Some(ErrorKind::Forbidden));
    Ok(())
}
