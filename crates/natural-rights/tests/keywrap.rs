//! The full delegation chain with real cryptography.
//!
//! A document key encrypted to a group reaches a member's second device
//! through two transform keys, and only that device's crypt key opens it.

use natural_rights::core::{
    AccountId, Action, AddMemberToGroupPayload, AuthorizeClientPayload, AuthorizeExistingPayload,
    ClientId, CreateDocumentPayload, CreateGroupPayload, DecryptDocumentResultPayload, DocumentId,
    DocumentRefPayload, GroupId, InitializeAccountPayload, KeyPair, Request, Response,
    SignDocumentPayload, SignDocumentResultPayload,
};
use natural_rights::primitives::{KeyWrapPrimitives, Primitives};
use natural_rights::store::MemoryStore;
use natural_rights::{NaturalRightsService, ServiceConfig};

type Service = NaturalRightsService<MemoryStore, KeyWrapPrimitives>;

/// A device holding a signing key; its id is the public half.
struct Device {
    sign: KeyPair,
    crypt: KeyPair,
}

impl Device {
    async fn generate(p: &KeyWrapPrimitives) -> anyhow::Result<Self> {
        Ok(Self {
            sign: p.sign_key_gen().await?,
            crypt: p.crypt_key_gen().await?,
        })
    }

    fn id(&self) -> ClientId {
        ClientId::from(self.sign.pub_key.as_str())
    }

    async fn send(
        &self,
        service: &Service,
        p: &KeyWrapPrimitives,
        actions: &[Action],
    ) -> anyhow::Result<Response> {
        let body = natural_rights::core::encode_actions(actions)?;
        let request = Request {
            client_id: self.id(),
            signature: p.sign(&self.sign, &body).await?,
            body,
        };
        let response = service.handle_request(&request).await?;
        anyhow::ensure!(response.all_succeeded(), "batch failed: {response:?}");
        Ok(response)
    }
}

/// Key material for a new account, with private keys sealed to the
/// account's own crypt key.
struct AccountKeys {
    sign: KeyPair,
    crypt: KeyPair,
    root: KeyPair,
}

impl AccountKeys {
    async fn generate(p: &KeyWrapPrimitives) -> anyhow::Result<Self> {
        Ok(Self {
            sign: p.sign_key_gen().await?,
            crypt: p.crypt_key_gen().await?,
            root: p.crypt_key_gen().await?,
        })
    }

    async fn payload(
        &self,
        p: &KeyWrapPrimitives,
        account: &str,
    ) -> anyhow::Result<InitializeAccountPayload> {
        Ok(InitializeAccountPayload {
            account_id: AccountId::from(account),
            sign_pub_key: self.sign.pub_key.clone(),
            crypt_pub_key: self.crypt.pub_key.clone(),
            enc_crypt_priv_key: p.encrypt(&self.crypt.pub_key, &self.crypt.priv_key, &self.sign).await?,
            enc_sign_priv_key: p.encrypt(&self.crypt.pub_key, &self.sign.priv_key, &self.sign).await?,
            root_doc_crypt_pub_key: self.root.pub_key.clone(),
            root_doc_enc_crypt_priv_key: p
                .encrypt(&self.crypt.pub_key, &self.root.priv_key, &self.sign)
                .await?,
        })
    }
}

#[tokio::test]
async fn test_group_document_reaches_second_device() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let p = KeyWrapPrimitives::new();
    let service: Service =
        NaturalRightsService::new(MemoryStore::new(), p, ServiceConfig::default()).await?;

    let alice = Device::generate(&p).await?;
    let alice_keys = AccountKeys::generate(&p).await?;
    let bob = Device::generate(&p).await?;
    let bob_phone = Device::generate(&p).await?;
    let bob_keys = AccountKeys::generate(&p).await?;

    alice
        .send(
            &service,
            &p,
            &[Action::InitializeAccount(alice_keys.payload(&p, "a1").await?)],
        )
        .await?;
    bob.send(
        &service,
        &p,
        &[
            Action::InitializeAccount(bob_keys.payload(&p, "a2").await?),
            Action::AuthorizeClient(AuthorizeClientPayload::ExistingAccount(
                AuthorizeExistingPayload {
                    client_id: bob_phone.id(),
                    account_id: AccountId::from("a2"),
                    crypt_transform_key: p
                        .crypt_transform_key_gen(&bob_keys.crypt, &bob_phone.crypt.pub_key, &bob_keys.sign)
                        .await?,
                },
            )),
        ],
    )
    .await?;

    // Alice builds a group, adds Bob, and files a document under it.
    let group_crypt = p.crypt_key_gen().await?;
    let group_sign = p.sign_key_gen().await?;
    let doc_crypt = p.crypt_key_gen().await?;
    let document = CreateDocumentPayload {
        crypt_account_id: "g1".into(),
        crypt_pub_key: doc_crypt.pub_key.clone(),
        creator_id: AccountId::from("a1"),
        enc_crypt_priv_key: p
            .encrypt(&group_crypt.pub_key, &doc_crypt.priv_key, &alice_keys.sign)
            .await?,
    };
    let document_id: DocumentId = document.document_id();

    alice
        .send(
            &service,
            &p,
            &[
                Action::CreateGroup(CreateGroupPayload {
                    group_id: GroupId::from("g1"),
                    account_id: AccountId::from("a1"),
                    sign_pub_key: group_sign.pub_key.clone(),
                    crypt_pub_key: group_crypt.pub_key.clone(),
                    enc_crypt_priv_key: p
                        .encrypt(&alice_keys.crypt.pub_key, &group_crypt.priv_key, &alice_keys.sign)
                        .await?,
                    enc_sign_priv_key: p
                        .encrypt(&alice_keys.crypt.pub_key, &group_sign.priv_key, &alice_keys.sign)
                        .await?,
                }),
                Action::AddMemberToGroup(AddMemberToGroupPayload {
                    group_id: GroupId::from("g1"),
                    account_id: AccountId::from("a2"),
                    crypt_transform_key: Some(
                        p.crypt_transform_key_gen(&group_crypt, &bob_keys.crypt.pub_key, &alice_keys.sign)
                            .await?,
                    ),
                    can_sign: true,
                }),
                Action::CreateDocument(document),
            ],
        )
        .await?;

    let response = bob_phone
        .send(
            &service,
            &p,
            &[
                Action::DecryptDocument(DocumentRefPayload {
                    document_id: document_id.clone(),
                }),
                Action::SignDocument(SignDocumentPayload {
                    document_id: document_id.clone(),
                    hashes: vec!["abc123".into()],
                }),
            ],
        )
        .await?;

    let decrypted: DecryptDocumentResultPayload = response.results[0].payload_as()?;
    assert_eq!(p.decrypt(&bob_phone.crypt, &decrypted.enc_crypt_priv_key).await?, doc_crypt.priv_key);

    // Bob's laptop was never given a crypt key path, and the account key
    // does not open a ciphertext already carried down to the phone.
    assert!(p.decrypt(&bob.crypt, &decrypted.enc_crypt_priv_key).await.is_err());

    let signed: SignDocumentResultPayload = response.results[1].payload_as()?;
    assert!(
        p.verify(
            service.sign_pub_key(),
            &signed.signatures[0],
            &format!("{document_id}:abc123")
        )
        .await?
    );
    Ok(())
}

#[tokio::test]
async fn test_forged_signature_is_rejected() -> anyhow::Result<()> {
    let p = KeyWrapPrimitives::new();
    let service: Service =
        NaturalRightsService::new(MemoryStore::new(), p, ServiceConfig::default()).await?;
    let device = Device::generate(&p).await?;
    let impostor = Device::generate(&p).await?;

    let body = natural_rights::core::encode_actions(&[])?;
    let request = Request {
        client_id: device.id(),
        signature: p.sign(&impostor.sign, &body).await?,
        body,
    };
    assert!(service.handle_request(&request).await.is_err());
    assert!(service.store().is_empty()?);
    Ok(())
}
