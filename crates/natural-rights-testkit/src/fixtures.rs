//! Test fixtures and helpers.
//!
//! Everything here runs on [`IdentityPrimitives`], so keys are readable
//! names and "ciphertexts" are the plaintext they stand for. A client id
//! doubles as its signing public key, which is what lets an unknown client
//! enroll on its first request.

use std::sync::Arc;

use natural_rights::core::{
    encode_actions, AccountId, Action, ClientId, CreateDocumentPayload, CreateGroupPayload,
    DocumentId, GroupId, InitializeAccountPayload, KeyPair, Request, Response,
};
use natural_rights::primitives::IdentityPrimitives;
use natural_rights::store::MemoryStore;
use natural_rights::{NaturalRightsService, ServiceConfig};

/// A service over shared handles, so tests can inspect both sides.
pub type TestService = NaturalRightsService<Arc<MemoryStore>, Arc<IdentityPrimitives>>;

/// A client device that signs its own requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestClient {
    pub id: ClientId,
}

impl TestClient {
    pub fn new(name: &str) -> Self {
        Self {
            id: ClientId::from(format!("client-{name}")),
        }
    }

    /// The client's crypt key pair.
    pub fn crypt_keypair(&self) -> KeyPair {
        IdentityPrimitives::crypt_keypair(self.id.as_str())
    }

    /// Sign an arbitrary body.
    pub fn sign(&self, body: &str) -> Request {
        Request {
            client_id: self.id.clone(),
            signature: IdentityPrimitives::signature(self.id.as_str(), body),
            body: body.to_owned(),
        }
    }

    /// Encode and sign a batch of actions.
    pub fn request(&self, actions: &[Action]) -> Request {
        let body = encode_actions(actions).expect("actions always encode");
        self.sign(&body)
    }
}

/// A service with an in-memory graph and identity primitives.
pub struct TestFixture {
    pub service: TestService,
    pub store: Arc<MemoryStore>,
    pub primitives: Arc<IdentityPrimitives>,
}

impl TestFixture {
    pub fn new() -> Self {
        Self::with_config(ServiceConfig::default())
    }

    pub fn with_config(config: ServiceConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let primitives = Arc::new(IdentityPrimitives::new());
        let service = NaturalRightsService::with_sign_keypair(
            store.clone(),
            primitives.clone(),
            IdentityPrimitives::sign_keypair("service"),
            config,
        );
        Self {
            service,
            store,
            primitives,
        }
    }

    /// Send a batch and return the response.
    ///
    /// Panics if the request itself is rejected; action failures are in
    /// the response.
    pub async fn send(&self, client: &TestClient, actions: Vec<Action>) -> Response {
        self.service
            .handle_request(&client.request(&actions))
            .await
            .expect("request accepted")
    }

    /// Create `account` and bind `client` to it as its owner client.
    pub async fn bootstrap(&self, client: &TestClient, account: &str) -> Response {
        let response = self
            .send(client, vec![Action::InitializeAccount(account_payload(account))])
            .await;
        assert!(response.all_succeeded(), "bootstrap failed: {response:?}");
        response
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// An InitializeAccount payload with readable identity keys.
pub fn account_payload(account: &str) -> InitializeAccountPayload {
    let crypt = IdentityPrimitives::crypt_keypair(account);
    let sign = IdentityPrimitives::sign_keypair(account);
    let root = IdentityPrimitives::crypt_keypair(&format!("{account}-root"));

    InitializeAccountPayload {
        account_id: AccountId::from(account),
        sign_pub_key: sign.pub_key,
        crypt_pub_key: crypt.pub_key,
        enc_crypt_priv_key: crypt.priv_key,
        enc_sign_priv_key: sign.priv_key,
        root_doc_crypt_pub_key: root.pub_key,
        root_doc_enc_crypt_priv_key: root.priv_key,
    }
}

/// The root document id of an account created from [`account_payload`].
pub fn root_document_id(account: &str) -> DocumentId {
    let payload = account_payload(account);
    DocumentId::derive(&payload.account_id, &payload.root_doc_crypt_pub_key)
}

/// A CreateGroup payload whose admin copy is the group's private key.
pub fn group_payload(group: &str, admin: &str) -> CreateGroupPayload {
    let crypt = IdentityPrimitives::crypt_keypair(group);
    let sign = IdentityPrimitives::sign_keypair(group);

    CreateGroupPayload {
        group_id: GroupId::from(group),
        account_id: AccountId::from(admin),
        sign_pub_key: sign.pub_key,
        crypt_pub_key: crypt.pub_key,
        enc_crypt_priv_key: crypt.priv_key,
        enc_sign_priv_key: sign.priv_key,
    }
}

/// A CreateDocument payload. The document key is named after `name`.
pub fn document_payload(name: &str, creator: &str, crypt_account_id: &str) -> CreateDocumentPayload {
    let crypt = IdentityPrimitives::crypt_keypair(&format!("doc-{name}"));

    CreateDocumentPayload {
        crypt_account_id: crypt_account_id.to_owned(),
        crypt_pub_key: crypt.pub_key,
        creator_id: AccountId::from(creator),
        enc_crypt_priv_key: crypt.priv_key,
    }
}

/// The identity transform key from one named crypt key to another.
pub fn transform_key(from: &str, to: &str) -> String {
    IdentityPrimitives::transform_key(
        &IdentityPrimitives::crypt_keypair(from).pub_key,
        &IdentityPrimitives::crypt_keypair(to).pub_key,
    )
}
