//! Actions: the unit of work in a Natural Rights request.
//!
//! On the wire an action is `{"type": "...", "payload": {...}}` with
//! camelCase payload fields. Each variant pairs the action kind with its
//! own payload type, so handlers never inspect field presence to decide
//! what they were asked to do.

use serde::{Deserialize, Serialize};

use crate::types::{AccountId, ClientId, DocumentId, GrantKind, GroupId, KeyKind};

/// Discriminant of an action or result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionType {
    InitializeAccount,
    Login,
    AuthorizeClient,
    DeauthorizeClient,
    CreateGroup,
    AddMemberToGroup,
    RemoveMemberFromGroup,
    AddAdminToGroup,
    RemoveAdminFromGroup,
    CreateDocument,
    SignDocument,
    GrantAccess,
    DecryptDocument,
    RevokeAccess,
    UpdateDocument,
    GetPubKeys,
    GetKeyPairs,
    /// Any type tag this service does not understand.
    #[serde(other)]
    Unknown,
}

impl ActionType {
    /// Whether a successful action of this type can change which account
    /// the acting client is bound to.
    pub fn rebinds_identity(&self) -> bool {
        matches!(
            self,
            ActionType::InitializeAccount
                | ActionType::AuthorizeClient
                | ActionType::DeauthorizeClient
        )
    }
}

/// Any action supported by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum Action {
    InitializeAccount(InitializeAccountPayload),
    Login(LoginPayload),
    AuthorizeClient(AuthorizeClientPayload),
    DeauthorizeClient(DeauthorizeClientPayload),
    CreateGroup(CreateGroupPayload),
    AddMemberToGroup(AddMemberToGroupPayload),
    RemoveMemberFromGroup(GroupMemberPayload),
    AddAdminToGroup(AddAdminToGroupPayload),
    RemoveAdminFromGroup(GroupMemberPayload),
    CreateDocument(CreateDocumentPayload),
    SignDocument(SignDocumentPayload),
    GrantAccess(GrantAccessPayload),
    DecryptDocument(DocumentRefPayload),
    RevokeAccess(RevokeAccessPayload),
    UpdateDocument(UpdateDocumentPayload),
    GetPubKeys(KeyLookupPayload),
    GetKeyPairs(KeyLookupPayload),
}

impl Action {
    /// The discriminant of this action.
    pub fn action_type(&self) -> ActionType {
        match self {
            Action::InitializeAccount(_) => ActionType::InitializeAccount,
            Action::Login(_) => ActionType::Login,
            Action::AuthorizeClient(_) => ActionType::AuthorizeClient,
            Action::DeauthorizeClient(_) => ActionType::DeauthorizeClient,
            Action::CreateGroup(_) => ActionType::CreateGroup,
            Action::AddMemberToGroup(_) => ActionType::AddMemberToGroup,
            Action::RemoveMemberFromGroup(_) => ActionType::RemoveMemberFromGroup,
            Action::AddAdminToGroup(_) => ActionType::AddAdminToGroup,
            Action::RemoveAdminFromGroup(_) => ActionType::RemoveAdminFromGroup,
            Action::CreateDocument(_) => ActionType::CreateDocument,
            Action::SignDocument(_) => ActionType::SignDocument,
            Action::GrantAccess(_) => ActionType::GrantAccess,
            Action::DecryptDocument(_) => ActionType::DecryptDocument,
            Action::RevokeAccess(_) => ActionType::RevokeAccess,
            Action::UpdateDocument(_) => ActionType::UpdateDocument,
            Action::GetPubKeys(_) => ActionType::GetPubKeys,
            Action::GetKeyPairs(_) => ActionType::GetKeyPairs,
        }
    }

    /// The payload of this action as a JSON value.
    ///
    /// Failed results mirror the payload of the action that failed.
    pub fn payload_value(&self) -> serde_json::Value {
        serde_json::to_value(self)
            .ok()
            .and_then(|mut v| v.get_mut("payload").map(serde_json::Value::take))
            .unwrap_or(serde_json::Value::Null)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Accounts and clients
// ─────────────────────────────────────────────────────────────────────────────

/// Parameters to create a new account and its root document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeAccountPayload {
    pub account_id: AccountId,
    pub sign_pub_key: String,
    pub crypt_pub_key: String,
    pub enc_crypt_priv_key: String,
    pub enc_sign_priv_key: String,
    pub root_doc_crypt_pub_key: String,
    pub root_doc_enc_crypt_priv_key: String,
}

/// Parameters to look up the account bound to the acting client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginPayload {
    pub crypt_pub_key: String,
}

/// Parameters to authorize a client on an account.
///
/// The two shapes are told apart when the body is decoded: a payload that
/// carries the full account bootstrap fields creates the account in the
/// same step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AuthorizeClientPayload {
    NewAccount(AuthorizeNewAccountPayload),
    ExistingAccount(AuthorizeExistingPayload),
}

impl AuthorizeClientPayload {
    /// The client being authorized.
    pub fn client_id(&self) -> &ClientId {
        match self {
            AuthorizeClientPayload::NewAccount(p) => &p.client_id,
            AuthorizeClientPayload::ExistingAccount(p) => &p.client_id,
        }
    }

    /// The account the client is authorized on.
    pub fn account_id(&self) -> &AccountId {
        match self {
            AuthorizeClientPayload::NewAccount(p) => &p.account.account_id,
            AuthorizeClientPayload::ExistingAccount(p) => &p.account_id,
        }
    }
}

/// Authorize a client on an account the actor already owns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizeExistingPayload {
    pub client_id: ClientId,
    pub account_id: AccountId,
    pub crypt_transform_key: String,
}

/// Create an account and authorize a client on it atomically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizeNewAccountPayload {
    pub client_id: ClientId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crypt_transform_key: Option<String>,
    #[serde(flatten)]
    pub account: InitializeAccountPayload,
}

/// Parameters to deauthorize a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DeauthorizeClientPayload {
    /// Deauthorize a named client of an account the actor owns.
    Client(ClientBindingPayload),
    /// Deauthorize the acting client itself.
    Current(CurrentClientPayload),
}

/// Empty payload naming the acting client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CurrentClientPayload {}

/// A client together with the account it is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientBindingPayload {
    pub client_id: ClientId,
    pub account_id: AccountId,
}

// ─────────────────────────────────────────────────────────────────────────────
// Groups
// ─────────────────────────────────────────────────────────────────────────────

/// Parameters to create a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGroupPayload {
    pub group_id: GroupId,
    pub account_id: AccountId,
    #[serde(default)]
    pub sign_pub_key: String,
    pub crypt_pub_key: String,
    pub enc_crypt_priv_key: String,
    pub enc_sign_priv_key: String,
}

/// Parameters to add a member to a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMemberToGroupPayload {
    pub group_id: GroupId,
    pub account_id: AccountId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crypt_transform_key: Option<String>,
    #[serde(default)]
    pub can_sign: bool,
}

/// A group together with one of its members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupMemberPayload {
    pub group_id: GroupId,
    pub account_id: AccountId,
}

/// Parameters to promote a member to admin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddAdminToGroupPayload {
    pub group_id: GroupId,
    pub account_id: AccountId,
    pub enc_crypt_priv_key: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Documents
// ─────────────────────────────────────────────────────────────────────────────

/// Parameters to create a document.
///
/// `crypt_account_id` names the account or group whose key the document
/// private key is encrypted to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDocumentPayload {
    pub crypt_account_id: String,
    pub crypt_pub_key: String,
    pub creator_id: AccountId,
    pub enc_crypt_priv_key: String,
}

impl CreateDocumentPayload {
    /// The id the document will be created under.
    pub fn document_id(&self) -> DocumentId {
        DocumentId::derive(&self.creator_id, &self.crypt_pub_key)
    }
}

/// Parameters to sign hashes on behalf of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignDocumentPayload {
    pub document_id: DocumentId,
    pub hashes: Vec<String>,
}

/// Parameters to grant access to a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantAccessPayload {
    pub document_id: DocumentId,
    pub kind: GrantKind,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enc_crypt_priv_key: Option<String>,
    #[serde(default)]
    pub can_sign: bool,
}

/// A bare reference to a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRefPayload {
    pub document_id: DocumentId,
}

/// Parameters to revoke a grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevokeAccessPayload {
    pub document_id: DocumentId,
    pub kind: GrantKind,
    pub id: String,
}

/// Parameters to rotate a document's crypt key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDocumentPayload {
    pub document_id: DocumentId,
    pub crypt_account_id: String,
    pub crypt_pub_key: String,
    pub enc_crypt_priv_key: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Key lookups
// ─────────────────────────────────────────────────────────────────────────────

/// Parameters to look up the keys of an account, group, or document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyLookupPayload {
    pub kind: KeyKind,
    pub id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_action_wire_shape() {
        let action = Action::Login(LoginPayload {
            crypt_pub_key: "cp1".into(),
        });
        let value = serde_json::to_value(&action).unwrap();
        assert_eq!(
            value,
            json!({"type": "Login", "payload": {"cryptPubKey": "cp1"}})
        );
    }

    #[test]
    fn test_authorize_client_existing_account() {
        let action: Action = serde_json::from_value(json!({
            "type": "AuthorizeClient",
            "payload": {"clientId": "c2", "accountId": "a1", "cryptTransformKey": "tk"}
        }))
        .unwrap();

        match action {
            Action::AuthorizeClient(AuthorizeClientPayload::ExistingAccount(p)) => {
                assert_eq!(p.client_id.as_str(), "c2");
                assert_eq!(p.crypt_transform_key, "tk");
            }
            other => panic!("unexpected action: {:?}", other),
        }
    }

    #[test]
    fn test_authorize_client_new_account() {
        let action: Action = serde_json::from_value(json!({
            "type": "AuthorizeClient",
            "payload": {
                "clientId": "c1",
                "accountId": "a1",
                "signPubKey": "sp1",
                "cryptPubKey": "cp1",
                "encCryptPrivKey": "e1",
                "encSignPrivKey": "e2",
                "rootDocCryptPubKey": "rp1",
                "rootDocEncCryptPrivKey": "re1"
            }
        }))
        .unwrap();

        match action {
            Action::AuthorizeClient(AuthorizeClientPayload::NewAccount(p)) => {
                assert_eq!(p.account.account_id.as_str(), "a1");
                assert_eq!(p.crypt_transform_key, None);
            }
            other => panic!("unexpected action: {:?}", other),
        }
    }

    #[test]
    fn test_deauthorize_shapes() {
        let named: DeauthorizeClientPayload =
            serde_json::from_value(json!({"clientId": "c2", "accountId": "a1"})).unwrap();
        assert!(matches!(named, DeauthorizeClientPayload::Client(_)));

        let current: DeauthorizeClientPayload = serde_json::from_value(json!({})).unwrap();
        assert!(matches!(current, DeauthorizeClientPayload::Current(_)));

        // A half-specified target must not silently become a self-deauth.
        let partial = serde_json::from_value::<DeauthorizeClientPayload>(json!({"clientId": "c2"}));
        assert!(partial.is_err());
    }

    #[test]
    fn test_unknown_type_tag() {
        let ty: ActionType = serde_json::from_value(json!("Teleport")).unwrap();
        assert_eq!(ty, ActionType::Unknown);
        assert!(serde_json::from_value::<Action>(json!({"type": "Teleport", "payload": {}})).is_err());
    }

    #[test]
    fn test_payload_value_mirrors_payload() {
        let action = Action::DecryptDocument(DocumentRefPayload {
            document_id: DocumentId::from("d1"),
        });
        assert_eq!(action.payload_value(), json!({"documentId": "d1"}));
        assert_eq!(action.action_type(), ActionType::DecryptDocument);
    }

    #[test]
    fn test_optional_flags_default() {
        let p: AddMemberToGroupPayload =
            serde_json::from_value(json!({"groupId": "g1", "accountId": "a2"})).unwrap();
        assert!(!p.can_sign);
        assert!(p.crypt_transform_key.is_none());
    }
}
