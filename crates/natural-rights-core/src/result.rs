//! Action results.
//!
//! A handler produces a typed [`ActionOutput`]; the dispatcher flattens it
//! into the wire-level [`ActionResult`]. Callers branch on
//! `(action_type, success)` and never parse `error`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::action::{
    ActionType, AddAdminToGroupPayload, ClientBindingPayload, CreateGroupPayload,
    GrantAccessPayload, GroupMemberPayload, InitializeAccountPayload, RevokeAccessPayload,
    UpdateDocumentPayload,
};
use crate::error::{CoreError, Result};
use crate::types::{AccountId, DocumentId, GroupId, KeyKind};

/// Machine-readable class of a failed action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    Forbidden,
    InvariantViolation,
    Conflict,
    Malformed,
    Internal,
}

/// Successful output of a handler, one variant per action kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ActionOutput {
    InitializeAccount(InitializeAccountPayload),
    Login(LoginResultPayload),
    AuthorizeClient(ClientBindingPayload),
    DeauthorizeClient(ClientBindingPayload),
    CreateGroup(CreateGroupPayload),
    AddMemberToGroup(GroupMembershipPayload),
    RemoveMemberFromGroup(GroupMemberPayload),
    AddAdminToGroup(AddAdminToGroupPayload),
    RemoveAdminFromGroup(GroupMemberPayload),
    CreateDocument(CreateDocumentResultPayload),
    SignDocument(SignDocumentResultPayload),
    GrantAccess(GrantAccessPayload),
    DecryptDocument(DecryptDocumentResultPayload),
    RevokeAccess(RevokeAccessPayload),
    UpdateDocument(UpdateDocumentPayload),
    GetPubKeys(PubKeysPayload),
    GetKeyPairs(KeyPairsPayload),
}

impl ActionOutput {
    /// Flatten into a successful wire result.
    pub fn into_result(self) -> Result<ActionResult> {
        let mut value = serde_json::to_value(&self)?;
        let action_type = serde_json::from_value(value["type"].take())?;
        let payload = value
            .get_mut("payload")
            .map(serde_json::Value::take)
            .unwrap_or(serde_json::Value::Null);

        Ok(ActionResult {
            action_type,
            success: true,
            error: String::new(),
            error_kind: None,
            payload,
        })
    }
}

/// Wire-level result of one action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResult {
    #[serde(rename = "type")]
    pub action_type: ActionType,
    pub success: bool,
    #[serde(default)]
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl ActionResult {
    /// A failed result mirroring the payload of the failed action.
    pub fn failure(
        action_type: ActionType,
        kind: ErrorKind,
        error: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            action_type,
            success: false,
            error: error.into(),
            error_kind: Some(kind),
            payload,
        }
    }

    /// Decode the payload of a successful result.
    pub fn payload_as<T: DeserializeOwned>(&self) -> Result<T> {
        if self.payload.is_null() {
            return Err(CoreError::MissingPayload);
        }
        Ok(serde_json::from_value(self.payload.clone())?)
    }
}

/// Data returned by Login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResultPayload {
    pub account_id: AccountId,
    pub root_document_id: DocumentId,
}

/// Data returned by AddMemberToGroup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupMembershipPayload {
    pub group_id: GroupId,
    pub account_id: AccountId,
    pub can_sign: bool,
}

/// Data returned by CreateDocument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDocumentResultPayload {
    pub document_id: DocumentId,
}

/// Data returned by SignDocument, one signature per requested hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignDocumentResultPayload {
    pub signatures: Vec<String>,
}

/// Data returned by DecryptDocument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecryptDocumentResultPayload {
    pub document_id: DocumentId,
    pub enc_crypt_priv_key: String,
}

/// Data returned by GetPubKeys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PubKeysPayload {
    pub kind: KeyKind,
    pub id: String,
    pub sign_pub_key: String,
    pub crypt_pub_key: String,
}

/// Data returned by GetKeyPairs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyPairsPayload {
    pub kind: KeyKind,
    pub id: String,
    pub sign_pub_key: String,
    pub enc_sign_priv_key: String,
    pub crypt_pub_key: String,
    pub enc_crypt_priv_key: String,
}
