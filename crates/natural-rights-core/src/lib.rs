//! # Natural Rights Core
//!
//! Shared vocabulary for the Natural Rights service: identifiers, key
//! pairs, the action and result sum types, and the signed request envelope.
//!
//! This crate contains no I/O, no storage, and no cryptography beyond
//! deterministic id derivation.
//!
//! ## Key Types
//!
//! - [`Action`] - One operation in a request batch, tagged by [`ActionType`]
//! - [`ActionOutput`] - Typed successful output of a handler
//! - [`ActionResult`] - Wire-level result with `(type, success, error, payload)`
//! - [`Request`] / [`Response`] - The signed envelope and its answer
//! - [`DocumentId::derive`] - Deterministic document id derivation

pub mod action;
pub mod error;
pub mod request;
pub mod result;
pub mod types;

pub use action::{
    Action, ActionType, AddAdminToGroupPayload, AddMemberToGroupPayload, AuthorizeClientPayload,
    AuthorizeExistingPayload, AuthorizeNewAccountPayload, ClientBindingPayload,
    CreateDocumentPayload, CreateGroupPayload, CurrentClientPayload, DeauthorizeClientPayload,
    DocumentRefPayload, GrantAccessPayload, GroupMemberPayload, InitializeAccountPayload,
    KeyLookupPayload, LoginPayload, RevokeAccessPayload, SignDocumentPayload,
    UpdateDocumentPayload,
};
pub use error::{CoreError, Result};
pub use request::{decode_action, decode_actions, encode_actions, raw_action_type, Request, Response};
pub use result::{
    ActionOutput, ActionResult, CreateDocumentResultPayload, DecryptDocumentResultPayload,
    ErrorKind, GroupMembershipPayload, KeyPairsPayload, LoginResultPayload, PubKeysPayload,
    SignDocumentResultPayload,
};
pub use types::{AccountId, ClientId, DocumentId, GrantKind, GroupId, KeyKind, KeyPair};
