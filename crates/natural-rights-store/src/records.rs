//! Entity records of the key graph.
//!
//! Every entity is stored as a versioned record keyed by `(kind, id)`.
//! Edges live inside the record that owns them: a client's binding to its
//! account, a group's member and admin maps, a document's grants. This
//! keeps every handler mutation a write to a small, fixed set of records.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use natural_rights_core::{AccountId, ClientId, DocumentId, GrantKind, GroupId};

/// Kind of a stored record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RecordKind {
    Account,
    Client,
    Group,
    Document,
}

impl RecordKind {
    /// Stable name used as the storage discriminator.
    pub const fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Account => "account",
            RecordKind::Client => "client",
            RecordKind::Group => "group",
            RecordKind::Document => "document",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Storage key of a record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordKey {
    pub kind: RecordKind,
    pub id: String,
}

impl RecordKey {
    pub fn new(kind: RecordKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }

    pub fn account(id: &AccountId) -> Self {
        Self::new(RecordKind::Account, id.as_str())
    }

    pub fn client(id: &ClientId) -> Self {
        Self::new(RecordKind::Client, id.as_str())
    }

    pub fn group(id: &GroupId) -> Self {
        Self::new(RecordKind::Group, id.as_str())
    }

    pub fn document(id: &DocumentId) -> Self {
        Self::new(RecordKind::Document, id.as_str())
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// An account and its key material.
///
/// The private keys are stored only as ciphertexts produced by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    pub id: AccountId,
    pub sign_pub_key: String,
    pub crypt_pub_key: String,
    pub enc_sign_priv_key: String,
    pub enc_crypt_priv_key: String,
    pub root_document_id: DocumentId,
}

/// The edge from a client to the account it acts for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientBinding {
    pub account_id: AccountId,

    /// Account→client transform key. `None` for the owner client, which
    /// generated the account keys itself.
    pub crypt_transform_key: Option<String>,
}

/// A client device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRecord {
    pub id: ClientId,

    /// Current signing public key, checked against every request.
    pub sign_pub_key: String,

    pub binding: Option<ClientBinding>,

    /// Set once the client has been deauthorized.
    pub revoked: bool,
}

impl ClientRecord {
    /// A new unbound client whose id is its signing public key.
    pub fn enrolled(id: ClientId) -> Self {
        Self {
            sign_pub_key: id.as_str().to_owned(),
            id,
            binding: None,
            revoked: false,
        }
    }

    pub fn account_id(&self) -> Option<&AccountId> {
        self.binding.as_ref().map(|b| &b.account_id)
    }
}

/// A member's edge into a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    /// Group→account transform key.
    pub crypt_transform_key: Option<String>,
    pub can_sign: bool,
}

/// A group of accounts sharing a key pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRecord {
    pub id: GroupId,
    pub sign_pub_key: String,
    pub crypt_pub_key: String,
    pub enc_sign_priv_key: String,
    pub enc_crypt_priv_key: String,
    pub members: BTreeMap<AccountId, Membership>,

    /// Admin account → the group's crypt private key encrypted to that admin.
    pub admins: BTreeMap<AccountId, String>,
}

impl GroupRecord {
    pub fn is_admin(&self, account: &AccountId) -> bool {
        self.admins.contains_key(account)
    }

    pub fn is_member(&self, account: &AccountId) -> bool {
        self.members.contains_key(account)
    }
}

/// The principal a grant or crypt ownership points at.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Grantee {
    pub kind: GrantKind,
    pub id: String,
}

impl Grantee {
    pub fn new(kind: GrantKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }

    pub fn account(id: &AccountId) -> Self {
        Self::new(GrantKind::Account, id.as_str())
    }

    pub fn group(id: &GroupId) -> Self {
        Self::new(GrantKind::Group, id.as_str())
    }
}

impl fmt::Display for Grantee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// Capabilities a grantee holds on a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    pub grantee: Grantee,

    /// The document's crypt private key encrypted to the grantee.
    pub enc_crypt_priv_key: Option<String>,

    pub can_sign: bool,
}

impl Grant {
    pub fn can_decrypt(&self) -> bool {
        self.enc_crypt_priv_key.is_some()
    }
}

/// A document's key and its grants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: DocumentId,
    pub creator_id: AccountId,

    /// The account or group holding the owner grant.
    pub crypt_owner: Grantee,

    pub crypt_pub_key: String,
    pub grants: Vec<Grant>,
}

impl DocumentRecord {
    pub fn grant(&self, grantee: &Grantee) -> Option<&Grant> {
        self.grants.iter().find(|g| &g.grantee == grantee)
    }

    pub fn grant_mut(&mut self, grantee: &Grantee) -> Option<&mut Grant> {
        self.grants.iter_mut().find(|g| &g.grantee == grantee)
    }

    /// Remove a grant, returning it if present.
    pub fn remove_grant(&mut self, grantee: &Grantee) -> Option<Grant> {
        let index = self.grants.iter().position(|g| &g.grantee == grantee)?;
        Some(self.grants.remove(index))
    }

    pub fn owner_grant(&self) -> Option<&Grant> {
        self.grant(&self.crypt_owner)
    }
}

/// Any stored record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Record {
    Account(AccountRecord),
    Client(ClientRecord),
    Group(GroupRecord),
    Document(DocumentRecord),
}

impl Record {
    pub fn key(&self) -> RecordKey {
        match self {
            Record::Account(r) => RecordKey::account(&r.id),
            Record::Client(r) => RecordKey::client(&r.id),
            Record::Group(r) => RecordKey::group(&r.id),
            Record::Document(r) => RecordKey::document(&r.id),
        }
    }

    pub fn kind(&self) -> RecordKind {
        match self {
            Record::Account(_) => RecordKind::Account,
            Record::Client(_) => RecordKind::Client,
            Record::Group(_) => RecordKind::Group,
            Record::Document(_) => RecordKind::Document,
        }
    }
}

impl From<AccountRecord> for Record {
    fn from(r: AccountRecord) -> Self {
        Record::Account(r)
    }
}

impl From<ClientRecord> for Record {
    fn from(r: ClientRecord) -> Self {
        Record::Client(r)
    }
}

impl From<GroupRecord> for Record {
    fn from(r: GroupRecord) -> Self {
        Record::Group(r)
    }
}

impl From<DocumentRecord> for Record {
    fn from(r: DocumentRecord) -> Self {
        Record::Document(r)
    }
}

/// A record together with the version it was read at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Versioned<T> {
    pub version: u64,
    pub record: T,
}

impl<T> Versioned<T> {
    pub fn new(version: u64, record: T) -> Self {
        Self { version, record }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Versioned<U> {
        Versioned {
            version: self.version,
            record: f(self.record),
        }
    }
}
