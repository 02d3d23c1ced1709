//! Strong type definitions for Natural Rights.
//!
//! Identifiers are newtypes over strings so an account id can never be
//! passed where a group or document id is expected. The service treats
//! every key and ciphertext as an opaque string and never parses them.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap a raw identifier.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the raw identifier.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume into the raw identifier.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id! {
    /// Identifier of an account.
    AccountId
}

string_id! {
    /// Identifier of a client device.
    ///
    /// Client ids are self-certifying: the id is the client's signing
    /// public key.
    ClientId
}

string_id! {
    /// Identifier of a group.
    GroupId
}

string_id! {
    /// Identifier of a document.
    DocumentId
}

/// Derivation context for document ids.
const DOCUMENT_ID_CONTEXT: &str = "natural-rights 2024-01-01 document id v1";

impl DocumentId {
    /// Derive the id of a document from its creator and crypt public key.
    ///
    /// Deterministic so that a client can reference a document created
    /// earlier in the same action batch, and so that replaying a
    /// CreateDocument collides with the document it already created.
    pub fn derive(creator: &AccountId, crypt_pub_key: &str) -> Self {
        let mut hasher = blake3::Hasher::new_derive_key(DOCUMENT_ID_CONTEXT);
        hasher.update(&(creator.as_str().len() as u64).to_le_bytes());
        hasher.update(creator.as_str().as_bytes());
        hasher.update(crypt_pub_key.as_bytes());
        Self(hex::encode(hasher.finalize().as_bytes()))
    }
}

/// Kind of principal that can receive a grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GrantKind {
    Account,
    Group,
}

impl fmt::Display for GrantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrantKind::Account => f.write_str("account"),
            GrantKind::Group => f.write_str("group"),
        }
    }
}

/// Kind of entity whose keys can be looked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyKind {
    Account,
    Group,
    Document,
}

impl From<GrantKind> for KeyKind {
    fn from(kind: GrantKind) -> Self {
        match kind {
            GrantKind::Account => KeyKind::Account,
            GrantKind::Group => KeyKind::Group,
        }
    }
}

/// An asymmetric key pair as exchanged with the primitives provider.
///
/// Both halves are opaque strings. Inside the service the private half is
/// only ever held transiently for the service's own signing key.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyPair {
    pub pub_key: String,
    pub priv_key: String,
}

impl KeyPair {
    /// Create a key pair from its two halves.
    pub fn new(pub_key: impl Into<String>, priv_key: impl Into<String>) -> Self {
        Self {
            pub_key: pub_key.into(),
            priv_key: priv_key.into(),
        }
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("pub_key", &self.pub_key)
            .field("priv_key", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_id_deterministic() {
        let creator = AccountId::from("a1");
        let d1 = DocumentId::derive(&creator, "cp");
        let d2 = DocumentId::derive(&creator, "cp");
        assert_eq!(d1, d2);
        assert_eq!(d1.as_str().len(), 64);
    }

    #[test]
    fn test_document_id_length_prefix_separates_fields() {
        // "ab" + "c" must not collide with "a" + "bc"
        let d1 = DocumentId::derive(&AccountId::from("ab"), "c");
        let d2 = DocumentId::derive(&AccountId::from("a"), "bc");
        assert_ne!(d1, d2);
    }

    #[test]
    fn test_ids_serialize_transparently() {
        let id = GroupId::from("g1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"g1\"");
        assert_eq!(format!("{:?}", id), "GroupId(g1)");
    }

    #[test]
    fn test_grant_kind_wire_names() {
        assert_eq!(serde_json::to_string(&GrantKind::Group).unwrap(), "\"group\"");
        let kind: KeyKind = serde_json::from_str("\"document\"").unwrap();
        assert_eq!(kind, KeyKind::Document);
    }

    #[test]
    fn test_keypair_debug_redacts_private_half() {
        let kp = KeyPair::new("pub", "very-secret");
        let debug = format!("{:?}", kp);
        assert!(debug.contains("pub"));
        assert!(!debug.contains("very-secret"));
    }

    proptest::proptest! {
        #[test]
        fn test_document_id_distinct_inputs(
            creator_a in "[a-z0-9]{1,16}",
            creator_b in "[a-z0-9]{1,16}",
            key in "[a-z0-9]{0,32}",
        ) {
            proptest::prop_assume!(creator_a != creator_b);
            let d1 = DocumentId::derive(&AccountId::new(creator_a), &key);
            let d2 = DocumentId::derive(&AccountId::new(creator_b), &key);
            proptest::prop_assert_ne!(d1, d2);
        }
    }
}
