//! Capability reachability.
//!
//! Authorization is a fresh breadth-first walk over the key graph for every
//! action: `Client → Account` through the client binding, then
//! `Account → Group` through memberships. Each principal reached carries
//! the transform keys that lead from it back down to the client, and
//! whether the actor controls its private key. Document checks then look
//! for a grant held by any reached principal.
//!
//! Each principal also records the versions of the client and group
//! records it was derived from. Handlers pin those versions in their
//! commit, so a binding or admin change that lands between the walk and the
//! write turns the write into a conflict.
//!
//! Groups are never members of other groups, so the walk is at most two
//! edges deep before the final document edge. It is still bounded by the
//! configured depth and tracks visited principals.

use std::collections::{HashSet, VecDeque};

use natural_rights_core::{AccountId, GrantKind, GroupId};
use natural_rights_store::{
    DocumentRecord, Grant, Grantee, GraphStore, GraphStoreExt, Guard, RecordKey,
    Result as StoreResult,
};

use crate::auth::ActingIdentity;

/// A principal the acting client can act as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub grantee: Grantee,

    /// Transform keys from this principal down to the client, outermost
    /// first. `None` marks an edge without a transform key.
    pub transforms: Vec<Option<String>>,

    /// Whether the actor holds this principal's private key: its own
    /// account, or a group it administers.
    pub controls: bool,

    /// Whether signing through this principal is allowed.
    pub can_sign: bool,

    /// Edges walked from the client.
    pub depth: usize,

    /// Records this principal was reached through, at the versions read.
    pub guards: Vec<Guard>,
}

impl Principal {
    /// Whether a ciphertext for this principal can be carried all the way
    /// down to the client.
    pub fn fully_transformable(&self) -> bool {
        self.transforms.iter().all(Option::is_some)
    }
}

/// Everything the acting client can reach for one action.
#[derive(Debug, Clone)]
pub struct Reach {
    account_id: Option<AccountId>,
    binding: Option<Guard>,
    principals: Vec<Principal>,
}

impl Reach {
    /// Walk the graph from the acting client.
    pub async fn resolve<S: GraphStore + ?Sized>(
        store: &S,
        identity: &ActingIdentity,
        max_depth: usize,
    ) -> StoreResult<Self> {
        let mut reach = Reach {
            account_id: identity.account_id.clone(),
            binding: None,
            principals: Vec::new(),
        };

        let Some(account_id) = identity.account_id.clone() else {
            return Ok(reach);
        };

        let client = store.get_client(&identity.client_id).await?;
        reach.binding = client.as_ref().map(|c| Guard {
            key: RecordKey::client(&identity.client_id),
            version: c.version,
        });
        let binding_key = client
            .and_then(|c| c.record.binding)
            .filter(|b| b.account_id == account_id)
            .and_then(|b| b.crypt_transform_key);

        let mut visited = HashSet::new();
        let mut queue = VecDeque::new();
        queue.push_back(Principal {
            grantee: Grantee::account(&account_id),
            transforms: vec![binding_key],
            controls: true,
            can_sign: true,
            depth: 1,
            guards: reach.binding.iter().cloned().collect(),
        });

        while let Some(principal) = queue.pop_front() {
            // A principal is only useful if a document edge still fits.
            if principal.depth + 1 > max_depth || !visited.insert(principal.grantee.clone()) {
                continue;
            }

            if principal.grantee.kind == GrantKind::Account {
                let account = AccountId::new(principal.grantee.id.clone());
                for group in store.groups_for_account(&account).await? {
                    let Some(membership) = group.record.members.get(&account) else {
                        continue;
                    };

                    let mut transforms = vec![membership.crypt_transform_key.clone()];
                    transforms.extend(principal.transforms.iter().cloned());

                    let mut guards = principal.guards.clone();
                    guards.push(Guard {
                        key: RecordKey::group(&group.record.id),
                        version: group.version,
                    });

                    queue.push_back(Principal {
                        grantee: Grantee::group(&group.record.id),
                        transforms,
                        controls: principal.controls && group.record.is_admin(&account),
                        can_sign: principal.can_sign && membership.can_sign,
                        depth: principal.depth + 1,
                        guards,
                    });
                }
            }

            reach.principals.push(principal);
        }

        Ok(reach)
    }

    /// The acting account, if the client is bound.
    pub fn account_id(&self) -> Option<&AccountId> {
        self.account_id.as_ref()
    }

    pub fn principals(&self) -> &[Principal] {
        &self.principals
    }

    pub fn principal(&self, grantee: &Grantee) -> Option<&Principal> {
        self.principals.iter().find(|p| &p.grantee == grantee)
    }

    /// The acting client's record at the version the walk read.
    pub fn binding_guard(&self) -> Option<Guard> {
        self.binding.clone()
    }

    /// Guards for the records through which `grantee` was reached.
    pub fn guards_for(&self, grantee: &Grantee) -> Vec<Guard> {
        self.principal(grantee)
            .map(|p| p.guards.clone())
            .unwrap_or_default()
    }

    /// Whether the actor holds the private key of `grantee`.
    pub fn controls(&self, grantee: &Grantee) -> bool {
        self.principal(grantee).is_some_and(|p| p.controls)
    }

    /// Whether the actor administers a group.
    pub fn administers_group(&self, group: &GroupId) -> bool {
        self.controls(&Grantee::group(group))
    }

    /// Whether the actor administers a document: it controls the document's
    /// crypt owner.
    pub fn administers(&self, document: &DocumentRecord) -> bool {
        self.controls(&document.crypt_owner)
    }

    /// The best grant through which the actor can decrypt `document`.
    ///
    /// Paths that can be transformed all the way to the client win over
    /// ones that stop early; among those, shorter paths win.
    pub fn decrypt_path<'a>(
        &'a self,
        document: &'a DocumentRecord,
    ) -> Option<(&'a Principal, &'a Grant)> {
        self.principals
            .iter()
            .filter_map(|p| {
                document
                    .grant(&p.grantee)
                    .filter(|g| g.can_decrypt())
                    .map(|g| (p, g))
            })
            .min_by_key(|(p, _)| (!p.fully_transformable(), p.transforms.len()))
    }

    pub fn can_decrypt(&self, document: &DocumentRecord) -> bool {
        self.decrypt_path(document).is_some()
    }

    /// A reached principal holding a sign capability on `document`.
    pub fn sign_principal(&self, document: &DocumentRecord) -> Option<&Principal> {
        self.principals.iter().find(|p| {
            p.can_sign && document.grant(&p.grantee).is_some_and(|g| g.can_sign)
        })
    }

    pub fn can_sign(&self, document: &DocumentRecord) -> bool {
        self.sign_principal(document).is_some()
    }
}
