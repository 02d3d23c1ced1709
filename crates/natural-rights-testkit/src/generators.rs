//! Proptest generators for property-based testing.
//!
//! Ids are drawn from small pools so that generated batches keep running
//! into each other: the same account gets created twice, a grant names a
//! group that exists, a revoke hits a grant that was just made.

use proptest::prelude::*;

use natural_rights::core::{
    AccountId, Action, AddAdminToGroupPayload, AddMemberToGroupPayload, ClientBindingPayload,
    ClientId, CurrentClientPayload, DeauthorizeClientPayload, DocumentId, DocumentRefPayload,
    GrantAccessPayload, GrantKind, GroupId, GroupMemberPayload, KeyKind, KeyLookupPayload,
    LoginPayload, RevokeAccessPayload, SignDocumentPayload,
};
use natural_rights::primitives::IdentityPrimitives;

use crate::fixtures::{account_payload, document_payload, group_payload, root_document_id};

const ACCOUNTS: &[&str] = &["a1", "a2", "a3"];
const GROUPS: &[&str] = &["g1", "g2"];
const DOCUMENTS: &[&str] = &["d1", "d2"];
const CLIENTS: &[&str] = &["client-c1", "client-c2"];

/// An account name from the pool.
pub fn account_name() -> impl Strategy<Value = &'static str> {
    prop::sample::select(ACCOUNTS)
}

/// A group name from the pool.
pub fn group_name() -> impl Strategy<Value = &'static str> {
    prop::sample::select(GROUPS)
}

pub fn account_id() -> impl Strategy<Value = AccountId> {
    account_name().prop_map(AccountId::from)
}

pub fn group_id() -> impl Strategy<Value = GroupId> {
    group_name().prop_map(GroupId::from)
}

/// A client id; most come from the pool, some are fresh.
pub fn client_id() -> impl Strategy<Value = ClientId> {
    prop_oneof![
        4 => prop::sample::select(CLIENTS).prop_map(ClientId::from),
        1 => "client-[a-z]{4}".prop_map(ClientId::from),
    ]
}

pub fn grant_kind() -> impl Strategy<Value = GrantKind> {
    prop_oneof![Just(GrantKind::Account), Just(GrantKind::Group)]
}

pub fn key_kind() -> impl Strategy<Value = KeyKind> {
    prop_oneof![
        Just(KeyKind::Account),
        Just(KeyKind::Group),
        Just(KeyKind::Document),
    ]
}

/// A grantee of either kind, named from the pools.
pub fn grantee() -> impl Strategy<Value = (GrantKind, String)> {
    prop_oneof![
        account_name().prop_map(|a| (GrantKind::Account, a.to_owned())),
        group_name().prop_map(|g| (GrantKind::Group, g.to_owned())),
    ]
}

/// A document id: a root document or one made by [`document_payload`].
pub fn document_id() -> impl Strategy<Value = DocumentId> {
    prop_oneof![
        account_name().prop_map(root_document_id),
        (prop::sample::select(DOCUMENTS), account_name())
            .prop_map(|(d, a)| document_payload(d, a, a).document_id()),
    ]
}

/// Any action, with payloads referencing the id pools.
pub fn action() -> impl Strategy<Value = Action> {
    prop_oneof![account_action(), group_action(), document_action()]
}

fn account_action() -> impl Strategy<Value = Action> {
    prop_oneof![
        account_name().prop_map(|a| Action::InitializeAccount(account_payload(a))),
        account_name().prop_map(|a| Action::Login(LoginPayload {
            crypt_pub_key: IdentityPrimitives::crypt_keypair(a).pub_key,
        })),
        (client_id(), account_id()).prop_map(|(client_id, account_id)| {
            Action::DeauthorizeClient(DeauthorizeClientPayload::Client(ClientBindingPayload {
                client_id,
                account_id,
            }))
        }),
        Just(Action::DeauthorizeClient(DeauthorizeClientPayload::Current(
            CurrentClientPayload {}
        ))),
    ]
}

fn group_action() -> impl Strategy<Value = Action> {
    prop_oneof![
        (group_name(), account_name()).prop_map(|(g, a)| Action::CreateGroup(group_payload(g, a))),
        (group_id(), account_id(), any::<bool>()).prop_map(|(group_id, account_id, can_sign)| {
            Action::AddMemberToGroup(AddMemberToGroupPayload {
                group_id,
                account_id,
                crypt_transform_key: None,
                can_sign,
            })
        }),
        (group_id(), account_id()).prop_map(|(group_id, account_id)| {
            Action::RemoveMemberFromGroup(GroupMemberPayload {
                group_id,
                account_id,
            })
        }),
        (group_name(), account_id()).prop_map(|(g, account_id)| {
            Action::AddAdminToGroup(AddAdminToGroupPayload {
                group_id: GroupId::from(g),
                account_id,
                enc_crypt_priv_key: IdentityPrimitives::crypt_keypair(g).priv_key,
            })
        }),
        (group_id(), account_id()).prop_map(|(group_id, account_id)| {
            Action::RemoveAdminFromGroup(GroupMemberPayload {
                group_id,
                account_id,
            })
        }),
    ]
}

fn document_action() -> impl Strategy<Value = Action> {
    prop_oneof![
        (prop::sample::select(DOCUMENTS), account_name(), grantee()).prop_map(
            |(d, creator, (_, owner))| Action::CreateDocument(document_payload(d, creator, &owner))
        ),
        (document_id(), prop::collection::vec("[0-9a-f]{8}", 0..3)).prop_map(
            |(document_id, hashes)| Action::SignDocument(SignDocumentPayload {
                document_id,
                hashes,
            })
        ),
        (document_id(), grantee(), any::<bool>(), any::<bool>()).prop_map(
            |(document_id, (kind, id), with_key, can_sign)| {
                Action::GrantAccess(GrantAccessPayload {
                    document_id,
                    kind,
                    id,
                    enc_crypt_priv_key: with_key.then(|| "enc-doc-key".to_owned()),
                    can_sign,
                })
            }
        ),
        document_id().prop_map(|document_id| Action::DecryptDocument(DocumentRefPayload {
            document_id
        })),
        (document_id(), grantee()).prop_map(|(document_id, (kind, id))| {
            Action::RevokeAccess(RevokeAccessPayload {
                document_id,
                kind,
                id,
            })
        }),
        (key_kind(), grantee()).prop_map(|(kind, (_, id))| Action::GetPubKeys(KeyLookupPayload {
            kind,
            id
        })),
        (key_kind(), grantee()).prop_map(|(kind, (_, id))| Action::GetKeyPairs(KeyLookupPayload {
            kind,
            id
        })),
    ]
}

/// A batch of up to `max` actions.
pub fn batch(max: usize) -> impl Strategy<Value = Vec<Action>> {
    prop::collection::vec(action(), 0..=max)
}
