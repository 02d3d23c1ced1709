//! Group lifecycle: creation, members, admins.

use std::collections::BTreeMap;

use tracing::info;

use natural_rights_core::{
    AccountId, ActionOutput, AddAdminToGroupPayload, AddMemberToGroupPayload,
    CreateGroupPayload, GroupId, GroupMemberPayload, GroupMembershipPayload,
};
use natural_rights_primitives::Primitives;
use natural_rights_store::{
    GraphStore, GraphStoreExt, GroupRecord, Guard, Membership, Versioned, WriteBatch,
};

use super::{require_account, ActionHandlers};
use crate::auth::ActingIdentity;
use crate::error::{ActionError, HandlerResult};

impl<S: GraphStore, P: Primitives> ActionHandlers<S, P> {
    pub(crate) async fn create_group(
        &self,
        identity: &ActingIdentity,
        payload: CreateGroupPayload,
    ) -> HandlerResult<ActionOutput> {
        let actor = require_account(identity)?;
        if actor != &payload.account_id {
            return Err(ActionError::forbidden(format!(
                "client does not act for account {}",
                payload.account_id
            )));
        }
        if self.store.get_group(&payload.group_id).await?.is_some() {
            return Err(ActionError::AlreadyExists(format!(
                "group {}",
                payload.group_id
            )));
        }

        let group = GroupRecord {
            id: payload.group_id.clone(),
            sign_pub_key: payload.sign_pub_key.clone(),
            crypt_pub_key: payload.crypt_pub_key.clone(),
            enc_sign_priv_key: payload.enc_sign_priv_key.clone(),
            enc_crypt_priv_key: payload.enc_crypt_priv_key.clone(),
            members: BTreeMap::from([(
                actor.clone(),
                Membership {
                    crypt_transform_key: None,
                    can_sign: true,
                },
            )]),
            admins: BTreeMap::from([(actor.clone(), payload.enc_crypt_priv_key.clone())]),
        };
        self.commit(WriteBatch::new().insert(group)).await?;

        info!(group = %payload.group_id, admin = %actor, "created group");
        Ok(ActionOutput::CreateGroup(payload))
    }

    pub(crate) async fn add_member_to_group(
        &self,
        identity: &ActingIdentity,
        payload: AddMemberToGroupPayload,
    ) -> HandlerResult<ActionOutput> {
        let (mut group, binding) = self.administered_group(identity, &payload.group_id).await?;
        self.require_account_exists(&payload.account_id).await?;

        group.record.members.insert(
            payload.account_id.clone(),
            Membership {
                crypt_transform_key: payload.crypt_transform_key,
                can_sign: payload.can_sign,
            },
        );
        self.commit(
            WriteBatch::new()
                .update(group.version, group.record)
                .guarded_by(binding),
        )
        .await?;

        Ok(ActionOutput::AddMemberToGroup(GroupMembershipPayload {
            group_id: payload.group_id,
            account_id: payload.account_id,
            can_sign: payload.can_sign,
        }))
    }

    pub(crate) async fn remove_member_from_group(
        &self,
        identity: &ActingIdentity,
        payload: GroupMemberPayload,
    ) -> HandlerResult<ActionOutput> {
        let (mut group, binding) = self.administered_group(identity, &payload.group_id).await?;
        let record = &mut group.record;

        if !record.is_member(&payload.account_id) {
            return Err(ActionError::not_found(format!(
                "member {} of group {}",
                payload.account_id, payload.group_id
            )));
        }
        if record.is_admin(&payload.account_id) && record.admins.len() == 1 {
            return Err(ActionError::InvariantViolation(format!(
                "{} is the last admin of group {}",
                payload.account_id, payload.group_id
            )));
        }

        record.members.remove(&payload.account_id);
        record.admins.remove(&payload.account_id);
        self.commit(
            WriteBatch::new()
                .update(group.version, group.record)
                .guarded_by(binding),
        )
        .await?;

        Ok(ActionOutput::RemoveMemberFromGroup(payload))
    }

    pub(crate) async fn add_admin_to_group(
        &self,
        identity: &ActingIdentity,
        payload: AddAdminToGroupPayload,
    ) -> HandlerResult<ActionOutput> {
        let (mut group, binding) = self.administered_group(identity, &payload.group_id).await?;
        self.require_account_exists(&payload.account_id).await?;

        if group.record.is_admin(&payload.account_id) {
            return Err(ActionError::AlreadyExists(format!(
                "admin {} of group {}",
                payload.account_id, payload.group_id
            )));
        }

        group
            .record
            .admins
            .insert(payload.account_id.clone(), payload.enc_crypt_priv_key.clone());
        group
            .record
            .members
            .entry(payload.account_id.clone())
            .or_insert(Membership {
                crypt_transform_key: None,
                can_sign: false,
            });
        self.commit(
            WriteBatch::new()
                .update(group.version, group.record)
                .guarded_by(binding),
        )
        .await?;

        Ok(ActionOutput::AddAdminToGroup(payload))
    }

    pub(crate) async fn remove_admin_from_group(
        &self,
        identity: &ActingIdentity,
        payload: GroupMemberPayload,
    ) -> HandlerResult<ActionOutput> {
        let (mut group, binding) = self.administered_group(identity, &payload.group_id).await?;

        if !group.record.is_admin(&payload.account_id) {
            return Err(ActionError::not_found(format!(
                "admin {} of group {}",
                payload.account_id, payload.group_id
            )));
        }
        if group.record.admins.len() == 1 {
            return Err(ActionError::InvariantViolation(format!(
                "{} is the last admin of group {}",
                payload.account_id, payload.group_id
            )));
        }

        group.record.admins.remove(&payload.account_id);
        self.commit(
            WriteBatch::new()
                .update(group.version, group.record)
                .guarded_by(binding),
        )
        .await?;

        Ok(ActionOutput::RemoveAdminFromGroup(payload))
    }

    /// Load a group the actor administers, with a guard on the client
    /// binding that makes the actor an admin.
    async fn administered_group(
        &self,
        identity: &ActingIdentity,
        group_id: &GroupId,
    ) -> HandlerResult<(Versioned<GroupRecord>, Option<Guard>)> {
        let group = self
            .store
            .get_group(group_id)
            .await?
            .ok_or_else(|| ActionError::not_found(format!("group {group_id}")))?;

        let actor = require_account(identity)?;
        if !group.record.is_admin(actor) {
            return Err(ActionError::forbidden(format!(
                "not an admin of group {group_id}"
            )));
        }
        let binding = self.binding_guard(identity).await?;
        Ok((group, binding))
    }

    async fn require_account_exists(&self, account_id: &AccountId) -> HandlerResult<()> {
        match self.store.get_account(account_id).await? {
            Some(_) => Ok(()),
            None => Err(ActionError::not_found(format!("account {account_id}"))),
        }
    }
}
