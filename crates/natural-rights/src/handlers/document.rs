//! Documents and their grants.

use tracing::{debug, info};

use natural_rights_core::{
    ActionOutput, CreateDocumentPayload, CreateDocumentResultPayload,
    DecryptDocumentResultPayload, DocumentId, DocumentRefPayload, GrantAccessPayload,
    RevokeAccessPayload, SignDocumentPayload, SignDocumentResultPayload, UpdateDocumentPayload,
};
use natural_rights_primitives::Primitives;
use natural_rights_store::{
    DocumentRecord, Grant, Grantee, GraphStore, GraphStoreExt, Versioned, WriteBatch,
};

use super::{require_account, ActionHandlers};
use crate::auth::ActingIdentity;
use crate::authz::Reach;
use crate::error::{ActionError, HandlerResult};

impl<S: GraphStore, P: Primitives> ActionHandlers<S, P> {
    pub(crate) async fn create_document(
        &self,
        identity: &ActingIdentity,
        payload: CreateDocumentPayload,
    ) -> HandlerResult<ActionOutput> {
        let actor = require_account(identity)?;
        if actor != &payload.creator_id {
            return Err(ActionError::forbidden(format!(
                "client does not act for account {}",
                payload.creator_id
            )));
        }

        let owner = self.resolve_crypt_account(&payload.crypt_account_id).await?;
        let reach = self.reach(identity).await?;
        if !reach.controls(&owner) {
            return Err(ActionError::forbidden(format!("does not control {owner}")));
        }
        let guards = reach.guards_for(&owner);

        let document_id = payload.document_id();
        if self.store.get_document(&document_id).await?.is_some() {
            return Err(ActionError::AlreadyExists(format!("document {document_id}")));
        }

        let document = DocumentRecord {
            id: document_id.clone(),
            creator_id: payload.creator_id,
            crypt_owner: owner.clone(),
            crypt_pub_key: payload.crypt_pub_key,
            grants: vec![Grant {
                grantee: owner,
                enc_crypt_priv_key: Some(payload.enc_crypt_priv_key),
                can_sign: true,
            }],
        };
        self.commit(
            WriteBatch::new()
                .insert(document)
                .guarded_by(guards),
        )
        .await?;

        info!(document = %document_id, "created document");
        Ok(ActionOutput::CreateDocument(CreateDocumentResultPayload {
            document_id,
        }))
    }

    pub(crate) async fn sign_document(
        &self,
        identity: &ActingIdentity,
        payload: SignDocumentPayload,
    ) -> HandlerResult<ActionOutput> {
        let document = self.document(&payload.document_id).await?;
        let reach = self.reach(identity).await?;

        let is_creator = reach.account_id() == Some(&document.record.creator_id);
        if !is_creator && !reach.can_sign(&document.record) {
            return Err(ActionError::forbidden(format!(
                "no sign capability on document {}",
                payload.document_id
            )));
        }

        let mut signatures = Vec::with_capacity(payload.hashes.len());
        for hash in &payload.hashes {
            let text = format!("{}:{}", payload.document_id, hash);
            signatures.push(self.primitives.sign(&self.sign_keypair, &text).await?);
        }

        Ok(ActionOutput::SignDocument(SignDocumentResultPayload {
            signatures,
        }))
    }

    /// Add or extend a grant.
    ///
    /// Admins may change any grant. A holder of decrypt capability may only
    /// share: it can add a ciphertext where none exists and pass on a sign
    /// bit it can use itself, and it never touches the owner grant.
    pub(crate) async fn grant_access(
        &self,
        identity: &ActingIdentity,
        payload: GrantAccessPayload,
    ) -> HandlerResult<ActionOutput> {
        let mut document = self.document(&payload.document_id).await?;
        let reach = self.reach(identity).await?;

        let administers = reach.administers(&document.record);
        let mut guards = if administers {
            reach.guards_for(&document.record.crypt_owner)
        } else {
            match reach.decrypt_path(&document.record) {
                Some((principal, _)) => principal.guards.clone(),
                None => {
                    return Err(ActionError::forbidden(format!(
                        "no decrypt or admin capability on document {}",
                        payload.document_id
                    )))
                }
            }
        };

        let grantee = Grantee::new(payload.kind, payload.id.as_str());
        self.require_grantee(&grantee).await?;

        if !administers {
            let record = &document.record;
            if grantee == record.crypt_owner {
                return Err(ActionError::forbidden(format!(
                    "only an admin may change the owner grant of document {}",
                    payload.document_id
                )));
            }

            let existing = record.grant(&grantee).and_then(|g| g.enc_crypt_priv_key.as_ref());
            let replaces = match (existing, payload.enc_crypt_priv_key.as_ref()) {
                (Some(old), Some(new)) => old != new,
                _ => false,
            };
            if replaces {
                return Err(ActionError::forbidden(format!(
                    "only an admin may replace the key held by {grantee}"
                )));
            }

            if payload.can_sign {
                let is_creator = reach.account_id() == Some(&record.creator_id);
                match reach.sign_principal(record) {
                    Some(principal) => guards.extend(principal.guards.iter().cloned()),
                    None if is_creator => {}
                    None => {
                        return Err(ActionError::forbidden(format!(
                            "no sign capability to pass on for document {}",
                            payload.document_id
                        )))
                    }
                }
            }
        }

        match document.record.grant_mut(&grantee) {
            Some(grant) => {
                if let Some(key) = &payload.enc_crypt_priv_key {
                    grant.enc_crypt_priv_key = Some(key.clone());
                }
                grant.can_sign |= payload.can_sign;
            }
            None => document.record.grants.push(Grant {
                grantee: grantee.clone(),
                enc_crypt_priv_key: payload.enc_crypt_priv_key.clone(),
                can_sign: payload.can_sign,
            }),
        }
        self.commit(
            WriteBatch::new()
                .update(document.version, document.record)
                .guarded_by(guards),
        )
        .await?;

        debug!(document = %payload.document_id, %grantee, "granted access");
        Ok(ActionOutput::GrantAccess(payload))
    }

    pub(crate) async fn decrypt_document(
        &self,
        identity: &ActingIdentity,
        payload: DocumentRefPayload,
    ) -> HandlerResult<ActionOutput> {
        let document = self.document(&payload.document_id).await?;
        let reach = self.reach(identity).await?;

        let enc_crypt_priv_key = self.decrypt_for(&reach, &document.record).await?;
        Ok(ActionOutput::DecryptDocument(DecryptDocumentResultPayload {
            document_id: payload.document_id,
            enc_crypt_priv_key,
        }))
    }

    pub(crate) async fn revoke_access(
        &self,
        identity: &ActingIdentity,
        payload: RevokeAccessPayload,
    ) -> HandlerResult<ActionOutput> {
        let mut document = self.document(&payload.document_id).await?;
        let reach = self.reach(identity).await?;

        if !reach.administers(&document.record) {
            return Err(ActionError::forbidden(format!(
                "no admin capability on document {}",
                payload.document_id
            )));
        }

        let guards = reach.guards_for(&document.record.crypt_owner);
        let grantee = Grantee::new(payload.kind, payload.id.as_str());
        if grantee == document.record.crypt_owner {
            return Err(ActionError::InvariantViolation(format!(
                "{grantee} owns document {}; rotate it with UpdateDocument",
                payload.document_id
            )));
        }
        if document.record.remove_grant(&grantee).is_none() {
            return Err(ActionError::not_found(format!(
                "grant to {grantee} on document {}",
                payload.document_id
            )));
        }
        self.commit(
            WriteBatch::new()
                .update(document.version, document.record)
                .guarded_by(guards),
        )
        .await?;

        info!(document = %payload.document_id, %grantee, "revoked access");
        Ok(ActionOutput::RevokeAccess(payload))
    }

    /// Rotate a document's crypt key and owner.
    ///
    /// Every other grant loses its decrypt copy, which was encrypted under
    /// the old key. Sign capabilities are kept.
    pub(crate) async fn update_document(
        &self,
        identity: &ActingIdentity,
        payload: UpdateDocumentPayload,
    ) -> HandlerResult<ActionOutput> {
        let mut document = self.document(&payload.document_id).await?;
        let reach = self.reach(identity).await?;

        if !reach.administers(&document.record) {
            return Err(ActionError::forbidden(format!(
                "no admin capability on document {}",
                payload.document_id
            )));
        }

        let owner = self.resolve_crypt_account(&payload.crypt_account_id).await?;
        if !reach.controls(&owner) {
            return Err(ActionError::forbidden(format!("does not control {owner}")));
        }
        let mut guards = reach.guards_for(&document.record.crypt_owner);
        guards.extend(reach.guards_for(&owner));

        let record = &mut document.record;
        for grant in &mut record.grants {
            grant.enc_crypt_priv_key = None;
        }
        record.grants.retain(|g| g.can_sign && g.grantee != owner);
        record.grants.push(Grant {
            grantee: owner.clone(),
            enc_crypt_priv_key: Some(payload.enc_crypt_priv_key.clone()),
            can_sign: true,
        });
        record.crypt_owner = owner;
        record.crypt_pub_key = payload.crypt_pub_key.clone();

        self.commit(
            WriteBatch::new()
                .update(document.version, document.record)
                .guarded_by(guards),
        )
        .await?;

        info!(document = %payload.document_id, "rotated document key");
        Ok(ActionOutput::UpdateDocument(payload))
    }

    pub(crate) async fn document(&self, id: &DocumentId) -> HandlerResult<Versioned<DocumentRecord>> {
        self.store
            .get_document(id)
            .await?
            .ok_or_else(|| ActionError::not_found(format!("document {id}")))
    }

    /// The document's private key, transformed as far toward the acting
    /// client as the best reachable path allows.
    pub(crate) async fn decrypt_for(
        &self,
        reach: &Reach,
        document: &DocumentRecord,
    ) -> HandlerResult<String> {
        let (principal, grant) = reach.decrypt_path(document).ok_or_else(|| {
            ActionError::forbidden(format!("no decrypt capability on document {}", document.id))
        })?;
        let ciphertext = grant.enc_crypt_priv_key.clone().unwrap_or_default();

        debug!(
            document = %document.id,
            via = %principal.grantee,
            hops = principal.transforms.len(),
            "decrypting"
        );
        self.transform_along(ciphertext, &principal.transforms).await
    }
}
