//! One entry point over the key components.

use std::sync::Arc;

use interalpha_rbac::{Action, PermissionEvaluator, Resource, build_permission};
use interalpha_types::{ActorId, ClientId, KeyId};
use tracing::warn;

use crate::backend::Backend;
use crate::cleanup::{CleanupHandle, CleanupJob, CleanupReport};
use crate::config::AccessSettings;
use crate::error::{AccessError, PublicKeyError, Result};
use crate::issuer::KeyIssuer;
use crate::lifecycle::KeyLifecycleManager;
use crate::model::{
    ClientKeyData, IssueOptions, IssuedKey, KeyMetadata, KeySession, KeyUsageStats,
};
use crate::validator::KeyValidator;

/// Issuer, validator, lifecycle manager and cleanup job sharing one
/// backend and one set of settings.
pub struct ClientKeyService<B: Backend> {
    backend: Arc<B>,
    evaluator: PermissionEvaluator,
    issuer: KeyIssuer<B>,
    validator: KeyValidator<B>,
    lifecycle: KeyLifecycleManager<B>,
    cleanup: Arc<CleanupJob<B>>,
    collapse_key_errors: bool,
}

impl<B: Backend> ClientKeyService<B> {
    pub fn new(backend: Arc<B>, settings: AccessSettings, evaluator: PermissionEvaluator) -> Self {
        let timeout = settings.access_keys.store_timeout();
        Self {
            evaluator,
            issuer: KeyIssuer::new(
                Arc::clone(&backend),
                settings.access_keys.clone(),
                settings.notifications.clone(),
            ),
            validator: KeyValidator::new(Arc::clone(&backend), timeout),
            lifecycle: KeyLifecycleManager::new(Arc::clone(&backend), timeout),
            cleanup: Arc::new(CleanupJob::new(
                Arc::clone(&backend),
                settings.cleanup,
                settings.notifications,
                timeout,
            )),
            collapse_key_errors: settings.access_keys.collapse_key_errors,
            backend,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn issuer(&self) -> &KeyIssuer<B> {
        &self.issuer
    }

    pub fn validator(&self) -> &KeyValidator<B> {
        &self.validator
    }

    pub fn lifecycle(&self) -> &KeyLifecycleManager<B> {
        &self.lifecycle
    }

    /// Permission an employee role needs to issue client keys.
    pub fn issue_permission() -> String {
        build_permission(Resource::CLIENTES, Action::UPDATE)
    }

    pub async fn issue(
        &self,
        client_id: &ClientId,
        issued_by: &ActorId,
        options: IssueOptions,
    ) -> Result<IssuedKey> {
        self.issuer.issue(client_id, issued_by, options).await
    }

    /// Issues a key on behalf of an employee whose role string arrived from
    /// an untrusted source.
    ///
    /// Fails with [`AccessError::InvalidRole`] when the role is unknown or
    /// does not grant [`Self::issue_permission`].
    pub async fn issue_as(
        &self,
        role: &str,
        employee: &ActorId,
        client_id: &ClientId,
        options: IssueOptions,
    ) -> Result<IssuedKey> {
        let permission = Self::issue_permission();
        if !self.evaluator.has_permission(role, &permission) {
            warn!(
                role,
                employee = %employee,
                permission = %permission,
                "Key issuance denied for role"
            );
            return Err(AccessError::InvalidRole(role.to_string()));
        }
        self.issuer.issue(client_id, employee, options).await
    }

    pub async fn validate(&self, presented: &str) -> Result<KeySession> {
        self.validator.validate(presented).await
    }

    /// Validates and records the caller's request metadata on the key.
    pub async fn validate_with(
        &self,
        presented: &str,
        session: KeyMetadata,
    ) -> Result<KeySession> {
        self.validator.validate_with(presented, Some(session)).await
    }

    /// Validates and renders failures as the public response body.
    pub async fn validate_public(
        &self,
        presented: &str,
    ) -> std::result::Result<KeySession, PublicKeyError> {
        self.validator
            .validate(presented)
            .await
            .map_err(|e| self.public_error(&e))
    }

    /// Public body for `err`, honoring `collapse_key_errors`.
    pub fn public_error(&self, err: &AccessError) -> PublicKeyError {
        PublicKeyError::from_access_error(err, self.collapse_key_errors)
    }

    pub async fn revoke(&self, presented: &str, revoked_by: &ActorId) -> Result<bool> {
        self.lifecycle.revoke(presented, revoked_by).await
    }

    pub async fn revoke_by_id(&self, key_id: KeyId, revoked_by: &ActorId) -> Result<bool> {
        self.lifecycle.revoke_by_id(key_id, revoked_by).await
    }

    pub async fn revoke_all(&self, client_id: &ClientId, revoked_by: &ActorId) -> Result<usize> {
        self.lifecycle.revoke_all(client_id, revoked_by).await
    }

    pub async fn active_keys(&self, client_id: &ClientId) -> Result<Vec<ClientKeyData>> {
        self.lifecycle.active_keys(client_id).await
    }

    pub async fn usage_stats(&self, key_id: KeyId) -> Result<Option<KeyUsageStats>> {
        self.lifecycle.usage_stats(key_id).await
    }

    pub async fn run_cleanup(&self) -> CleanupReport {
        self.cleanup.run_once().await
    }

    /// Starts the periodic cleanup loop on the configured interval.
    pub fn start_cleanup(&self) -> CleanupHandle {
        Arc::clone(&self.cleanup).spawn()
    }
}
