//! Access-key validation.
//!
//! Every store call is bounded by `store_timeout`; a timeout or store error
//! rejects the key. Expiry is sticky: the first validation past
//! `expires_at` deactivates the record with reason `Expired`, and later
//! attempts report `KeyExpired` from the stored reason without consulting
//! the clock. If that write fails, the key id is remembered here and the
//! write is retried on every later hit until the store reflects it.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use interalpha_crypto::{AccessToken, KeyHash};
use interalpha_types::{ActorId, ActorType, KeyId};
use tracing::{debug, error, info, warn};

use crate::audit::{self, AuditAction, AuditEvent};
use crate::backend::Backend;
use crate::clock::Clock;
use crate::error::{AccessError, Result, StoreError};
use crate::model::{ClientKeyData, DeactivationReason, KeyMetadata, KeySession};
use crate::store::{ClientDirectory, KeyStore, bounded};

/// Verifies presented keys and does usage bookkeeping.
pub struct KeyValidator<B: Backend> {
    backend: Arc<B>,
    timeout: Duration,
    /// Keys seen expired whose deactivation has not reached the store.
    pending_expiry: Mutex<HashSet<KeyId>>,
}

/// Outcome for a record that is no longer active.
fn rejection_for(record: &ClientKeyData) -> AccessError {
    match record.deactivation_reason() {
        Some(DeactivationReason::Expired) => AccessError::KeyExpired,
        Some(DeactivationReason::Revoked) | None => AccessError::KeyRevoked,
    }
}

impl<B: Backend> KeyValidator<B> {
    pub fn new(backend: Arc<B>, timeout: Duration) -> Self {
        Self {
            backend,
            timeout,
            pending_expiry: Mutex::new(HashSet::new()),
        }
    }

    /// Validates a presented token, returning the session it grants.
    pub async fn validate(&self, presented: &str) -> Result<KeySession> {
        self.validate_with(presented, None).await
    }

    /// Like [`Self::validate`], merging `session` into the stored metadata
    /// on success.
    pub async fn validate_with(
        &self,
        presented: &str,
        session: Option<KeyMetadata>,
    ) -> Result<KeySession> {
        match self.check(presented, session).await {
            Ok(session) => Ok(session),
            Err(AccessError::StoreUnavailable(e)) => {
                error!(error = %e, "Key validation failed closed");
                Err(AccessError::StoreUnavailable(e))
            }
            Err(e) => Err(e),
        }
    }

    async fn check(&self, presented: &str, session: Option<KeyMetadata>) -> Result<KeySession> {
        if !AccessToken::is_well_formed(presented) {
            debug!("Malformed client key rejected");
            return Err(AccessError::InvalidKey);
        }

        let store = self.backend.store();
        let hash = KeyHash::of_token(presented);
        let record = bounded("find_by_hash", self.timeout, store.find_by_hash(&hash))
            .await?
            .filter(|record| record.key_hash.matches_token(presented))
            .ok_or(AccessError::InvalidKey)?;

        if !record.active {
            self.lock_pending().remove(&record.id);
            return Err(self.reject(&record, rejection_for(&record)).await);
        }

        let now = self.backend.clock().now();
        let pending = self.lock_pending().contains(&record.id);
        if pending || record.is_expired_at(now) {
            self.expire(&record, now).await;
            return Err(self.reject(&record, AccessError::KeyExpired).await);
        }

        let usage = bounded(
            "record_usage",
            self.timeout,
            store.record_usage(record.id, now, session),
        );
        let Some(used) = usage.await? else {
            // Deactivated between the lookup and the usage update.
            let err = self.current_rejection(record.id).await?;
            return Err(self.reject(&record, err).await);
        };

        let directory = self.backend.directory();
        let lookup = bounded("find_client", self.timeout, directory.find(&used.client_id));
        let Some(client) = lookup.await? else {
            let err = AccessError::ClientNotFound(used.client_id.clone());
            return Err(self.reject(&record, err).await);
        };

        info!(
            client_id = %used.client_id,
            key_id = %used.id,
            usage_count = used.usage_count,
            "Client key validated"
        );

        Ok(KeySession {
            key_id: used.id,
            client_id: used.client_id,
            client_name: client.name,
            permissions: used.permissions,
            expires_at: used.expires_at,
        })
    }

    /// Deactivates an expired record, remembering it when the store fails.
    async fn expire(&self, record: &ClientKeyData, now: DateTime<Utc>) {
        let store = self.backend.store();
        let deactivated = bounded(
            "deactivate",
            self.timeout,
            store.deactivate(record.id, DeactivationReason::Expired, now),
        )
        .await;
        match deactivated {
            Ok(_) => {
                self.lock_pending().remove(&record.id);
                warn!(client_id = %record.client_id, key_id = %record.id, "Client key expired");
            }
            Err(e) => {
                self.lock_pending().insert(record.id);
                error!(key_id = %record.id, error = %e, "Could not deactivate expired key");
            }
        }
    }

    fn lock_pending(&self) -> MutexGuard<'_, HashSet<KeyId>> {
        self.pending_expiry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    async fn current_rejection(&self, id: KeyId) -> std::result::Result<AccessError, StoreError> {
        let store = self.backend.store();
        let current = bounded("find_by_id", self.timeout, store.find_by_id(id)).await?;
        Ok(current.as_ref().map_or(AccessError::InvalidKey, rejection_for))
    }

    /// Audits a rejection of an existing record and hands the error back.
    async fn reject(&self, record: &ClientKeyData, err: AccessError) -> AccessError {
        let event = AuditEvent::new(
            ActorId::from(&record.client_id),
            ActorType::Client,
            AuditAction::KeyValidationFailed,
            record.client_id.clone(),
            self.backend.clock().now(),
        )
        .with_key(record.id)
        .failed()
        .with_meta("reason", err.code());
        audit::record(self.backend.audit(), event).await;
        err
    }
}
