//! Revocation, expiry sweeps and key queries.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use interalpha_crypto::KeyHash;
use interalpha_types::{ActorId, ActorType, ClientId, KeyId};
use tracing::{debug, info};

use crate::audit::{self, AuditAction, AuditEvent};
use crate::backend::Backend;
use crate::clock::Clock;
use crate::error::Result;
use crate::model::{ClientKeyData, DeactivationReason, KeyUsageStats};
use crate::store::{KeyStore, bounded};

/// Deactivates a client's expired-but-active keys. Returns how many changed.
pub(crate) async fn sweep_client<S: KeyStore>(
    store: &S,
    client_id: &ClientId,
    now: DateTime<Utc>,
    timeout: Duration,
) -> Result<usize> {
    let expired = bounded(
        "find_expired_by_client",
        timeout,
        store.find_expired_by_client(client_id, now),
    )
    .await?;

    let mut swept = 0;
    for record in expired {
        if bounded(
            "deactivate",
            timeout,
            store.deactivate(record.id, DeactivationReason::Expired, now),
        )
        .await?
        {
            swept += 1;
        }
    }

    if swept > 0 {
        debug!(client_id = %client_id, swept, "Expired client keys deactivated");
    }
    Ok(swept)
}

/// Audit actor category for an id.
pub(crate) fn actor_type_of(actor: &ActorId) -> ActorType {
    if actor.as_str() == ActorId::SYSTEM {
        ActorType::System
    } else {
        ActorType::Employee
    }
}

/// Explicit revocation and read-only key queries.
pub struct KeyLifecycleManager<B: Backend> {
    backend: Arc<B>,
    timeout: Duration,
}

impl<B: Backend> KeyLifecycleManager<B> {
    pub fn new(backend: Arc<B>, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    /// Revokes the key matching a presented token.
    ///
    /// Returns `Ok(false)` when no record matches and `Ok(true)` otherwise,
    /// including when the key was already inactive.
    pub async fn revoke(&self, presented: &str, revoked_by: &ActorId) -> Result<bool> {
        let hash = KeyHash::of_token(presented);
        let store = self.backend.store();
        let Some(record) = bounded("find_by_hash", self.timeout, store.find_by_hash(&hash)).await?
        else {
            debug!("Revocation requested for unknown key");
            return Ok(false);
        };
        self.revoke_record(&record, revoked_by).await?;
        Ok(true)
    }

    /// Revokes a key by record id, with the same semantics as [`Self::revoke`].
    pub async fn revoke_by_id(&self, key_id: KeyId, revoked_by: &ActorId) -> Result<bool> {
        let store = self.backend.store();
        let Some(record) = bounded("find_by_id", self.timeout, store.find_by_id(key_id)).await?
        else {
            return Ok(false);
        };
        self.revoke_record(&record, revoked_by).await?;
        Ok(true)
    }

    async fn revoke_record(&self, record: &ClientKeyData, revoked_by: &ActorId) -> Result<()> {
        let now = self.backend.clock().now();
        let changed = bounded(
            "deactivate",
            self.timeout,
            self.backend
                .store()
                .deactivate(record.id, DeactivationReason::Revoked, now),
        )
        .await?;

        if changed {
            info!(
                client_id = %record.client_id,
                key_id = %record.id,
                revoked_by = %revoked_by,
                "Client key revoked"
            );
            let event = AuditEvent::new(
                revoked_by.clone(),
                actor_type_of(revoked_by),
                AuditAction::KeyRevoked,
                record.client_id.clone(),
                now,
            )
            .with_key(record.id);
            audit::record(self.backend.audit(), event).await;
        }
        Ok(())
    }

    /// Revokes every live key of a client. Returns the number revoked.
    pub async fn revoke_all(&self, client_id: &ClientId, revoked_by: &ActorId) -> Result<usize> {
        let store = self.backend.store();
        let now = self.backend.clock().now();
        sweep_client(store, client_id, now, self.timeout).await?;

        let live = bounded(
            "find_active_by_client",
            self.timeout,
            store.find_active_by_client(client_id, now),
        )
        .await?;

        let mut revoked = 0;
        for record in live {
            if bounded(
                "deactivate",
                self.timeout,
                store.deactivate(record.id, DeactivationReason::Revoked, now),
            )
            .await?
            {
                revoked += 1;
            }
        }

        if revoked > 0 {
            info!(client_id = %client_id, revoked, revoked_by = %revoked_by, "Client keys revoked");
            let event = AuditEvent::new(
                revoked_by.clone(),
                actor_type_of(revoked_by),
                AuditAction::KeysRevokedBulk,
                client_id.clone(),
                now,
            )
            .with_meta("count", revoked);
            audit::record(self.backend.audit(), event).await;
        }
        Ok(revoked)
    }

    /// Deactivates a client's expired keys.
    pub async fn sweep_expired(&self, client_id: &ClientId) -> Result<usize> {
        let now = self.backend.clock().now();
        sweep_client(self.backend.store(), client_id, now, self.timeout).await
    }

    /// Live keys of a client, after sweeping expired ones.
    pub async fn active_keys(&self, client_id: &ClientId) -> Result<Vec<ClientKeyData>> {
        let store = self.backend.store();
        let now = self.backend.clock().now();
        sweep_client(store, client_id, now, self.timeout).await?;
        Ok(bounded(
            "find_active_by_client",
            self.timeout,
            store.find_active_by_client(client_id, now),
        )
        .await?)
    }

    pub async fn usage_stats(&self, key_id: KeyId) -> Result<Option<KeyUsageStats>> {
        let record = bounded(
            "find_by_id",
            self.timeout,
            self.backend.store().find_by_id(key_id),
        )
        .await?;
        Ok(record.as_ref().map(KeyUsageStats::from))
    }
}
