//! Access-key issuance.
//!
//! # Quota
//!
//! "Sweep expired, count live, insert" runs under a per-client lock, so
//! concurrent requests for one client never exceed `max_active_keys`. A
//! request that finds the client at the limit fails before any record is
//! written.
//!
//! # Delivery
//!
//! The raw token is handed to a spawned notification task and returned in
//! [`IssuedKey`]. The caller never waits for email or SMS, and a failed
//! delivery leaves the key valid.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use interalpha_crypto::AccessToken;
use interalpha_types::{ActorId, ClientId, KeyId};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::audit::{self, AuditAction, AuditEvent};
use crate::backend::Backend;
use crate::clock::Clock;
use crate::config::{AccessKeyConfig, NotificationConfig};
use crate::error::{AccessError, Result};
use crate::lifecycle::{actor_type_of, sweep_client};
use crate::locks::ClientLocks;
use crate::model::{Client, ClientKeyData, ClientPermissions, IssueOptions, IssuedKey};
use crate::notification::{self, Delivery, Template, TemplateVars};
use crate::store::{ClientDirectory, KeyStore, bounded};

/// Generates, quota-checks and persists new access keys.
pub struct KeyIssuer<B: Backend> {
    backend: Arc<B>,
    config: AccessKeyConfig,
    notifications: NotificationConfig,
    locks: ClientLocks,
}

impl<B: Backend> KeyIssuer<B> {
    pub fn new(
        backend: Arc<B>,
        config: AccessKeyConfig,
        notifications: NotificationConfig,
    ) -> Self {
        Self {
            backend,
            config,
            notifications,
            locks: ClientLocks::default(),
        }
    }

    pub fn config(&self) -> &AccessKeyConfig {
        &self.config
    }

    /// Issues a key for `client_id` on behalf of `issued_by`.
    pub async fn issue(
        &self,
        client_id: &ClientId,
        issued_by: &ActorId,
        options: IssueOptions,
    ) -> Result<IssuedKey> {
        if client_id.is_blank() {
            return Err(AccessError::ValidationError("client id is blank".to_string()));
        }
        if issued_by.as_str().trim().is_empty() {
            return Err(AccessError::ValidationError("issuer id is blank".to_string()));
        }
        let ttl = options.custom_ttl.unwrap_or_else(|| self.config.default_ttl());
        if ttl <= Duration::zero() {
            return Err(AccessError::ValidationError(format!(
                "key lifetime must be positive, got {ttl}"
            )));
        }

        let timeout = self.config.store_timeout();
        let client = bounded("find_client", timeout, self.backend.directory().find(client_id))
            .await?
            .ok_or_else(|| AccessError::ClientNotFound(client_id.clone()))?;

        let store = self.backend.store();
        let guard = self.locks.lock(client_id).await;

        let now = self.backend.clock().now();
        sweep_client(store, client_id, now, timeout).await?;

        let live = bounded(
            "count_active_by_client",
            timeout,
            store.count_active_by_client(client_id, now),
        )
        .await?;
        if live >= self.config.max_active_keys {
            warn!(
                client_id = %client_id,
                live,
                limit = self.config.max_active_keys,
                "Client key quota exceeded"
            );
            return Err(AccessError::QuotaExceeded {
                client_id: client_id.clone(),
                limit: self.config.max_active_keys,
            });
        }

        let token = AccessToken::generate()?;
        let expires_at = now.checked_add_signed(ttl).ok_or_else(|| {
            AccessError::ValidationError(format!("key lifetime {ttl} overflows"))
        })?;
        let permissions = ClientPermissions::default().with_overrides(&options.permissions);
        let key_id = KeyId::generate();

        let record = ClientKeyData {
            id: key_id,
            key_hash: token.hash(),
            client_id: client_id.clone(),
            issued_by: issued_by.clone(),
            issued_at: now,
            expires_at,
            active: true,
            usage_count: 0,
            last_used_at: None,
            deactivation: None,
            metadata: options.metadata,
            permissions,
        };
        bounded("create", timeout, store.create(record)).await?;
        drop(guard);

        let notification = self.spawn_delivery(client, &token, expires_at);

        let event = AuditEvent::new(
            issued_by.clone(),
            actor_type_of(issued_by),
            AuditAction::KeyIssued,
            client_id.clone(),
            now,
        )
        .with_key(key_id)
        .with_meta("expires_at", expires_at.to_rfc3339());
        audit::record(self.backend.audit(), event).await;

        info!(
            client_id = %client_id,
            key_id = %key_id,
            issued_by = %issued_by,
            expires_at = %expires_at,
            "Client key issued"
        );

        Ok(IssuedKey {
            token,
            key_id,
            client_id: client_id.clone(),
            expires_at,
            permissions,
            notification,
        })
    }

    fn spawn_delivery(
        &self,
        client: Client,
        token: &AccessToken,
        expires_at: DateTime<Utc>,
    ) -> JoinHandle<Delivery> {
        let vars =
            TemplateVars::access_key(&client, token.expose(), expires_at, &self.notifications);
        let sms_enabled = self.notifications.sms_enabled;
        let backend = Arc::clone(&self.backend);

        tokio::spawn(async move {
            let delivery = notification::deliver(
                backend.notifier(),
                &client,
                Template::AccessKey,
                &vars,
                sms_enabled,
            )
            .await;
            if !delivery.any_sent() {
                warn!(client_id = %client.id, "Access key was not delivered on any channel");
            }
            delivery
        })
    }
}
