//! Audit trail for key operations.
//!
//! Events carry the key's record id, never the raw token or its hash.

use std::future::Future;

use chrono::{DateTime, Utc};
use interalpha_types::{ActorId, ActorType, ClientId, KeyId};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::StoreError;

/// Resource name recorded on every event from this crate.
pub const RESOURCE: &str = "client_access_key";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    KeyIssued,
    KeyValidationFailed,
    KeyRevoked,
    KeysRevokedBulk,
    KeyExpired,
}

impl AuditAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::KeyIssued => "key_issued",
            Self::KeyValidationFailed => "key_validation_failed",
            Self::KeyRevoked => "key_revoked",
            Self::KeysRevokedBulk => "keys_revoked_bulk",
            Self::KeyExpired => "key_expired",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditResult {
    Success,
    Failure,
}

/// One audit record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditEvent {
    pub actor_id: ActorId,
    pub actor_type: ActorType,
    pub action: AuditAction,
    pub resource: &'static str,
    pub resource_id: Option<KeyId>,
    pub client_id: ClientId,
    pub result: AuditResult,
    pub metadata: Map<String, Value>,
    pub at: DateTime<Utc>,
}

impl AuditEvent {
    pub fn new(
        actor_id: ActorId,
        actor_type: ActorType,
        action: AuditAction,
        client_id: ClientId,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            actor_id,
            actor_type,
            action,
            resource: RESOURCE,
            resource_id: None,
            client_id,
            result: AuditResult::Success,
            metadata: Map::new(),
            at,
        }
    }

    pub fn with_key(mut self, key_id: KeyId) -> Self {
        self.resource_id = Some(key_id);
        self
    }

    pub fn failed(mut self) -> Self {
        self.result = AuditResult::Failure;
        self
    }

    pub fn with_meta(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}

/// Destination for audit events.
pub trait AuditSink: Send + Sync + 'static {
    fn log_action(&self, event: AuditEvent) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Writes `event`, logging instead of failing the caller's operation.
pub(crate) async fn record<A: AuditSink>(sink: &A, event: AuditEvent) {
    let action = event.action;
    if let Err(e) = sink.log_action(event).await {
        warn!(action = action.as_str(), error = %e, "Audit event dropped");
    }
}
