//! Access-key records and the values handed back to callers.

use chrono::{DateTime, Duration, Utc};
use interalpha_crypto::{AccessToken, KeyHash};
use interalpha_types::{ActorId, ClientId, KeyId};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use crate::notification::Delivery;

/// Request metadata captured when a key is issued.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyMetadata {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl KeyMetadata {
    /// Overwrites the fields `other` sets; unset fields keep their value.
    pub fn merge(&mut self, other: KeyMetadata) {
        if other.ip_address.is_some() {
            self.ip_address = other.ip_address;
        }
        if other.user_agent.is_some() {
            self.user_agent = other.user_agent;
        }
    }
}

/// Why a key stopped being active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeactivationReason {
    Expired,
    Revoked,
}

/// When and why a record was deactivated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deactivation {
    pub reason: DeactivationReason,
    pub at: DateTime<Utc>,
}

/// Persisted access-key record. Never holds the raw token.
///
/// `active` is true exactly when `deactivation` is `None`. A record is never
/// reactivated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientKeyData {
    pub id: KeyId,
    pub key_hash: KeyHash,
    pub client_id: ClientId,
    pub issued_by: ActorId,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub active: bool,
    pub usage_count: u64,
    pub last_used_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub deactivation: Option<Deactivation>,
    #[serde(default)]
    pub metadata: KeyMetadata,
    #[serde(default)]
    pub permissions: ClientPermissions,
}

impl ClientKeyData {
    /// A key is expired strictly after its expiry instant.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Active and not yet expired.
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        self.active && !self.is_expired_at(now)
    }

    /// Active but past expiry: waiting to be deactivated.
    pub fn is_stale_at(&self, now: DateTime<Utc>) -> bool {
        self.active && self.is_expired_at(now)
    }

    /// Marks the record inactive. Returns false if it already was.
    pub fn deactivate(&mut self, reason: DeactivationReason, at: DateTime<Utc>) -> bool {
        if !self.active {
            return false;
        }
        self.active = false;
        self.deactivation = Some(Deactivation { reason, at });
        true
    }

    pub fn deactivation_reason(&self) -> Option<DeactivationReason> {
        self.deactivation.map(|d| d.reason)
    }
}

/// Capability bundle granted to a client session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientPermissions {
    pub can_view_orders: bool,
    pub can_view_payments: bool,
    pub can_view_documents: bool,
    pub can_chat: bool,
}

impl Default for ClientPermissions {
    fn default() -> Self {
        Self {
            can_view_orders: true,
            can_view_payments: true,
            can_view_documents: true,
            can_chat: true,
        }
    }
}

impl ClientPermissions {
    /// Applies partial overrides on top of `self`.
    pub fn with_overrides(mut self, overrides: &PermissionOverrides) -> Self {
        if let Some(v) = overrides.can_view_orders {
            self.can_view_orders = v;
        }
        if let Some(v) = overrides.can_view_payments {
            self.can_view_payments = v;
        }
        if let Some(v) = overrides.can_view_documents {
            self.can_view_documents = v;
        }
        if let Some(v) = overrides.can_chat {
            self.can_chat = v;
        }
        self
    }
}

/// Partial [`ClientPermissions`]; unset fields keep the default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionOverrides {
    pub can_view_orders: Option<bool>,
    pub can_view_payments: Option<bool>,
    pub can_view_documents: Option<bool>,
    pub can_chat: Option<bool>,
}

/// Optional inputs to issuance.
#[derive(Debug, Clone, Default)]
pub struct IssueOptions {
    /// Overrides the configured default lifetime.
    pub custom_ttl: Option<Duration>,
    pub metadata: KeyMetadata,
    pub permissions: PermissionOverrides,
}

impl IssueOptions {
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.custom_ttl = Some(ttl);
        self
    }

    pub fn with_metadata(mut self, metadata: KeyMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_permissions(mut self, permissions: PermissionOverrides) -> Self {
        self.permissions = permissions;
        self
    }
}

/// Result of a successful issuance. The only place the raw token surfaces.
#[derive(Debug)]
pub struct IssuedKey {
    pub token: AccessToken,
    pub key_id: KeyId,
    pub client_id: ClientId,
    pub expires_at: DateTime<Utc>,
    pub permissions: ClientPermissions,
    /// Background delivery of the token. Dropping the handle detaches it.
    pub notification: JoinHandle<Delivery>,
}

/// Session data returned by a successful validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeySession {
    pub key_id: KeyId,
    pub client_id: ClientId,
    pub client_name: String,
    pub permissions: ClientPermissions,
    pub expires_at: DateTime<Utc>,
}

/// Usage figures for one key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyUsageStats {
    pub usage_count: u64,
    pub last_used_at: Option<DateTime<Utc>>,
    pub issued_at: DateTime<Utc>,
    pub active: bool,
}

impl From<&ClientKeyData> for KeyUsageStats {
    fn from(record: &ClientKeyData) -> Self {
        Self {
            usage_count: record.usage_count,
            last_used_at: record.last_used_at,
            issued_at: record.issued_at,
            active: record.active,
        }
    }
}

/// Contact preferences held by the client directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPreferences {
    pub sms_notifications: bool,
}

/// A client as known to the client directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[serde(default)]
    pub preferences: NotificationPreferences,
}

impl Client {
    pub fn new(id: impl Into<ClientId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            email: None,
            phone: None,
            preferences: NotificationPreferences::default(),
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_phone(mut self, phone: impl Into<String>, sms: bool) -> Self {
        self.phone = Some(phone.into());
        self.preferences.sms_notifications = sms;
        self
    }
}
