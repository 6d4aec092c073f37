//! Runtime settings for the key lifecycle.
//!
//! Plain structs with defaults; `interalpha-config` fills them from files
//! and environment.

use std::time::Duration as StdDuration;

use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Quota, lifetime and store bounds for access keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessKeyConfig {
    /// Lifetime of a key when no custom TTL is given.
    pub default_ttl_secs: u64,
    /// Maximum simultaneously active keys per client.
    pub max_active_keys: usize,
    /// Upper bound on each key store and directory call.
    pub store_timeout_ms: u64,
    /// Render InvalidKey, KeyExpired and KeyRevoked as one public error.
    pub collapse_key_errors: bool,
}

impl Default for AccessKeyConfig {
    fn default() -> Self {
        Self {
            default_ttl_secs: 24 * 60 * 60,
            max_active_keys: 3,
            store_timeout_ms: 2_000,
            collapse_key_errors: true,
        }
    }
}

impl AccessKeyConfig {
    pub fn default_ttl(&self) -> Duration {
        i64::try_from(self.default_ttl_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or(Duration::MAX)
    }

    pub fn store_timeout(&self) -> StdDuration {
        StdDuration::from_millis(self.store_timeout_ms)
    }
}

/// Where notifications point and how they are signed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Base URL of the client portal.
    pub portal_url: String,
    pub company_name: String,
    /// Global switch for SMS delivery.
    pub sms_enabled: bool,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            portal_url: "http://localhost:3000".to_string(),
            company_name: "InterAlpha".to_string(),
            sms_enabled: true,
        }
    }
}

/// Periodic expiry sweep and expiration warnings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanupConfig {
    pub enabled: bool,
    pub interval_minutes: u64,
    /// Hours before expiry at which a warning is sent.
    pub warning_hours: Vec<u32>,
    /// Maximum expired keys deactivated per run.
    pub batch_size: usize,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_minutes: 60,
            warning_hours: vec![4, 1],
            batch_size: 100,
        }
    }
}

impl CleanupConfig {
    pub fn interval(&self) -> StdDuration {
        StdDuration::from_secs(self.interval_minutes.saturating_mul(60))
    }
}

/// Every setting of the key lifecycle, as one value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessSettings {
    pub access_keys: AccessKeyConfig,
    pub notifications: NotificationConfig,
    pub cleanup: CleanupConfig,
}
