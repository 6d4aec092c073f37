//! Configuration management for InterAlpha authorization
//!
//! Provides hierarchical configuration loading from multiple sources:
//! 1. Environment variables (IA_* prefix, `__` between section and key)
//! 2. interalpha.local.toml (gitignored, local overrides)
//! 3. interalpha.toml (git-tracked, project config)
//! 4. ~/.config/interalpha/config.toml (user defaults)
//! 5. Built-in defaults (lowest precedence)
//!
//! An explicit file passed to [`ConfigLoader::with_config_file`] sits
//! between the local file and the environment.

use anyhow::Result;
use interalpha_access::{AccessKeyConfig, AccessSettings, CleanupConfig, NotificationConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;

mod error;
mod loader;
mod paths;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use paths::Paths;

/// Largest accepted `cleanup.warning_hours` entry.
pub const MAX_WARNING_HOURS: u32 = 24 * 365;

/// Main InterAlpha configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterAlphaConfig {
    pub access_keys: AccessKeyConfig,
    pub notifications: NotificationConfig,
    pub cleanup: CleanupConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default `tracing` filter when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl InterAlphaConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        ConfigLoader::new().load()
    }

    /// Load configuration from specific project directory
    pub fn load_from_dir(project_dir: impl AsRef<Path>) -> Result<Self> {
        ConfigLoader::new().with_project_dir(project_dir).load()
    }

    /// Rejects values the key lifecycle cannot run with.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::ValidationError(msg.to_string()));

        if self.access_keys.max_active_keys == 0 {
            return invalid("access_keys.max_active_keys must be at least 1");
        }
        if self.access_keys.default_ttl_secs == 0 {
            return invalid("access_keys.default_ttl_secs must be positive");
        }
        if self.access_keys.store_timeout_ms == 0 {
            return invalid("access_keys.store_timeout_ms must be positive");
        }
        if self.cleanup.batch_size == 0 {
            return invalid("cleanup.batch_size must be at least 1");
        }
        if self.cleanup.interval_minutes == 0 {
            return invalid("cleanup.interval_minutes must be positive");
        }
        if self
            .cleanup
            .warning_hours
            .iter()
            .any(|h| *h > MAX_WARNING_HOURS)
        {
            return invalid("cleanup.warning_hours entries must be at most 8760 (one year)");
        }
        if self.notifications.portal_url.trim().is_empty() {
            return invalid("notifications.portal_url must not be empty");
        }
        Ok(())
    }

    /// Settings for `ClientKeyService`.
    pub fn access_settings(&self) -> AccessSettings {
        AccessSettings {
            access_keys: self.access_keys.clone(),
            notifications: self.notifications.clone(),
            cleanup: self.cleanup.clone(),
        }
    }

    /// The effective configuration as TOML.
    pub fn to_toml(&self) -> std::result::Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}
