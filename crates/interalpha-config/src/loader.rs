//! Configuration loader with multi-source merging

use crate::{InterAlphaConfig, Paths};
use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};

/// Configuration loader with builder pattern
pub struct ConfigLoader {
    project_dir: PathBuf,
    env_prefix: String,
    config_file: Option<PathBuf>,
    user_config: bool,
}

impl ConfigLoader {
    /// Create a new config loader with default project directory (current dir)
    pub fn new() -> Self {
        Self {
            project_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            env_prefix: "IA".to_string(),
            config_file: None,
            user_config: true,
        }
    }

    /// Set the project directory
    pub fn with_project_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.project_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Set the environment variable prefix (default: "IA")
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Add an explicit config file. Unlike the discovered files it must exist.
    pub fn with_config_file(mut self, path: impl AsRef<Path>) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Skip ~/.config/interalpha/config.toml
    pub fn without_user_config(mut self) -> Self {
        self.user_config = false;
        self
    }

    /// Files that would be read, in precedence order (lowest first).
    pub fn sources(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();
        if self.user_config {
            if let Ok(user_config_file) = Paths::new().user_config_file() {
                files.push(user_config_file);
            }
        }
        files.push(Paths::project_config_file(&self.project_dir));
        files.push(Paths::local_config_file(&self.project_dir));
        files.retain(|f| f.exists());
        if let Some(explicit) = &self.config_file {
            files.push(explicit.clone());
        }
        files
    }

    /// Load configuration from all sources with proper precedence
    pub fn load(self) -> Result<InterAlphaConfig> {
        let mut builder = config::Config::builder();

        // 1. Start with built-in defaults
        let defaults = InterAlphaConfig::default();
        builder = builder.add_source(config::Config::try_from(&defaults)?);

        // 2-5. User, project, local and explicit files
        let explicit = self.config_file.clone();
        for file in self.sources() {
            let required = explicit.as_ref() == Some(&file);
            builder = builder.add_source(
                config::File::from(file)
                    .required(required)
                    .format(config::FileFormat::Toml),
            );
        }

        // 6. Environment variables (IA_SECTION__KEY)
        builder = builder.add_source(
            config::Environment::with_prefix(&self.env_prefix)
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("cleanup.warning_hours")
                .try_parsing(true),
        );

        // Build and deserialize
        let config = builder.build().context("Failed to build configuration")?;

        let interalpha_config: InterAlphaConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        interalpha_config
            .validate()
            .context("Configuration rejected")?;

        Ok(interalpha_config)
    }

    /// Load configuration or return defaults if not found
    pub fn load_or_default(self) -> InterAlphaConfig {
        self.load().unwrap_or_default()
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn loader(dir: &Path) -> ConfigLoader {
        ConfigLoader::new()
            .with_project_dir(dir)
            .without_user_config()
            .with_env_prefix("IA_CONFIG_LOADER_TEST")
    }

    #[test]
    fn test_load_defaults() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let config = loader(temp_dir.path())
            .load()
            .expect("Failed to load config");

        assert_eq!(config, InterAlphaConfig::default());
    }

    #[test]
    fn test_load_project_config() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let project_dir = temp_dir.path();

        let config_content = r#"
[access_keys]
max_active_keys = 5
default_ttl_secs = 3600

[notifications]
portal_url = "https://portal.interalpha.com.br"

[cleanup]
warning_hours = [12, 2]
"#;
        fs::write(project_dir.join("interalpha.toml"), config_content)
            .expect("Failed to write config");

        let config = loader(project_dir).load().expect("Failed to load config");

        assert_eq!(config.access_keys.max_active_keys, 5);
        assert_eq!(config.access_keys.default_ttl_secs, 3600);
        assert_eq!(config.access_keys.store_timeout_ms, 2_000);
        assert_eq!(
            config.notifications.portal_url,
            "https://portal.interalpha.com.br"
        );
        assert_eq!(config.cleanup.warning_hours, vec![12, 2]);
        assert!(config.cleanup.enabled);
    }

    #[test]
    fn test_local_overrides() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let project_dir = temp_dir.path();

        fs::write(
            project_dir.join("interalpha.toml"),
            r#"
[notifications]
company_name = "InterAlpha Matriz"
sms_enabled = true
"#,
        )
        .expect("Failed to write project config");

        fs::write(
            project_dir.join("interalpha.local.toml"),
            r#"
[notifications]
sms_enabled = false
"#,
        )
        .expect("Failed to write local config");

        let config = loader(project_dir).load().expect("Failed to load config");

        assert_eq!(config.notifications.company_name, "InterAlpha Matriz");
        assert!(!config.notifications.sms_enabled);
    }

    #[test]
    fn test_explicit_file_wins_over_project_files() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let project_dir = temp_dir.path();

        fs::write(
            project_dir.join("interalpha.local.toml"),
            "[cleanup]\nbatch_size = 10\n",
        )
        .expect("Failed to write local config");
        let explicit = project_dir.join("ops.toml");
        fs::write(&explicit, "[cleanup]\nbatch_size = 500\n").expect("Failed to write config");

        let config = loader(project_dir)
            .with_config_file(&explicit)
            .load()
            .expect("Failed to load config");
        assert_eq!(config.cleanup.batch_size, 500);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let result = loader(temp_dir.path())
            .with_config_file(temp_dir.path().join("missing.toml"))
            .load();
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let project_dir = temp_dir.path();
        fs::write(
            project_dir.join("interalpha.toml"),
            "[access_keys]\nmax_active_keys = 0\n",
        )
        .expect("Failed to write config");

        let err = loader(project_dir).load().unwrap_err();
        assert!(format!("{err:#}").contains("max_active_keys"));
        assert_eq!(
            loader(project_dir).load_or_default(),
            InterAlphaConfig::default()
        );
    }

    // Environment overrides are not exercised here: setting variables is
    // process-global and `unsafe` on this edition. In actual usage:
    //
    // IA_ACCESS_KEYS__MAX_ACTIVE_KEYS=5
    // IA_CLEANUP__WARNING_HOURS=6,1
    // IA_NOTIFICATIONS__SMS_ENABLED=false
}
