//! Where configuration files are looked up.
//!
//! One per-user file under the platform config directory, and two files in
//! the directory the tools run from.

use crate::ConfigError;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Config file locations for the `interalpha` tools.
pub struct Paths {
    project_dirs: Option<ProjectDirs>,
}

impl Paths {
    /// Resolves the per-user directory from `$XDG_CONFIG_HOME` or the
    /// platform equivalent. Without a home directory the per-user lookups
    /// return [`ConfigError::XdgError`].
    pub fn new() -> Self {
        Self {
            project_dirs: ProjectDirs::from("br.com", "InterAlpha", "interalpha"),
        }
    }

    /// `~/.config/interalpha/` on Linux.
    pub fn user_config_dir(&self) -> Result<PathBuf, ConfigError> {
        self.project_dirs
            .as_ref()
            .map(|p| p.config_dir().to_path_buf())
            .ok_or_else(|| {
                ConfigError::XdgError("No home directory for per-user settings".to_string())
            })
    }

    /// Per-user overrides, read before any project file.
    pub fn user_config_file(&self) -> Result<PathBuf, ConfigError> {
        Ok(self.user_config_dir()?.join("config.toml"))
    }

    /// Shared settings checked into the deployment repository.
    pub fn project_config_file(project_dir: impl AsRef<Path>) -> PathBuf {
        project_dir.as_ref().join("interalpha.toml")
    }

    /// Machine-specific overrides; not meant to be committed.
    pub fn local_config_file(project_dir: impl AsRef<Path>) -> PathBuf {
        project_dir.as_ref().join("interalpha.local.toml")
    }
}

impl Default for Paths {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_user_file_sits_in_app_dir() {
        let paths = Paths::new();

        // No home directory on some CI runners.
        if let (Ok(dir), Ok(file)) = (paths.user_config_dir(), paths.user_config_file()) {
            assert!(dir.to_string_lossy().contains("interalpha"));
            assert_eq!(file.parent(), Some(dir.as_path()));
        }
    }

    #[test]
    fn test_project_and_local_files_share_a_dir() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let project_dir = temp_dir.path();

        let shared = Paths::project_config_file(project_dir);
        let local = Paths::local_config_file(project_dir);
        assert_eq!(shared.file_name().and_then(|n| n.to_str()), Some("interalpha.toml"));
        assert_eq!(local.file_name().and_then(|n| n.to_str()), Some("interalpha.local.toml"));
        assert_eq!(shared.parent(), local.parent());
    }
}
