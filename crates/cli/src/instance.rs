//! Persisted per-user instance configuration.
//!
//! `tokenvault init` writes a small JSON file recording the chosen backend
//! and the cipher material location; every other subcommand loads it to
//! reconstruct the same manager.

use std::path::{Path, PathBuf};

use {
    anyhow::{Context, Result},
    directories::ProjectDirs,
    serde::{Deserialize, Serialize},
    tracing::debug,
};

use tokenvault_store::StoreConfig;

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "tokenvault")
}

/// User-global config directory (`~/.config/tokenvault` on Linux).
pub fn config_dir() -> PathBuf {
    project_dirs()
        .map(|d| d.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".config/tokenvault"))
}

/// User-global data directory; default home of the on-disk stores.
pub fn data_dir() -> PathBuf {
    project_dirs()
        .map(|d| d.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".local/share/tokenvault"))
}

pub fn default_config_path() -> PathBuf {
    config_dir().join("config.json")
}

/// The persisted backend choice plus the cipher material location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceConfig {
    pub store: StoreConfig,
    pub cipher_path: PathBuf,
}

impl InstanceConfig {
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;

        // The config names the cipher file; keep it owner-only.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }

        debug!(path = %path.display(), "instance config saved");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path).with_context(|| {
            format!(
                "no vault configuration at {}; run `tokenvault init` first",
                path.display()
            )
        })?;
        serde_json::from_str(&data)
            .with_context(|| format!("instance config at {} is invalid", path.display()))
    }

    /// Build the manager this configuration describes.
    pub async fn manager(&self) -> Result<tokenvault_core::Manager> {
        let store = self.store.build()?;
        let manager = tokenvault_core::Manager::new(store, &self.cipher_path).await?;
        Ok(manager)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let config = InstanceConfig {
            store: StoreConfig::Snapshot {
                path: dir.path().join("vault.snapshot"),
                truncate: false,
            },
            cipher_path: dir.path().join("material"),
        };
        config.save(&path).unwrap();

        let loaded = InstanceConfig::load(&path).unwrap();
        assert_eq!(loaded.store, config.store);
        assert_eq!(loaded.cipher_path, config.cipher_path);
    }

    #[test]
    fn load_missing_config_mentions_init() {
        let dir = tempfile::tempdir().unwrap();
        let err = InstanceConfig::load(&dir.path().join("config.json")).unwrap_err();
        assert!(err.to_string().contains("tokenvault init"));
    }

    #[cfg(unix)]
    #[test]
    fn saved_config_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let config = InstanceConfig {
            store: StoreConfig::Memory,
            cipher_path: dir.path().join("material"),
        };
        config.save(&path).unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
