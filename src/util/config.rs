//! Configuration file support for Botpack.
//!
//! Botpack supports two configuration file locations:
//! - Global: `<home>/config.toml` - user-wide defaults
//! - Project: `.botpack/config.toml` - project-specific overrides
//!
//! Project config takes precedence over global config.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::manifest::LinkMode;

/// Botpack configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Store settings
    pub store: StoreConfig,

    /// Registry settings
    pub registry: RegistryConfig,

    /// Network settings
    pub net: NetConfig,
}

/// Store-related configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StoreConfig {
    /// Default link mode for populating the virtual store.
    pub link_mode: Option<String>,
}

/// Registry-related configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Default registry base URL, absent a `BOTPACK_REGISTRY_URL` override.
    pub url: Option<String>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        RegistryConfig { url: None }
    }
}

/// Network-related configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NetConfig {
    /// Fetch timeout in seconds.
    pub timeout_secs: Option<u64>,

    /// Offline by default (don't fetch from network unless `--offline` is
    /// explicitly overridden on the command line).
    #[serde(default)]
    pub offline: bool,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        if other.store.link_mode.is_some() {
            self.store.link_mode = other.store.link_mode;
        }

        if other.registry.url.is_some() {
            self.registry.url = other.registry.url;
        }

        if other.net.timeout_secs.is_some() {
            self.net.timeout_secs = other.net.timeout_secs;
        }
        if other.net.offline {
            self.net.offline = true;
        }
    }

    /// Parse the configured default link mode.
    pub fn link_mode(&self) -> Option<LinkMode> {
        self.store.link_mode.as_deref().and_then(|s| match s {
            "auto" => Some(LinkMode::Auto),
            "symlink" => Some(LinkMode::Symlink),
            "hardlink" => Some(LinkMode::Hardlink),
            "copy" => Some(LinkMode::Copy),
            _ => None,
        })
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (`.botpack/config.toml`)
/// 2. Global config (`<home>/config.toml`)
/// 3. Defaults
pub fn load_config(global_path: &Path, project_path: &Path) -> Config {
    let mut config = Config::default();

    // Load global config first
    if global_path.exists() {
        let global = Config::load_or_default(global_path);
        config.merge(global);
    }

    // Project config overrides global
    if project_path.exists() {
        let project = Config::load_or_default(project_path);
        config.merge(project);
    }

    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(config.store.link_mode.is_none());
        assert!(config.registry.url.is_none());
        assert!(!config.net.offline);
    }

    #[test]
    fn test_config_load() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.toml");

        std::fs::write(
            &config_path,
            r#"
[store]
linkMode = "hardlink"

[registry]
url = "https://registry.example.com"

[net]
timeoutSecs = 30
"#,
        )
        .unwrap();

        let config = Config::load(&config_path).unwrap();
        assert_eq!(config.store.link_mode, Some("hardlink".to_string()));
        assert_eq!(config.registry.url, Some("https://registry.example.com".to_string()));
        assert_eq!(config.net.timeout_secs, Some(30));
    }

    #[test]
    fn test_config_merge() {
        let mut base = Config::default();
        base.store.link_mode = Some("symlink".to_string());
        base.net.timeout_secs = Some(60);

        let mut override_cfg = Config::default();
        override_cfg.store.link_mode = Some("copy".to_string());

        base.merge(override_cfg);

        assert_eq!(base.store.link_mode, Some("copy".to_string()));
        assert_eq!(base.net.timeout_secs, Some(60)); // not overridden
    }

    #[test]
    fn test_config_parse_link_mode() {
        let mut config = Config::default();
        config.store.link_mode = Some("hardlink".to_string());

        assert_eq!(config.link_mode(), Some(LinkMode::Hardlink));
    }
}
