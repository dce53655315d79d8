//! Global context for botpack operations.
//!
//! Provides centralized access to configuration, paths, and environment.
//! Workspace root resolution follows the precedence order: explicit flag >
//! named global profile > environment variable > parent search for the
//! manifest filename > current directory.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use directories::ProjectDirs;

use crate::core::workspace::{find_manifest as ws_find_manifest, ManifestError};

/// Project directories for botpack.
static PROJECT_DIRS: LazyLock<Option<ProjectDirs>> =
    LazyLock::new(|| ProjectDirs::from("dev", "botpack", "botpack"));

/// The registry used when a dependency gives a bare version requirement
/// with no other source selector, and no `BOTPACK_REGISTRY_URL`/config
/// override is in effect.
pub const DEFAULT_REGISTRY_URL: &str = "https://registry.botpack.dev";

/// Global context containing configuration and paths.
#[derive(Debug, Clone)]
pub struct GlobalContext {
    /// Current working directory.
    cwd: PathBuf,

    /// An explicit workspace root, if one was passed via `--root`.
    explicit_root: Option<PathBuf>,

    /// A named global profile directory, if `--global --profile <name>` was used.
    global_profile: Option<String>,

    /// Home directory for global botpack data (defaults to platform cache dir).
    home: PathBuf,

    /// Content-addressed store root, resolved from `BOTPACK_STORE` or `home/store`.
    store_root: PathBuf,

    /// Default registry base URL, resolved from `BOTPACK_REGISTRY_URL` if set.
    registry_url: Option<String>,

    /// Whether to use verbose output.
    verbose: bool,

    /// Whether operations run offline (no network fetches).
    offline: bool,

    /// Whether to use colors in output.
    color: bool,
}

impl GlobalContext {
    /// Create a new GlobalContext with defaults, resolving environment
    /// variables and platform directories.
    pub fn new() -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;

        let home = if let Ok(root) = std::env::var("BOTPACK_ROOT") {
            PathBuf::from(root)
        } else if let Some(dirs) = PROJECT_DIRS.as_ref() {
            dirs.cache_dir().to_path_buf()
        } else {
            dirs::home_dir()
                .map(|h| h.join(".botpack"))
                .unwrap_or_else(|| PathBuf::from(".botpack"))
        };

        let store_root = std::env::var("BOTPACK_STORE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| home.join("store"));

        let registry_url = std::env::var("BOTPACK_REGISTRY_URL").ok();

        Ok(GlobalContext {
            cwd,
            explicit_root: None,
            global_profile: None,
            home,
            store_root,
            registry_url,
            verbose: false,
            offline: false,
            color: true,
        })
    }

    /// Create a GlobalContext with a specific working directory.
    pub fn with_cwd(cwd: PathBuf) -> Result<Self> {
        let mut ctx = Self::new()?;
        ctx.cwd = cwd;
        Ok(ctx)
    }

    /// Set the explicit workspace root (`--root <path>`), highest precedence.
    pub fn set_explicit_root(&mut self, root: Option<PathBuf>) {
        self.explicit_root = root;
    }

    /// Set a named global profile (`--global --profile <name>`).
    pub fn set_global_profile(&mut self, profile: Option<String>) {
        self.global_profile = profile;
    }

    /// Set verbose mode.
    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    /// Set color output.
    pub fn set_color(&mut self, color: bool) {
        self.color = color;
    }

    /// Set offline mode.
    pub fn set_offline(&mut self, offline: bool) {
        self.offline = offline;
    }

    /// Get the current working directory.
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Get the botpack home directory (global data root).
    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Get the content-addressed store root.
    pub fn store_root(&self) -> &Path {
        &self.store_root
    }

    /// Get the configured default registry base URL, if any.
    pub fn registry_url(&self) -> Option<&str> {
        self.registry_url.as_deref()
    }

    /// Get the global configuration file path.
    pub fn config_path(&self) -> PathBuf {
        self.home.join("config.toml")
    }

    /// Get the global profile's root directory, if a profile is active.
    pub fn global_profile_dir(&self) -> Option<PathBuf> {
        self.global_profile
            .as_ref()
            .map(|name| self.home.join("profiles").join(name))
    }

    /// Check if verbose mode is enabled.
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Check if offline mode is enabled.
    pub fn is_offline(&self) -> bool {
        self.offline
    }

    /// Check if color output is enabled.
    pub fn color(&self) -> bool {
        self.color
    }

    /// Resolve the workspace root per the documented precedence:
    /// explicit flag > named global profile > `BOTPACK_ROOT` env var >
    /// parent search for `botpack.toml` > current directory.
    pub fn resolve_workspace_root(&self) -> Result<PathBuf, ManifestError> {
        if let Some(root) = &self.explicit_root {
            return Ok(root.clone());
        }

        if let Some(profile_dir) = self.global_profile_dir() {
            return Ok(profile_dir);
        }

        if let Ok(env_root) = std::env::var("BOTPACK_ROOT") {
            return Ok(PathBuf::from(env_root));
        }

        self.find_workspace_root()
    }

    /// Find the manifest file (`botpack.toml`) starting from cwd and
    /// searching upward.
    pub fn find_manifest(&self) -> Result<PathBuf, ManifestError> {
        let mut current = self.cwd.clone();
        loop {
            match ws_find_manifest(&current) {
                Ok(path) => return Ok(path),
                Err(ManifestError::NotFound { .. }) => {
                    if !current.pop() {
                        return Err(ManifestError::NotFound { dir: self.cwd.clone() });
                    }
                }
                Err(other) => return Err(other),
            }
        }
    }

    /// Find the workspace root (directory containing `botpack.toml`).
    pub fn find_workspace_root(&self) -> Result<PathBuf, ManifestError> {
        self.find_manifest().map(|p| p.parent().unwrap().to_path_buf())
    }

    /// Get the workspace-local `.botpack/` state directory for a given
    /// workspace root.
    pub fn botpack_dir(&self, workspace_root: &Path) -> PathBuf {
        workspace_root.join(".botpack")
    }

    /// Ensure a directory exists, creating it if necessary.
    pub fn ensure_dir(&self, path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::create_dir_all(path)
                .with_context(|| format!("failed to create directory: {}", path.display()))?;
        }
        Ok(())
    }
}

impl Default for GlobalContext {
    fn default() -> Self {
        Self::new().expect("failed to create default GlobalContext")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_context_paths() {
        let ctx = GlobalContext::new().unwrap();
        assert!(ctx.cwd().is_absolute());
    }

    #[test]
    fn test_find_manifest() {
        let tmp = TempDir::new().unwrap();
        let manifest = tmp.path().join("botpack.toml");
        std::fs::write(&manifest, "version = 1\n[workspace]\ndir = \".\"\n").unwrap();

        let ctx = GlobalContext::with_cwd(tmp.path().to_path_buf()).unwrap();
        assert_eq!(ctx.find_manifest().ok(), Some(manifest));
    }

    #[test]
    fn test_find_manifest_searches_upward() {
        let tmp = TempDir::new().unwrap();
        let manifest = tmp.path().join("botpack.toml");
        std::fs::write(&manifest, "version = 1\n[workspace]\ndir = \".\"\n").unwrap();

        let nested = tmp.path().join("a/b/c");
        std::fs::create_dir_all(&nested).unwrap();

        let ctx = GlobalContext::with_cwd(nested).unwrap();
        assert_eq!(ctx.find_manifest().ok(), Some(manifest));
    }

    #[test]
    fn test_explicit_root_wins() {
        let tmp = TempDir::new().unwrap();
        let explicit = tmp.path().join("elsewhere");
        std::fs::create_dir_all(&explicit).unwrap();

        let mut ctx = GlobalContext::with_cwd(tmp.path().to_path_buf()).unwrap();
        ctx.set_explicit_root(Some(explicit.clone()));
        assert_eq!(ctx.resolve_workspace_root().unwrap(), explicit);
    }
}
