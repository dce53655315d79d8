//! Workspace — the project root: its manifest, lockfile, and `.botpack/`
//! state directory.

use std::path::{Path, PathBuf};

use anyhow::Result;
use thiserror::Error;

use crate::core::{Dependency, Manifest, PackageId, SourceId, Summary};
use crate::util::GlobalContext;

/// Canonical project manifest filename.
pub const MANIFEST_NAME: &str = "botpack.toml";

/// Canonical lockfile filename.
pub const LOCKFILE_NAME: &str = "botpack.lock";

/// Errors that can occur while locating the project manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("could not find `{}` in `{}` or any parent directory", MANIFEST_NAME, dir.display())]
    NotFound { dir: PathBuf },
}

/// Search `dir` (non-recursively) for the manifest file.
pub fn find_manifest(dir: &Path) -> Result<PathBuf, ManifestError> {
    let candidate = dir.join(MANIFEST_NAME);
    if candidate.is_file() {
        Ok(candidate)
    } else {
        Err(ManifestError::NotFound { dir: dir.to_path_buf() })
    }
}

/// Search `dir` and its parents for the manifest file.
pub fn find_lockfile(workspace_root: &Path) -> PathBuf {
    workspace_root.join(LOCKFILE_NAME)
}

/// A workspace: the project manifest plus its root directory.
#[derive(Debug)]
pub struct Workspace {
    manifest: Manifest,
    root: PathBuf,
}

impl Workspace {
    /// Load a workspace from a manifest path.
    pub fn new(manifest_path: &Path, _ctx: &GlobalContext) -> Result<Self> {
        let manifest = Manifest::load(manifest_path)?;
        let root = manifest_path
            .parent()
            .unwrap_or(Path::new("."))
            .to_path_buf();

        Ok(Workspace { manifest, root })
    }

    /// Get the workspace root directory (the directory containing
    /// `botpack.toml`).
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the manifest.
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Get a mutable reference to the manifest (used by `add`/`remove`).
    pub fn manifest_mut(&mut self) -> &mut Manifest {
        &mut self.manifest
    }

    /// The directory the workspace's assets are rooted at (`[workspace].dir`).
    pub fn assets_dir(&self) -> PathBuf {
        self.root.join(&self.manifest.workspace.dir)
    }

    /// Get the workspace display name.
    pub fn name(&self) -> String {
        self.manifest.name()
    }

    /// Path to `botpack.toml`.
    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_NAME)
    }

    /// Path to `botpack.lock`.
    pub fn lockfile_path(&self) -> PathBuf {
        find_lockfile(&self.root)
    }

    /// Path to the workspace's `.botpack/` state directory.
    pub fn botpack_dir(&self) -> PathBuf {
        self.root.join(".botpack")
    }

    /// Path to the virtual store (`.botpack/pkgs/`).
    pub fn pkgs_dir(&self) -> PathBuf {
        self.botpack_dir().join("pkgs")
    }

    /// Path to the generated output directory for a given target.
    pub fn generated_dir(&self, target: &str) -> PathBuf {
        self.botpack_dir().join("generated").join(target)
    }

    /// Path to the per-target sync state file.
    pub fn sync_state_path(&self, target: &str) -> PathBuf {
        self.botpack_dir()
            .join("state")
            .join(format!("sync-{target}.json"))
    }

    /// Path to the asset catalog.
    pub fn catalog_path(&self) -> PathBuf {
        self.botpack_dir().join("catalog.json")
    }

    /// Path to the trust store.
    pub fn trust_path(&self) -> PathBuf {
        self.botpack_dir().join("trust.toml")
    }

    /// Path to the workspace-level advisory lock.
    pub fn lock_path(&self) -> PathBuf {
        self.botpack_dir().join(".lock")
    }

    /// Ensure `.botpack/` and its standard subdirectories exist.
    pub fn ensure_botpack_dir(&self) -> Result<()> {
        let dir = self.botpack_dir();
        crate::util::fs::ensure_dir(&dir)?;
        crate::util::fs::ensure_dir(&dir.join("pkgs"))?;
        crate::util::fs::ensure_dir(&dir.join("generated"))?;
        crate::util::fs::ensure_dir(&dir.join("state"))?;
        Ok(())
    }

    /// Build a synthetic root `Summary` for the workspace, so the resolver
    /// can BFS outward from its direct dependencies. The workspace itself
    /// has no registry identity: name is the workspace's display name,
    /// version is always `0.0.0`, and the source is the workspace root
    /// treated as a path source.
    pub fn root_summary(&self) -> Result<Summary> {
        let source_id = SourceId::for_path(&self.root)?;
        let package_id = PackageId::new(self.name(), semver::Version::new(0, 0, 0), source_id);

        let deps: Result<Vec<Dependency>> = self
            .manifest
            .dependencies
            .iter()
            .map(|(name, spec)| spec.to_dependency(name, &self.root))
            .collect();

        Ok(Summary::new(package_id, deps?, None))
    }

    /// Fingerprint of the resolution-affecting fields of `botpack.toml`
    /// (its dependency table), used to detect whether `botpack.lock` is
    /// stale without comparing file modification times.
    pub fn manifest_fingerprint(&self) -> String {
        let mut entries: Vec<(&String, String)> = self
            .manifest
            .dependencies
            .iter()
            .map(|(name, spec)| (name, format!("{:?}", spec)))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));

        let mut fp = crate::util::hash::Fingerprint::new();
        for (name, spec) in entries {
            fp.update_str(name);
            fp.update_str(&spec);
        }
        fp.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_test_manifest(dir: &Path) -> PathBuf {
        let manifest_path = dir.join(MANIFEST_NAME);
        std::fs::write(
            &manifest_path,
            r#"
version = 1

[workspace]
dir = "."
name = "testws"

[dependencies]
acme-quality-skills = "^2.1"
"#,
        )
        .unwrap();
        manifest_path
    }

    #[test]
    fn test_workspace_creation() {
        let tmp = TempDir::new().unwrap();
        let manifest_path = write_test_manifest(tmp.path());
        let ctx = GlobalContext::with_cwd(tmp.path().to_path_buf()).unwrap();

        let ws = Workspace::new(&manifest_path, &ctx).unwrap();
        assert_eq!(ws.name(), "testws");
        assert!(ws.lockfile_path().ends_with(LOCKFILE_NAME));
    }

    #[test]
    fn test_workspace_root_summary() {
        let tmp = TempDir::new().unwrap();
        let manifest_path = write_test_manifest(tmp.path());
        let ctx = GlobalContext::with_cwd(tmp.path().to_path_buf()).unwrap();

        let ws = Workspace::new(&manifest_path, &ctx).unwrap();
        let summary = ws.root_summary().unwrap();
        assert_eq!(summary.dependencies().len(), 1);
    }

    #[test]
    fn test_find_manifest_not_found() {
        let tmp = TempDir::new().unwrap();
        assert!(find_manifest(tmp.path()).is_err());
    }
}
