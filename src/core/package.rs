//! Package — a fetched asset bundle: its manifest plus the on-disk location
//! of its asset directories (`skills/`, `commands/`, `agents/`, `mcp/`,
//! `policy/`).

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use semver::Version;

use crate::core::summary::Summary;
use crate::core::{PackageId, PackageManifest, SourceId};
use crate::util::InternedString;

/// The package manifest's conventional filename within a package root.
pub const PACKAGE_MANIFEST_NAME: &str = "agentpkg.toml";

/// A fetched package: its manifest and the directory its content lives in.
#[derive(Debug, Clone)]
pub struct Package {
    package_id: PackageId,
    manifest: PackageManifest,
    root: PathBuf,
}

impl Package {
    /// Construct a package from an already-parsed manifest, its root
    /// directory, and the source it was fetched from.
    pub fn with_source_id(
        manifest: PackageManifest,
        root: PathBuf,
        source_id: SourceId,
    ) -> Result<Self> {
        let version = manifest.semver()?;
        let package_id = PackageId::new(&manifest.name, version, source_id);

        Ok(Package {
            package_id,
            manifest,
            root,
        })
    }

    /// Load a package from its root directory, treating it as a path
    /// source. Used for local/workspace-relative `{path}` dependencies.
    pub fn load(root: &Path) -> Result<Self> {
        let manifest_path = root.join(PACKAGE_MANIFEST_NAME);
        let manifest = PackageManifest::load(&manifest_path).with_context(|| {
            format!(
                "failed to load package manifest from {}",
                manifest_path.display()
            )
        })?;
        let source_id = SourceId::for_path(root)?;
        Self::with_source_id(manifest, root.to_path_buf(), source_id)
    }

    /// Get the package ID.
    pub fn package_id(&self) -> PackageId {
        self.package_id
    }

    /// Get the package name.
    pub fn name(&self) -> InternedString {
        self.package_id.name()
    }

    /// Get the package version.
    pub fn version(&self) -> &Version {
        self.package_id.version()
    }

    /// Get the source ID.
    pub fn source_id(&self) -> SourceId {
        self.package_id.source_id()
    }

    /// Get the package manifest.
    pub fn manifest(&self) -> &PackageManifest {
        &self.manifest
    }

    /// Get the package root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the package manifest file path.
    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(PACKAGE_MANIFEST_NAME)
    }

    /// Directory holding `skills/<id>/SKILL.md` assets, if declared.
    pub fn skills_dir(&self) -> PathBuf {
        self.root.join("skills")
    }

    /// Directory holding `commands/<id>.md` assets, if declared.
    pub fn commands_dir(&self) -> PathBuf {
        self.root.join("commands")
    }

    /// Directory holding `agents/<id>.md` assets, if declared.
    pub fn agents_dir(&self) -> PathBuf {
        self.root.join("agents")
    }

    /// `mcp/servers.toml`, if present.
    pub fn mcp_manifest_path(&self) -> PathBuf {
        self.root.join("mcp").join("servers.toml")
    }

    /// Directory holding `policy/*` fragments, if declared.
    pub fn policy_dir(&self) -> PathBuf {
        self.root.join("policy")
    }

    /// Build a resolution-ready [`Summary`] from this package's manifest,
    /// converting its declared `[dependencies]` table relative to its own
    /// root directory.
    pub fn to_summary(&self) -> Result<Summary> {
        let mut dependencies = Vec::with_capacity(self.manifest.dependencies.len());
        for (name, spec) in &self.manifest.dependencies {
            dependencies.push(spec.to_dependency(name, &self.root)?);
        }

        Ok(Summary::new(self.package_id, dependencies, None)
            .with_capabilities(self.manifest.capabilities))
    }
}

impl std::fmt::Display for Package {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.package_id)
    }
}

impl PartialEq for Package {
    fn eq(&self, other: &Self) -> bool {
        self.package_id == other.package_id
    }
}

impl Eq for Package {}

impl std::hash::Hash for Package {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.package_id.hash(state);
    }
}
