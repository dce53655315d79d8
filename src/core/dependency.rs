//! Dependency specification.
//!
//! A Dependency describes what a package requires from another package: a
//! name, a version constraint (only meaningful for registry sources), and
//! where to find it.

use std::path::PathBuf;

use semver::VersionReq;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::core::source_id::{GitReference, SourceId};
use crate::util::context::DEFAULT_REGISTRY_URL;
use crate::util::InternedString;

/// A dependency specification.
#[derive(Debug, Clone)]
pub struct Dependency {
    /// Package name.
    name: InternedString,

    /// Version requirement (registry sources only; defaults to `*` otherwise).
    version_req: VersionReq,

    /// Where to find the package.
    source_id: SourceId,

    /// Expected content integrity digest, for tarball dependencies.
    integrity: Option<String>,
}

impl Dependency {
    /// Create a new dependency.
    pub fn new(name: impl Into<InternedString>, source_id: SourceId) -> Self {
        Dependency {
            name: name.into(),
            version_req: VersionReq::STAR,
            source_id,
            integrity: None,
        }
    }

    /// Create a dependency with a version requirement.
    pub fn with_version_req(mut self, req: VersionReq) -> Self {
        self.version_req = req;
        self
    }

    /// Attach an expected integrity digest (tarball dependencies).
    pub fn with_integrity(mut self, integrity: impl Into<String>) -> Self {
        self.integrity = Some(integrity.into());
        self
    }

    /// Get the package name.
    pub fn name(&self) -> InternedString {
        self.name
    }

    /// Get the version requirement.
    pub fn version_req(&self) -> &VersionReq {
        &self.version_req
    }

    /// Get the source ID.
    pub fn source_id(&self) -> SourceId {
        self.source_id
    }

    /// Get the pinned integrity digest, if any.
    pub fn integrity(&self) -> Option<&str> {
        self.integrity.as_deref()
    }

    /// Check if a version matches this dependency's requirement.
    pub fn matches_version(&self, version: &semver::Version) -> bool {
        self.version_req.matches(version)
    }

    /// Check if this is a path dependency.
    pub fn is_path(&self) -> bool {
        self.source_id.is_path()
    }

    /// Check if this is a git dependency.
    pub fn is_git(&self) -> bool {
        self.source_id.is_git()
    }

    /// Check if this is a registry dependency.
    pub fn is_registry(&self) -> bool {
        self.source_id.is_registry()
    }

    /// Check if this is a direct tarball dependency.
    pub fn is_tarball(&self) -> bool {
        self.source_id.is_tarball()
    }
}

/// Dependency specification as it appears in `botpack.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DependencySpec {
    /// Simple semver requirement string, resolved against the default
    /// registry: `acme-quality-skills = "^2.1"`.
    Simple(String),

    /// Detailed specification: git, path, or direct-tarball source.
    Detailed(DetailedDependencySpec),
}

/// Detailed dependency specification. Exactly one of `git`, `path`, or `url`
/// must be present; a bare `version` with none of those implies a registry
/// lookup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetailedDependencySpec {
    /// Version requirement (registry dependencies only).
    #[serde(default)]
    pub version: Option<String>,

    /// Path to a local dependency, relative to the manifest directory.
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Git repository URL.
    #[serde(default)]
    pub git: Option<String>,

    /// Git branch.
    #[serde(default)]
    pub branch: Option<String>,

    /// Git tag.
    #[serde(default)]
    pub tag: Option<String>,

    /// Git revision (commit hash).
    #[serde(default)]
    pub rev: Option<String>,

    /// Direct tarball URL.
    #[serde(default)]
    pub url: Option<String>,

    /// Expected integrity digest for a tarball dependency (`<algo>:<hex>`).
    #[serde(default)]
    pub integrity: Option<String>,

    /// Alternate registry base URL (uses the configured default if absent).
    #[serde(default)]
    pub registry: Option<String>,
}

impl DetailedDependencySpec {
    /// Check if this spec has an explicit source selector.
    pub fn has_explicit_source(&self) -> bool {
        self.path.is_some() || self.git.is_some() || self.url.is_some()
    }
}

impl DependencySpec {
    /// Convert to a Dependency given the package name and manifest directory.
    pub fn to_dependency(
        &self,
        name: &str,
        manifest_dir: &std::path::Path,
    ) -> anyhow::Result<Dependency> {
        match self {
            DependencySpec::Simple(version) => {
                let version_req: VersionReq = version.parse()?;
                let registry_url = Url::parse(DEFAULT_REGISTRY_URL)?;
                let source_id = SourceId::for_registry(&registry_url)?;
                Ok(Dependency::new(name, source_id).with_version_req(version_req))
            }
            DependencySpec::Detailed(spec) => spec.to_dependency(name, manifest_dir),
        }
    }
}

impl DetailedDependencySpec {
    /// Convert to a Dependency.
    pub fn to_dependency(
        &self,
        name: &str,
        manifest_dir: &std::path::Path,
    ) -> anyhow::Result<Dependency> {
        if let Some(ref path) = self.path {
            let full_path = if path.is_absolute() {
                path.clone()
            } else {
                manifest_dir.join(path)
            };
            let source_id = SourceId::for_path(&full_path)?;
            return Ok(Dependency::new(name, source_id));
        }

        if let Some(ref git_url) = self.git {
            let url = Url::parse(git_url)?;
            let reference = if let Some(ref branch) = self.branch {
                GitReference::Branch(branch.clone())
            } else if let Some(ref tag) = self.tag {
                GitReference::Tag(tag.clone())
            } else if let Some(ref rev) = self.rev {
                GitReference::Rev(rev.clone())
            } else {
                GitReference::DefaultBranch
            };
            let source_id = SourceId::for_git(&url, reference)?;
            return Ok(Dependency::new(name, source_id));
        }

        if let Some(ref url) = self.url {
            let parsed = Url::parse(url)?;
            let source_id = SourceId::for_tarball(&parsed)?;
            let mut dep = Dependency::new(name, source_id);
            if let Some(ref integrity) = self.integrity {
                dep = dep.with_integrity(integrity.clone());
            }
            return Ok(dep);
        }

        // No explicit source: registry lookup, either an alternate base or
        // the configured default.
        let registry_url = if let Some(ref url) = self.registry {
            Url::parse(url)?
        } else {
            Url::parse(DEFAULT_REGISTRY_URL)?
        };
        let source_id = SourceId::for_registry(&registry_url)?;

        let version_req = if let Some(ref v) = self.version {
            v.parse()?
        } else {
            VersionReq::STAR
        };

        Ok(Dependency::new(name, source_id).with_version_req(version_req))
    }
}

impl std::fmt::Display for Dependency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)?;
        if self.version_req != VersionReq::STAR {
            write!(f, " {}", self.version_req)?;
        }
        Ok(())
    }
}
