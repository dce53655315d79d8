//! Lockfile encoding and decoding.
//!
//! `botpack.lock` is canonical JSON: sorted keys, 2-space indent, `\n` line
//! endings, a trailing newline, and no embedded timestamps, so two
//! resolutions of the same inputs produce byte-identical files.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::capability::Capabilities;
use crate::core::dependency::DependencySpec;
use crate::core::{PackageId, SourceId, Summary};
use crate::resolver::resolve::Resolve;
use crate::util::InternedString;

/// Current lockfile schema version.
pub const LOCKFILE_VERSION: u32 = 1;

/// Lockfile representation for serialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lockfile {
    /// Lockfile format version
    pub version: u32,

    /// The `botpack` build that produced this lockfile (`CARGO_PKG_VERSION`).
    /// Carried for diagnostics only; compatibility is decided by `version`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_version: Option<String>,

    /// The project manifest schema version (`botpack.toml`'s own `version`
    /// key) this lockfile was resolved against.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec_version: Option<u32>,

    /// Fingerprint of the root manifest's resolution-affecting fields.
    /// Used for content-based freshness detection (`botpack install --locked`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_fingerprint: Option<String>,

    /// The manifest's `[dependencies]` table, copied verbatim. This is what
    /// `--frozen-lockfile` checks a direct dependency's spec against before
    /// reusing its pin.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub direct_dependencies: BTreeMap<String, DependencySpec>,

    /// Locked packages, keyed by `"name@version"`.
    #[serde(default)]
    pub packages: BTreeMap<String, LockedPackage>,
}

/// A locked package entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockedPackage {
    /// Source URL (`path+`, `git+`, `registry+`, or a bare tarball URL).
    pub source: String,

    /// How the source was pinned to an exact commit/build, when applicable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved: Option<ResolvedRef>,

    /// Content integrity digest, `<algo>:<hex>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integrity: Option<String>,

    /// Direct dependencies, as a flat `name -> exact version` map.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dependencies: BTreeMap<String, String>,

    /// Capabilities declared by the package, carried into the lockfile so
    /// the trust gate can be consulted without re-reading every manifest.
    #[serde(default, skip_serializing_if = "is_default_capabilities")]
    pub capabilities: Capabilities,
}

fn is_default_capabilities(c: &Capabilities) -> bool {
    !c.any()
}

/// How a source was pinned to a precise, reproducible reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedRef {
    /// The precise commit hash (git sources).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,

    /// The human-meaningful reference the commit was resolved from
    /// (branch/tag name), kept for diagnostics — resolution always trusts
    /// `commit`, never re-resolves this.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_ref: Option<String>,
}

impl Lockfile {
    /// Create a new lockfile from a Resolve.
    pub fn from_resolve(resolve: &Resolve) -> Self {
        let mut packages = BTreeMap::new();

        let mut entries: Vec<(&PackageId, &Summary)> = resolve.packages().collect();
        entries.sort_by_key(|(id, _)| (id.name().to_string(), id.version().clone()));

        for (pkg_id, summary) in entries {
            let mut dependencies = BTreeMap::new();
            for dep in summary.dependencies() {
                if let Some(dep_id) = resolve.get_package_by_name(dep.name()) {
                    dependencies.insert(dep_id.name().to_string(), dep_id.version().to_string());
                }
            }

            let source_id = pkg_id.source_id();
            let resolved = if source_id.is_git() {
                Some(ResolvedRef {
                    commit: source_id.precise().map(|s| s.to_string()),
                    original_ref: git_reference_label(&source_id),
                })
            } else {
                None
            };

            let key = format!("{}@{}", pkg_id.name(), pkg_id.version());
            packages.insert(
                key,
                LockedPackage {
                    source: strip_precise(&source_id),
                    resolved,
                    integrity: resolve.checksum(*pkg_id).map(|s| s.to_string()),
                    dependencies,
                    capabilities: summary.capabilities(),
                },
            );
        }

        Lockfile {
            version: LOCKFILE_VERSION,
            tool_version: None,
            spec_version: None,
            root_fingerprint: None,
            direct_dependencies: BTreeMap::new(),
            packages,
        }
    }

    /// Set the root manifest fingerprint for content-based freshness
    /// detection.
    pub fn with_root_fingerprint(mut self, fingerprint: String) -> Self {
        self.root_fingerprint = Some(fingerprint);
        self
    }

    /// Stamp the lockfile with the tool version that produced it, the
    /// manifest schema version it was resolved against, and a verbatim copy
    /// of the manifest's direct-dependency table.
    pub fn with_manifest_metadata(
        mut self,
        tool_version: String,
        spec_version: u32,
        direct_dependencies: BTreeMap<String, DependencySpec>,
    ) -> Self {
        self.tool_version = Some(tool_version);
        self.spec_version = Some(spec_version);
        self.direct_dependencies = direct_dependencies;
        self
    }

    /// Load a lockfile from a path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read lockfile: {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse lockfile: {}", path.display()))
    }

    /// Serialize to the canonical JSON text written to disk.
    pub fn to_canonical_json(&self) -> Result<String> {
        let mut text = serde_json::to_string_pretty(self).context("failed to encode lockfile")?;
        text.push('\n');
        Ok(text)
    }

    /// Save the lockfile to a path as canonical JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = self.to_canonical_json()?;
        std::fs::write(path, content)
            .with_context(|| format!("failed to write lockfile: {}", path.display()))?;
        Ok(())
    }

    /// Convert to a Resolve.
    ///
    /// This produces a partial `Resolve`: package identity, direct
    /// dependency edges, and capabilities are all present, but full
    /// `Summary` objects (including every transitive dependency's own
    /// requirement strings) are only as complete as what was recorded at
    /// lock time. Callers that need fully hydrated summaries should re-query
    /// the source for each package instead of relying on this conversion.
    pub fn to_resolve(&self) -> Result<Resolve> {
        let mut resolve = Resolve::new();
        let mut ids: BTreeMap<&str, PackageId> = BTreeMap::new();

        for (key, locked) in &self.packages {
            let (name, version) = split_key(key)?;
            let source_id = SourceId::parse(&locked.source)
                .with_context(|| format!("invalid source in lockfile entry {}", key))?;
            let source_id = match &locked.resolved {
                Some(ResolvedRef {
                    commit: Some(commit),
                    ..
                }) => source_id.with_precise(commit.clone()),
                _ => source_id,
            };
            let version: semver::Version = version.parse()?;
            let pkg_id = PackageId::new(name, version, source_id);

            let summary = Summary::new(pkg_id, vec![], locked.integrity.clone())
                .with_capabilities(locked.capabilities);
            resolve.add_package(pkg_id, summary);
            ids.insert(key.as_str(), pkg_id);
        }

        for (key, locked) in &self.packages {
            let pkg_id = ids[key.as_str()];
            for (dep_name, dep_version) in &locked.dependencies {
                if let Some(dep_id) =
                    resolve.get_package_by_name(InternedString::new(dep_name.as_str()))
                {
                    if dep_id.version().to_string() == *dep_version {
                        resolve.add_edge(pkg_id, dep_id);
                    }
                }
            }
        }

        Ok(resolve)
    }

    /// Check if the lockfile is compatible with this build's schema version.
    pub fn is_compatible(&self) -> bool {
        self.version == LOCKFILE_VERSION
    }
}

fn split_key(key: &str) -> Result<(&str, &str)> {
    key.rsplit_once('@')
        .ok_or_else(|| anyhow::anyhow!("malformed lockfile package key: {}", key))
}

fn strip_precise(source_id: &SourceId) -> String {
    let precise_free = source_id
        .precise()
        .map(|_| {
            let url = source_id.to_url_string();
            url.rsplit_once('#').map(|(base, _)| base.to_string()).unwrap_or(url)
        })
        .unwrap_or_else(|| source_id.to_url_string());
    precise_free
}

fn git_reference_label(source_id: &SourceId) -> Option<String> {
    use crate::core::source_id::GitReference;
    match source_id.git_reference() {
        Some(GitReference::Branch(b)) => Some(b.clone()),
        Some(GitReference::Tag(t)) => Some(t.clone()),
        Some(GitReference::Rev(r)) => Some(r.clone()),
        _ => None,
    }
}
