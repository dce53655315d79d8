//! Registry source - the static HTTP package registry.
//!
//! A botpack registry is a plain file server: `GET <base>/<name>/versions.json`
//! returns the full version index for a package. Each entry names a tarball
//! URL and its expected content digest; there is no API beyond that. Direct
//! `{url = "..."}` tarball dependencies reuse the same fetch-verify-extract
//! path via [`TarballSource`], skipping the index lookup.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read as _;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use flate2::read::GzDecoder;
use serde::Deserialize;
use tar::Archive;
use url::Url;

use crate::core::dependency::DependencySpec;
use crate::core::package::PACKAGE_MANIFEST_NAME;
use crate::core::{Dependency, Package, PackageId, SourceId, Summary};
use crate::sources::Source;
use crate::util::hash::ContentDigest;

/// One version entry in a registry's `<name>/versions.json` index.
#[derive(Debug, Clone, Deserialize)]
struct VersionEntry {
    version: String,
    /// Tarball URL. Relative URLs are resolved against the registry base.
    url: String,
    /// Expected content digest, `<algo>:<hex>`.
    integrity: String,
    #[serde(default)]
    dependencies: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct VersionsIndex {
    versions: Vec<VersionEntry>,
}

/// A source backed by a static HTTP registry index.
pub struct RegistrySource {
    base_url: Url,
    cache_dir: PathBuf,
    source_id: SourceId,
    index: Option<HashMap<String, Vec<VersionEntry>>>,
    extracted: HashMap<PackageId, PathBuf>,
    offline: bool,
}

impl RegistrySource {
    /// Create a new registry source rooted at `base_url`.
    pub fn new(base_url: Url, cache_dir: &Path, source_id: SourceId) -> Self {
        RegistrySource {
            base_url,
            cache_dir: cache_dir.join("registry"),
            source_id,
            index: None,
            extracted: HashMap::new(),
            offline: false,
        }
    }

    /// Disable network access; index lookups for uncached packages fail.
    pub fn set_offline(&mut self, offline: bool) {
        self.offline = offline;
    }

    fn fetch_index(&mut self, name: &str) -> Result<&[VersionEntry]> {
        if self.index.as_ref().map_or(true, |i| !i.contains_key(name)) {
            if self.offline {
                bail!("offline mode: cannot fetch registry index for {}", name);
            }

            let index_url = self
                .base_url
                .join(&format!("{}/versions.json", name))
                .with_context(|| format!("invalid registry URL for {}", name))?;

            let body = reqwest::blocking::get(index_url.clone())
                .with_context(|| format!("failed to fetch {}", index_url))?
                .error_for_status()
                .with_context(|| format!("registry returned an error for {}", index_url))?
                .text()
                .context("failed to read registry response body")?;

            let parsed: VersionsIndex = serde_json::from_str(&body)
                .with_context(|| format!("invalid versions.json for {}", name))?;

            self.index
                .get_or_insert_with(HashMap::new)
                .insert(name.to_string(), parsed.versions);
        }

        Ok(self
            .index
            .as_ref()
            .and_then(|i| i.get(name))
            .map(Vec::as_slice)
            .unwrap_or(&[]))
    }

    fn package_dir(&self, pkg_id: PackageId) -> PathBuf {
        self.cache_dir
            .join(format!("{}-{}", pkg_id.name(), pkg_id.version()))
    }

    fn ensure_extracted(&mut self, pkg_id: PackageId) -> Result<PathBuf> {
        if let Some(path) = self.extracted.get(&pkg_id) {
            return Ok(path.clone());
        }

        let dest = self.package_dir(pkg_id);
        if dest.join(PACKAGE_MANIFEST_NAME).is_file() {
            self.extracted.insert(pkg_id, dest.clone());
            return Ok(dest);
        }

        let entries = self.fetch_index(pkg_id.name().as_str())?;
        let entry = entries
            .iter()
            .find(|e| e.version == pkg_id.version().to_string())
            .cloned()
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "no registry entry for {}@{}",
                    pkg_id.name(),
                    pkg_id.version()
                )
            })?;

        let tarball_url = self
            .base_url
            .join(&entry.url)
            .unwrap_or_else(|_| Url::parse(&entry.url).expect("absolute or base-relative URL"));

        let expected = entry
            .integrity
            .parse::<ContentDigest>()
            .with_context(|| format!("invalid integrity digest in registry index: {}", entry.integrity))?;

        fetch_and_extract_tarball(&tarball_url, &expected, &dest, self.offline)?;

        self.extracted.insert(pkg_id, dest.clone());
        Ok(dest)
    }
}

/// Download a tarball, verify its content digest, and extract it into `dest`.
///
/// `dest` is populated via a staged temporary directory and an atomic rename
/// so a killed download never leaves a half-extracted package behind.
pub fn fetch_and_extract_tarball(
    url: &Url,
    expected: &ContentDigest,
    dest: &Path,
    offline: bool,
) -> Result<()> {
    if dest.join(PACKAGE_MANIFEST_NAME).is_file() {
        return Ok(());
    }

    if offline {
        bail!("offline mode: cannot fetch {}", url);
    }

    let parent = dest
        .parent()
        .ok_or_else(|| anyhow::anyhow!("destination has no parent directory"))?;
    crate::util::fs::ensure_dir(parent)?;

    let tmp_dir = tempfile::Builder::new()
        .prefix(".fetch-")
        .tempdir_in(parent)
        .context("failed to create staging directory for download")?;

    let archive_path = tmp_dir.path().join("package.tar.gz");
    let bytes = reqwest::blocking::get(url.clone())
        .with_context(|| format!("failed to download {}", url))?
        .error_for_status()
        .with_context(|| format!("download returned an error status: {}", url))?
        .bytes()
        .context("failed to read download body")?;

    let actual = ContentDigest::of_bytes(&bytes);
    if &actual != expected {
        bail!(
            "integrity mismatch for {}: expected {}, got {}",
            url,
            expected,
            actual
        );
    }

    std::fs::write(&archive_path, &bytes).context("failed to write downloaded tarball")?;

    let extract_dir = tmp_dir.path().join("extracted");
    crate::util::fs::ensure_dir(&extract_dir)?;

    let file = File::open(&archive_path).context("failed to reopen downloaded tarball")?;
    let mut archive = Archive::new(GzDecoder::new(file));
    archive
        .unpack(&extract_dir)
        .context("failed to extract tarball")?;

    // Tarballs conventionally contain a single top-level directory; unwrap
    // it if present so `dest` holds the package root directly.
    let root = single_subdir(&extract_dir).unwrap_or(extract_dir);

    crate::util::fs::atomic_replace(&root, dest)?;

    Ok(())
}

fn single_subdir(dir: &Path) -> Option<PathBuf> {
    let mut entries: Vec<_> = std::fs::read_dir(dir).ok()?.filter_map(|e| e.ok()).collect();
    if entries.len() == 1 && entries[0].path().is_dir() {
        Some(entries.remove(0).path())
    } else {
        None
    }
}

impl Source for RegistrySource {
    fn name(&self) -> &str {
        "registry"
    }

    fn supports(&self, dep: &Dependency) -> bool {
        dep.source_id() == self.source_id
    }

    fn query(&mut self, dep: &Dependency) -> Result<Vec<Summary>> {
        if !self.supports(dep) {
            return Ok(vec![]);
        }

        let entries = self.fetch_index(dep.name().as_str())?.to_vec();
        let manifest_dir = PathBuf::from(".");

        let mut summaries = Vec::new();
        for entry in &entries {
            let version: semver::Version = match entry.version.parse() {
                Ok(v) => v,
                Err(_) => continue,
            };
            if !dep.matches_version(&version) {
                continue;
            }

            let pkg_id = PackageId::new(dep.name(), version, self.source_id);
            let mut dependencies = Vec::with_capacity(entry.dependencies.len());
            for (name, req) in &entry.dependencies {
                let spec = DependencySpec::Simple(req.clone());
                dependencies.push(spec.to_dependency(name, &manifest_dir)?);
            }

            summaries.push(Summary::new(pkg_id, dependencies, Some(entry.integrity.clone())));
        }

        Ok(summaries)
    }

    fn ensure_ready(&mut self) -> Result<()> {
        Ok(())
    }

    fn get_package_path(&self, pkg_id: PackageId) -> Result<&Path> {
        self.extracted
            .get(&pkg_id)
            .map(PathBuf::as_path)
            .ok_or_else(|| anyhow::anyhow!("{} has not been fetched yet", pkg_id))
    }

    fn load_package(&mut self, pkg_id: PackageId) -> Result<Package> {
        let dir = self.ensure_extracted(pkg_id)?;
        Package::with_source_id(
            crate::core::PackageManifest::load(&dir.join(PACKAGE_MANIFEST_NAME))?,
            dir,
            pkg_id.source_id(),
        )
    }

    fn is_cached(&self, pkg_id: PackageId) -> bool {
        self.package_dir(pkg_id).join(PACKAGE_MANIFEST_NAME).is_file()
    }
}

/// A source for a single direct-tarball dependency (`{url = "...", integrity = "..."}`).
pub struct TarballSource {
    url: Url,
    expected: Option<ContentDigest>,
    cache_dir: PathBuf,
    source_id: SourceId,
    offline: bool,
}

impl TarballSource {
    pub fn new(url: Url, cache_dir: &Path, source_id: SourceId) -> Self {
        TarballSource {
            url,
            expected: None,
            cache_dir: cache_dir.join("tarball"),
            source_id,
            offline: false,
        }
    }

    pub fn set_offline(&mut self, offline: bool) {
        self.offline = offline;
    }

    fn dest(&self) -> PathBuf {
        let key = crate::util::hash::sha256_str(self.url.as_str());
        self.cache_dir.join(&key[..16])
    }
}

impl Source for TarballSource {
    fn name(&self) -> &str {
        "tarball"
    }

    fn supports(&self, dep: &Dependency) -> bool {
        dep.source_id() == self.source_id
    }

    fn query(&mut self, dep: &Dependency) -> Result<Vec<Summary>> {
        if !self.supports(dep) {
            return Ok(vec![]);
        }

        self.expected = dep.integrity().map(|s| s.parse()).transpose()?;
        self.ensure_ready()?;

        let package = self.load_package_inner()?;
        Ok(vec![package.to_summary()?])
    }

    fn ensure_ready(&mut self) -> Result<()> {
        let expected = self.expected.clone().ok_or_else(|| {
            anyhow::anyhow!("tarball dependency on {} is missing an integrity digest", self.url)
        })?;
        fetch_and_extract_tarball(&self.url, &expected, &self.dest(), self.offline)
    }

    fn get_package_path(&self, _pkg_id: PackageId) -> Result<&Path> {
        bail!("tarball sources don't support path lookup by PackageId")
    }

    fn load_package(&mut self, _pkg_id: PackageId) -> Result<Package> {
        self.load_package_inner()
    }

    fn is_cached(&self, _pkg_id: PackageId) -> bool {
        self.dest().join(PACKAGE_MANIFEST_NAME).is_file()
    }
}

impl TarballSource {
    fn load_package_inner(&self) -> Result<Package> {
        let dir = self.dest();
        Package::with_source_id(
            crate::core::PackageManifest::load(&dir.join(PACKAGE_MANIFEST_NAME))?,
            dir,
            self.source_id,
        )
    }
}
