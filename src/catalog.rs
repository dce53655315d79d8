//! Asset catalog: `.botpack/catalog.json`, a metadata-only index derived
//! from the asset scanner. Never carries asset bodies. Deterministic
//! ordering; the generation timestamp is excluded from the otherwise
//! canonical, hash-stable portion of the document.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::Workspace;
use crate::scan::{Asset, AssetOrigin};

/// One catalog entry: just enough to locate and identify an asset, no body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    #[serde(rename = "type")]
    pub asset_type: String,
    pub id: String,
    pub qualified_name: String,
    /// `null` for workspace-owned assets, `"<name>@<version>"` otherwise.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
    pub path: String,
}

impl CatalogEntry {
    fn from_asset(asset: &Asset, ws_root: &Path) -> Self {
        let package = match &asset.origin {
            AssetOrigin::Workspace => None,
            AssetOrigin::Package { name, version } => Some(format!("{name}@{version}")),
        };
        let path = crate::util::fs::relative_path(ws_root, &asset.path)
            .to_string_lossy()
            .replace('\\', "/");

        CatalogEntry {
            asset_type: asset.asset_type.as_str().to_string(),
            id: asset.id.clone(),
            qualified_name: asset.qualified_name(),
            package,
            path,
        }
    }
}

/// The catalog document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    pub schema: u32,
    /// RFC 3339 timestamp of the generation that produced this document.
    /// Excluded from `to_canonical_json`'s hashed form.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<String>,
    pub entries: Vec<CatalogEntry>,
}

const CATALOG_SCHEMA_VERSION: u32 = 1;

impl Catalog {
    /// Build a catalog from scanned assets, stamped with a generation time.
    pub fn build(assets: &[Asset], ws_root: &Path, generated_at: impl Into<String>) -> Self {
        let mut entries: Vec<CatalogEntry> =
            assets.iter().map(|a| CatalogEntry::from_asset(a, ws_root)).collect();
        entries.sort_by(|a, b| {
            a.asset_type
                .cmp(&b.asset_type)
                .then_with(|| a.package.cmp(&b.package))
                .then_with(|| a.id.cmp(&b.id))
        });

        Catalog {
            schema: CATALOG_SCHEMA_VERSION,
            generated_at: Some(generated_at.into()),
            entries,
        }
    }

    /// Canonical JSON used for file output and hash comparisons: sorted
    /// keys (guaranteed by field order plus `BTreeMap`-free deterministic
    /// entry sort above), 2-space indent, trailing newline. The timestamp
    /// is stripped before hashing but kept in the serialized file itself,
    /// matching the lockfile's "generated but not load-bearing" field
    /// convention.
    pub fn to_canonical_json(&self) -> Result<String> {
        let mut json = serde_json::to_string_pretty(self).context("failed to serialize catalog")?;
        json.push('\n');
        Ok(json)
    }

    /// The deterministic hash input: every field except `generated_at`.
    pub fn deterministic_digest(&self) -> String {
        let without_timestamp = Catalog {
            schema: self.schema,
            generated_at: None,
            entries: self.entries.clone(),
        };
        let json = serde_json::to_string(&without_timestamp).unwrap_or_default();
        crate::util::hash::sha256_str(&json)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = self.to_canonical_json()?;
        crate::util::fs::write_string(path, &content)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = crate::util::fs::read_to_string(path)?;
        serde_json::from_str(&content).context("failed to parse catalog.json")
    }
}

/// Build and write the catalog for a workspace from already-scanned assets.
pub fn write_catalog(ws: &Workspace, assets: &[Asset], generated_at: impl Into<String>) -> Result<Catalog> {
    let catalog = Catalog::build(assets, ws.root(), generated_at);
    catalog.save(&ws.catalog_path())?;
    Ok(catalog)
}
