//! Asset scanner.
//!
//! Walks a workspace's assets directory and every populated virtual-store
//! package for conventional asset paths (`skills/<id>/SKILL.md`,
//! `commands/<id>.md`, `agents/<id>.md`, `mcp/servers.toml`, `policy/*`),
//! parsing only bounded YAML frontmatter (never a skill's full body) plus,
//! for Python scripts, a PEP-723 inline metadata block.

mod frontmatter;
mod pep723;

use std::path::{Path, PathBuf};

use anyhow::Result;
use thiserror::Error;

use crate::core::Workspace;

pub use frontmatter::Frontmatter;
pub use pep723::Pep723Metadata;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("malformed frontmatter in {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Asset kind, matching the conventional directory/file each is recognized
/// by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AssetType {
    Skill,
    Command,
    Agent,
    McpServer,
    PolicyFragment,
    Template,
}

impl AssetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetType::Skill => "skill",
            AssetType::Command => "command",
            AssetType::Agent => "agent",
            AssetType::McpServer => "mcp-server",
            AssetType::PolicyFragment => "policy-fragment",
            AssetType::Template => "template",
        }
    }
}

/// Where an asset was scanned from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetOrigin {
    /// Declared directly in the workspace's own assets directory.
    Workspace,
    /// Exported by a fetched dependency.
    Package { name: String, version: String },
}

impl AssetOrigin {
    /// The package-qualified naming scope for this origin: the workspace
    /// has no scope prefix, a package's scope is its name.
    pub fn scope_name(&self) -> Option<&str> {
        match self {
            AssetOrigin::Workspace => None,
            AssetOrigin::Package { name, .. } => Some(name),
        }
    }
}

/// Extra parsed metadata for an asset, beyond its id and path.
#[derive(Debug, Clone, Default)]
pub struct AssetMetadata {
    pub frontmatter: Option<Frontmatter>,
    pub pep723: Option<Pep723Metadata>,
}

/// One recognized asset.
#[derive(Debug, Clone)]
pub struct Asset {
    pub asset_type: AssetType,
    pub id: String,
    pub origin: AssetOrigin,
    pub path: PathBuf,
    pub metadata: AssetMetadata,
}

impl Asset {
    /// The default package-qualified output name (`<scope-name>.<id>`, scope
    /// slash replaced with dash), before alias rewriting.
    pub fn qualified_name(&self) -> String {
        match self.origin.scope_name() {
            Some(scope) => format!("{}.{}", scope.replace('/', "-"), self.id),
            None => self.id.clone(),
        }
    }
}

/// Scan one asset root (either a workspace's assets dir or a virtual-store
/// package directory) and return every recognized asset, sorted by type,
/// then id.
fn scan_root(root: &Path, origin: AssetOrigin) -> Result<Vec<Asset>, ScanError> {
    let mut assets = Vec::new();

    scan_skills(root, &origin, &mut assets)?;
    scan_flat_md(root, "commands", AssetType::Command, &origin, &mut assets)?;
    scan_flat_md(root, "agents", AssetType::Agent, &origin, &mut assets)?;
    scan_mcp(root, &origin, &mut assets)?;
    scan_policy(root, &origin, &mut assets)?;

    assets.sort_by(|a, b| a.asset_type.cmp(&b.asset_type).then_with(|| a.id.cmp(&b.id)));
    Ok(assets)
}

fn scan_skills(root: &Path, origin: &AssetOrigin, out: &mut Vec<Asset>) -> Result<(), ScanError> {
    let skills_dir = root.join("skills");
    if !skills_dir.is_dir() {
        return Ok(());
    }

    for entry in std::fs::read_dir(&skills_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let id = entry.file_name().to_string_lossy().into_owned();
        let skill_md = entry.path().join("SKILL.md");
        if !skill_md.is_file() {
            continue;
        }

        let frontmatter = frontmatter::read(&skill_md).map_err(|reason| ScanError::Parse {
            path: skill_md.clone(),
            reason,
        })?;

        out.push(Asset {
            asset_type: AssetType::Skill,
            id,
            origin: origin.clone(),
            path: skill_md,
            metadata: AssetMetadata {
                frontmatter,
                pep723: None,
            },
        });

        scan_scripts(&entry.path(), origin, out)?;
    }
    Ok(())
}

/// Skill-local `scripts/*.py`, recognized as `template`-typed assets carrying
/// only their PEP-723 header metadata (the script body is never read for
/// asset indexing purposes).
fn scan_scripts(skill_dir: &Path, origin: &AssetOrigin, out: &mut Vec<Asset>) -> Result<(), ScanError> {
    let scripts_dir = skill_dir.join("scripts");
    if !scripts_dir.is_dir() {
        return Ok(());
    }

    for entry in std::fs::read_dir(&scripts_dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("py") {
            continue;
        }

        let pep723 = pep723::read(&path).map_err(|reason| ScanError::Parse {
            path: path.clone(),
            reason,
        })?;
        if pep723.is_none() {
            continue;
        }

        let id = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        out.push(Asset {
            asset_type: AssetType::Template,
            id,
            origin: origin.clone(),
            path,
            metadata: AssetMetadata {
                frontmatter: None,
                pep723,
            },
        });
    }
    Ok(())
}

fn scan_flat_md(
    root: &Path,
    dir_name: &str,
    asset_type: AssetType,
    origin: &AssetOrigin,
    out: &mut Vec<Asset>,
) -> Result<(), ScanError> {
    let dir = root.join(dir_name);
    if !dir.is_dir() {
        return Ok(());
    }

    for entry in std::fs::read_dir(&dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("md") {
            continue;
        }

        let id = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let frontmatter = frontmatter::read(&path).map_err(|reason| ScanError::Parse {
            path: path.clone(),
            reason,
        })?;

        out.push(Asset {
            asset_type,
            id,
            origin: origin.clone(),
            path,
            metadata: AssetMetadata {
                frontmatter,
                pep723: None,
            },
        });
    }
    Ok(())
}

fn scan_mcp(root: &Path, origin: &AssetOrigin, out: &mut Vec<Asset>) -> Result<(), ScanError> {
    let servers_toml = root.join("mcp").join("servers.toml");
    if !servers_toml.is_file() {
        return Ok(());
    }

    let content = std::fs::read_to_string(&servers_toml)?;
    let parsed: crate::mcp::ServersFile = toml::from_str(&content).map_err(|e| ScanError::Parse {
        path: servers_toml.clone(),
        reason: e.to_string(),
    })?;

    for (server_id, _server) in parsed.servers {
        out.push(Asset {
            asset_type: AssetType::McpServer,
            id: server_id,
            origin: origin.clone(),
            path: servers_toml.clone(),
            metadata: AssetMetadata::default(),
        });
    }
    Ok(())
}

fn scan_policy(root: &Path, origin: &AssetOrigin, out: &mut Vec<Asset>) -> Result<(), ScanError> {
    let policy_dir = root.join("policy");
    if !policy_dir.is_dir() {
        return Ok(());
    }

    for entry in std::fs::read_dir(&policy_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let path = entry.path();
        let id = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        out.push(Asset {
            asset_type: AssetType::PolicyFragment,
            id,
            origin: origin.clone(),
            path,
            metadata: AssetMetadata::default(),
        });
    }
    Ok(())
}

/// Scan the workspace's own assets directory.
pub fn scan_workspace(ws: &Workspace) -> Result<Vec<Asset>, ScanError> {
    scan_root(&ws.assets_dir(), AssetOrigin::Workspace)
}

/// Scan a single package's virtual-store entry.
pub fn scan_package(package_dir: &Path, name: &str, version: &str) -> Result<Vec<Asset>, ScanError> {
    scan_root(
        package_dir,
        AssetOrigin::Package {
            name: name.to_string(),
            version: version.to_string(),
        },
    )
}

/// Scan the workspace plus every package currently populated in the virtual
/// store (`.botpack/pkgs/<name>@<version>/`), in stable order: workspace
/// assets first, then packages ordered by `name@version`.
pub fn scan_all(ws: &Workspace) -> Result<Vec<Asset>, ScanError> {
    let mut assets = scan_workspace(ws)?;

    let pkgs_dir = ws.pkgs_dir();
    if pkgs_dir.is_dir() {
        let mut entries: Vec<_> = std::fs::read_dir(&pkgs_dir)?
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_dir())
            .collect();
        entries.sort_by_key(|e| e.file_name());

        for entry in entries {
            let entry_name = entry.file_name().to_string_lossy().into_owned();
            let Some((name, version)) = entry_name.rsplit_once('@') else {
                continue;
            };
            assets.extend(scan_package(&entry.path(), name, version)?);
        }
    }

    Ok(assets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_skill(root: &Path, id: &str, frontmatter: &str) {
        let dir = root.join("skills").join(id);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("SKILL.md"),
            format!("---\n{frontmatter}\n---\nbody text not parsed"),
        )
        .unwrap();
    }

    #[test]
    fn test_scan_skill_with_frontmatter() {
        let tmp = TempDir::new().unwrap();
        write_skill(tmp.path(), "fetch_web", "description: fetches a URL");

        let assets = scan_root(tmp.path(), AssetOrigin::Workspace).unwrap();
        assert_eq!(assets.len(), 1);
        assert_eq!(assets[0].asset_type, AssetType::Skill);
        assert_eq!(assets[0].id, "fetch_web");
        assert!(assets[0].metadata.frontmatter.is_some());
    }

    #[test]
    fn test_scan_commands_and_agents() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("commands")).unwrap();
        std::fs::write(tmp.path().join("commands").join("deploy.md"), "---\n---\n").unwrap();
        std::fs::create_dir_all(tmp.path().join("agents")).unwrap();
        std::fs::write(tmp.path().join("agents").join("reviewer.md"), "---\n---\n").unwrap();

        let assets = scan_root(tmp.path(), AssetOrigin::Workspace).unwrap();
        assert_eq!(assets.len(), 2);
        assert!(assets.iter().any(|a| a.asset_type == AssetType::Command && a.id == "deploy"));
        assert!(assets.iter().any(|a| a.asset_type == AssetType::Agent && a.id == "reviewer"));
    }

    #[test]
    fn test_qualified_name() {
        let asset = Asset {
            asset_type: AssetType::Skill,
            id: "fetch_web".to_string(),
            origin: AssetOrigin::Package {
                name: "acme-quality-skills".to_string(),
                version: "2.1.0".to_string(),
            },
            path: PathBuf::new(),
            metadata: AssetMetadata::default(),
        };
        assert_eq!(asset.qualified_name(), "acme-quality-skills.fetch_web");
    }

    #[test]
    fn test_malformed_frontmatter_errors() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("skills").join("broken");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("SKILL.md"), "---\nunterminated: true\n").unwrap();

        let err = scan_root(tmp.path(), AssetOrigin::Workspace).unwrap_err();
        assert!(matches!(err, ScanError::Parse { .. }));
    }
}
