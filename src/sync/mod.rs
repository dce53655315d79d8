//! Sync engine: materializes the resolved asset graph into a target
//! runtime's directory layout (`.claude/`, `.agents/`, `.factory/`, or a
//! user-defined custom target).

mod apply;
mod state;
mod watch;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::manifest::{AliasesSection, PolicyMode, TargetSection};
use crate::core::Workspace;
use crate::mcp::MergedServer;
use crate::scan::{Asset, AssetType};
use crate::util::hash::{ContentDigest, Fingerprint};

pub use apply::{apply, ApplyOptions, ApplyReport};
pub use state::{SyncState, SyncStateEntry};
pub use watch::watch;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("unknown sync target `{target}`; known targets: {known}")]
    UnknownTarget { target: String, known: String },

    #[error("sync collision: `{path}` would be written by both `{first}` and `{second}`")]
    Collision {
        path: String,
        first: String,
        second: String,
    },

    #[error("alias collision: `{alias}` is used by both `{first}` and `{second}`")]
    AliasCollision {
        alias: String,
        first: String,
        second: String,
    },

    #[error("on-disk drift detected at `{path}`: modified since the last sync; re-run with --force to overwrite")]
    Drift { path: String },

    #[error(transparent)]
    Mcp(#[from] crate::mcp::McpError),

    #[error(transparent)]
    Store(#[from] crate::store::StoreError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// A target's resolved, absolute-path configuration, combining manifest
/// overrides with built-in defaults.
#[derive(Debug, Clone)]
pub struct ResolvedTarget {
    pub name: String,
    /// Absolute path to the target's root directory (e.g. `<ws>/.claude`).
    pub root: PathBuf,
    /// Absolute path assets of type `skill` are written under, if this
    /// target supports skills (built-in `amp`/`droid` fall back to the
    /// `claude` target's skills directory when not configured).
    pub skills_dir: Option<PathBuf>,
    pub commands_dir: Option<PathBuf>,
    pub agents_dir: Option<PathBuf>,
    pub mcp_out: Option<PathBuf>,
    pub policy_dir: Option<PathBuf>,
    pub policy_mode: PolicyMode,
}

impl ResolvedTarget {
    /// A hash of everything about this target's configuration that affects
    /// *where* things are written, used to detect manifest-driven drift
    /// even when no asset itself changed.
    pub fn config_hash(&self) -> String {
        let mut fp = Fingerprint::new();
        fp.update_str(&self.name);
        fp.update_str(&self.root.to_string_lossy());
        fp.update_opt(self.skills_dir.as_ref().map(|p| p.to_string_lossy()).as_deref());
        fp.update_opt(self.commands_dir.as_ref().map(|p| p.to_string_lossy()).as_deref());
        fp.update_opt(self.agents_dir.as_ref().map(|p| p.to_string_lossy()).as_deref());
        fp.update_opt(self.mcp_out.as_ref().map(|p| p.to_string_lossy()).as_deref());
        fp.update_str(&format!("{:?}", self.policy_mode));
        fp.finish_short()
    }
}

fn builtin_default(name: &str) -> Option<TargetSection> {
    match name {
        "claude" => Some(TargetSection {
            root: ".claude".to_string(),
            skills_dir: Some("skills".to_string()),
            commands_dir: Some("commands".to_string()),
            agents_dir: Some("agents".to_string()),
            mcp_out: Some("mcp.json".to_string()),
            policy_mode: PolicyMode::Fragments,
        }),
        "amp" => Some(TargetSection {
            root: ".agents".to_string(),
            skills_dir: None,
            commands_dir: Some("commands".to_string()),
            agents_dir: Some("agents".to_string()),
            mcp_out: None,
            policy_mode: PolicyMode::Fragments,
        }),
        "droid" => Some(TargetSection {
            root: ".factory".to_string(),
            skills_dir: None,
            commands_dir: None,
            agents_dir: None,
            mcp_out: None,
            policy_mode: PolicyMode::Fragments,
        }),
        _ => None,
    }
}

/// Resolve a target by name: manifest config if declared, else a built-in
/// default, else [`SyncError::UnknownTarget`].
pub fn resolve_target(ws: &Workspace, name: &str) -> Result<ResolvedTarget, SyncError> {
    let section = ws
        .manifest()
        .targets
        .get(name)
        .cloned()
        .or_else(|| builtin_default(name))
        .ok_or_else(|| SyncError::UnknownTarget {
            target: name.to_string(),
            known: known_targets(ws).join(", "),
        })?;

    let root = ws.root().join(&section.root);

    // `amp`/`droid` fall back to the `claude` target's skills directory
    // when they declare none of their own.
    let skills_dir = match section.skills_dir {
        Some(ref dir) => Some(root.join(dir)),
        None => builtin_default("claude")
            .map(|claude| ws.root().join(&claude.root).join(claude.skills_dir.unwrap())),
    };

    Ok(ResolvedTarget {
        name: name.to_string(),
        commands_dir: section.commands_dir.as_ref().map(|d| root.join(d)),
        agents_dir: section.agents_dir.as_ref().map(|d| root.join(d)),
        mcp_out: section.mcp_out.as_ref().map(|f| root.join(f)),
        policy_dir: Some(root.join("policy")),
        policy_mode: section.policy_mode,
        skills_dir,
        root,
    })
}

fn known_targets(ws: &Workspace) -> Vec<String> {
    let mut names: Vec<String> = ws.manifest().targets.keys().cloned().collect();
    for builtin in ["claude", "amp", "droid"] {
        if !names.iter().any(|n| n == builtin) {
            names.push(builtin.to_string());
        }
    }
    names.sort();
    names
}

/// One step of a sync plan.
#[derive(Debug, Clone)]
pub enum Operation {
    CreateDir(PathBuf),
    /// Link `src` (inside the virtual store, or the workspace's own assets
    /// dir) to `dst` (inside the target root).
    Link { src: PathBuf, dst: PathBuf },
    WriteFile { dst: PathBuf, contents: Vec<u8> },
    Remove(PathBuf),
}

/// A fully-built, not-yet-applied sync plan.
#[derive(Debug, Default)]
pub struct Plan {
    pub operations: Vec<Operation>,
    /// Sync-state entries this plan will produce once applied, keyed by
    /// path relative to the target root.
    pub entries: Vec<SyncStateEntry>,
}

/// Build a sync plan for `target` from the scanned assets and the allowed
/// (trust-gated) MCP servers. Detects output-path collisions eagerly;
/// does not touch the filesystem.
pub fn build_plan(
    target: &ResolvedTarget,
    assets: &[Asset],
    aliases: &AliasesSection,
    mcp_servers: &[MergedServer],
) -> Result<Plan, SyncError> {
    let mut plan = Plan::default();
    let mut claimed: HashMap<PathBuf, String> = HashMap::new();

    for asset in assets {
        match asset.asset_type {
            AssetType::Skill => {
                let Some(skills_dir) = &target.skills_dir else { continue };
                let name = alias_for(&aliases.skills, asset)?;
                let skill_src_dir = asset.path.parent().unwrap_or(&asset.path).to_path_buf();
                let dst = skills_dir.join(&name);
                claim_path(&mut claimed, dst.clone(), asset.qualified_name())?;
                plan.operations.push(Operation::CreateDir(skills_dir.clone()));
                plan.operations.push(Operation::Link { src: skill_src_dir.clone(), dst: dst.clone() });
                plan.entries.push(SyncStateEntry {
                    path: rel(target, &dst),
                    asset_address: asset.qualified_name(),
                    checksum: checksum_of(&skill_src_dir)?.to_string(),
                });
            }
            AssetType::Command => {
                let Some(dir) = &target.commands_dir else { continue };
                let name = alias_for(&aliases.commands, asset)?;
                let dst = dir.join(format!("{name}.md"));
                claim_path(&mut claimed, dst.clone(), asset.qualified_name())?;
                plan.operations.push(Operation::CreateDir(dir.clone()));
                plan.operations.push(Operation::Link { src: asset.path.clone(), dst: dst.clone() });
                plan.entries.push(SyncStateEntry {
                    path: rel(target, &dst),
                    asset_address: asset.qualified_name(),
                    checksum: checksum_of(&asset.path)?.to_string(),
                });
            }
            AssetType::Agent => {
                let Some(dir) = &target.agents_dir else { continue };
                let name = alias_for(&aliases.agents, asset)?;
                let dst = dir.join(format!("{name}.md"));
                claim_path(&mut claimed, dst.clone(), asset.qualified_name())?;
                plan.operations.push(Operation::CreateDir(dir.clone()));
                plan.operations.push(Operation::Link { src: asset.path.clone(), dst: dst.clone() });
                plan.entries.push(SyncStateEntry {
                    path: rel(target, &dst),
                    asset_address: asset.qualified_name(),
                    checksum: checksum_of(&asset.path)?.to_string(),
                });
            }
            AssetType::PolicyFragment => {
                let Some(dir) = &target.policy_dir else { continue };
                match target.policy_mode {
                    PolicyMode::Off => {}
                    PolicyMode::Fragments => {
                        let dst = dir.join(format!("{}.md", asset.qualified_name()));
                        claim_path(&mut claimed, dst.clone(), asset.qualified_name())?;
                        plan.operations.push(Operation::CreateDir(dir.clone()));
                        plan.operations.push(Operation::Link { src: asset.path.clone(), dst: dst.clone() });
                        plan.entries.push(SyncStateEntry {
                            path: rel(target, &dst),
                            asset_address: asset.qualified_name(),
                            checksum: checksum_of(&asset.path)?.to_string(),
                        });
                    }
                    PolicyMode::Generate => {
                        // Handled once below, after the loop, so every
                        // fragment's bytes are concatenated together.
                    }
                }
            }
            AssetType::McpServer | AssetType::Template => {}
        }
    }

    if matches!(target.policy_mode, PolicyMode::Generate) {
        if let Some(dir) = &target.policy_dir {
            let fragments: Vec<&Asset> = assets
                .iter()
                .filter(|a| a.asset_type == AssetType::PolicyFragment)
                .collect();
            if !fragments.is_empty() {
                let mut contents = Vec::new();
                for fragment in &fragments {
                    contents.extend_from_slice(&std::fs::read(&fragment.path)?);
                    contents.push(b'\n');
                }
                let dst = dir.join("POLICY.md");
                claim_path(&mut claimed, dst.clone(), "policy/generated".to_string())?;
                plan.operations.push(Operation::CreateDir(dir.clone()));
                plan.operations.push(Operation::WriteFile { dst: dst.clone(), contents: contents.clone() });
                plan.entries.push(SyncStateEntry {
                    path: rel(target, &dst),
                    asset_address: "policy/generated".to_string(),
                    checksum: ContentDigest::of_bytes(&contents).to_string(),
                });
            }
        }
    }

    if let Some(mcp_out) = &target.mcp_out {
        if !mcp_servers.is_empty() {
            let content = crate::mcp::render(mcp_servers)?;
            claim_path(&mut claimed, mcp_out.clone(), "mcp/merged".to_string())?;
            if let Some(parent) = mcp_out.parent() {
                plan.operations.push(Operation::CreateDir(parent.to_path_buf()));
            }
            plan.operations.push(Operation::WriteFile {
                dst: mcp_out.clone(),
                contents: content.clone().into_bytes(),
            });
            plan.entries.push(SyncStateEntry {
                path: rel(target, mcp_out),
                asset_address: "mcp/merged".to_string(),
                checksum: ContentDigest::of_bytes(content.as_bytes()).to_string(),
            });
        }
    }

    Ok(plan)
}

fn claim_path(
    claimed: &mut HashMap<PathBuf, String>,
    dst: PathBuf,
    address: String,
) -> Result<(), SyncError> {
    if let Some(existing) = claimed.get(&dst) {
        return Err(SyncError::Collision {
            path: dst.to_string_lossy().into_owned(),
            first: existing.clone(),
            second: address,
        });
    }
    claimed.insert(dst, address);
    Ok(())
}

fn alias_for(
    table: &HashMap<String, String>,
    asset: &Asset,
) -> Result<String, SyncError> {
    Ok(table
        .get(&asset.qualified_name())
        .cloned()
        .unwrap_or_else(|| asset.qualified_name()))
}

fn rel(target: &ResolvedTarget, path: &Path) -> String {
    crate::util::fs::relative_path(&target.root, path)
        .to_string_lossy()
        .replace('\\', "/")
}

fn checksum_of(path: &Path) -> Result<ContentDigest, SyncError> {
    if path.is_dir() {
        let (digest, _) = crate::store::digest_tree(path)?;
        Ok(digest)
    } else {
        let bytes = std::fs::read(path)?;
        Ok(ContentDigest::of_bytes(&bytes))
    }
}
