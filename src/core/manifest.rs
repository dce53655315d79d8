//! `botpack.toml` (project manifest) and `agentpkg.toml` (package manifest)
//! parsing and schema.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use semver::Version;
use serde::{Deserialize, Serialize};

use crate::core::capability::Capabilities;
use crate::core::dependency::DependencySpec;

/// Link mode used when populating the virtual store (`.botpack/pkgs/`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkMode {
    /// Try symlink, then hardlink, then copy.
    Auto,
    Symlink,
    Hardlink,
    Copy,
}

impl Default for LinkMode {
    fn default() -> Self {
        LinkMode::Auto
    }
}

/// `policyMode` for a sync target: how `policy/*` fragments are materialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyMode {
    /// Write individual fragment files.
    Fragments,
    /// Concatenate fragments into one generated file.
    Generate,
    /// Skip policy materialization for this target.
    Off,
}

impl Default for PolicyMode {
    fn default() -> Self {
        PolicyMode::Fragments
    }
}

/// The parsed `botpack.toml` project manifest (the workspace root manifest).
#[derive(Debug, Clone)]
pub struct Manifest {
    pub workspace: WorkspaceSection,
    pub dependencies: HashMap<String, DependencySpec>,
    pub sync: SyncSection,
    pub targets: HashMap<String, TargetSection>,
    pub aliases: AliasesSection,

    /// The directory containing this manifest.
    pub manifest_dir: PathBuf,
}

/// `[workspace]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceSection {
    /// Directory the workspace's assets and aliases are rooted at, relative
    /// to the manifest.
    #[serde(default = "default_workspace_dir")]
    pub dir: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub private: bool,
}

fn default_workspace_dir() -> String {
    ".".to_string()
}

impl Default for WorkspaceSection {
    fn default() -> Self {
        WorkspaceSection {
            dir: default_workspace_dir(),
            name: None,
            private: false,
        }
    }
}

/// `[sync]` section: default sync behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSection {
    /// Run `sync` automatically after `add`.
    #[serde(default)]
    pub on_add: bool,

    /// Run `sync` automatically after `install`.
    #[serde(default)]
    pub on_install: bool,

    /// Emit `.botpack/catalog.json` after sync.
    #[serde(default = "default_true")]
    pub catalog: bool,

    /// Default link mode for the virtual store.
    #[serde(default)]
    pub link_mode: LinkMode,
}

fn default_true() -> bool {
    true
}

impl Default for SyncSection {
    fn default() -> Self {
        SyncSection {
            on_add: false,
            on_install: false,
            catalog: true,
            link_mode: LinkMode::default(),
        }
    }
}

/// `[targets.<name>]` section: one materialization profile for a runtime
/// (e.g. `claude`, `amp`, `droid`, or a user-defined custom target).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetSection {
    /// Root directory this target materializes under, relative to the
    /// workspace root (e.g. `.claude`).
    pub root: String,

    /// Subdirectory for skills, relative to `root`.
    #[serde(default)]
    pub skills_dir: Option<String>,

    /// Subdirectory for slash-commands, relative to `root`.
    #[serde(default)]
    pub commands_dir: Option<String>,

    /// Subdirectory for agent definitions, relative to `root`.
    #[serde(default)]
    pub agents_dir: Option<String>,

    /// Path to write the merged MCP server config to, relative to `root`.
    #[serde(default)]
    pub mcp_out: Option<String>,

    /// How policy fragments are materialized for this target.
    #[serde(default)]
    pub policy_mode: PolicyMode,
}

/// `[aliases.skills|commands|agents]` section: rename conventional asset ids
/// to target-specific output names.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AliasesSection {
    #[serde(default)]
    pub skills: HashMap<String, String>,

    #[serde(default)]
    pub commands: HashMap<String, String>,

    #[serde(default)]
    pub agents: HashMap<String, String>,
}

/// Raw manifest as deserialized from TOML.
#[derive(Debug, Deserialize)]
struct RawManifest {
    #[serde(default = "default_schema_version")]
    version: u32,

    #[serde(default)]
    workspace: WorkspaceSection,

    #[serde(default)]
    dependencies: HashMap<String, DependencySpec>,

    #[serde(default)]
    sync: SyncSection,

    #[serde(default)]
    targets: HashMap<String, TargetSection>,

    #[serde(default)]
    aliases: AliasesSection,
}

fn default_schema_version() -> u32 {
    1
}

/// The only `botpack.toml` schema version this build accepts. Surfaced so
/// the lockfile can record which manifest schema it was resolved against
/// (SPEC_FULL §3, "spec version").
pub const MANIFEST_SCHEMA_VERSION: u32 = 1;

impl Manifest {
    /// Load a manifest from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read manifest: {}", path.display()))?;

        Self::parse(&content, path)
    }

    /// Parse manifest content.
    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        let raw: RawManifest =
            toml::from_str(content).with_context(|| "failed to parse botpack.toml")?;

        if raw.version != 1 {
            anyhow::bail!("unsupported botpack.toml schema version: {}", raw.version);
        }

        let manifest_dir = path.parent().unwrap_or(Path::new(".")).to_path_buf();

        Ok(Manifest {
            workspace: raw.workspace,
            dependencies: raw.dependencies,
            sync: raw.sync,
            targets: raw.targets,
            aliases: raw.aliases,
            manifest_dir,
        })
    }

    /// Save the manifest back to disk (used by `add`/`remove`).
    pub fn save(&self, path: &Path) -> Result<()> {
        let raw = RawManifest {
            version: 1,
            workspace: self.workspace.clone(),
            dependencies: self.dependencies.clone(),
            sync: self.sync.clone(),
            targets: self.targets.clone(),
            aliases: self.aliases.clone(),
        };

        let content = toml::to_string_pretty(&SerializableManifest::from(&raw))
            .context("failed to serialize botpack.toml")?;

        crate::util::fs::write_string(path, &content)
    }

    /// Get the workspace display name, falling back to the directory name.
    pub fn name(&self) -> String {
        self.workspace
            .name
            .clone()
            .unwrap_or_else(|| "workspace".to_string())
    }
}

/// Serializable mirror of `RawManifest`. `toml` requires `Serialize` types
/// that don't carry the "default" field functions as attributes again, so
/// this is kept separate rather than deriving `Serialize` directly on
/// `RawManifest`.
#[derive(Serialize)]
struct SerializableManifest {
    version: u32,
    workspace: WorkspaceSection,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    dependencies: HashMap<String, DependencySpec>,
    sync: SyncSection,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    targets: HashMap<String, TargetSection>,
    #[serde(skip_serializing_if = "is_default_aliases")]
    aliases: AliasesSection,
}

fn is_default_aliases(aliases: &AliasesSection) -> bool {
    aliases.skills.is_empty() && aliases.commands.is_empty() && aliases.agents.is_empty()
}

impl From<&RawManifest> for SerializableManifest {
    fn from(raw: &RawManifest) -> Self {
        SerializableManifest {
            version: raw.version,
            workspace: raw.workspace.clone(),
            dependencies: raw.dependencies.clone(),
            sync: raw.sync.clone(),
            targets: raw.targets.clone(),
            aliases: raw.aliases.clone(),
        }
    }
}

/// The parsed `agentpkg.toml` package manifest, embedded in every fetched
/// package.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageManifest {
    /// Package manifest schema marker/version.
    pub agentpkg: u32,

    pub name: String,

    pub version: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub license: Option<String>,

    #[serde(default)]
    pub repository: Option<String>,

    #[serde(default)]
    pub compat: CompatSection,

    #[serde(default)]
    pub exports: Option<ExportsSection>,

    #[serde(default)]
    pub capabilities: Capabilities,

    /// Transitive dependencies this package itself requires.
    #[serde(default)]
    pub dependencies: HashMap<String, DependencySpec>,
}

/// `[compat]` section: target-runtime compatibility requirements.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompatSection {
    /// Requirement strings, e.g. `{"claude": ">=1.0"}`.
    #[serde(default)]
    pub requires: HashMap<String, String>,
}

/// `[exports]` section: optional explicit manifest of provided asset ids,
/// used instead of directory scanning when present.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportsSection {
    #[serde(default)]
    pub skills: Vec<String>,

    #[serde(default)]
    pub commands: Vec<String>,

    #[serde(default)]
    pub agents: Vec<String>,
}

impl PackageManifest {
    /// Load a package manifest from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read package manifest: {}", path.display()))?;
        Self::parse(&content)
    }

    /// Parse package manifest content.
    pub fn parse(content: &str) -> Result<Self> {
        let manifest: PackageManifest =
            toml::from_str(content).context("failed to parse agentpkg.toml")?;

        if manifest.agentpkg != 1 {
            anyhow::bail!("unsupported agentpkg.toml schema version: {}", manifest.agentpkg);
        }

        Ok(manifest)
    }

    /// Parse the version string as semver.
    pub fn semver(&self) -> Result<Version> {
        self.version
            .parse()
            .with_context(|| format!("invalid version: {}", self.version))
    }
}

/// Generate a default `botpack.toml` for a new workspace. Leaves
/// `[targets.*]` undeclared so `claude`/`amp`/`droid` resolve to their
/// built-in defaults (see `sync::resolve_target`) instead of drifting from
/// them if the built-ins ever change.
pub fn generate_default_manifest() -> String {
    r#"version = 1

[workspace]
dir = "."

[sync]
onAdd = false
onInstall = false
catalog = true
linkMode = "auto"

[dependencies]
"#
    .to_string()
}

/// Generate a default `agentpkg.toml` for a new package.
pub fn generate_package_manifest(name: &str) -> String {
    format!(
        r#"agentpkg = 1
name = "{name}"
version = "0.1.0"

[compat]
requires = {{}}

[capabilities]
exec = false
network = false
mcp = false

[dependencies]
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_basic_manifest() {
        let content = r#"
version = 1

[workspace]
dir = "."

[dependencies]
acme-quality-skills = "^2.1"
"#;
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("botpack.toml");

        let manifest = Manifest::parse(content, &path).unwrap();
        assert_eq!(manifest.dependencies.len(), 1);
        assert_eq!(manifest.workspace.dir, ".");
    }

    #[test]
    fn test_parse_manifest_with_targets() {
        let content = r#"
version = 1

[workspace]
dir = "."

[targets.claude]
root = ".claude"
mcpOut = "mcp.json"
policyMode = "generate"
"#;
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("botpack.toml");

        let manifest = Manifest::parse(content, &path).unwrap();
        let target = manifest.targets.get("claude").unwrap();
        assert_eq!(target.root, ".claude");
        assert_eq!(target.mcp_out.as_deref(), Some("mcp.json"));
        assert_eq!(target.policy_mode, PolicyMode::Generate);
    }

    #[test]
    fn test_rejects_unsupported_schema_version() {
        let content = "version = 2\n[workspace]\ndir = \".\"\n";
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("botpack.toml");

        assert!(Manifest::parse(content, &path).is_err());
    }

    #[test]
    fn test_parse_package_manifest() {
        let content = r#"
agentpkg = 1
name = "acme-quality-skills"
version = "2.1.0"

[capabilities]
exec = false
network = false
mcp = true
"#;
        let manifest = PackageManifest::parse(content).unwrap();
        assert_eq!(manifest.name, "acme-quality-skills");
        assert_eq!(manifest.semver().unwrap(), Version::new(2, 1, 0));
        assert!(manifest.capabilities.mcp);
    }

    #[test]
    fn test_generate_default_manifest_parses() {
        let generated = generate_default_manifest();
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("botpack.toml");
        let manifest = Manifest::parse(&generated, &path).unwrap();
        assert_eq!(manifest.sync.link_mode, LinkMode::Auto);
    }
}
