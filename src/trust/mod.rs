//! Trust gate: recorded allow/deny decisions for capability-bearing
//! packages, persisted at `.botpack/trust.toml`.
//!
//! Nothing capability-bearing (an MCP server with a local `command`, or any
//! package declaring `exec`/`mcp`) is materialized without an explicit
//! trust record. Absence of a record is a deny, never a silent allow.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::util::hash::ContentDigest;

#[derive(Debug, Error)]
pub enum TrustError {
    #[error("capability-bearing asset `{fqid}` from `{package}` has no recorded trust decision; run `botpack trust {package} --allow exec` (or `--allow mcp`), or run interactively")]
    Blocked { package: String, fqid: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Per-package trust record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PackageTrust {
    #[serde(default)]
    pub allow_exec: bool,

    #[serde(default)]
    pub allow_mcp: bool,

    /// Optional content digest pin: if set, trust is revoked the moment the
    /// resolved package's digest changes, even if the name@version key
    /// matches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<ContentDigest>,

    /// Per-fqid overrides, keyed by `<package-name>/<server-id>`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub mcp: BTreeMap<String, ServerTrust>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerTrust {
    #[serde(default)]
    pub allow_exec: bool,
}

/// The whole trust file: `"<name>@<version>"` → [`PackageTrust`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrustFile {
    #[serde(flatten)]
    packages: BTreeMap<String, PackageTrust>,
}

impl TrustFile {
    pub fn load(path: &Path) -> Result<Self, TrustError> {
        if !path.is_file() {
            return Ok(TrustFile::default());
        }
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| TrustError::Other(anyhow::anyhow!("failed to parse trust.toml: {e}")))
    }

    pub fn save(&self, path: &Path) -> Result<(), TrustError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| TrustError::Other(anyhow::anyhow!("failed to serialize trust.toml: {e}")))?;
        crate::util::fs::write_string(path, &content).map_err(TrustError::Other)
    }

    fn key(name: &str, version: &str) -> String {
        format!("{name}@{version}")
    }

    pub fn package(&self, name: &str, version: &str) -> Option<&PackageTrust> {
        self.packages.get(&Self::key(name, version))
    }

    pub fn package_mut(&mut self, name: &str, version: &str) -> &mut PackageTrust {
        self.packages.entry(Self::key(name, version)).or_default()
    }

    /// Whether an MCP server `fqid` belonging to `name@version` may be
    /// materialized, given whether it requires `exec`. Precedence: a
    /// per-fqid override decides `exec`; otherwise the package-wide
    /// `allowExec` applies. `allowMcp` always gates the package's MCP
    /// servers regardless of `exec`.
    pub fn allows_server(&self, name: &str, version: &str, fqid: &str, needs_exec: bool) -> bool {
        let Some(pkg) = self.package(name, version) else {
            return false;
        };
        if !pkg.allow_mcp {
            return false;
        }
        if !needs_exec {
            return true;
        }
        match pkg.mcp.get(fqid) {
            Some(server) => server.allow_exec,
            None => pkg.allow_exec,
        }
    }

    /// Whether a non-MCP capability-bearing asset (declaring `exec` or
    /// `network` at the package level) is allowed.
    pub fn allows_exec(&self, name: &str, version: &str) -> bool {
        self.package(name, version).is_some_and(|p| p.allow_exec)
    }

    /// Record an allow/deny decision for `exec` at the package level.
    pub fn set_allow_exec(&mut self, name: &str, version: &str, allow: bool) {
        self.package_mut(name, version).allow_exec = allow;
    }

    /// Record an allow/deny decision for `mcp` at the package level.
    pub fn set_allow_mcp(&mut self, name: &str, version: &str, allow: bool) {
        self.package_mut(name, version).allow_mcp = allow;
    }

    /// Record an allow/deny decision for one specific server fqid.
    pub fn set_server_allow_exec(&mut self, name: &str, version: &str, fqid: &str, allow: bool) {
        self.package_mut(name, version)
            .mcp
            .entry(fqid.to_string())
            .or_default()
            .allow_exec = allow;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_denies() {
        let trust = TrustFile::default();
        assert!(!trust.allows_server("acme-mcp-pack", "0.3.0", "acme-mcp-pack/postgres", true));
    }

    #[test]
    fn test_package_wide_allow() {
        let mut trust = TrustFile::default();
        trust.set_allow_exec("acme-mcp-pack", "0.3.0", true);
        trust.set_allow_mcp("acme-mcp-pack", "0.3.0", true);
        assert!(trust.allows_server("acme-mcp-pack", "0.3.0", "acme-mcp-pack/postgres", true));
    }

    #[test]
    fn test_mcp_without_exec_still_requires_allow_mcp() {
        let mut trust = TrustFile::default();
        trust.set_allow_exec("acme-mcp-pack", "0.3.0", true);
        assert!(!trust.allows_server("acme-mcp-pack", "0.3.0", "acme-mcp-pack/postgres", false));
    }

    #[test]
    fn test_per_fqid_override_takes_precedence() {
        let mut trust = TrustFile::default();
        trust.set_allow_mcp("acme-mcp-pack", "0.3.0", true);
        trust.set_allow_exec("acme-mcp-pack", "0.3.0", true);
        trust.set_server_allow_exec("acme-mcp-pack", "0.3.0", "acme-mcp-pack/postgres", false);

        assert!(!trust.allows_server("acme-mcp-pack", "0.3.0", "acme-mcp-pack/postgres", true));
        assert!(trust.allows_server("acme-mcp-pack", "0.3.0", "acme-mcp-pack/redis", true));
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("trust.toml");

        let mut trust = TrustFile::default();
        trust.set_allow_exec("acme-mcp-pack", "0.3.0", true);
        trust.set_allow_mcp("acme-mcp-pack", "0.3.0", true);
        trust.save(&path).unwrap();

        let loaded = TrustFile::load(&path).unwrap();
        assert!(loaded.allows_server("acme-mcp-pack", "0.3.0", "acme-mcp-pack/postgres", true));
    }
}
