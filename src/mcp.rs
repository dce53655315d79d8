//! MCP server merger and trust gate.
//!
//! Every package's `mcp/servers.toml` contributes zero or more server
//! declarations. Each is identified by a fully-qualified id (fqid):
//! `<package-name>/<server-id>`. Collisions on fqid are a sync error;
//! servers without a recorded trust decision are omitted from target
//! output and reported rather than silently dropped or silently allowed.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::trust::TrustFile;

#[derive(Debug, Error)]
pub enum McpError {
    #[error("MCP server fqid `{fqid}` is declared by more than one package")]
    FqidCollision { fqid: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// The parsed `mcp/servers.toml` of one package.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServersFile {
    #[serde(default)]
    pub servers: BTreeMap<String, ServerSpec>,
}

/// One server declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
}

impl ServerSpec {
    /// A server with a local `command` (or `args`) implicitly requires
    /// `exec`; a purely remote `url` server does not.
    pub fn needs_exec(&self) -> bool {
        self.command.is_some() || self.args.is_some()
    }
}

/// One package's contribution to the merge: its identity plus its parsed
/// servers file.
pub struct PackageServers<'a> {
    pub name: &'a str,
    pub version: &'a str,
    pub servers: &'a ServersFile,
}

/// A server allowed through the trust gate, ready for emission.
#[derive(Debug, Clone)]
pub struct MergedServer {
    pub fqid: String,
    pub spec: ServerSpec,
}

/// A server withheld by the trust gate, reported rather than silently
/// dropped.
#[derive(Debug, Clone)]
pub struct DeniedServer {
    pub fqid: String,
    pub needs_exec: bool,
}

/// Merge every package's servers, gate them against `trust`, and return the
/// allowed servers (sorted by fqid) plus the denied ones.
///
/// Fails with [`McpError::FqidCollision`] before any trust check runs: a
/// naming collision is a configuration error, not a trust decision.
pub fn merge(
    packages: &[PackageServers<'_>],
    trust: &TrustFile,
) -> Result<(Vec<MergedServer>, Vec<DeniedServer>), McpError> {
    let mut all: BTreeMap<String, (&str, &str, &ServerSpec)> = BTreeMap::new();

    for pkg in packages {
        for (server_id, spec) in &pkg.servers.servers {
            let fqid = format!("{}/{}", pkg.name, server_id);
            if all.contains_key(&fqid) {
                return Err(McpError::FqidCollision { fqid });
            }
            all.insert(fqid, (pkg.name, pkg.version, spec));
        }
    }

    let mut allowed = Vec::new();
    let mut denied = Vec::new();

    for (fqid, (name, version, spec)) in all {
        let needs_exec = spec.needs_exec();
        if trust.allows_server(name, version, &fqid, needs_exec) {
            allowed.push(MergedServer {
                fqid,
                spec: spec.clone(),
            });
        } else {
            denied.push(DeniedServer { fqid, needs_exec });
        }
    }

    allowed.sort_by(|a, b| a.fqid.cmp(&b.fqid));
    Ok((allowed, denied))
}

/// Serialize the allowed servers to the target's merged MCP config file:
/// stable formatting (sorted keys via `BTreeMap`, 2-space indent, LF line
/// endings, trailing newline), no timestamps.
pub fn render(servers: &[MergedServer]) -> Result<String, McpError> {
    let map: BTreeMap<&str, &ServerSpec> =
        servers.iter().map(|s| (s.fqid.as_str(), &s.spec)).collect();

    #[derive(Serialize)]
    struct Output<'a> {
        #[serde(rename = "mcpServers")]
        mcp_servers: BTreeMap<&'a str, &'a ServerSpec>,
    }

    let mut json = serde_json::to_string_pretty(&Output { mcp_servers: map })
        .map_err(|e| McpError::Other(anyhow::Error::from(e)))?;
    json.push('\n');
    Ok(json)
}

pub fn write(path: &Path, servers: &[MergedServer]) -> Result<(), McpError> {
    let content = render(servers)?;
    crate::util::fs::write_string(path, &content).map_err(McpError::Other)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server(command: Option<&str>) -> ServerSpec {
        ServerSpec {
            command: command.map(str::to_string),
            args: None,
            url: None,
            env: BTreeMap::new(),
        }
    }

    #[test]
    fn test_needs_exec() {
        assert!(server(Some("npx")).needs_exec());
        assert!(!server(None).needs_exec());
    }

    #[test]
    fn test_merge_denies_by_default() {
        let mut servers_file = ServersFile::default();
        servers_file.servers.insert("postgres".to_string(), server(Some("npx")));

        let pkgs = vec![PackageServers {
            name: "acme-mcp-pack",
            version: "0.3.0",
            servers: &servers_file,
        }];
        let trust = TrustFile::default();

        let (allowed, denied) = merge(&pkgs, &trust).unwrap();
        assert!(allowed.is_empty());
        assert_eq!(denied.len(), 1);
        assert_eq!(denied[0].fqid, "acme-mcp-pack/postgres");
        assert!(denied[0].needs_exec);
    }

    #[test]
    fn test_merge_allows_when_trusted() {
        let mut servers_file = ServersFile::default();
        servers_file.servers.insert("postgres".to_string(), server(Some("npx")));

        let pkgs = vec![PackageServers {
            name: "acme-mcp-pack",
            version: "0.3.0",
            servers: &servers_file,
        }];
        let mut trust = TrustFile::default();
        trust.set_allow_exec("acme-mcp-pack", "0.3.0", true);
        trust.set_allow_mcp("acme-mcp-pack", "0.3.0", true);

        let (allowed, denied) = merge(&pkgs, &trust).unwrap();
        assert_eq!(allowed.len(), 1);
        assert!(denied.is_empty());
        assert_eq!(allowed[0].fqid, "acme-mcp-pack/postgres");
    }

    #[test]
    fn test_fqid_collision_detected() {
        let mut a = ServersFile::default();
        a.servers.insert("postgres".to_string(), server(None));
        let mut b = ServersFile::default();
        b.servers.insert("postgres".to_string(), server(None));

        let pkgs = vec![
            PackageServers { name: "acme", version: "1.0.0", servers: &a },
            PackageServers { name: "acme", version: "2.0.0", servers: &b },
        ];
        let trust = TrustFile::default();

        let err = merge(&pkgs, &trust).unwrap_err();
        assert!(matches!(err, McpError::FqidCollision { .. }));
    }

    #[test]
    fn test_render_sorted_and_stable() {
        let servers = vec![
            MergedServer { fqid: "acme/zeta".to_string(), spec: server(None) },
            MergedServer { fqid: "acme/alpha".to_string(), spec: server(Some("npx")) },
        ];
        let rendered = render(&servers).unwrap();
        let alpha_pos = rendered.find("acme/alpha").unwrap();
        let zeta_pos = rendered.find("acme/zeta").unwrap();
        assert!(alpha_pos < zeta_pos);
        assert!(rendered.ends_with('\n'));
    }
}
