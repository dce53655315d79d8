//! `botpack audit` command

use anyhow::Result;

use botpack::mcp::{self, PackageServers};
use botpack::trust::TrustFile;

use crate::cli::AuditArgs;
use crate::commands::support::open_workspace;
use crate::commands::sync::collect_package_servers;
use crate::App;

/// Report every MCP server the trust gate is currently withholding, and
/// whether granting it would also require exec trust.
pub fn execute(_args: AuditArgs, app: &App) -> Result<()> {
    let ws = open_workspace(app)?;

    let trust_path = ws.trust_path();
    let trust = if trust_path.is_file() {
        TrustFile::load(&trust_path)?
    } else {
        TrustFile::default()
    };

    let owned_servers = collect_package_servers(&ws)?;
    let package_servers: Vec<PackageServers<'_>> = owned_servers
        .iter()
        .map(|(name, version, servers)| PackageServers { name, version, servers })
        .collect();
    let (allowed, denied) = mcp::merge(&package_servers, &trust)?;

    if denied.is_empty() {
        app.shell.note(format!("{} MCP server(s) allowed, none withheld", allowed.len()));
        return Ok(());
    }

    for d in &denied {
        app.shell.warn(format!(
            "`{}` withheld by the trust gate{}",
            d.fqid,
            if d.needs_exec { " (requires exec trust)" } else { "" }
        ));
    }
    app.shell.note(format!(
        "{} allowed, {} withheld; grant with `botpack trust <package> --allow mcp`",
        allowed.len(),
        denied.len()
    ));

    anyhow::bail!("{} MCP server(s) withheld by the trust gate", denied.len());
}
