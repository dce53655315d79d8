//! `botpack trust` command

use anyhow::Result;

use botpack::ops::resolve::resolve_workspace;
use botpack::resolver::Resolve;
use botpack::trust::TrustFile;
use botpack::PackageId;

use crate::cli::{TrustArgs, TrustKind};
use crate::commands::support::{open_workspace, source_cache};
use crate::App;

/// Grant or revoke exec/MCP trust for a package, or one specific MCP
/// server fqid, persisting the decision to `.botpack/trust.toml`.
pub fn execute(args: TrustArgs, app: &App) -> Result<()> {
    let (kind, allow) = match (args.allow, args.deny) {
        (Some(kind), None) => (kind, true),
        (None, Some(kind)) => (kind, false),
        (Some(_), Some(_)) => unreachable!("clap forbids --allow and --deny together"),
        (None, None) => anyhow::bail!("pass `--allow exec|mcp` or `--deny exec|mcp`"),
    };

    if args.server.is_some() && kind != TrustKind::Mcp {
        anyhow::bail!("`--server` only applies to `--allow mcp`/`--deny mcp`");
    }

    let ws = open_workspace(app)?;
    let mut cache = source_cache(app);
    let resolve = resolve_workspace(&ws, &mut cache)?;
    let pkg_id = find_package(&resolve, &args.package)?;

    let trust_path = ws.trust_path();
    let mut trust = TrustFile::load(&trust_path)?;

    let name = pkg_id.name().to_string();
    let version = pkg_id.version().to_string();

    match (kind, &args.server) {
        (TrustKind::Exec, None) => trust.set_allow_exec(&name, &version, allow),
        (TrustKind::Mcp, None) => trust.set_allow_mcp(&name, &version, allow),
        (TrustKind::Mcp, Some(fqid)) => trust.set_server_allow_exec(&name, &version, fqid, allow),
        (TrustKind::Exec, Some(_)) => unreachable!("rejected above"),
    }

    trust.save(&trust_path)?;

    let verb = if allow { "granted" } else { "revoked" };
    let what = match (kind, &args.server) {
        (TrustKind::Exec, _) => "exec".to_string(),
        (TrustKind::Mcp, None) => "mcp".to_string(),
        (TrustKind::Mcp, Some(fqid)) => format!("mcp exec for `{fqid}`"),
    };
    app.shell.note(format!("{verb} {what} trust for {name}@{version}"));

    Ok(())
}

/// Resolve a `name` or `name@version` spec to a concrete package in the
/// current resolution. Bare names that resolve to more than one installed
/// version are ambiguous and must be disambiguated with `@version`.
fn find_package(resolve: &Resolve, spec: &str) -> Result<PackageId> {
    if let Some((name, version)) = spec.split_once('@') {
        let version: semver::Version = version
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid version `{version}` in `{spec}`: {e}"))?;
        return resolve
            .packages()
            .map(|(id, _)| *id)
            .find(|id| id.name().as_str() == name && id.version() == &version)
            .ok_or_else(|| anyhow::anyhow!("no package `{spec}` in the resolved graph"));
    }

    let matches: Vec<PackageId> = resolve
        .packages()
        .map(|(id, _)| *id)
        .filter(|id| id.name().as_str() == spec)
        .collect();

    match matches.len() {
        0 => anyhow::bail!("no package named `{spec}` in the resolved graph"),
        1 => Ok(matches[0]),
        _ => {
            let versions: Vec<String> = matches.iter().map(|id| id.version().to_string()).collect();
            anyhow::bail!(
                "`{spec}` resolves to multiple versions ({}); disambiguate with `{spec}@<version>`",
                versions.join(", ")
            )
        }
    }
}
