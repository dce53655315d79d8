//! `botpack sync` command

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use botpack::core::Workspace;
use botpack::mcp::{self, PackageServers, ServersFile};
use botpack::scan::scan_all;
use botpack::sync::{apply, resolve_target, watch, ApplyOptions, ApplyReport};
use botpack::trust::{TrustError, TrustFile};
use botpack::util::shell::Status;

use crate::cli::SyncArgs;
use crate::commands::support::{link_mode, open_workspace};
use crate::App;

/// Every package directory in the virtual store contributing `mcp/servers.toml`.
pub(crate) fn collect_package_servers(ws: &Workspace) -> Result<Vec<(String, String, ServersFile)>> {
    let mut out = Vec::new();
    let pkgs_dir = ws.pkgs_dir();
    if !pkgs_dir.is_dir() {
        return Ok(out);
    }

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

        let servers_toml = entry.path().join("mcp").join("servers.toml");
        if !servers_toml.is_file() {
            continue;
        }

        let content = std::fs::read_to_string(&servers_toml)
            .with_context(|| format!("failed to read {}", servers_toml.display()))?;
        let parsed: ServersFile = toml::from_str(&content)
            .with_context(|| format!("failed to parse {}", servers_toml.display()))?;

        out.push((name.to_string(), version.to_string(), parsed));
    }

    Ok(out)
}

/// Default target set when none is named on the command line: every
/// manifest-declared target plus the three built-ins, deduplicated.
pub(crate) fn default_targets(ws: &Workspace) -> Vec<String> {
    let mut names: BTreeSet<String> = ws.manifest().targets.keys().cloned().collect();
    for builtin in ["claude", "amp", "droid"] {
        names.insert(builtin.to_string());
    }
    names.into_iter().collect()
}

fn sync_one_target(app: &App, ws: &Workspace, name: &str, options: &ApplyOptions) -> Result<ApplyReport> {
    let target = resolve_target(ws, name)?;

    let assets = scan_all(ws)?;
    let trust_path = ws.trust_path();
    let trust = if trust_path.is_file() {
        TrustFile::load(&trust_path)?
    } else {
        TrustFile::default()
    };

    let owned_servers = collect_package_servers(ws)?;
    let package_servers: Vec<PackageServers<'_>> = owned_servers
        .iter()
        .map(|(name, version, servers)| PackageServers { name, version, servers })
        .collect();
    let (allowed, denied) = mcp::merge(&package_servers, &trust)?;

    // A capability gap fails the whole sync before anything is written, so
    // the previous materialization (including mcp.json) is left untouched.
    if let Some(first) = denied.first() {
        return Err(TrustError::Blocked {
            package: first.fqid.split('/').next().unwrap_or(&first.fqid).to_string(),
            fqid: first.fqid.clone(),
        }
        .into());
    }

    let plan = botpack::sync::build_plan(&target, &assets, &ws.manifest().aliases, &allowed)?;

    apply(ws, &target, &plan, *options).map_err(Into::into)
}

/// Sync every configured target for `ws`, used by `add`/`remove`/`install`
/// when `sync.onAdd`/`sync.onInstall` is set.
pub fn run_all_targets(app: &App, ws: &Workspace) -> Result<()> {
    let mode = link_mode(app, ws);
    let options = ApplyOptions {
        dry_run: false,
        clean: false,
        force: false,
        link_mode: mode,
    };

    for name in default_targets(ws) {
        let report = sync_one_target(app, ws, &name, &options)?;
        app.shell
            .status(Status::Finished, format!("synced `{name}` ({} written)", report.written.len()));
    }

    Ok(())
}

pub fn execute(args: SyncArgs, app: &App) -> Result<()> {
    let ws = open_workspace(app)?;
    ws.ensure_botpack_dir()?;

    let mode = link_mode(app, &ws);
    let options = ApplyOptions {
        dry_run: args.dry_run,
        clean: args.clean,
        force: args.force,
        link_mode: mode,
    };

    let targets = if args.targets.is_empty() {
        default_targets(&ws)
    } else {
        args.targets.clone()
    };

    let run_once = |app: &App, ws: &Workspace| -> Result<()> {
        for name in &targets {
            let report = sync_one_target(app, ws, name, &options)?;
            if options.dry_run {
                app.shell.status(Status::Info, format!("would write {} path(s) to `{name}`", report.written.len()));
            } else {
                app.shell
                    .status(Status::Finished, format!("synced `{name}` ({} written)", report.written.len()));
            }
        }

        if ws.manifest().sync.catalog && !options.dry_run {
            let assets = scan_all(ws)?;
            botpack::catalog::write_catalog(ws, &assets, botpack::util::time::now_rfc3339())?;
        }

        Ok(())
    };

    if args.watch {
        let mut watch_paths: Vec<PathBuf> = vec![ws.assets_dir(), ws.pkgs_dir()];
        watch_paths.retain(|p| p.is_dir());

        app.shell.note("watching for changes (Ctrl+C to stop)");
        watch(&watch_paths, Duration::from_millis(300), || {
            run_once(app, &ws).map_err(|e| botpack::sync::SyncError::Other(e))
        })?;
        Ok(())
    } else {
        run_once(app, &ws)
    }
}
