//! `botpack doctor` command

use anyhow::Result;

use botpack::mcp::{self, PackageServers};
use botpack::ops::lockfile::{load_lockfile, lockfile_needs_update};
use botpack::sync::{resolve_target, SyncState};
use botpack::trust::TrustFile;
use botpack::util::hash::ContentDigest;

use crate::cli::DoctorArgs;
use crate::commands::support::{open_workspace, store};
use crate::commands::sync::{collect_package_servers, default_targets};
use crate::App;

struct Check {
    ok: bool,
    message: String,
}

pub fn execute(_args: DoctorArgs, app: &App) -> Result<()> {
    let mut checks = Vec::new();

    let ws = match open_workspace(app) {
        Ok(ws) => ws,
        Err(e) => {
            app.shell.error(format!("no workspace found: {e:#}"));
            anyhow::bail!("doctor found unrecoverable problems");
        }
    };
    checks.push(Check { ok: true, message: format!("workspace found at `{}`", ws.root().display()) });

    if lockfile_needs_update(&ws) {
        checks.push(Check {
            ok: false,
            message: "lockfile is missing or stale; run `botpack install` or `botpack update`".to_string(),
        });
    } else {
        checks.push(Check { ok: true, message: "lockfile is up to date".to_string() });
    }

    if let Some(resolve) = load_lockfile(&ws.lockfile_path())? {
        let store = store(app);
        let mut missing = Vec::new();
        for (pkg_id, _summary) in resolve.packages() {
            let Some(checksum) = resolve.checksum(*pkg_id) else { continue };
            if let Ok(digest) = checksum.parse::<ContentDigest>() {
                if !store.contains(&digest) {
                    missing.push(pkg_id.display_name());
                }
            }
        }
        if missing.is_empty() {
            checks.push(Check { ok: true, message: "every locked package is present in the store".to_string() });
        } else {
            checks.push(Check {
                ok: false,
                message: format!("{} locked package(s) missing from the store: {}", missing.len(), missing.join(", ")),
            });
        }
    }

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
    let (_allowed, denied) = mcp::merge(&package_servers, &trust)?;
    if denied.is_empty() {
        checks.push(Check { ok: true, message: "no MCP servers withheld by the trust gate".to_string() });
    } else {
        let fqids: Vec<&str> = denied.iter().map(|d| d.fqid.as_str()).collect();
        checks.push(Check {
            ok: false,
            message: format!("{} MCP server(s) withheld by the trust gate: {}", denied.len(), fqids.join(", ")),
        });
    }

    for name in default_targets(&ws) {
        let Ok(target) = resolve_target(&ws, &name) else { continue };
        let Some(state) = SyncState::load(&ws.sync_state_path(&name))? else {
            continue;
        };
        let mut drifted = Vec::new();
        for entry in &state.entries {
            let path = target.root.join(&entry.path);
            if !path.exists() {
                continue;
            }
            let actual = if path.is_dir() {
                botpack::store::digest_tree(&path)?.0.to_string()
            } else {
                ContentDigest::of_bytes(&std::fs::read(&path)?).to_string()
            };
            if actual != entry.checksum {
                drifted.push(entry.path.clone());
            }
        }
        if drifted.is_empty() {
            checks.push(Check { ok: true, message: format!("target `{name}` matches its last sync") });
        } else {
            checks.push(Check {
                ok: false,
                message: format!("target `{name}` has drifted: {}", drifted.join(", ")),
            });
        }
    }

    let mut all_ok = true;
    for check in &checks {
        if check.ok {
            app.shell.note(format!("ok: {}", check.message));
        } else {
            all_ok = false;
            app.shell.warn(&check.message);
        }
    }

    if all_ok {
        Ok(())
    } else {
        anyhow::bail!("doctor found problems in the workspace");
    }
}
