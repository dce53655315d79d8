//! `install`: resolve (from the lockfile when possible), fetch every
//! package into the store, and optionally sync every configured target.

use anyhow::Result;

use crate::core::manifest::LinkMode;
use crate::core::Workspace;
use crate::ops::fetch::{fetch_resolve, FetchReport};
use crate::ops::lockfile::save_lockfile;
use crate::ops::resolve::{resolve_workspace_with_opts, ResolveOptions};
use crate::resolver::Resolve;
use crate::sources::SourceCache;
use crate::store::Store;

#[derive(Debug, Clone, Default)]
pub struct InstallOptions {
    /// Fail instead of re-resolving if the lockfile is missing or stale
    /// (`--frozen-lockfile`).
    pub frozen_lockfile: bool,
}

pub struct InstallResult {
    pub resolve: Resolve,
    pub fetch: FetchReport,
}

/// Resolve the workspace (honoring `--frozen-lockfile`), fetch every
/// resolved package into the store, and rewrite the lockfile with the
/// resulting checksums. Does not sync; callers decide whether to follow up
/// with `ops::sync` based on `--no-sync` and `manifest.sync.on_install`.
pub fn install(
    ws: &Workspace,
    source_cache: &mut SourceCache,
    store: &Store,
    link_mode: LinkMode,
    options: &InstallOptions,
) -> Result<InstallResult> {
    let resolve_opts = ResolveOptions {
        locked: options.frozen_lockfile,
        force: false,
    };
    let mut resolve = resolve_workspace_with_opts(ws, source_cache, &resolve_opts)?;

    let fetch = fetch_resolve(ws, source_cache, &mut resolve, store, link_mode)?;
    if !options.frozen_lockfile {
        save_lockfile(&ws.lockfile_path(), &resolve, ws)?;
    }

    Ok(InstallResult { resolve, fetch })
}
