//! Shared helpers for wiring a command's parsed arguments to the library.

use anyhow::{Context, Result};

use botpack::core::manifest::LinkMode;
use botpack::core::Workspace;
use botpack::ops::fetch::effective_link_mode;
use botpack::sources::SourceCache;
use botpack::store::Store;
use botpack::util::diagnostic::suggestions;

use crate::App;

/// Load the workspace rooted at the manifest found from `app.ctx`'s cwd (or
/// its resolved root), producing an actionable error if none is found.
pub fn open_workspace(app: &App) -> Result<Workspace> {
    let manifest_path = app
        .ctx
        .find_manifest()
        .map_err(|_| anyhow::anyhow!("no `botpack.toml` found\n\n{}", suggestions::NO_MANIFEST))?;

    Workspace::new(&manifest_path, &app.ctx)
        .with_context(|| format!("failed to load workspace at {}", manifest_path.display()))
}

/// Build a `SourceCache` rooted at this context's cache directory, honoring
/// `--offline`.
pub fn source_cache(app: &App) -> SourceCache {
    SourceCache::with_offline(app.ctx.home().join("cache"), app.ctx.is_offline())
}

/// Build a `Store` rooted at this context's store directory.
pub fn store(app: &App) -> Store {
    Store::new(app.ctx.store_root().to_path_buf())
}

/// The link mode a fetch/sync should use for this workspace, given the
/// workspace's `[sync].linkMode` and the merged config's default.
pub fn link_mode(app: &App, ws: &Workspace) -> LinkMode {
    effective_link_mode(ws, app.config.link_mode())
}
