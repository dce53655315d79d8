//! Workspace resolution operations.

use anyhow::Result;

use crate::core::Workspace;
use crate::ops::lockfile::{load_lockfile, lockfile_needs_update, save_lockfile};
use crate::resolver::{self, Resolve, ResolveError};
use crate::sources::SourceCache;

/// Options controlling how a workspace is resolved.
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// Require the existing lockfile to be used as-is; fail instead of
    /// re-resolving if it's missing or stale.
    pub locked: bool,

    /// Force fresh resolution even if the lockfile is up to date.
    pub force: bool,
}

/// Resolve the workspace dependencies.
///
/// Uses content-based freshness detection to determine if re-resolution is
/// needed. If the lockfile exists and the manifest's dependency table hasn't
/// changed, the lockfile is used as-is. Otherwise, a fresh resolution is
/// performed and the lockfile rewritten.
pub fn resolve_workspace(ws: &Workspace, source_cache: &mut SourceCache) -> Result<Resolve> {
    resolve_workspace_with_opts(ws, source_cache, &ResolveOptions::default())
}

/// Resolve the workspace dependencies with explicit options.
pub fn resolve_workspace_with_opts(
    ws: &Workspace,
    source_cache: &mut SourceCache,
    opts: &ResolveOptions,
) -> Result<Resolve> {
    let lockfile_path = ws.lockfile_path();
    let needs_update = lockfile_needs_update(ws);

    if opts.locked {
        if needs_update {
            return Err(ResolveError::FrozenLockfileStale {
                path: lockfile_path.display().to_string(),
            }
            .into());
        }
        if let Some(resolve) = load_lockfile(&lockfile_path)? {
            return Ok(resolve);
        }
        return Err(ResolveError::FrozenLockfileMissing {
            path: lockfile_path.display().to_string(),
        }
        .into());
    }

    if !opts.force && !needs_update {
        if let Some(resolve) = load_lockfile(&lockfile_path)? {
            tracing::info!("using existing lockfile (manifest unchanged)");
            return Ok(resolve);
        }
    }

    if lockfile_path.exists() {
        tracing::info!("manifest changed, re-resolving dependencies");
    } else {
        tracing::info!("no lockfile found, resolving dependencies");
    }

    resolve_fresh(ws, source_cache)
}

/// Perform fresh dependency resolution, ignoring any existing lockfile, and
/// persist the result.
pub fn resolve_fresh(ws: &Workspace, source_cache: &mut SourceCache) -> Result<Resolve> {
    let root_summary = ws.root_summary()?;

    let resolve = resolver::resolve(&root_summary, source_cache)?;

    save_lockfile(&ws.lockfile_path(), &resolve, ws)?;

    Ok(resolve)
}

/// Update the lockfile by re-resolving dependencies from scratch.
pub fn update_resolve(ws: &Workspace, source_cache: &mut SourceCache) -> Result<Resolve> {
    tracing::info!("updating dependencies");
    resolve_fresh(ws, source_cache)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::GlobalContext;
    use tempfile::TempDir;

    fn create_test_workspace(dir: &std::path::Path) {
        std::fs::write(
            dir.join(crate::core::workspace::MANIFEST_NAME),
            r#"
version = 1

[workspace]
dir = "."
name = "test"

[dependencies]
"#,
        )
        .unwrap();
    }

    #[test]
    fn test_resolve_workspace() {
        let tmp = TempDir::new().unwrap();
        create_test_workspace(tmp.path());

        let ctx = GlobalContext::with_cwd(tmp.path().to_path_buf()).unwrap();
        let ws = Workspace::new(
            &tmp.path().join(crate::core::workspace::MANIFEST_NAME),
            &ctx,
        )
        .unwrap();

        let mut cache = SourceCache::new(tmp.path().join("cache"));
        let resolve = resolve_workspace(&ws, &mut cache).unwrap();

        // Only the synthetic workspace root itself, no dependencies declared.
        assert_eq!(resolve.len(), 1);
        assert!(ws.lockfile_path().is_file());
    }

    #[test]
    fn test_resolve_workspace_locked_without_lockfile_fails() {
        let tmp = TempDir::new().unwrap();
        create_test_workspace(tmp.path());

        let ctx = GlobalContext::with_cwd(tmp.path().to_path_buf()).unwrap();
        let ws = Workspace::new(
            &tmp.path().join(crate::core::workspace::MANIFEST_NAME),
            &ctx,
        )
        .unwrap();

        let mut cache = SourceCache::new(tmp.path().join("cache"));
        let opts = ResolveOptions {
            locked: true,
            force: false,
        };
        assert!(resolve_workspace_with_opts(&ws, &mut cache, &opts).is_err());
    }
}
