//! Fetch: pull every resolved package's source tree into the content
//! store, then populate the workspace's virtual store from it.
//!
//! Resolution only decides *which* `name@version` pairs are needed; it
//! never touches disk beyond what a source's `query` requires. Fetching is
//! the step that actually materializes a package tree, hands it to
//! [`crate::store::Store::put`] for content-addressing, and records the
//! resulting digest back onto the [`Resolve`] so the lockfile can pin it.

use std::path::PathBuf;

use anyhow::Result;

use crate::core::manifest::LinkMode;
use crate::core::Workspace;
use crate::resolver::Resolve;
use crate::sources::SourceCache;
use crate::store::{virtual_store, Store};
use crate::util::hash::ContentDigest;

/// One package materialized by a fetch pass.
#[derive(Debug, Clone)]
pub struct FetchedPackage {
    pub name: String,
    pub version: String,
    pub digest: ContentDigest,
    pub link_mode: LinkMode,
    pub virtual_path: PathBuf,
    /// True if the store already held this digest; nothing new was copied.
    pub already_in_store: bool,
}

#[derive(Debug, Default)]
pub struct FetchReport {
    pub fetched: Vec<FetchedPackage>,
}

/// The link mode a fetch should use, in precedence order: an explicit
/// per-invocation override, then the manifest's `[sync]` section (when it
/// isn't left at the default), then the global config, falling back to
/// `auto`.
pub fn effective_link_mode(ws: &Workspace, config_link_mode: Option<LinkMode>) -> LinkMode {
    let manifest_mode = ws.manifest().sync.link_mode;
    if manifest_mode != LinkMode::Auto {
        return manifest_mode;
    }
    config_link_mode.unwrap_or(LinkMode::Auto)
}

/// Fetch every non-root package in `resolve` into the content store and
/// populate `<workspace>/.botpack/pkgs/<name>@<version>` from it, recording
/// each package's content digest back onto `resolve`.
///
/// The synthetic workspace-root package (the one [`Workspace::root_summary`]
/// manufactures so the resolver has a place to start) is never itself
/// fetched or linked into the virtual store - it already lives at the
/// workspace root.
pub fn fetch_resolve(
    ws: &Workspace,
    source_cache: &mut SourceCache,
    resolve: &mut Resolve,
    store: &Store,
    link_mode: LinkMode,
) -> Result<FetchReport> {
    let root_id = ws.root_summary()?.package_id();
    crate::util::fs::ensure_dir(&ws.pkgs_dir())?;

    let mut report = FetchReport::default();

    let package_ids: Vec<_> = resolve
        .packages()
        .map(|(id, _)| *id)
        .filter(|id| *id != root_id)
        .collect();

    for pkg_id in package_ids {
        let name = pkg_id.name().to_string();
        let version = pkg_id.version().to_string();

        tracing::info!("fetching {name} v{version}");
        let src_path = source_cache.package_path(pkg_id)?;

        let already_in_store = {
            let (digest, _) = crate::store::digest_tree(&src_path)?;
            store.contains(&digest)
        };

        let digest = store.put(&src_path, &name, &version, &pkg_id.source_id().to_url_string())?;
        resolve.set_checksum(pkg_id, digest.to_string());

        let virtual_path = virtual_store::entry_path(&ws.pkgs_dir(), &name, &version);
        let used_mode = virtual_store::populate(&store.payload_path(&digest), &virtual_path, link_mode)?;

        report.fetched.push(FetchedPackage {
            name,
            version,
            digest,
            link_mode: used_mode,
            virtual_path,
            already_in_store,
        });
    }

    store.cleanup_stale_tmp()?;

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::resolve::resolve_fresh;
    use tempfile::TempDir;

    fn write_package(dir: &std::path::Path, name: &str, version: &str) {
        std::fs::create_dir_all(dir.join("skills").join("fetch_web")).unwrap();
        std::fs::write(
            dir.join("agentpkg.toml"),
            format!("agentpkg = 1\nname = \"{name}\"\nversion = \"{version}\"\n"),
        )
        .unwrap();
        std::fs::write(
            dir.join("skills").join("fetch_web").join("SKILL.md"),
            "---\nid: fetch_web\n---\nbody",
        )
        .unwrap();
    }

    fn write_workspace(dir: &std::path::Path, pkg_dir: &std::path::Path) {
        std::fs::write(
            dir.join(crate::core::workspace::MANIFEST_NAME),
            format!(
                "version = 1\n\n[workspace]\ndir = \".\"\nname = \"ws\"\n\n[dependencies]\nacme-quality-skills = {{ path = \"{}\" }}\n",
                pkg_dir.display()
            ),
        )
        .unwrap();
    }

    #[test]
    fn test_fetch_populates_virtual_store() {
        let tmp = TempDir::new().unwrap();
        let pkg_dir = tmp.path().join("pkg");
        write_package(&pkg_dir, "acme-quality-skills", "1.0.0");

        let ws_dir = tmp.path().join("ws");
        std::fs::create_dir_all(&ws_dir).unwrap();
        write_workspace(&ws_dir, &pkg_dir);

        let ctx = crate::util::GlobalContext::with_cwd(ws_dir.clone()).unwrap();
        let ws = Workspace::new(&ws_dir.join(crate::core::workspace::MANIFEST_NAME), &ctx).unwrap();
        ws.ensure_botpack_dir().unwrap();

        let mut cache = SourceCache::new(tmp.path().join("cache"));
        let mut resolve = resolve_fresh(&ws, &mut cache).unwrap();
        assert_eq!(resolve.len(), 2);

        let store = Store::new(tmp.path().join("store"));
        let report = fetch_resolve(&ws, &mut cache, &mut resolve, &store, LinkMode::Copy).unwrap();

        assert_eq!(report.fetched.len(), 1);
        let fetched = &report.fetched[0];
        assert_eq!(fetched.name, "acme-quality-skills");
        assert!(fetched
            .virtual_path
            .join("skills")
            .join("fetch_web")
            .join("SKILL.md")
            .is_file());
        assert!(resolve.checksum(
            resolve
                .packages()
                .find(|(id, _)| id.name().as_str() == "acme-quality-skills")
                .unwrap()
                .0
                .clone()
        ).is_some());
    }
}
