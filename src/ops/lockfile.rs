//! Lockfile I/O operations.

use std::path::Path;

use anyhow::Result;

use crate::core::Workspace;
use crate::resolver::encode::Lockfile;
use crate::resolver::Resolve;

/// Load a lockfile from the given path.
pub fn load_lockfile(path: &Path) -> Result<Option<Resolve>> {
    if !path.exists() {
        return Ok(None);
    }

    let lockfile = Lockfile::load(path)?;

    if !lockfile.is_compatible() {
        anyhow::bail!(
            "lockfile version {} is not compatible with this version of botpack",
            lockfile.version
        );
    }

    let resolve = lockfile.to_resolve()?;
    Ok(Some(resolve))
}

/// Save a resolve to the lockfile, stamping it with the workspace's current
/// manifest fingerprint, the tool version, the manifest schema version, and
/// a verbatim copy of the manifest's direct-dependency table.
pub fn save_lockfile(path: &Path, resolve: &Resolve, ws: &Workspace) -> Result<()> {
    let lockfile = Lockfile::from_resolve(resolve)
        .with_root_fingerprint(ws.manifest_fingerprint())
        .with_manifest_metadata(
            env!("CARGO_PKG_VERSION").to_string(),
            crate::core::manifest::MANIFEST_SCHEMA_VERSION,
            ws.manifest()
                .dependencies
                .iter()
                .map(|(name, spec)| (name.clone(), spec.clone()))
                .collect(),
        );
    lockfile.save(path)?;
    Ok(())
}

/// Check if the lockfile needs updating: either it's missing, unreadable,
/// schema-incompatible, or its stored manifest fingerprint no longer matches
/// the workspace's current dependency table.
pub fn lockfile_needs_update(ws: &Workspace) -> bool {
    let path = ws.lockfile_path();
    if !path.exists() {
        return true;
    }

    let lockfile = match Lockfile::load(&path) {
        Ok(l) => l,
        Err(_) => return true,
    };

    if !lockfile.is_compatible() {
        return true;
    }

    match lockfile.root_fingerprint.as_deref() {
        Some(fp) => fp != ws.manifest_fingerprint(),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{PackageId, SourceId, Summary};
    use crate::util::GlobalContext;
    use semver::Version;
    use tempfile::TempDir;

    fn write_manifest(dir: &std::path::Path) {
        std::fs::write(
            dir.join(crate::core::workspace::MANIFEST_NAME),
            "version = 1\n\n[workspace]\ndir = \".\"\nname = \"testws\"\n\n[dependencies]\n",
        )
        .unwrap();
    }

    #[test]
    fn test_lockfile_roundtrip() {
        let tmp = TempDir::new().unwrap();
        write_manifest(tmp.path());
        let ctx = GlobalContext::with_cwd(tmp.path().to_path_buf()).unwrap();
        let ws = Workspace::new(
            &tmp.path().join(crate::core::workspace::MANIFEST_NAME),
            &ctx,
        )
        .unwrap();

        let lockfile_path = ws.lockfile_path();

        let source = SourceId::for_path(tmp.path()).unwrap();
        let pkg_id = PackageId::new("test", Version::new(1, 0, 0), source);

        let mut resolve = Resolve::new();
        resolve.add_package(pkg_id, Summary::new(pkg_id, vec![], None));

        save_lockfile(&lockfile_path, &resolve, &ws).unwrap();

        let loaded = load_lockfile(&lockfile_path).unwrap().unwrap();
        assert_eq!(loaded.len(), 1);
        assert!(!lockfile_needs_update(&ws));
    }

    #[test]
    fn test_missing_lockfile() {
        let tmp = TempDir::new().unwrap();
        let lockfile_path = tmp.path().join("nonexistent.lock");

        let result = load_lockfile(&lockfile_path).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_needs_update_when_dependencies_change() {
        let tmp = TempDir::new().unwrap();
        write_manifest(tmp.path());
        let ctx = GlobalContext::with_cwd(tmp.path().to_path_buf()).unwrap();
        let ws = Workspace::new(
            &tmp.path().join(crate::core::workspace::MANIFEST_NAME),
            &ctx,
        )
        .unwrap();

        assert!(lockfile_needs_update(&ws));

        let resolve = Resolve::new();
        save_lockfile(&ws.lockfile_path(), &resolve, &ws).unwrap();
        assert!(!lockfile_needs_update(&ws));

        std::fs::write(
            ws.manifest_path(),
            "version = 1\n\n[workspace]\ndir = \".\"\nname = \"testws\"\n\n[dependencies]\nfoo = \"^1.0\"\n",
        )
        .unwrap();
        let ws2 = Workspace::new(&ws.manifest_path(), &ctx).unwrap();
        assert!(lockfile_needs_update(&ws2));
    }
}
