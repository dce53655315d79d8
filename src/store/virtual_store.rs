//! Per-workspace virtual store: `.botpack/pkgs/<name>@<version>/`.
//!
//! The content store at the global store root is keyed by digest, not by
//! package identity, so nothing under a workspace ever points directly into
//! it by a name a human would recognize. The virtual store is the stable,
//! human-readable layer in between: one directory per resolved
//! `name@version`, populated from the global store entry via whichever
//! link mode the manifest (or config) selects.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::core::manifest::LinkMode;
use crate::util::fs::{atomic_replace, copy_dir_all, ensure_dir, hardlink_dir_all, symlink};

/// Populate `dst` (a fresh, not-yet-existing path under
/// `.botpack/pkgs/<name>@<version>`) from `src` (a path inside the global
/// content store) using `mode`.
///
/// `auto` tries symlink, then hardlink, then copy, falling back only on
/// actual failure so a misconfigured filesystem never aborts the sync.
/// An explicit mode (`symlink`/`hardlink`/`copy`) is a promise the caller
/// is relying on (e.g. `hardlink` to dedupe disk usage) and fails loudly
/// instead of silently falling back.
///
/// Population is staged adjacent to `dst` and moved into place with
/// [`atomic_replace`], so a reader never observes a partially populated
/// virtual store entry.
pub fn populate(src: &Path, dst: &Path, mode: LinkMode) -> Result<LinkMode> {
    if let Some(parent) = dst.parent() {
        ensure_dir(parent)?;
    }

    let staging = dst.with_extension("vstage");
    crate::util::fs::remove_dir_all_if_exists(&staging)?;

    let used = match mode {
        LinkMode::Auto => populate_auto(src, &staging)?,
        LinkMode::Symlink => {
            symlink(src, &staging)
                .with_context(|| format!("failed to symlink {} -> {}", staging.display(), src.display()))?;
            LinkMode::Symlink
        }
        LinkMode::Hardlink => {
            hardlink_dir_all(src, &staging)
                .with_context(|| format!("failed to hardlink tree {} -> {}", src.display(), staging.display()))?;
            LinkMode::Hardlink
        }
        LinkMode::Copy => {
            copy_dir_all(src, &staging)
                .with_context(|| format!("failed to copy {} -> {}", src.display(), staging.display()))?;
            LinkMode::Copy
        }
    };

    atomic_replace(&staging, dst)
        .with_context(|| format!("failed to publish virtual store entry at {}", dst.display()))?;

    Ok(used)
}

fn populate_auto(src: &Path, staging: &Path) -> Result<LinkMode> {
    if symlink(src, staging).is_ok() {
        return Ok(LinkMode::Symlink);
    }
    crate::util::fs::remove_dir_all_if_exists(staging)?;

    if hardlink_dir_all(src, staging).is_ok() {
        return Ok(LinkMode::Hardlink);
    }
    crate::util::fs::remove_dir_all_if_exists(staging)?;

    copy_dir_all(src, staging)
        .with_context(|| format!("every link mode failed copying {} -> {}", src.display(), staging.display()))?;
    Ok(LinkMode::Copy)
}

/// The stable on-disk directory name for a resolved package inside
/// `.botpack/pkgs/`.
pub fn entry_name(package_name: &str, version: &str) -> String {
    format!("{package_name}@{version}")
}

/// Full path of a package's virtual store entry.
pub fn entry_path(pkgs_dir: &Path, package_name: &str, version: &str) -> PathBuf {
    pkgs_dir.join(entry_name(package_name, version))
}
