//! Atomic apply: stage a plan's operations into a scratch tree, then swap
//! it in for the target root in one rename. A process killed mid-apply
//! either hasn't touched the real target root yet, or has already
//! finished the swap; it never leaves a half-written `.claude/`.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::core::manifest::LinkMode;
use crate::core::Workspace;
use crate::util::fs::{ensure_dir, relative_path, remove_dir_all_if_exists};

use super::{Operation, Plan, ResolvedTarget, SyncError, SyncState, SyncStateEntry};

#[derive(Debug, Clone, Copy, Default)]
pub struct ApplyOptions {
    pub dry_run: bool,
    /// Drop any file under the target root this sync doesn't manage,
    /// instead of preserving it across the swap.
    pub clean: bool,
    /// Overwrite even if the target root has drifted since the last sync.
    pub force: bool,
    pub link_mode: LinkMode,
}

#[derive(Debug, Default)]
pub struct ApplyReport {
    pub dry_run: bool,
    pub written: Vec<String>,
    pub preserved: Vec<String>,
    pub stale_removed: Vec<String>,
}

/// Apply `plan` to `target`, updating its persisted [`SyncState`] on success.
pub fn apply(
    ws: &Workspace,
    target: &ResolvedTarget,
    plan: &Plan,
    options: ApplyOptions,
) -> Result<ApplyReport, SyncError> {
    let state_path = ws.sync_state_path(&target.name);
    let previous = SyncState::load(&state_path)?.unwrap_or_default();

    if !options.force {
        check_drift(target, &previous)?;
    }

    let mut report = ApplyReport {
        dry_run: options.dry_run,
        written: plan.entries.iter().map(|e| e.path.clone()).collect(),
        ..Default::default()
    };

    let managed_now: std::collections::HashSet<&str> =
        plan.entries.iter().map(|e| e.path.as_str()).collect();
    let tracked_before: std::collections::HashSet<&str> =
        previous.entries.iter().map(|e| e.path.as_str()).collect();

    report.stale_removed = tracked_before
        .iter()
        .filter(|p| !managed_now.contains(*p))
        .map(|p| p.to_string())
        .collect();

    if options.dry_run {
        if !options.clean && target.root.is_dir() {
            report.preserved = find_untracked(&target.root, &tracked_before)?;
        }
        return Ok(report);
    }

    let staging = ws.botpack_dir().join("generated").join(format!("{}.new", target.name));
    remove_dir_all_if_exists(&staging)?;
    ensure_dir(&staging)?;

    for op in &plan.operations {
        apply_operation(target, &staging, op, options.link_mode)?;
    }

    if !options.clean && target.root.is_dir() {
        let preserved = find_untracked(&target.root, &tracked_before)?;
        for rel in &preserved {
            let src = target.root.join(rel);
            let dst = staging.join(rel);
            if dst.exists() {
                continue;
            }
            if let Some(parent) = dst.parent() {
                ensure_dir(parent)?;
            }
            if src.is_dir() {
                crate::util::fs::copy_dir_all(&src, &dst)?;
            } else {
                std::fs::copy(&src, &dst)?;
            }
        }
        report.preserved = preserved;
    }

    fsync_dir(&staging)?;
    swap_in(&target.root, &staging)?;

    let new_state = SyncState {
        tool_version: env!("CARGO_PKG_VERSION").to_string(),
        target_config_hash: target.config_hash(),
        entries: plan.entries.clone(),
    };
    new_state.save(&state_path)?;

    Ok(report)
}

fn check_drift(target: &ResolvedTarget, previous: &SyncState) -> Result<(), SyncError> {
    for entry in &previous.entries {
        let path = target.root.join(&entry.path);
        if !path.exists() {
            continue;
        }
        let actual = super::checksum_of(&path)?;
        if actual.to_string() != entry.checksum {
            return Err(SyncError::Drift { path: entry.path.clone() });
        }
    }
    Ok(())
}

fn apply_operation(
    target: &ResolvedTarget,
    staging: &Path,
    op: &Operation,
    link_mode: LinkMode,
) -> Result<(), SyncError> {
    match op {
        Operation::CreateDir(dir) => {
            ensure_dir(&restage(target, staging, dir))?;
        }
        Operation::Link { src, dst } => {
            let staged_dst = restage(target, staging, dst);
            link_entry(src, &staged_dst, link_mode)?;
        }
        Operation::WriteFile { dst, contents } => {
            let staged_dst = restage(target, staging, dst);
            if let Some(parent) = staged_dst.parent() {
                ensure_dir(parent)?;
            }
            std::fs::write(&staged_dst, contents)?;
        }
        Operation::Remove(_) => {}
    }
    Ok(())
}

fn restage(target: &ResolvedTarget, staging: &Path, original: &Path) -> PathBuf {
    let rel = relative_path(&target.root, original);
    staging.join(rel)
}

fn link_entry(src: &Path, dst: &Path, mode: LinkMode) -> Result<(), SyncError> {
    if let Some(parent) = dst.parent() {
        ensure_dir(parent)?;
    }
    if src.is_dir() {
        crate::store::virtual_store::populate(src, dst, mode).map_err(SyncError::Other)?;
        return Ok(());
    }

    match mode {
        LinkMode::Auto => {
            if crate::util::fs::symlink(src, dst).is_ok() {
                return Ok(());
            }
            if crate::util::fs::hardlink(src, dst).is_ok() {
                return Ok(());
            }
            std::fs::copy(src, dst)?;
            Ok(())
        }
        LinkMode::Symlink => crate::util::fs::symlink(src, dst).map_err(SyncError::Io),
        LinkMode::Hardlink => crate::util::fs::hardlink(src, dst).map_err(SyncError::Io),
        LinkMode::Copy => {
            std::fs::copy(src, dst)?;
            Ok(())
        }
    }
}

fn find_untracked(
    root: &Path,
    tracked_before: &std::collections::HashSet<&str>,
) -> Result<Vec<String>, SyncError> {
    let mut found = Vec::new();
    for entry in WalkDir::new(root).min_depth(1) {
        let entry = entry.map_err(|e| SyncError::Other(anyhow::Error::from(e)))?;
        if entry.file_type().is_dir() {
            continue;
        }
        let rel = relative_path(root, entry.path())
            .to_string_lossy()
            .replace('\\', "/");
        if tracked_before.contains(rel.as_str()) {
            continue;
        }
        found.push(rel);
    }
    found.sort();
    Ok(found)
}

/// Move `staged` into `root`, preserving the previous contents under
/// `<root>.old` until the swap is confirmed, then removing them. Rolls
/// `<root>.old` back into place if the final rename fails.
fn swap_in(root: &Path, staged: &Path) -> Result<(), SyncError> {
    let old = root.with_extension("old");
    remove_dir_all_if_exists(&old)?;

    let had_previous = root.is_dir();
    if had_previous {
        std::fs::rename(root, &old)?;
    }

    if let Some(parent) = root.parent() {
        ensure_dir(parent)?;
    }

    match std::fs::rename(staged, root) {
        Ok(()) => {
            if had_previous {
                remove_dir_all_if_exists(&old)?;
            }
            Ok(())
        }
        Err(e) => {
            if had_previous {
                let _ = std::fs::rename(&old, root);
            }
            Err(SyncError::Io(e))
        }
    }
}

#[cfg(unix)]
fn fsync_dir(path: &Path) -> Result<(), SyncError> {
    std::fs::File::open(path)?.sync_all()?;
    Ok(())
}

#[cfg(not(unix))]
fn fsync_dir(_path: &Path) -> Result<(), SyncError> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::manifest::PolicyMode;
    use tempfile::TempDir;

    fn target(tmp: &Path) -> ResolvedTarget {
        ResolvedTarget {
            name: "claude".to_string(),
            root: tmp.join(".claude"),
            skills_dir: Some(tmp.join(".claude").join("skills")),
            commands_dir: Some(tmp.join(".claude").join("commands")),
            agents_dir: Some(tmp.join(".claude").join("agents")),
            mcp_out: Some(tmp.join(".claude").join("mcp.json")),
            policy_dir: Some(tmp.join(".claude").join("policy")),
            policy_mode: PolicyMode::Fragments,
        }
    }

    fn workspace(tmp: &Path) -> Workspace {
        let manifest_path = tmp.join("botpack.toml");
        std::fs::write(
            &manifest_path,
            "version = 1\n[workspace]\ndir = \".\"\n",
        )
        .unwrap();
        let ctx = crate::util::context::GlobalContext::with_cwd(tmp.to_path_buf()).unwrap();
        Workspace::new(&manifest_path, &ctx).unwrap()
    }

    #[test]
    fn test_apply_writes_file_and_state() {
        let tmp = TempDir::new().unwrap();
        let ws = workspace(tmp.path());
        let t = target(tmp.path());

        let dst = t.commands_dir.clone().unwrap().join("deploy.md");
        let plan = Plan {
            operations: vec![
                Operation::CreateDir(t.commands_dir.clone().unwrap()),
                Operation::WriteFile { dst: dst.clone(), contents: b"content".to_vec() },
            ],
            entries: vec![SyncStateEntry {
                path: "commands/deploy.md".to_string(),
                asset_address: "deploy".to_string(),
                checksum: crate::util::hash::ContentDigest::of_bytes(b"content").to_string(),
            }],
        };

        let report = apply(&ws, &t, &plan, ApplyOptions::default()).unwrap();
        assert_eq!(report.written.len(), 1);
        assert_eq!(std::fs::read_to_string(t.root.join("commands/deploy.md")).unwrap(), "content");

        let state = SyncState::load(&ws.sync_state_path("claude")).unwrap().unwrap();
        assert_eq!(state.entries.len(), 1);
    }

    #[test]
    fn test_dry_run_does_not_write() {
        let tmp = TempDir::new().unwrap();
        let ws = workspace(tmp.path());
        let t = target(tmp.path());

        let dst = t.commands_dir.clone().unwrap().join("deploy.md");
        let plan = Plan {
            operations: vec![Operation::WriteFile { dst, contents: b"content".to_vec() }],
            entries: vec![SyncStateEntry {
                path: "commands/deploy.md".to_string(),
                asset_address: "deploy".to_string(),
                checksum: "blake3:deadbeef".to_string(),
            }],
        };

        let report = apply(&ws, &t, &plan, ApplyOptions { dry_run: true, ..Default::default() }).unwrap();
        assert!(report.dry_run);
        assert!(!t.root.exists());
    }

    #[test]
    fn test_preserves_untracked_file_by_default() {
        let tmp = TempDir::new().unwrap();
        let ws = workspace(tmp.path());
        let t = target(tmp.path());

        std::fs::create_dir_all(&t.root).unwrap();
        std::fs::write(t.root.join("NOTES.md"), "mine").unwrap();

        let plan = Plan::default();
        apply(&ws, &t, &plan, ApplyOptions::default()).unwrap();

        assert_eq!(std::fs::read_to_string(t.root.join("NOTES.md")).unwrap(), "mine");
    }

    #[test]
    fn test_clean_drops_untracked_file() {
        let tmp = TempDir::new().unwrap();
        let ws = workspace(tmp.path());
        let t = target(tmp.path());

        std::fs::create_dir_all(&t.root).unwrap();
        std::fs::write(t.root.join("NOTES.md"), "mine").unwrap();

        let plan = Plan::default();
        apply(&ws, &t, &plan, ApplyOptions { clean: true, ..Default::default() }).unwrap();

        assert!(!t.root.join("NOTES.md").exists());
    }

    #[test]
    fn test_drift_blocks_without_force() {
        let tmp = TempDir::new().unwrap();
        let ws = workspace(tmp.path());
        let t = target(tmp.path());

        std::fs::create_dir_all(t.root.join("commands")).unwrap();
        std::fs::write(t.root.join("commands").join("deploy.md"), "modified by hand").unwrap();

        let previous = SyncState {
            tool_version: "0.1.0".to_string(),
            target_config_hash: t.config_hash(),
            entries: vec![SyncStateEntry {
                path: "commands/deploy.md".to_string(),
                asset_address: "deploy".to_string(),
                checksum: crate::util::hash::ContentDigest::of_bytes(b"original").to_string(),
            }],
        };
        previous.save(&ws.sync_state_path("claude")).unwrap();

        let plan = Plan::default();
        let err = apply(&ws, &t, &plan, ApplyOptions::default()).unwrap_err();
        assert!(matches!(err, SyncError::Drift { .. }));
    }
}
