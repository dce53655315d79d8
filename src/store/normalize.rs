//! Tree normalization and content digesting.
//!
//! Before a fetched package tree is hashed or copied into the store, it is
//! walked into a canonical, platform-independent list of entries: lexical
//! path order, VCS directories excluded, file mode bits collapsed to
//! `{regular, regular-executable}`, symlink targets preserved as-is. Line
//! endings are never rewritten (binary safety, see SPEC_FULL §4.2).

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use walkdir::WalkDir;

use crate::util::hash::ContentDigest;

/// Directory names excluded from normalization (version-control metadata).
const EXCLUDED_DIRS: &[&str] = &[".git", ".hg", ".svn"];

/// One entry in a normalized package tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedEntry {
    /// Path relative to the tree root, using `/` separators on every
    /// platform so digests are platform-independent.
    pub rel_path: String,
    pub kind: EntryKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
    /// A regular file, `executable` iff the owner-execute bit was set.
    File { executable: bool },
    /// A symlink, preserved with its raw (possibly relative, possibly
    /// dangling) target string.
    Symlink { target: String },
}

/// Walk `root`, producing the lexically-ordered, VCS-stripped list of
/// normalized entries. Does not follow symlinks that point outside the
/// tree (`WalkDir` with `follow_links(false)` never follows any symlink;
/// a symlink is recorded as a [`EntryKind::Symlink`] entry instead).
pub fn walk_normalized(root: &Path) -> Result<Vec<NormalizedEntry>> {
    let mut entries = Vec::new();

    for entry in WalkDir::new(root).follow_links(false).into_iter() {
        let entry = entry.with_context(|| format!("failed to walk {}", root.display()))?;
        let path = entry.path();

        if path == root {
            continue;
        }

        if path
            .components()
            .any(|c| matches!(c.as_os_str().to_str(), Some(s) if EXCLUDED_DIRS.contains(&s)))
        {
            continue;
        }

        let file_type = entry.file_type();
        if file_type.is_dir() {
            continue;
        }

        let rel = path
            .strip_prefix(root)
            .with_context(|| format!("{} is not under {}", path.display(), root.display()))?;
        let rel_path = to_slash(rel);

        let kind = if file_type.is_symlink() {
            let target = std::fs::read_link(path)
                .with_context(|| format!("failed to read symlink: {}", path.display()))?;
            EntryKind::Symlink {
                target: to_slash(&target),
            }
        } else {
            EntryKind::File {
                executable: is_executable(path)?,
            }
        };

        entries.push(NormalizedEntry { rel_path, kind });
    }

    entries.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));
    Ok(entries)
}

/// Render a path using forward slashes regardless of host platform.
fn to_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(unix)]
fn is_executable(path: &Path) -> Result<bool> {
    use std::os::unix::fs::PermissionsExt;
    let meta = std::fs::symlink_metadata(path)
        .with_context(|| format!("failed to stat {}", path.display()))?;
    Ok(meta.permissions().mode() & 0o111 != 0)
}

/// Non-POSIX filesystems have no executable bit to read; every file
/// normalizes as non-executable there (recorded as a deliberate choice in
/// DESIGN.md rather than guessed per-platform heuristics).
#[cfg(not(unix))]
fn is_executable(_path: &Path) -> Result<bool> {
    Ok(false)
}

/// Compute the content digest of a normalized tree: a BLAKE3 hash over each
/// entry's relative path, kind marker, and (for files) content, in lexical
/// order. Two trees with identical contents, paths, mode bits and symlink
/// targets always hash identically, independent of host platform or the
/// order files were created on disk.
pub fn digest_tree(root: &Path) -> Result<(ContentDigest, Vec<NormalizedEntry>)> {
    let entries = walk_normalized(root)?;
    let mut hasher = blake3::Hasher::new();

    for entry in &entries {
        hasher.update(entry.rel_path.as_bytes());
        hasher.update(b"\0");
        match &entry.kind {
            EntryKind::File { executable } => {
                hasher.update(if *executable { b"f+x\0" } else { b"f\0" });
                let path = root.join(split_slash(&entry.rel_path));
                let mut file = std::fs::File::open(&path)
                    .with_context(|| format!("failed to open {}", path.display()))?;
                std::io::copy(&mut file, &mut hasher)
                    .with_context(|| format!("failed to hash {}", path.display()))?;
            }
            EntryKind::Symlink { target } => {
                hasher.update(b"l\0");
                hasher.update(target.as_bytes());
            }
        }
        hasher.update(b"\0");
    }

    Ok((ContentDigest::from_hasher(hasher), entries))
}

fn split_slash(rel_path: &str) -> PathBuf {
    rel_path.split('/').collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_digest_ignores_vcs_dirs() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join(".git")).unwrap();
        std::fs::write(tmp.path().join(".git").join("HEAD"), "ref: refs/heads/main").unwrap();
        std::fs::write(tmp.path().join("a.txt"), "hello").unwrap();

        let (digest, entries) = digest_tree(tmp.path()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].rel_path, "a.txt");

        let tmp2 = TempDir::new().unwrap();
        std::fs::write(tmp2.path().join("a.txt"), "hello").unwrap();
        let (digest2, _) = digest_tree(tmp2.path()).unwrap();

        assert_eq!(digest, digest2);
    }

    #[test]
    fn test_digest_depends_on_content() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("a.txt"), "hello").unwrap();
        let (digest_a, _) = digest_tree(tmp.path()).unwrap();

        std::fs::write(tmp.path().join("a.txt"), "world").unwrap();
        let (digest_b, _) = digest_tree(tmp.path()).unwrap();

        assert_ne!(digest_a, digest_b);
    }

    #[test]
    fn test_digest_is_path_order_independent() {
        let tmp_a = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp_a.path().join("b")).unwrap();
        std::fs::write(tmp_a.path().join("b").join("z.txt"), "z").unwrap();
        std::fs::write(tmp_a.path().join("a.txt"), "a").unwrap();

        let tmp_b = TempDir::new().unwrap();
        std::fs::write(tmp_b.path().join("a.txt"), "a").unwrap();
        std::fs::create_dir_all(tmp_b.path().join("b")).unwrap();
        std::fs::write(tmp_b.path().join("b").join("z.txt"), "z").unwrap();

        let (digest_a, _) = digest_tree(tmp_a.path()).unwrap();
        let (digest_b, _) = digest_tree(tmp_b.path()).unwrap();
        assert_eq!(digest_a, digest_b);
    }

    #[cfg(unix)]
    #[test]
    fn test_digest_depends_on_executable_bit() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        let script = tmp.path().join("run.sh");
        std::fs::write(&script, "#!/bin/sh\necho hi").unwrap();
        let (digest_plain, _) = digest_tree(tmp.path()).unwrap();

        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        let (digest_exec, _) = digest_tree(tmp.path()).unwrap();

        assert_ne!(digest_plain, digest_exec);
    }

    #[test]
    fn test_symlink_target_preserved_not_followed() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("real.txt"), "content").unwrap();

        #[cfg(unix)]
        std::os::unix::fs::symlink("real.txt", tmp.path().join("link.txt")).unwrap();
        #[cfg(unix)]
        {
            let entries = walk_normalized(tmp.path()).unwrap();
            let link = entries.iter().find(|e| e.rel_path == "link.txt").unwrap();
            assert_eq!(link.kind, EntryKind::Symlink { target: "real.txt".to_string() });
        }
    }
}
