//! Content-addressed package store.
//!
//! Every fetched package tree is normalized, digested, and written once to
//! `<store_root>/v1/<store_key>/payload/`, with `meta.json` alongside the
//! `payload/` directory (not inside it, so the digest is computed only over
//! package contents). All workspaces on a machine share one store;
//! population is crash-safe and idempotent so concurrent `botpack`
//! invocations (or a process killed mid-populate) never leave a partially
//! written entry visible under its final name.

pub mod normalize;
pub mod virtual_store;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::util::fs::ensure_dir;
use crate::util::hash::ContentDigest;
use crate::util::lock::{store_digest_lock_path, FileLock};

pub use normalize::{digest_tree, walk_normalized, EntryKind, NormalizedEntry};

/// Store layout version. Bumped if the on-disk entry format ever changes in
/// a way that makes old entries unreadable.
const STORE_LAYOUT_VERSION: &str = "v1";

const META_FILE: &str = "meta.json";
const PAYLOAD_DIR: &str = "payload";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store entry for `{digest}` is corrupt: expected {expected}, found {actual}")]
    Corrupt {
        digest: String,
        expected: String,
        actual: String,
    },

    #[error("no store entry for `{digest}`")]
    NotFound { digest: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Metadata recorded alongside a store entry's payload, used to explain
/// provenance in `botpack why`/`botpack info` without re-reading the
/// manifest of every dependency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreMeta {
    pub source: String,
    pub package_name: String,
    pub package_version: String,
    pub files: usize,
}

/// Report produced by [`Store::prune`].
#[derive(Debug, Default)]
pub struct PruneReport {
    pub removed: Vec<ContentDigest>,
    pub reclaimed_bytes: u64,
}

/// The shared, machine-wide content store.
pub struct Store {
    root: PathBuf,
}

impl Store {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Store { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entries_dir(&self) -> PathBuf {
        self.root.join(STORE_LAYOUT_VERSION)
    }

    /// Final, published path for a digest's entry. Only valid to read from
    /// once `contains` returns true.
    pub fn path_for(&self, digest: &ContentDigest) -> PathBuf {
        self.entries_dir().join(digest.store_key())
    }

    /// Path to the payload subdirectory of a digest's entry — the actual
    /// package contents, as opposed to `meta.json` alongside it. This is
    /// what gets digested, verified, and linked into the virtual store.
    pub fn payload_path(&self, digest: &ContentDigest) -> PathBuf {
        self.path_for(digest).join(PAYLOAD_DIR)
    }

    fn meta_path(&self, digest: &ContentDigest) -> PathBuf {
        self.path_for(digest).join(META_FILE)
    }

    /// True iff a well-formed entry for `digest` is already published.
    pub fn contains(&self, digest: &ContentDigest) -> bool {
        self.meta_path(digest).is_file()
    }

    /// Populate the store from a tree already present on disk (typically a
    /// source's working checkout). Returns the digest the tree was stored
    /// under, recomputing it from the tree's own contents rather than
    /// trusting a caller-supplied value.
    ///
    /// Crash-safe population protocol:
    /// 1. Digest the tree (pure computation, no store state touched).
    /// 2. Acquire an exclusive lock keyed on the digest, so two processes
    ///    racing to populate the same content serialize instead of
    ///    clobbering each other.
    /// 3. If a well-formed entry already exists, return immediately
    ///    (idempotent; this is the common case for a shared dependency).
    /// 4. Otherwise copy the tree into a `<digest>.tmp-<pid>-<nanos>`
    ///    staging directory beside the final location, fsync every file
    ///    and the directory itself, write `meta.json` last, fsync again,
    ///    then atomically rename the staging directory into place.
    /// 5. Release the lock (on drop).
    ///
    /// A process killed between steps 4 and the final rename leaves an
    /// orphaned `*.tmp-*` directory that [`Store::cleanup_stale_tmp`] will
    /// remove later; the final name never exists half-written.
    pub fn put(
        &self,
        src_tree: &Path,
        package_name: &str,
        package_version: &str,
        source: &str,
    ) -> Result<ContentDigest, StoreError> {
        let (digest, entries) = digest_tree(src_tree).map_err(StoreError::Other)?;

        ensure_dir(&self.entries_dir())?;
        let lock_path = store_digest_lock_path(&self.root, &digest.store_key());
        let _lock = FileLock::acquire_exclusive(&lock_path).map_err(StoreError::Other)?;

        if self.contains(&digest) {
            return Ok(digest);
        }

        let final_path = self.path_for(&digest);
        let staging = self
            .entries_dir()
            .join(format!(
                "{}.tmp-{}-{}",
                digest.store_key(),
                std::process::id(),
                nanos_suffix(),
            ));
        crate::util::fs::remove_dir_all_if_exists(&staging)?;
        let staged_payload = staging.join(PAYLOAD_DIR);
        copy_tree_with_fsync(src_tree, &staged_payload, &entries)?;

        let meta = StoreMeta {
            source: source.to_string(),
            package_name: package_name.to_string(),
            package_version: package_version.to_string(),
            files: entries.len(),
        };
        let meta_json = serde_json::to_string_pretty(&meta).map_err(anyhow::Error::from)?;
        let meta_path = staging.join(META_FILE);
        std::fs::write(&meta_path, meta_json)?;
        fsync_path(&meta_path)?;
        fsync_path(&staging)?;

        if final_path.exists() {
            // Another process won the race between our `contains` check and
            // now; our freshly staged copy is redundant.
            crate::util::fs::remove_dir_all_if_exists(&staging)?;
            return Ok(digest);
        }

        std::fs::rename(&staging, &final_path).map_err(|e| {
            StoreError::Other(anyhow::anyhow!(
                "failed to move staged store entry into place at {}: {}",
                final_path.display(),
                e
            ))
        })?;
        fsync_path(&self.entries_dir())?;

        Ok(digest)
    }

    /// Re-hash a published entry and compare it against the digest it's
    /// published under. Used by `botpack verify` to detect on-disk
    /// corruption or tampering.
    pub fn verify(&self, digest: &ContentDigest) -> Result<(), StoreError> {
        let path = self.payload_path(digest);
        if !path.is_dir() {
            return Err(StoreError::NotFound {
                digest: digest.to_string(),
            });
        }

        let (actual, _) = digest_tree(&path).map_err(StoreError::Other)?;
        if &actual != digest {
            return Err(StoreError::Corrupt {
                digest: digest.to_string(),
                expected: digest.to_string(),
                actual: actual.to_string(),
            });
        }
        Ok(())
    }

    /// Remove every published entry not present in `referenced`. Never
    /// invoked implicitly; only `botpack prune` calls this.
    pub fn prune(&self, referenced: &HashSet<ContentDigest>) -> Result<PruneReport, StoreError> {
        let mut report = PruneReport::default();
        let dir = self.entries_dir();
        if !dir.is_dir() {
            return Ok(report);
        }

        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            let name = entry.file_name();
            let name = name.to_string_lossy();

            if name.contains(".tmp-") {
                continue;
            }
            if !path.is_dir() {
                continue;
            }

            let digest: ContentDigest = match name.split_once('-') {
                Some((algo, hex)) => match format!("{algo}:{hex}").parse() {
                    Ok(d) => d,
                    Err(_) => continue,
                },
                None => continue,
            };

            if referenced.contains(&digest) {
                continue;
            }

            let size = dir_size(&path).unwrap_or(0);
            std::fs::remove_dir_all(&path)?;
            report.reclaimed_bytes += size;
            report.removed.push(digest);
        }

        Ok(report)
    }

    /// Remove orphaned `*.tmp-*` staging directories left behind by a
    /// process that died mid-populate. Safe to call at any time; a live
    /// staging directory is always held under its own digest lock, so this
    /// only ever removes entries nobody holds a lock on.
    pub fn cleanup_stale_tmp(&self) -> Result<(), StoreError> {
        let dir = self.entries_dir();
        if !dir.is_dir() {
            return Ok(());
        }

        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if !name.contains(".tmp-") {
                continue;
            }

            let store_key = name.split(".tmp-").next().unwrap_or_default().to_string();
            let lock_path = store_digest_lock_path(&self.root, &store_key);
            if let Some(_lock) = FileLock::try_acquire_exclusive(&lock_path).map_err(StoreError::Other)? {
                crate::util::fs::remove_dir_all_if_exists(&entry.path())?;
            }
        }

        Ok(())
    }
}

fn nanos_suffix() -> u128 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0)
}

fn copy_tree_with_fsync(
    src_root: &Path,
    dst_root: &Path,
    entries: &[NormalizedEntry],
) -> Result<(), StoreError> {
    ensure_dir(dst_root)?;

    for entry in entries {
        let rel: PathBuf = entry.rel_path.split('/').collect();
        let src = src_root.join(&rel);
        let dst = dst_root.join(&rel);
        if let Some(parent) = dst.parent() {
            ensure_dir(parent)?;
        }

        match &entry.kind {
            EntryKind::File { executable } => {
                std::fs::copy(&src, &dst)?;
                fsync_path(&dst)?;
                #[cfg(unix)]
                if *executable {
                    use std::os::unix::fs::PermissionsExt;
                    std::fs::set_permissions(&dst, std::fs::Permissions::from_mode(0o755))?;
                }
            }
            EntryKind::Symlink { target } => {
                crate::util::fs::symlink(Path::new(target), &dst)?;
            }
        }
    }

    fsync_path(dst_root)?;
    Ok(())
}

#[cfg(unix)]
fn fsync_path(path: &Path) -> std::io::Result<()> {
    std::fs::File::open(path)?.sync_all()
}

#[cfg(not(unix))]
fn fsync_path(path: &Path) -> std::io::Result<()> {
    if path.is_dir() {
        return Ok(());
    }
    std::fs::File::open(path)?.sync_all()
}

fn dir_size(path: &Path) -> std::io::Result<u64> {
    let mut total = 0;
    for entry in walkdir::WalkDir::new(path) {
        let entry = entry.map_err(std::io::Error::other)?;
        if entry.file_type().is_file() {
            total += entry.metadata().map_err(std::io::Error::other)?.len();
        }
    }
    Ok(total)
}
