//! Advisory file locking for the content store and workspace state.
//!
//! Used to serialize concurrent store population (two processes racing to
//! populate the same digest) and concurrent workspace mutation (two `botpack`
//! invocations against the same workspace). Locks are advisory: they only
//! coordinate cooperating `botpack` processes, not arbitrary filesystem
//! access.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fs4::fs_std::FileExt;

/// A held advisory lock on a file. Released on drop.
pub struct FileLock {
    file: File,
    path: PathBuf,
}

impl FileLock {
    /// Acquire an exclusive lock on `path`, creating the lock file if it
    /// doesn't exist. Blocks until the lock is available.
    pub fn acquire_exclusive(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            super::fs::ensure_dir(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)
            .with_context(|| format!("failed to open lock file: {}", path.display()))?;

        file.lock_exclusive()
            .with_context(|| format!("failed to acquire lock: {}", path.display()))?;

        Ok(FileLock {
            file,
            path: path.to_path_buf(),
        })
    }

    /// Try to acquire an exclusive lock without blocking. Returns `Ok(None)`
    /// if the lock is currently held by someone else.
    pub fn try_acquire_exclusive(path: &Path) -> Result<Option<Self>> {
        if let Some(parent) = path.parent() {
            super::fs::ensure_dir(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)
            .with_context(|| format!("failed to open lock file: {}", path.display()))?;

        match file.try_lock_exclusive() {
            Ok(true) => Ok(Some(FileLock {
                file,
                path: path.to_path_buf(),
            })),
            Ok(false) => Ok(None),
            Err(e) => Err(e).with_context(|| format!("failed to lock: {}", path.display())),
        }
    }

    /// Acquire a shared (read) lock on `path`. Blocks until available.
    pub fn acquire_shared(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            super::fs::ensure_dir(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .read(true)
            .open(path)
            .with_context(|| format!("failed to open lock file: {}", path.display()))?;

        file.lock_shared()
            .with_context(|| format!("failed to acquire shared lock: {}", path.display()))?;

        Ok(FileLock {
            file,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

/// The path to the per-digest store lock for a given store key
/// (`<algo>-<hex>`, see [`crate::util::hash::ContentDigest::store_key`]).
pub fn store_digest_lock_path(store_root: &Path, store_key: &str) -> PathBuf {
    store_root.join(".locks").join(format!("{store_key}.lock"))
}

/// The path to the whole-workspace lock (`.botpack/.lock`).
pub fn workspace_lock_path(workspace_botpack_dir: &Path) -> PathBuf {
    workspace_botpack_dir.join(".lock")
}
