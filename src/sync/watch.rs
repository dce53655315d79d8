//! `--watch` support: debounced filesystem watching that re-triggers a
//! sync whenever the workspace's assets or virtual store change.

use std::path::PathBuf;
use std::sync::mpsc::channel;
use std::time::Duration;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};

use super::SyncError;

/// Watch `paths` and call `on_change` once per burst of filesystem
/// activity, coalescing events that arrive within `debounce` of each
/// other into a single call. Blocks forever; returns only if the
/// underlying watch channel is closed.
pub fn watch(
    paths: &[PathBuf],
    debounce: Duration,
    mut on_change: impl FnMut() -> Result<(), SyncError>,
) -> Result<(), SyncError> {
    let (tx, rx) = channel::<notify::Result<notify::Event>>();
    let mut watcher: RecommendedWatcher =
        notify::recommended_watcher(tx).map_err(|e| SyncError::Other(anyhow::anyhow!(e)))?;

    for path in paths {
        if !path.is_dir() {
            continue;
        }
        watcher
            .watch(path, RecursiveMode::Recursive)
            .map_err(|e| SyncError::Other(anyhow::anyhow!(e)))?;
    }

    loop {
        let Ok(first) = rx.recv() else {
            return Ok(());
        };
        if first.is_err() {
            continue;
        }
        while rx.recv_timeout(debounce).is_ok() {}
        on_change()?;
    }
}
