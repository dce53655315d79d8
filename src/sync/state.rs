//! Per-target sync state: `.botpack/state/sync-<target>.json`.
//!
//! Records what was written by the last successful `apply`, so the next
//! sync can detect drift (on-disk modification since the last write) and
//! `--clean` can remove paths the new plan no longer wants.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// One path this target's last sync wrote.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncStateEntry {
    /// Path relative to the target root (e.g. `skills/acme.fetch_web`).
    pub path: String,
    /// The asset this path was materialized from (its qualified name, or
    /// MCP fqid, or policy fragment id).
    pub asset_address: String,
    /// Content digest of what was written, used for drift detection.
    pub checksum: String,
}

/// Persisted sync state for one target.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncState {
    pub tool_version: String,
    /// Hash of the resolved target configuration (root + dir names + mode),
    /// so a manifest edit that changes where things go is detected even if
    /// no asset itself changed.
    pub target_config_hash: String,
    pub entries: Vec<SyncStateEntry>,
}

impl SyncState {
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.is_file() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read sync state: {}", path.display()))?;
        let state = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse sync state: {}", path.display()))?;
        Ok(Some(state))
    }

    /// Write atomically: serialize to a temp file beside `path`, then
    /// rename over it.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            crate::util::fs::ensure_dir(parent)?;
        }
        let mut json =
            serde_json::to_string_pretty(self).context("failed to serialize sync state")?;
        json.push('\n');

        let tmp_path = path.with_extension("json.tmp");
        std::fs::write(&tmp_path, json)
            .with_context(|| format!("failed to write {}", tmp_path.display()))?;
        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to move sync state into place at {}", path.display()))
    }

    pub fn entry(&self, path: &str) -> Option<&SyncStateEntry> {
        self.entries.iter().find(|e| e.path == path)
    }
}
