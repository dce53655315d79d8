//! Capabilities a package's assets may require at sync/materialization time.
//!
//! A package declares these in its `[capabilities]` manifest table; the sync
//! engine's trust gate consults them before materializing MCP server entries
//! or otherwise capability-bearing assets (see `crate::sync::trust`).

use serde::{Deserialize, Serialize};

/// Capabilities requested by a package, as declared in its manifest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Capabilities {
    /// Requires executing local commands (MCP servers with a local `command`).
    #[serde(default)]
    pub exec: bool,

    /// Requires outbound network access.
    #[serde(default)]
    pub network: bool,

    /// Declares one or more MCP server entries.
    #[serde(default)]
    pub mcp: bool,
}

impl Capabilities {
    /// True if the package requires any gated capability at all.
    pub fn any(&self) -> bool {
        self.exec || self.network || self.mcp
    }
}
