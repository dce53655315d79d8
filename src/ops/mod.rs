//! High-level operations shared by the CLI commands.
//!
//! Each module here is a workspace-level verb (resolve, lock, fetch into the
//! store, populate the virtual store, scan assets, sync to a target, gate
//! trust) that the `commands` layer wires up to `clap` subcommands.

pub mod add;
pub mod fetch;
pub mod install;
pub mod lockfile;
pub mod manifest_edit;
pub mod resolve;

pub use add::{add_dependencies, parse_add_spec, remove_dependencies, AddResult};
pub use fetch::{effective_link_mode, fetch_resolve, FetchReport, FetchedPackage};
pub use install::{install, InstallOptions, InstallResult};
pub use lockfile::{load_lockfile, save_lockfile};
pub use resolve::{resolve_workspace, resolve_workspace_with_opts, ResolveOptions};
