//! Core data structures for Botpack.
//!
//! This module contains the foundational types used throughout botpack:
//! - Interned identifiers (SourceId, PackageId)
//! - Manifests (project and package) and dependency specs
//! - Capabilities declared by packages
//! - Workspace management

pub mod capability;
pub mod dependency;
pub mod manifest;
pub mod package;
pub mod package_id;
pub mod registry;
pub mod source_id;
pub mod summary;
pub mod workspace;

pub use capability::Capabilities;
pub use dependency::Dependency;
pub use manifest::{Manifest, PackageManifest};
pub use package::Package;
pub use package_id::PackageId;
pub use source_id::SourceId;
pub use summary::Summary;
pub use workspace::{
    find_lockfile, find_manifest, ManifestError, Workspace, LOCKFILE_NAME, MANIFEST_NAME,
};
