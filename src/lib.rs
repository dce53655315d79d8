//! Botpack - a package manager for AI agent assets
//!
//! This crate provides the core library functionality for Botpack:
//! dependency resolution, fetching, the content-addressed store, asset
//! scanning, and sync materialization into runtime-specific layouts.

pub mod catalog;
pub mod core;
pub mod mcp;
pub mod ops;
pub mod resolver;
pub mod scan;
pub mod sources;
pub mod store;
pub mod sync;
pub mod trust;
pub mod util;

pub use core::{
    dependency::Dependency, manifest::Manifest, package::Package, package_id::PackageId,
    source_id::SourceId, workspace::Workspace,
};

pub use resolver::Resolve;
pub use util::context::GlobalContext;
