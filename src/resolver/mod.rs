//! Dependency resolution.
//!
//! Resolution is plain breadth-first graph construction, not a SAT solver:
//! for each dependency, the highest available version satisfying the semver
//! requirement is selected, with ties broken by lexicographically smaller
//! source URL. Two requirers that need incompatible ranges of the same
//! package simply both get satisfied — the graph can hold multiple versions
//! of a package side by side. All I/O (registry/git/path queries) happens
//! through the `Registry` trait passed in; the traversal itself is pure.

pub mod encode;
pub mod errors;
pub mod resolve;

pub use errors::ResolveError;
pub use resolve::Resolve;

use std::collections::{HashMap, HashSet, VecDeque};

use crate::core::registry::Registry;
use crate::core::{Dependency, PackageId, Summary};
use crate::util::InternedString;

/// Breadth-first resolve the dependency graph rooted at `root`, querying
/// candidate versions through `registry`.
pub fn resolve(root: &Summary, registry: &mut dyn Registry) -> Result<Resolve, ResolveError> {
    let mut graph = Resolve::new();
    graph.add_package(root.package_id(), root.clone());

    let mut processed: HashSet<PackageId> = HashSet::new();
    processed.insert(root.package_id());

    let mut selected: HashMap<(InternedString, String), PackageId> = HashMap::new();

    let mut queue: VecDeque<(PackageId, Dependency)> = VecDeque::new();
    for dep in root.dependencies() {
        queue.push_back((root.package_id(), dep.clone()));
    }

    while let Some((parent_id, dep)) = queue.pop_front() {
        let cache_key = (dep.name(), dep.version_req().to_string());

        let chosen_id = if let Some(&id) = selected.get(&cache_key) {
            id
        } else {
            let candidates = registry.query(&dep).map_err(|e| ResolveError::SourceError {
                source_name: dep.source_id().to_string(),
                message: e.to_string(),
            })?;

            let best = select_best(&candidates, &dep).ok_or_else(|| ResolveError::NoMatchingVersion {
                package: dep.name().to_string(),
                requirement: dep.version_req().to_string(),
                available: candidates.iter().map(|s| s.version().to_string()).collect(),
            })?;

            graph.add_package(best.package_id(), best.clone());
            selected.insert(cache_key, best.package_id());

            if processed.insert(best.package_id()) {
                for child in best.dependencies() {
                    queue.push_back((best.package_id(), child.clone()));
                }
            }

            best.package_id()
        };

        graph.add_edge(parent_id, chosen_id);
    }

    Ok(graph)
}

/// Select the candidate summary that satisfies `dep`'s version requirement,
/// preferring the highest version, then the lexicographically smaller
/// source URL on ties.
fn select_best<'a>(candidates: &'a [Summary], dep: &Dependency) -> Option<&'a Summary> {
    candidates
        .iter()
        .filter(|s| dep.matches_version(s.version()))
        .max_by(|a, b| {
            a.version()
                .cmp(b.version())
                .then_with(|| b.source_id().url().as_str().cmp(a.source_id().url().as_str()))
        })
}
