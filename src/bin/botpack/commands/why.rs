//! `botpack why` command

use std::collections::{HashMap, VecDeque};

use anyhow::Result;

use botpack::ops::resolve::resolve_workspace;
use botpack::resolver::Resolve;
use botpack::PackageId;

use crate::cli::WhyArgs;
use crate::commands::support::{open_workspace, source_cache};
use crate::App;

/// Print the shortest dependency chain from the workspace root down to the
/// named package, explaining why it's in the resolved graph.
pub fn execute(args: WhyArgs, app: &App) -> Result<()> {
    let ws = open_workspace(app)?;
    let mut cache = source_cache(app);

    let resolve = resolve_workspace(&ws, &mut cache)?;
    let root_id = ws.root_summary()?.package_id();
    let target = find_package(&resolve, &args.package)?;

    if target == root_id {
        println!("{} is the workspace root", target.display_name());
        return Ok(());
    }

    match shortest_path_from_root(&resolve, root_id, target) {
        Some(path) => {
            for (depth, pkg_id) in path.iter().enumerate() {
                let indent = "  ".repeat(depth);
                if depth == 0 {
                    println!("{indent}{} (workspace root)", pkg_id.name());
                } else {
                    println!("{indent}└── {} v{}", pkg_id.name(), pkg_id.version());
                }
            }
            Ok(())
        }
        None => anyhow::bail!(
            "`{}` is not reachable from the workspace root",
            target.display_name()
        ),
    }
}

fn find_package(resolve: &Resolve, spec: &str) -> Result<PackageId> {
    let name = spec.split('@').next().unwrap_or(spec);
    resolve
        .get_package_by_name(name.into())
        .ok_or_else(|| anyhow::anyhow!("no package named `{name}` in the resolved graph"))
}

/// Breadth-first from `root` over `deps()` edges, returning the shortest
/// chain of package ids from root to `target` (inclusive), or `None` if
/// `target` isn't reachable.
fn shortest_path_from_root(resolve: &Resolve, root: PackageId, target: PackageId) -> Option<Vec<PackageId>> {
    let mut came_from: HashMap<PackageId, PackageId> = HashMap::new();
    let mut queue = VecDeque::new();
    queue.push_back(root);
    let mut seen = std::collections::HashSet::new();
    seen.insert(root);

    while let Some(current) = queue.pop_front() {
        if current == target {
            let mut path = vec![current];
            let mut cursor = current;
            while let Some(&parent) = came_from.get(&cursor) {
                path.push(parent);
                cursor = parent;
            }
            path.reverse();
            return Some(path);
        }

        for dep in resolve.deps(current) {
            if seen.insert(dep) {
                came_from.insert(dep, current);
                queue.push_back(dep);
            }
        }
    }

    None
}
