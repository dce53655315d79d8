//! `botpack tree` command

use std::collections::HashSet;

use anyhow::Result;

use botpack::ops::resolve::resolve_workspace;
use botpack::resolver::Resolve;
use botpack::PackageId;

use crate::cli::TreeArgs;
use crate::commands::support::{open_workspace, source_cache};
use crate::App;

pub fn execute(args: TreeArgs, app: &App) -> Result<()> {
    let ws = open_workspace(app)?;
    let mut cache = source_cache(app);

    let resolve = resolve_workspace(&ws, &mut cache)?;

    let root_id = match &args.package {
        Some(spec) => find_package(&resolve, spec)?,
        None => ws.root_summary()?.package_id(),
    };

    let mut seen = HashSet::new();
    print_tree(&resolve, root_id, 0, &mut seen);

    Ok(())
}

fn find_package(resolve: &Resolve, spec: &str) -> Result<PackageId> {
    let name = spec.split('@').next().unwrap_or(spec);
    resolve
        .get_package_by_name(name.into())
        .ok_or_else(|| anyhow::anyhow!("no package named `{name}` in the resolved graph"))
}

fn print_tree(resolve: &Resolve, pkg_id: PackageId, depth: usize, seen: &mut HashSet<PackageId>) {
    let is_duplicate = seen.contains(&pkg_id);
    seen.insert(pkg_id);

    let prefix = if depth == 0 {
        String::new()
    } else {
        format!("{}├── ", "│   ".repeat(depth - 1))
    };

    let dup_marker = if is_duplicate { " (*)" } else { "" };

    println!("{prefix}{} v{}{dup_marker}", pkg_id.name(), pkg_id.version());

    if is_duplicate {
        return;
    }

    for dep_id in resolve.deps(pkg_id) {
        print_tree(resolve, dep_id, depth + 1, seen);
    }
}
