//! `botpack info` command

use anyhow::Result;

use botpack::ops::resolve::resolve_workspace;
use botpack::resolver::Resolve;
use botpack::PackageId;

use crate::cli::InfoArgs;
use crate::commands::support::{open_workspace, source_cache};
use crate::App;

pub fn execute(args: InfoArgs, app: &App) -> Result<()> {
    let ws = open_workspace(app)?;
    let mut cache = source_cache(app);

    let resolve = resolve_workspace(&ws, &mut cache)?;
    let pkg_id = find_package(&resolve, &args.package)?;
    let summary = resolve
        .summary(pkg_id)
        .ok_or_else(|| anyhow::anyhow!("no summary for `{}`", pkg_id.display_name()))?;

    println!("name: {}", pkg_id.name());
    println!("version: {}", pkg_id.version());
    println!("source: {}", pkg_id.source_id().to_url_string());
    if let Some(checksum) = resolve.checksum(pkg_id) {
        println!("checksum: {checksum}");
    }
    let deps = resolve.deps(pkg_id);
    if deps.is_empty() {
        println!("dependencies: none");
    } else {
        println!("dependencies:");
        for dep in deps {
            println!("  {} v{}", dep.name(), dep.version());
        }
    }
    let dependents = resolve.dependents(pkg_id);
    if !dependents.is_empty() {
        println!("required by:");
        for dep in dependents {
            println!("  {} v{}", dep.name(), dep.version());
        }
    }
    let _ = summary.capabilities();

    Ok(())
}

fn find_package(resolve: &Resolve, spec: &str) -> Result<PackageId> {
    let name = spec.split('@').next().unwrap_or(spec);
    resolve
        .get_package_by_name(name.into())
        .ok_or_else(|| anyhow::anyhow!("no package named `{name}` in the resolved graph"))
}
