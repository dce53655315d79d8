//! `botpack add` command

use anyhow::{bail, Result};

use botpack::core::dependency::{DependencySpec, DetailedDependencySpec};
use botpack::ops::add::{add_dependencies, parse_add_spec};
use botpack::util::shell::Status;

use crate::cli::AddArgs;
use crate::commands::support::{link_mode, open_workspace, source_cache, store};
use crate::App;

pub fn execute(args: AddArgs, app: &App) -> Result<()> {
    if args.specs.len() > 1 && (args.path.is_some() || args.git.is_some() || args.url.is_some()) {
        bail!("`--path`/`--git`/`--url` can only be combined with a single package spec");
    }

    let mut specs = Vec::new();
    for raw in &args.specs {
        let (name, version) = parse_add_spec(raw);

        let spec = if let Some(path) = &args.path {
            DependencySpec::Detailed(DetailedDependencySpec {
                path: Some(path.clone()),
                ..Default::default()
            })
        } else if let Some(git) = &args.git {
            DependencySpec::Detailed(DetailedDependencySpec {
                git: Some(git.clone()),
                branch: args.branch.clone(),
                tag: args.tag.clone(),
                rev: args.rev.clone(),
                ..Default::default()
            })
        } else if let Some(url) = &args.url {
            DependencySpec::Detailed(DetailedDependencySpec {
                url: Some(url.clone()),
                integrity: args.integrity.clone(),
                ..Default::default()
            })
        } else {
            DependencySpec::Simple(version.unwrap_or_else(|| "*".to_string()))
        };

        specs.push((name, spec));
    }

    let mut ws = open_workspace(app)?;
    ws.ensure_botpack_dir()?;

    let mut cache = source_cache(app);
    let store = store(app);
    let mode = link_mode(app, &ws);

    let names: Vec<String> = specs.iter().map(|(n, _)| n.clone()).collect();
    let result = add_dependencies(&mut ws, &mut cache, &store, mode, specs)?;

    for name in &names {
        app.shell.status(Status::Added, name);
    }
    app.shell.status(
        Status::Resolving,
        format!("{} package(s) in the graph", result.resolve.len()),
    );

    if ws.manifest().sync.on_add && !args.no_sync {
        crate::commands::sync::run_all_targets(app, &ws)?;
    }

    Ok(())
}
