//! `botpack remove` command

use anyhow::Result;

use botpack::ops::add::remove_dependencies;
use botpack::util::shell::Status;

use crate::cli::RemoveArgs;
use crate::commands::support::{link_mode, open_workspace, source_cache, store};
use crate::App;

pub fn execute(args: RemoveArgs, app: &App) -> Result<()> {
    let mut ws = open_workspace(app)?;
    ws.ensure_botpack_dir()?;

    let mut cache = source_cache(app);
    let store = store(app);
    let mode = link_mode(app, &ws);

    let (removed, result) = remove_dependencies(&mut ws, &mut cache, &store, mode, &args.names)?;

    for name in &removed {
        app.shell.status(Status::Removed, name);
    }
    for name in &args.names {
        if !removed.contains(name) {
            app.shell.warn(format!("`{name}` was not a dependency"));
        }
    }
    app.shell.status(
        Status::Resolving,
        format!("{} package(s) in the graph", result.resolve.len()),
    );

    if ws.manifest().sync.on_add {
        crate::commands::sync::run_all_targets(app, &ws)?;
    }

    Ok(())
}
