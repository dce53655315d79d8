//! `botpack list` command

use anyhow::Result;

use botpack::ops::resolve::resolve_workspace;

use crate::cli::ListArgs;
use crate::commands::support::{open_workspace, source_cache};
use crate::App;

pub fn execute(_args: ListArgs, app: &App) -> Result<()> {
    let ws = open_workspace(app)?;
    let mut cache = source_cache(app);

    let resolve = resolve_workspace(&ws, &mut cache)?;
    let root_id = ws.root_summary()?.package_id();

    let mut names: Vec<String> = resolve
        .packages()
        .filter(|(id, _)| **id != root_id)
        .map(|(id, _)| format!("{} v{}", id.name(), id.version()))
        .collect();
    names.sort();

    if names.is_empty() {
        app.shell.note("no dependencies");
    } else {
        for name in names {
            println!("{name}");
        }
    }

    Ok(())
}
