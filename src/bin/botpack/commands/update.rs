//! `botpack update` command

use anyhow::Result;

use botpack::ops::fetch::fetch_resolve;
use botpack::ops::lockfile::save_lockfile;
use botpack::ops::resolve::update_resolve;
use botpack::util::shell::Status;

use crate::cli::UpdateArgs;
use crate::commands::support::{link_mode, open_workspace, source_cache, store};
use crate::App;

pub fn execute(args: UpdateArgs, app: &App) -> Result<()> {
    let ws = open_workspace(app)?;
    ws.ensure_botpack_dir()?;

    if !args.packages.is_empty() {
        app.shell.warn(
            "botpack always re-resolves every dependency; `update <packages>` is accepted for \
             compatibility but updates the whole graph",
        );
    }

    let mut cache = source_cache(app);
    let store = store(app);
    let mode = link_mode(app, &ws);

    let mut resolve = update_resolve(&ws, &mut cache)?;
    let fetch = fetch_resolve(&ws, &mut cache, &mut resolve, &store, mode)?;
    save_lockfile(&ws.lockfile_path(), &resolve, &ws)?;

    app.shell.status(
        Status::Updated,
        format!("{} package(s), fetched {}", resolve.len(), fetch.fetched.len()),
    );

    Ok(())
}
