//! `botpack prefetch` command

use anyhow::Result;

use botpack::ops::fetch::fetch_resolve;
use botpack::ops::resolve::resolve_workspace;
use botpack::util::shell::Status;

use crate::cli::PrefetchArgs;
use crate::commands::support::{link_mode, open_workspace, source_cache, store};
use crate::App;

/// Fetch every package the current resolution references into the store,
/// without touching any sync target.
pub fn execute(_args: PrefetchArgs, app: &App) -> Result<()> {
    let ws = open_workspace(app)?;
    ws.ensure_botpack_dir()?;

    let mut cache = source_cache(app);
    let store = store(app);
    let mode = link_mode(app, &ws);

    let mut resolve = resolve_workspace(&ws, &mut cache)?;
    let report = fetch_resolve(&ws, &mut cache, &mut resolve, &store, mode)?;

    let newly_fetched = report.fetched.iter().filter(|p| !p.already_in_store).count();
    app.shell.status(
        Status::Finished,
        format!(
            "prefetched {} package(s), {newly_fetched} new to the store",
            report.fetched.len()
        ),
    );

    Ok(())
}
