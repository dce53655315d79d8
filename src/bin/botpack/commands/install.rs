//! `botpack install` command

use anyhow::Result;

use botpack::ops::install::{install, InstallOptions};
use botpack::util::shell::Status;

use crate::cli::InstallArgs;
use crate::commands::support::{link_mode, open_workspace, source_cache, store};
use crate::App;

pub fn execute(args: InstallArgs, app: &App) -> Result<()> {
    let ws = open_workspace(app)?;
    ws.ensure_botpack_dir()?;

    let mut cache = source_cache(app);
    let store = store(app);
    let mode = link_mode(app, &ws);

    let options = InstallOptions {
        frozen_lockfile: args.frozen_lockfile,
    };

    let result = install(&ws, &mut cache, &store, mode, &options)?;

    app.shell.status(
        Status::Finished,
        format!(
            "installed {} package(s), fetched {}",
            result.resolve.len(),
            result.fetch.fetched.len()
        ),
    );

    if ws.manifest().sync.on_install && !args.no_sync {
        crate::commands::sync::run_all_targets(app, &ws)?;
    }

    Ok(())
}
