//! `botpack prune` command

use std::collections::HashSet;

use anyhow::Result;

use botpack::ops::lockfile::load_lockfile;
use botpack::util::hash::ContentDigest;
use botpack::util::shell::Status;

use crate::cli::PruneArgs;
use crate::commands::support::{open_workspace, store};
use crate::App;

/// Remove every store entry not referenced by the workspace's lockfile.
/// Never invoked implicitly.
pub fn execute(args: PruneArgs, app: &App) -> Result<()> {
    let ws = open_workspace(app)?;
    let store = store(app);

    let resolve = load_lockfile(&ws.lockfile_path())?
        .ok_or_else(|| anyhow::anyhow!("no lockfile found; run `botpack install` first"))?;

    let mut referenced: HashSet<ContentDigest> = HashSet::new();
    for (pkg_id, _summary) in resolve.packages() {
        if let Some(checksum) = resolve.checksum(*pkg_id) {
            referenced.insert(checksum.parse()?);
        }
    }

    if args.dry_run {
        let total = referenced.len();
        app.shell.note(format!(
            "dry run: {total} package(s) referenced by the lockfile would be kept; nothing removed"
        ));
        return Ok(());
    }

    let report = store.prune(&referenced)?;

    if report.removed.is_empty() {
        app.shell.status(Status::Finished, "no unreferenced store entries");
    } else {
        app.shell.status(
            Status::Finished,
            format!(
                "removed {} unreferenced entr{}, reclaimed {} bytes",
                report.removed.len(),
                if report.removed.len() == 1 { "y" } else { "ies" },
                report.reclaimed_bytes
            ),
        );
    }

    Ok(())
}
