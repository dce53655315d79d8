//! `botpack verify` command

use anyhow::{Context, Result};

use botpack::ops::lockfile::load_lockfile;
use botpack::store::StoreError;
use botpack::util::hash::ContentDigest;
use botpack::util::shell::Status;

use crate::cli::VerifyArgs;
use crate::commands::support::{open_workspace, store};
use crate::App;

pub fn execute(_args: VerifyArgs, app: &App) -> Result<()> {
    let ws = open_workspace(app)?;
    let store = store(app);

    let resolve = load_lockfile(&ws.lockfile_path())?
        .ok_or_else(|| anyhow::anyhow!("no lockfile found; run `botpack install` first"))?;

    let mut ok = 0;
    let mut missing = Vec::new();
    let mut corrupt = Vec::new();
    let mut first_error: Option<StoreError> = None;

    for (pkg_id, _summary) in resolve.packages() {
        let Some(checksum) = resolve.checksum(*pkg_id) else {
            continue;
        };
        let digest: ContentDigest = checksum.parse()?;

        if !store.contains(&digest) {
            missing.push(pkg_id.display_name());
            first_error.get_or_insert(StoreError::NotFound { digest: digest.to_string() });
            continue;
        }

        match store.verify(&digest) {
            Ok(()) => ok += 1,
            Err(e) => {
                corrupt.push(format!("{}: {e}", pkg_id.display_name()));
                first_error.get_or_insert(e);
            }
        }
    }

    for name in &missing {
        app.shell.warn(format!("`{name}` is not in the store; run `botpack install`"));
    }
    for line in &corrupt {
        app.shell.error(format!("content mismatch for {line}"));
    }

    if missing.is_empty() && corrupt.is_empty() {
        app.shell.status(Status::Finished, format!("{ok} package(s) verified"));
        Ok(())
    } else {
        let err = first_error.expect("missing or corrupt implies at least one store error");
        Err(err).with_context(|| {
            format!(
                "{} package(s) missing, {} corrupt",
                missing.len(),
                corrupt.len()
            )
        })
    }
}
