//! `botpack catalog` command

use anyhow::Result;

use botpack::catalog::{write_catalog, Catalog};
use botpack::scan::scan_all;
use botpack::util::shell::Status;
use botpack::util::time::now_rfc3339;

use crate::cli::CatalogArgs;
use crate::commands::support::open_workspace;
use crate::App;

pub fn execute(args: CatalogArgs, app: &App) -> Result<()> {
    let ws = open_workspace(app)?;

    let catalog = if args.regenerate {
        let assets = scan_all(&ws)?;
        let catalog = write_catalog(&ws, &assets, now_rfc3339())?;
        app.shell.status(Status::Finished, format!("catalog regenerated ({} entries)", catalog.entries.len()));
        catalog
    } else {
        let path = ws.catalog_path();
        if path.is_file() {
            Catalog::load(&path)?
        } else {
            let assets = scan_all(&ws)?;
            write_catalog(&ws, &assets, now_rfc3339())?
        }
    };

    println!("{}", catalog.to_canonical_json()?);
    Ok(())
}
