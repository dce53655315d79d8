//! `botpack init` command

use anyhow::{bail, Result};

use botpack::core::manifest::generate_default_manifest;
use botpack::core::workspace::MANIFEST_NAME;
use botpack::util::shell::Status;

use crate::cli::InitArgs;
use crate::App;

pub fn execute(args: InitArgs, app: &App) -> Result<()> {
    let dir = app.ctx.cwd();
    let manifest_path = dir.join(MANIFEST_NAME);

    if manifest_path.exists() {
        bail!("`{}` already exists in `{}`", MANIFEST_NAME, dir.display());
    }

    let mut content = generate_default_manifest();
    if let Some(name) = &args.name {
        content = content.replacen(
            "[workspace]\ndir = \".\"\n",
            &format!("[workspace]\ndir = \".\"\nname = \"{name}\"\n"),
            1,
        );
    }

    botpack::util::fs::write_string(&manifest_path, &content)?;

    let display_name = args.name.unwrap_or_else(|| {
        dir.file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("workspace")
            .to_string()
    });

    app.shell.status(Status::Created, format!("workspace `{display_name}`"));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_creates_manifest() {
        let tmp = TempDir::new().unwrap();
        let ctx = botpack::util::GlobalContext::with_cwd(tmp.path().to_path_buf()).unwrap();
        let shell = std::sync::Arc::new(botpack::util::shell::Shell::default());
        let app = App {
            ctx,
            shell,
            config: botpack::util::config::Config::default(),
        };

        execute(InitArgs { name: Some("myws".to_string()) }, &app).unwrap();

        let manifest = tmp.path().join(MANIFEST_NAME);
        assert!(manifest.is_file());
        let content = std::fs::read_to_string(manifest).unwrap();
        assert!(content.contains("name = \"myws\""));
    }

    #[test]
    fn test_init_fails_if_exists() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join(MANIFEST_NAME), "version = 1\n").unwrap();

        let ctx = botpack::util::GlobalContext::with_cwd(tmp.path().to_path_buf()).unwrap();
        let shell = std::sync::Arc::new(botpack::util::shell::Shell::default());
        let app = App {
            ctx,
            shell,
            config: botpack::util::config::Config::default(),
        };

        assert!(execute(InitArgs { name: None }, &app).is_err());
    }
}
