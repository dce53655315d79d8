//! Botpack CLI - a package manager for agent skills, commands, agents, and
//! MCP servers.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};

use botpack::util::config::load_config;
use botpack::util::shell::{ColorChoice, Shell};
use botpack::util::GlobalContext;

/// Bundles everything a command needs beyond its own parsed arguments:
/// where the workspace lives, how to talk to the user, and merged config.
pub struct App {
    pub ctx: GlobalContext,
    pub shell: Arc<Shell>,
    pub config: botpack::util::config::Config,
}

fn main() {
    let (shell, result) = run();
    if let Err(e) = result {
        let kind = error_kind_for(&e);
        match &shell {
            Some(shell) if shell.is_json() => {
                let event = serde_json::json!({
                    "ok": false,
                    "kind": kind.as_str(),
                    "reason": format!("{e:#}"),
                });
                shell.json_event(&event);
            }
            _ => eprintln!("error: {:#}", e),
        }
        std::process::exit(kind.exit_code());
    }
}

/// The error kinds from the external-interface contract, each tied to a
/// fixed exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ErrorKind {
    Parse,
    Resolution,
    Fetch,
    Sync,
    TrustBlocked,
    Generic,
}

impl ErrorKind {
    fn exit_code(self) -> i32 {
        match self {
            ErrorKind::Generic => 1,
            ErrorKind::Parse => 2,
            ErrorKind::Resolution => 3,
            ErrorKind::Fetch => 4,
            ErrorKind::Sync => 5,
            ErrorKind::TrustBlocked => 6,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Parse => "parse",
            ErrorKind::Resolution => "resolution",
            ErrorKind::Fetch => "fetch",
            ErrorKind::Sync => "sync",
            ErrorKind::TrustBlocked => "trust-blocked",
            ErrorKind::Generic => "generic",
        }
    }
}

/// Classify an error's kind by walking its whole `anyhow` cause chain, since
/// most commands wrap the originating typed error in additional context
/// before it reaches `main`. `store` errors are folded into `fetch` per the
/// exit-code contract (`§6`): both report failures in getting package
/// content usable.
fn error_kind_for(err: &anyhow::Error) -> ErrorKind {
    for cause in err.chain() {
        if cause.downcast_ref::<toml::de::Error>().is_some()
            || cause.downcast_ref::<serde_json::Error>().is_some()
        {
            return ErrorKind::Parse;
        }
        if cause.downcast_ref::<botpack::resolver::ResolveError>().is_some() {
            return ErrorKind::Resolution;
        }
        if cause.downcast_ref::<botpack::store::StoreError>().is_some() {
            return ErrorKind::Fetch;
        }
        if cause.downcast_ref::<botpack::sync::SyncError>().is_some() {
            return ErrorKind::Sync;
        }
        if let Some(trust_err) = cause.downcast_ref::<botpack::trust::TrustError>() {
            return if matches!(trust_err, botpack::trust::TrustError::Blocked { .. }) {
                ErrorKind::TrustBlocked
            } else {
                ErrorKind::Generic
            };
        }
    }
    ErrorKind::Generic
}

/// Parses arguments, wires up the shell and workspace context, and
/// dispatches to the chosen command. Returns the shell alongside the
/// result (when it got far enough to build one) so `main` can report
/// failures in whichever mode the user asked for.
fn run() -> (Option<Arc<Shell>>, Result<()>) {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("botpack=debug")
    } else {
        EnvFilter::new("botpack=info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();

    let color: ColorChoice = match cli.color.parse().map_err(|e: String| anyhow::anyhow!(e)) {
        Ok(c) => c,
        Err(e) => return (None, Err(e)),
    };
    let shell = Arc::new(Shell::from_flags(cli.quiet, cli.verbose, color, cli.json));

    let mut ctx = match GlobalContext::new() {
        Ok(ctx) => ctx,
        Err(e) => return (Some(shell), Err(e)),
    };
    ctx.set_explicit_root(cli.root.clone());
    if cli.global || cli.profile.is_some() {
        ctx.set_global_profile(Some(cli.profile.clone().unwrap_or_else(|| "default".to_string())));
    }
    ctx.set_verbose(cli.verbose);
    ctx.set_offline(cli.offline);
    ctx.set_color(shell.use_color());

    let config = load_config(&ctx.config_path(), &ctx.home().join("config.toml"));

    let app = App { ctx, shell: Arc::clone(&shell), config };

    let result = match cli.command {
        Commands::Init(args) => commands::init::execute(args, &app),
        Commands::Add(args) => commands::add::execute(args, &app),
        Commands::Remove(args) => commands::remove::execute(args, &app),
        Commands::Install(args) => commands::install::execute(args, &app),
        Commands::Update(args) => commands::update::execute(args, &app),
        Commands::Sync(args) => commands::sync::execute(args, &app),
        Commands::Prefetch(args) => commands::prefetch::execute(args, &app),
        Commands::Verify(args) => commands::verify::execute(args, &app),
        Commands::Prune(args) => commands::prune::execute(args, &app),
        Commands::Trust(args) => commands::trust::execute(args, &app),
        Commands::List(args) => commands::list::execute(args, &app),
        Commands::Tree(args) => commands::tree::execute(args, &app),
        Commands::Info(args) => commands::info::execute(args, &app),
        Commands::Why(args) => commands::why::execute(args, &app),
        Commands::Audit(args) => commands::audit::execute(args, &app),
        Commands::Catalog(args) => commands::catalog::execute(args, &app),
        Commands::Doctor(args) => commands::doctor::execute(args, &app),
        Commands::Completions(args) => commands::completions::execute(args),
    };

    (Some(shell), result)
}
