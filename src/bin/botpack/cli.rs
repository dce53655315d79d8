//! CLI definitions using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

/// Message output format, selectable via the global `--json` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum MessageFormat {
    /// Human-readable output (default)
    #[default]
    Human,
    /// Machine-readable, newline-delimited JSON events
    Json,
}

/// Botpack - a package manager for agent skills, commands, agents, and MCP
/// servers.
#[derive(Parser)]
#[command(name = "botpack")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Run as if started in `<path>` instead of the current directory.
    #[arg(long, global = true, value_name = "path")]
    pub root: Option<std::path::PathBuf>,

    /// Use the global profile instead of a workspace-local one.
    #[arg(long, global = true)]
    pub global: bool,

    /// Name of the global profile to use (implies `--global`).
    #[arg(long, global = true, value_name = "name")]
    pub profile: Option<String>,

    /// Emit machine-readable JSON events instead of human-readable output.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-error output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Color output: auto, always, never.
    #[arg(long, global = true, default_value = "auto")]
    pub color: String,

    /// Run without network access; fail instead of fetching anything not
    /// already in the store.
    #[arg(long, global = true)]
    pub offline: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new `botpack.toml` in the current directory
    Init(InitArgs),

    /// Add one or more dependencies and re-lock
    Add(AddArgs),

    /// Remove one or more dependencies and re-lock
    Remove(RemoveArgs),

    /// Resolve, fetch, and populate the store from the lockfile (or manifest if absent)
    Install(InstallArgs),

    /// Re-resolve dependencies against their requirements and rewrite the lockfile
    Update(UpdateArgs),

    /// Materialize the resolved asset graph into one or more target directories
    Sync(SyncArgs),

    /// Fetch every locked package into the store without syncing
    Prefetch(PrefetchArgs),

    /// Re-verify every locked package's content against the store
    Verify(VerifyArgs),

    /// Remove unreferenced packages from the store
    Prune(PruneArgs),

    /// Grant or revoke exec/MCP trust for a package or a specific MCP server
    Trust(TrustArgs),

    /// List the packages in the current resolution
    List(ListArgs),

    /// Print the dependency graph as a tree
    Tree(TreeArgs),

    /// Show details about one package
    Info(InfoArgs),

    /// Show why a package is in the dependency graph
    Why(WhyArgs),

    /// Report trust-denied MCP servers and other capability gaps
    Audit(AuditArgs),

    /// Print or regenerate the asset catalog
    Catalog(CatalogArgs),

    /// Diagnose common workspace problems
    Doctor(DoctorArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args)]
pub struct InitArgs {
    /// Workspace display name (defaults to the directory name)
    #[arg(long)]
    pub name: Option<String>,
}

#[derive(Args)]
pub struct AddArgs {
    /// Package specs, e.g. `acme-quality-skills`, `acme-quality-skills@^2`, `@acme/skills@^2`
    #[arg(required = true)]
    pub specs: Vec<String>,

    /// Add from a local path instead of the registry
    #[arg(long, conflicts_with_all = ["git", "url"])]
    pub path: Option<std::path::PathBuf>,

    /// Add from a git repository
    #[arg(long, conflicts_with_all = ["path", "url"])]
    pub git: Option<String>,

    /// Git branch to track (with `--git`)
    #[arg(long, requires = "git")]
    pub branch: Option<String>,

    /// Git tag to pin (with `--git`)
    #[arg(long, requires = "git")]
    pub tag: Option<String>,

    /// Git revision to pin (with `--git`)
    #[arg(long, requires = "git")]
    pub rev: Option<String>,

    /// Add from a direct tarball URL
    #[arg(long, conflicts_with_all = ["path", "git"])]
    pub url: Option<String>,

    /// Expected integrity digest for a tarball dependency (`<algo>:<hex>`)
    #[arg(long, requires = "url")]
    pub integrity: Option<String>,

    /// Skip syncing after adding, even if `sync.onAdd` is set
    #[arg(long)]
    pub no_sync: bool,
}

#[derive(Args)]
pub struct RemoveArgs {
    /// Package names to remove
    #[arg(required = true)]
    pub names: Vec<String>,

    /// Skip syncing after removing, even if `sync.onAdd` is set
    #[arg(long)]
    pub no_sync: bool,
}

#[derive(Args)]
pub struct InstallArgs {
    /// Fail instead of re-resolving if the lockfile is missing or stale
    #[arg(long)]
    pub frozen_lockfile: bool,

    /// Skip syncing after installing, even if `sync.onInstall` is set
    #[arg(long)]
    pub no_sync: bool,
}

#[derive(Args)]
pub struct UpdateArgs {
    /// Only re-resolve these packages; updates every dependency if omitted
    pub packages: Vec<String>,
}

#[derive(Args)]
pub struct SyncArgs {
    /// Targets to sync; syncs every configured target if omitted
    pub targets: Vec<String>,

    /// Show what would change without writing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Remove files under the target root this sync doesn't manage
    #[arg(long)]
    pub clean: bool,

    /// Overwrite even if the target root has drifted since the last sync
    #[arg(long)]
    pub force: bool,

    /// Watch the workspace and virtual store, re-syncing on change
    #[arg(long)]
    pub watch: bool,
}

#[derive(Args)]
pub struct PrefetchArgs {}

#[derive(Args)]
pub struct VerifyArgs {}

#[derive(Args)]
pub struct PruneArgs {
    /// Report what would be removed without deleting anything
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args)]
pub struct TrustArgs {
    /// Package to grant or revoke trust for, as `name` or `name@version`
    pub package: String,

    /// Grant exec or MCP trust
    #[arg(long, value_enum, conflicts_with = "deny")]
    pub allow: Option<TrustKind>,

    /// Revoke exec or MCP trust
    #[arg(long, value_enum, conflicts_with = "allow")]
    pub deny: Option<TrustKind>,

    /// Apply the decision to one fully-qualified MCP server id instead of
    /// the whole package (only meaningful with `--allow mcp`/`--deny mcp`)
    #[arg(long, value_name = "fqid")]
    pub server: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TrustKind {
    Exec,
    Mcp,
}

#[derive(Args)]
pub struct ListArgs {}

#[derive(Args)]
pub struct TreeArgs {
    /// Show only the subtree rooted at this package
    pub package: Option<String>,
}

#[derive(Args)]
pub struct InfoArgs {
    /// Package name, or `name@version` to disambiguate
    pub package: String,
}

#[derive(Args)]
pub struct WhyArgs {
    /// Package name to explain
    pub package: String,
}

#[derive(Args)]
pub struct AuditArgs {}

#[derive(Args)]
pub struct CatalogArgs {
    /// Regenerate `.botpack/catalog.json` instead of printing the current one
    #[arg(long)]
    pub regenerate: bool,
}

#[derive(Args)]
pub struct DoctorArgs {}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}
