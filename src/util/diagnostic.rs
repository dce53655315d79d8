//! User-friendly diagnostic messages.
//!
//! Implements the "Actionable Error Messages" design principle:
//! Every error must include root cause, conflicting constraints, and suggested fixes.

use std::fmt;
use std::path::PathBuf;

use miette::{Diagnostic as MietteDiagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Common suggestion messages for consistent error handling.
pub mod suggestions {
    /// Suggestion when no manifest file is found.
    pub const NO_MANIFEST: &str = "help: Run `botpack init` to create a new workspace";

    /// Suggestion when the lockfile is stale or missing.
    pub const STALE_LOCK: &str = "help: Run `botpack update` to refresh dependencies";

    /// Suggestion when a sync target is not found.
    pub const TARGET_NOT_FOUND: &str =
        "help: Run `botpack sync` with no argument to see configured targets";

    /// Suggestion when a package is not found.
    pub const PACKAGE_NOT_FOUND: &str = "help: Run `botpack tree` to see all dependencies";

    /// Suggestion when a dependency is missing.
    pub const MISSING_DEPENDENCY: &str =
        "help: Run `botpack add <package>` to add it as a dependency";

    /// Suggestion when fetching into the store fails.
    pub const FETCH_FAILED: &str = "help: Check your network connection and try `botpack install`";

    /// Suggestion when store verification finds a corrupted payload.
    pub const STORE_CORRUPT: &str =
        "help: Run `botpack prefetch --force` to re-download and repopulate the store";

    /// Suggestion when a capability-bearing asset has no trust decision.
    pub const TRUST_REQUIRED: &str =
        "help: Run `botpack trust <package> --allow exec` (or `--allow mcp`) to grant it";
}

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Note,
    Help,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Note => write!(f, "note"),
            Severity::Help => write!(f, "help"),
        }
    }
}

/// A diagnostic message with optional suggestions.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Primary message
    pub message: String,
    /// Severity level
    pub severity: Severity,
    /// Additional context lines
    pub context: Vec<String>,
    /// Suggested fixes
    pub suggestions: Vec<String>,
    /// Related location (file path)
    pub location: Option<PathBuf>,
}

impl Diagnostic {
    /// Create a new error diagnostic.
    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic {
            message: message.into(),
            severity: Severity::Error,
            context: Vec::new(),
            suggestions: Vec::new(),
            location: None,
        }
    }

    /// Create a new warning diagnostic.
    pub fn warning(message: impl Into<String>) -> Self {
        Diagnostic {
            message: message.into(),
            severity: Severity::Warning,
            context: Vec::new(),
            suggestions: Vec::new(),
            location: None,
        }
    }

    /// Add context to the diagnostic.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    /// Add a suggestion for fixing the issue.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    /// Add a file location.
    pub fn with_location(mut self, path: impl Into<PathBuf>) -> Self {
        self.location = Some(path.into());
        self
    }

    /// Format the diagnostic for terminal output.
    pub fn format(&self, color: bool) -> String {
        let mut output = String::new();

        // Severity prefix with optional color
        let severity_str = if color {
            match self.severity {
                Severity::Error => "\x1b[1;31merror\x1b[0m",
                Severity::Warning => "\x1b[1;33mwarning\x1b[0m",
                Severity::Note => "\x1b[1;36mnote\x1b[0m",
                Severity::Help => "\x1b[1;32mhelp\x1b[0m",
            }
        } else {
            match self.severity {
                Severity::Error => "error",
                Severity::Warning => "warning",
                Severity::Note => "note",
                Severity::Help => "help",
            }
        };

        // Main message
        output.push_str(&format!("{}: {}\n", severity_str, self.message));

        // Location if present
        if let Some(ref path) = self.location {
            output.push_str(&format!("  --> {}\n", path.display()));
        }

        // Context lines
        for ctx in &self.context {
            output.push_str(&format!("  â†’ {}\n", ctx));
        }

        // Suggestions
        if !self.suggestions.is_empty() {
            output.push('\n');
            let help_prefix = if color {
                "\x1b[1;32mhelp\x1b[0m"
            } else {
                "help"
            };
            output.push_str(&format!("{}: consider:\n", help_prefix));
            for (i, suggestion) in self.suggestions.iter().enumerate() {
                output.push_str(&format!("  {}. {}\n", i + 1, suggestion));
            }
        }

        output
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format(false))
    }
}

/// Version conflict error with detailed diagnostics. Botpack's resolver lets
/// multiple versions of a package coexist, so this only fires when a single
/// pinned source (a `path` or `integrity`-locked tarball dependency) is
/// required at two incompatible versions at once.
#[derive(Debug, Error, MietteDiagnostic)]
#[error("version conflict for `{package}`")]
#[diagnostic(
    code(botpack::resolve::version_conflict),
    help("Requirers of a pinned source must agree on one version; split the pinned dependency out under a distinct name if they can't")
)]
pub struct VersionConflictError {
    pub package: String,
    #[source_code]
    pub src: Option<NamedSource<String>>,
    #[label("required here")]
    pub span: Option<SourceSpan>,
    pub requirements: Vec<String>,
}

/// Compatibility conflict: two required `[compat].requires` entries for the
/// same target runtime that no installed version of the package can satisfy
/// simultaneously.
#[derive(Debug, Error, MietteDiagnostic)]
#[error("conflicting compat requirements for `{package}`")]
#[diagnostic(
    code(botpack::resolve::compat_conflict),
    help("Pin `{package}` to a version whose `[compat]` section satisfies every requirer, or drop support for one target")
)]
pub struct CompatConflictError {
    pub package: String,
    pub conflicts: Vec<(String, String)>, // (target, required range)
}

/// Missing dependency error.
#[derive(Debug, Error, MietteDiagnostic)]
#[error("could not find `{package}` in any source")]
#[diagnostic(code(botpack::resolve::not_found))]
pub struct PackageNotFoundError {
    pub package: String,
    #[help]
    pub suggestions: Option<String>,
}

/// Print a diagnostic to stderr.
pub fn emit(diagnostic: &Diagnostic, color: bool) {
    eprint!("{}", diagnostic.format(color));
}

/// Print an error message with context and suggestions.
pub fn emit_error(message: &str, context: &[&str], suggestions: &[&str], color: bool) {
    let mut diag = Diagnostic::error(message);
    for ctx in context {
        diag = diag.with_context(*ctx);
    }
    for sug in suggestions {
        diag = diag.with_suggestion(*sug);
    }
    emit(&diag, color);
}
