//! Resolution error types and diagnostics.

use thiserror::Error;

use crate::util::diagnostic::Diagnostic;

/// Error during dependency resolution.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("no matching version for `{package}`")]
    NoMatchingVersion {
        package: String,
        requirement: String,
        available: Vec<String>,
    },

    #[error("package not found: `{package}`")]
    PackageNotFound {
        package: String,
        suggestions: Vec<String>,
    },

    #[error("source error for `{source_name}`: {message}")]
    SourceError { source_name: String, message: String },

    #[error("the lockfile at {path} needs to be updated but --frozen-lockfile was passed")]
    FrozenLockfileStale { path: String },

    #[error("no lockfile found at {path} but --frozen-lockfile was passed")]
    FrozenLockfileMissing { path: String },
}

impl ResolveError {
    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            ResolveError::NoMatchingVersion {
                package,
                requirement,
                available,
            } => {
                let mut diag = Diagnostic::error(format!(
                    "no version of `{}` matches requirement `{}`",
                    package, requirement
                ));

                if !available.is_empty() {
                    diag = diag.with_context(format!(
                        "available versions: {}",
                        available.join(", ")
                    ));
                }

                diag = diag.with_suggestion(format!(
                    "Update your version requirement for `{}` in botpack.toml",
                    package
                ));

                diag
            }

            ResolveError::PackageNotFound {
                package,
                suggestions,
            } => {
                let mut diag =
                    Diagnostic::error(format!("could not find package `{}`", package));

                if !suggestions.is_empty() {
                    diag = diag.with_context(format!(
                        "did you mean: {}?",
                        suggestions.join(", ")
                    ));
                }

                diag = diag
                    .with_suggestion("Check that the package name is spelled correctly".to_string())
                    .with_suggestion("Ensure the package source is accessible".to_string());

                diag
            }

            ResolveError::SourceError { source_name, message } => {
                Diagnostic::error(format!("error fetching from `{}`: {}", source_name, message))
                    .with_suggestion("Check your network connection".to_string())
                    .with_suggestion("Retry with --offline if the package is already in the store".to_string())
            }

            ResolveError::FrozenLockfileStale { path } => {
                Diagnostic::error(format!("lockfile at `{}` is out of date", path))
                    .with_suggestion("Run `botpack update` to refresh the lockfile, then retry".to_string())
            }

            ResolveError::FrozenLockfileMissing { path } => {
                Diagnostic::error(format!("no lockfile found at `{}`", path))
                    .with_suggestion("Run `botpack install` without --frozen-lockfile to generate one".to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_matching_version_diagnostic() {
        let err = ResolveError::NoMatchingVersion {
            package: "acme-quality-skills".to_string(),
            requirement: "^3.0".to_string(),
            available: vec!["2.1.0".to_string(), "2.2.0".to_string()],
        };

        let diag = err.to_diagnostic();
        let output = diag.format(false);

        assert!(output.contains("acme-quality-skills"));
        assert!(output.contains("^3.0"));
        assert!(output.contains("2.1.0"));
    }

    #[test]
    fn test_package_not_found_diagnostic() {
        let err = ResolveError::PackageNotFound {
            package: "acme-qualty-skills".to_string(),
            suggestions: vec!["acme-quality-skills".to_string()],
        };

        let diag = err.to_diagnostic();
        let output = diag.format(false);

        assert!(output.contains("acme-qualty-skills"));
        assert!(output.contains("acme-quality-skills"));
    }
}
