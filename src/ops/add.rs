//! `add`/`remove`: mutate the manifest's dependency table, then resolve,
//! fetch, and lock so the workspace is immediately in a consistent state.

use anyhow::Result;

use crate::core::dependency::DependencySpec;
use crate::core::manifest::LinkMode;
use crate::core::Workspace;
use crate::ops::fetch::{fetch_resolve, FetchReport};
use crate::ops::lockfile::save_lockfile;
use crate::ops::manifest_edit;
use crate::resolver::{self, Resolve};
use crate::sources::SourceCache;
use crate::store::Store;

/// Result of adding one or more dependencies.
pub struct AddResult {
    pub resolve: Resolve,
    pub fetch: FetchReport,
}

/// Insert or overwrite entries in the manifest's `[dependencies]` table,
/// save it, then resolve the whole workspace from scratch, fetch every
/// resolved package into the store, and rewrite the lockfile with the
/// resulting checksums.
///
/// Each name in `specs` that already exists is overwritten (re-adding a
/// dependency with a different spec is how a requirement is changed).
pub fn add_dependencies(
    ws: &mut Workspace,
    source_cache: &mut SourceCache,
    store: &Store,
    link_mode: LinkMode,
    specs: Vec<(String, DependencySpec)>,
) -> Result<AddResult> {
    let manifest_path = ws.manifest_path();
    for (name, spec) in specs {
        manifest_edit::insert_dependency(&manifest_path, &name, &spec)?;
        ws.manifest_mut().dependencies.insert(name, spec);
    }

    let root_summary = ws.root_summary()?;
    let mut resolve = resolver::resolve(&root_summary, source_cache)?;
    let fetch = fetch_resolve(ws, source_cache, &mut resolve, store, link_mode)?;
    save_lockfile(&ws.lockfile_path(), &resolve, ws)?;

    Ok(AddResult { resolve, fetch })
}

/// Remove entries from the manifest's `[dependencies]` table by name, save
/// it, then re-resolve and re-lock. Names not present in the manifest are
/// silently ignored by the caller's responsibility to report them.
pub fn remove_dependencies(
    ws: &mut Workspace,
    source_cache: &mut SourceCache,
    store: &Store,
    link_mode: LinkMode,
    names: &[String],
) -> Result<(Vec<String>, AddResult)> {
    let manifest_path = ws.manifest_path();
    let mut removed = Vec::new();
    for name in names {
        if manifest_edit::remove_dependency(&manifest_path, name)? {
            ws.manifest_mut().dependencies.remove(name);
            removed.push(name.clone());
        }
    }

    let root_summary = ws.root_summary()?;
    let mut resolve = resolver::resolve(&root_summary, source_cache)?;
    let fetch = fetch_resolve(ws, source_cache, &mut resolve, store, link_mode)?;
    save_lockfile(&ws.lockfile_path(), &resolve, ws)?;

    Ok((removed, AddResult { resolve, fetch }))
}

/// Parse a CLI `add` argument of the form `name`, `name@<version-req>`, or
/// `@scope/name@<version-req>` into a (name, version requirement) pair. A
/// leading `@scope/` is treated as part of the name, not a version
/// separator, so `@acme/quality-skills@^2` splits after `quality-skills`.
pub fn parse_add_spec(spec: &str) -> (String, Option<String>) {
    if let Some(rest) = spec.strip_prefix('@') {
        match rest.find('@') {
            Some(idx) => (format!("@{}", &rest[..idx]), Some(rest[idx + 1..].to_string())),
            None => (spec.to_string(), None),
        }
    } else {
        match spec.find('@') {
            Some(idx) => (spec[..idx].to_string(), Some(spec[idx + 1..].to_string())),
            None => (spec.to_string(), None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_add_spec_bare_name() {
        assert_eq!(parse_add_spec("acme-quality-skills"), ("acme-quality-skills".to_string(), None));
    }

    #[test]
    fn test_parse_add_spec_with_version() {
        assert_eq!(
            parse_add_spec("acme-quality-skills@^2"),
            ("acme-quality-skills".to_string(), Some("^2".to_string()))
        );
    }

    #[test]
    fn test_parse_add_spec_scoped_with_version() {
        assert_eq!(
            parse_add_spec("@acme/quality-skills@^2"),
            ("@acme/quality-skills".to_string(), Some("^2".to_string()))
        );
    }

    #[test]
    fn test_parse_add_spec_scoped_bare() {
        assert_eq!(
            parse_add_spec("@acme/quality-skills"),
            ("@acme/quality-skills".to_string(), None)
        );
    }
}
