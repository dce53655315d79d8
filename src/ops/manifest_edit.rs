//! Format-preserving edits to `botpack.toml`'s `[dependencies]` table.
//!
//! `Manifest::save` round-trips the whole document through `serde`, which
//! is fine for `init` (nothing to preserve yet) but would clobber comments
//! and formatting on every `add`/`remove`. Those two commands instead parse
//! the file as a [`toml_edit::DocumentMut`], touch only the dependency
//! entries they're asked to change, and write the rest of the document back
//! untouched.

use std::path::Path;

use anyhow::{Context, Result};
use toml_edit::{DocumentMut, InlineTable, Item, Table, Value};

use crate::core::dependency::DependencySpec;
use crate::util::fs;

/// Insert or overwrite one dependency entry, creating `[dependencies]` if
/// the manifest doesn't have one yet.
pub fn insert_dependency(manifest_path: &Path, name: &str, spec: &DependencySpec) -> Result<()> {
    let content = fs::read_to_string(manifest_path)?;
    let mut doc: DocumentMut = content
        .parse()
        .with_context(|| format!("failed to parse {}", manifest_path.display()))?;

    if !doc.contains_key("dependencies") {
        doc["dependencies"] = Item::Table(Table::new());
    }

    doc["dependencies"][name] = dependency_to_item(spec);

    fs::write_string(manifest_path, &doc.to_string())
}

/// Remove one dependency entry by name. Returns `true` if it was present.
pub fn remove_dependency(manifest_path: &Path, name: &str) -> Result<bool> {
    let content = fs::read_to_string(manifest_path)?;
    let mut doc: DocumentMut = content
        .parse()
        .with_context(|| format!("failed to parse {}", manifest_path.display()))?;

    let Some(deps) = doc.get_mut("dependencies").and_then(|d| d.as_table_mut()) else {
        return Ok(false);
    };

    let removed = deps.remove(name).is_some();
    if removed {
        fs::write_string(manifest_path, &doc.to_string())?;
    }
    Ok(removed)
}

fn dependency_to_item(spec: &DependencySpec) -> Item {
    match spec {
        DependencySpec::Simple(req) => Item::Value(Value::from(req.clone())),
        DependencySpec::Detailed(detailed) => {
            let mut table = InlineTable::new();
            if let Some(path) = &detailed.path {
                table.insert("path", path.to_string_lossy().into_owned().into());
            }
            if let Some(git) = &detailed.git {
                table.insert("git", git.clone().into());
            }
            if let Some(branch) = &detailed.branch {
                table.insert("branch", branch.clone().into());
            }
            if let Some(tag) = &detailed.tag {
                table.insert("tag", tag.clone().into());
            }
            if let Some(rev) = &detailed.rev {
                table.insert("rev", rev.clone().into());
            }
            if let Some(url) = &detailed.url {
                table.insert("url", url.clone().into());
            }
            if let Some(version) = &detailed.version {
                table.insert("version", version.clone().into());
            }
            if let Some(integrity) = &detailed.integrity {
                table.insert("integrity", integrity.clone().into());
            }
            if let Some(registry) = &detailed.registry {
                table.insert("registry", registry.clone().into());
            }
            Item::Value(Value::InlineTable(table))
        }
    }
}
