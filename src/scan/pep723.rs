//! PEP 723 inline script metadata extraction.
//!
//! Recognizes the `# /// script` ... `# ///` fenced comment block at the
//! head of a Python file and parses only the lines inside it, never the
//! script body.

use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

const MAX_SCAN_BYTES: usize = 64 * 1024;

static FENCE_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#\s*///\s*script\s*$").unwrap());
static FENCE_CLOSE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^#\s*///\s*$").unwrap());
static KEY_VALUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^#\s*([a-zA-Z0-9_-]+)\s*=\s*"(.*)"\s*$"#).unwrap());
static ARRAY_ITEM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#""([^"]*)""#).unwrap());

/// Parsed `requires-python` / `dependencies` fields from a PEP 723 header.
#[derive(Debug, Clone, Default)]
pub struct Pep723Metadata {
    pub requires_python: Option<String>,
    pub dependencies: Vec<String>,
}

/// Read and parse the PEP 723 header block of `path`, if present. Returns
/// `Ok(None)` if the file has no `# /// script` fence within the scan
/// bound.
pub fn read(path: &Path) -> Result<Option<Pep723Metadata>, String> {
    let lines = match read_fence_lines(path).map_err(|e| e.to_string())? {
        Some(lines) => lines,
        None => return Ok(None),
    };

    let mut meta = Pep723Metadata::default();
    let mut in_dependencies = false;

    for line in &lines {
        if let Some(caps) = KEY_VALUE.captures(line) {
            let key = &caps[1];
            let value = caps[2].to_string();
            if key == "requires-python" {
                meta.requires_python = Some(value);
            }
            in_dependencies = false;
            continue;
        }

        let trimmed = line.trim_start_matches('#').trim();
        if trimmed.starts_with("dependencies") && trimmed.contains('[') {
            in_dependencies = true;
            for cap in ARRAY_ITEM.captures_iter(trimmed) {
                meta.dependencies.push(cap[1].to_string());
            }
            if trimmed.contains(']') {
                in_dependencies = false;
            }
            continue;
        }

        if in_dependencies {
            for cap in ARRAY_ITEM.captures_iter(trimmed) {
                meta.dependencies.push(cap[1].to_string());
            }
            if trimmed.contains(']') {
                in_dependencies = false;
            }
        }
    }

    Ok(Some(meta))
}

/// Return the raw comment lines strictly between the opening and closing
/// fence, stopping the scan as soon as the closing fence is seen.
fn read_fence_lines(path: &Path) -> std::io::Result<Option<Vec<String>>> {
    let file = std::fs::File::open(path)?;
    let reader = BufReader::new(file);

    let mut in_block = false;
    let mut lines = Vec::new();
    let mut scanned = 0usize;

    for line in reader.lines() {
        let line = line?;
        scanned += line.len() + 1;

        if !in_block {
            if FENCE_OPEN.is_match(line.trim_end()) {
                in_block = true;
            }
            if scanned > MAX_SCAN_BYTES {
                return Ok(None);
            }
            continue;
        }

        if FENCE_CLOSE.is_match(line.trim_end()) {
            return Ok(Some(lines));
        }

        lines.push(line);

        if scanned > MAX_SCAN_BYTES {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("PEP 723 block exceeds {MAX_SCAN_BYTES} byte scan limit"),
            ));
        }
    }

    if in_block {
        return Err(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "unterminated PEP 723 script block (no closing `# ///`)",
        ));
    }

    Ok(None)
}
