//! Bounded YAML frontmatter extraction.
//!
//! Reads only the `---\n...\n---` delimited header block at the head of a
//! file, never the body that follows it. A skill body can be arbitrarily
//! large; the scanner only ever needs its declared metadata.

use std::io::{BufRead, BufReader};
use std::path::Path;

use gray_matter::engine::YAML;
use gray_matter::Matter;

/// Cap on how far into a file we'll scan looking for a closing `---`
/// delimiter before giving up. Generous for any realistic frontmatter block.
const MAX_SCAN_BYTES: usize = 64 * 1024;

/// Parsed YAML frontmatter.
#[derive(Debug, Clone)]
pub struct Frontmatter(pub serde_yaml::Value);

impl Frontmatter {
    pub fn get(&self, key: &str) -> Option<&serde_yaml::Value> {
        self.0.get(key)
    }

    pub fn as_str_field(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(|v| v.as_str())
    }
}

/// Read and parse the bounded frontmatter block of `path`, if present.
/// Returns `Ok(None)` if the file doesn't open with a `---` delimiter (no
/// frontmatter declared).
pub fn read(path: &Path) -> Result<Option<Frontmatter>, String> {
    let block = match read_block(path).map_err(|e| e.to_string())? {
        Some(b) => b,
        None => return Ok(None),
    };

    let matter = Matter::<YAML>::new();
    let parsed = matter.parse(&block);

    let Some(pod) = parsed.data else {
        return Ok(None);
    };

    let value: serde_yaml::Value = pod
        .deserialize()
        .map_err(|e| format!("invalid YAML frontmatter: {e}"))?;

    Ok(Some(Frontmatter(value)))
}

/// Read the raw `---\n...\n---\n` block from the head of a file, without
/// reading anything past its closing delimiter.
fn read_block(path: &Path) -> std::io::Result<Option<String>> {
    let file = std::fs::File::open(path)?;
    let mut reader = BufReader::new(file);

    let mut first_line = String::new();
    if reader.read_line(&mut first_line)? == 0 {
        return Ok(None);
    }
    if first_line.trim_end_matches(['\n', '\r']) != "---" {
        return Ok(None);
    }

    let mut block = first_line;
    let mut scanned = block.len();

    loop {
        let mut line = String::new();
        let n = reader.read_line(&mut line)?;
        if n == 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "unterminated frontmatter block (no closing `---`)",
            ));
        }
        scanned += n;
        let is_closing = line.trim_end_matches(['\n', '\r']) == "---";
        block.push_str(&line);
        if is_closing {
            break;
        }
        if scanned > MAX_SCAN_BYTES {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("frontmatter block exceeds {MAX_SCAN_BYTES} byte scan limit"),
            ));
        }
    }

    Ok(Some(block))
}
