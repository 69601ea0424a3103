//! Reading the `key value` rc-file format.
//!
//! One option per line, the key separated from the value by whitespace.
//! Blank lines and `#` comments are skipped. An `includeConfigFile <path>`
//! line splices another file in at that point; `~` expands against the
//! home directory and relative paths resolve against the including file.
//! Include cycles are broken by skipping files already being read.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use super::{canonical_name, Layer, LayerSource};
use crate::error::Result;
use crate::home::HomeDir;

/// Directive that pulls another file into the current one.
pub const INCLUDE_DIRECTIVE: &str = "includeConfigFile";

/// One `key value` pair read from an rc file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RcEntry {
    pub key: String,
    pub value: String,
    pub line: usize,
}

/// Split rc text into entries, leaving directives in place.
pub fn parse_entries(content: &str) -> Vec<RcEntry> {
    content
        .lines()
        .enumerate()
        .filter_map(|(index, line)| {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                return None;
            }
            let (key, value) = super::split_first_word(line);
            Some(RcEntry {
                key: key.to_string(),
                value: value.unwrap_or("").to_string(),
                line: index + 1,
            })
        })
        .collect()
}

/// Reads rc files, following includes.
pub struct RcReader<'a> {
    home: Option<&'a HomeDir>,
    active: HashSet<PathBuf>,
}

impl<'a> RcReader<'a> {
    pub fn new(home: Option<&'a HomeDir>) -> Self {
        Self {
            home,
            active: HashSet::new(),
        }
    }

    /// All entries of `path` with includes expanded. A missing file reads
    /// as empty.
    pub fn read_entries(&mut self, path: &Path) -> Result<Vec<RcEntry>> {
        if !path.is_file() {
            debug!("rc file {} not present", path.display());
            return Ok(Vec::new());
        }
        let key = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        if !self.active.insert(key.clone()) {
            warn!("Skipping recursive include of {}", path.display());
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(path)?;
        let base = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let entries = self.expand(parse_entries(&content), &base);
        self.active.remove(&key);
        entries
    }

    fn expand(&mut self, entries: Vec<RcEntry>, base: &Path) -> Result<Vec<RcEntry>> {
        let mut out = Vec::with_capacity(entries.len());
        for entry in entries {
            if entry.key.eq_ignore_ascii_case(INCLUDE_DIRECTIVE) {
                let target = self.resolve(&entry.value, base);
                out.extend(self.read_entries(&target)?);
            } else {
                out.push(entry);
            }
        }
        Ok(out)
    }

    fn resolve(&self, raw: &str, base: &Path) -> PathBuf {
        let expanded = match self.home {
            Some(home) => home.expand(raw),
            None => PathBuf::from(raw),
        };
        if expanded.is_absolute() {
            expanded
        } else {
            base.join(expanded)
        }
    }
}

/// Build a typed layer from rc entries.
///
/// Unknown keys and malformed values are logged and skipped so that one bad
/// line does not make the whole file unusable.
pub fn layer_from_entries(entries: &[RcEntry], source: LayerSource, origin: &str) -> Layer {
    let mut layer = Layer::new(source);
    for entry in entries {
        if canonical_name(&entry.key).is_none() {
            debug!("{}:{}: ignoring unknown option {}", origin, entry.line, entry.key);
            continue;
        }
        if let Err(err) = layer.set_line(&entry.key, &entry.value) {
            warn!("{}:{}: {}", origin, entry.line, err);
        }
    }
    layer
}

/// Read `path` (and its includes) into a layer. Missing files give an
/// empty layer.
pub fn read_layer(path: &Path, source: LayerSource, home: Option<&HomeDir>) -> Result<Layer> {
    let entries = RcReader::new(home).read_entries(path)?;
    Ok(layer_from_entries(
        &entries,
        source,
        &path.display().to_string(),
    ))
}
