//! Placeholder substitution for user-supplied strings.
//!
//! Supports `$name` and `${name}`; `$$` produces a literal dollar. Unknown
//! or malformed placeholders are left exactly as written.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Named values available to placeholders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Variables {
    values: BTreeMap<String, String>,
}

/// Fields read from the companion info file.
#[derive(Debug, Default, Deserialize)]
struct InfoFile {
    app_name: Option<String>,
    app_version: Option<String>,
    gen_file: Option<String>,
}

impl Variables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        self.values.insert(name.to_string(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// `platform` plus whatever the companion info file at `path` provides
    /// (`pkg_name`, `version`, `gen_file`). A missing file is not an error.
    pub fn load(info_file: &Path, platform: &str) -> Result<Self> {
        let mut vars = Variables::new().with("platform", platform);
        if !info_file.is_file() {
            return Ok(vars);
        }

        let content = std::fs::read_to_string(info_file).map_err(|e| Error::read(info_file, e))?;
        let info: InfoFile = serde_json::from_str(&content).map_err(|e| {
            Error::config(format!("invalid info file {}: {e}", info_file.display()))
        })?;

        for (name, value) in [
            ("pkg_name", info.app_name),
            ("version", info.app_version),
            ("gen_file", info.gen_file),
        ] {
            if let Some(value) = value {
                vars.insert(name, value);
            }
        }
        Ok(vars)
    }

    /// Expand placeholders in `text`.
    pub fn substitute(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;

        while let Some(pos) = rest.find('$') {
            out.push_str(&rest[..pos]);
            let after = &rest[pos + 1..];

            if let Some(tail) = after.strip_prefix('$') {
                out.push('$');
                rest = tail;
                continue;
            }

            if let Some(inner) = after.strip_prefix('{')
                && let Some(end) = inner.find('}')
                && is_identifier(&inner[..end])
            {
                let name = &inner[..end];
                match self.get(name) {
                    Some(value) => out.push_str(value),
                    None => out.push_str(&rest[pos..pos + 3 + end]),
                }
                rest = &inner[end + 1..];
                continue;
            }

            let len = identifier_len(after);
            if len > 0 {
                let name = &after[..len];
                match self.get(name) {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push('$');
                        out.push_str(name);
                    }
                }
                rest = &after[len..];
            } else {
                out.push('$');
                rest = after;
            }
        }

        out.push_str(rest);
        out
    }
}

/// Length of the identifier at the start of `text`.
fn identifier_len(text: &str) -> usize {
    let mut chars = text.char_indices();
    match chars.next() {
        Some((_, c)) if c == '_' || c.is_ascii_alphabetic() => {}
        _ => return 0,
    }
    chars
        .find(|(_, c)| !(*c == '_' || c.is_ascii_alphanumeric()))
        .map_or(text.len(), |(idx, _)| idx)
}

fn is_identifier(text: &str) -> bool {
    !text.is_empty() && identifier_len(text) == text.len()
}
