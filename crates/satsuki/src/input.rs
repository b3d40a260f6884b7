//! Typed invocation inputs and their normalisation.
//!
//! CI systems pass values through environment variables and YAML, which
//! often leaves stray whitespace or a layer of quotes around them. Every
//! string is cleaned the same way before resolution so that an empty value
//! behaves exactly like a missing one.

use std::path::PathBuf;

/// Raw inputs for one invocation. `None`, `false` and empty lists mean
/// "not given".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inputs {
    pub token: Option<String>,
    pub slug: Option<String>,
    pub owner: Option<String>,
    pub repo: Option<String>,
    pub tag: Option<String>,
    pub latest: bool,
    pub command: Option<String>,
    pub rel_name: Option<String>,
    pub body: Option<String>,
    pub prerelease: Option<bool>,
    pub draft: Option<bool>,
    pub commitish: Option<String>,
    pub recreate_ok: bool,
    pub force: bool,
    pub include_tag: bool,
    pub files: Vec<String>,
    pub labels: Vec<String>,
    pub mimes: Vec<String>,
    pub files_file: Option<String>,
    pub file_sha: Option<String>,
    pub working_dir: Option<PathBuf>,
}

impl Inputs {
    /// Clean every field.
    pub fn normalized(self) -> Self {
        Self {
            token: clean_opt(self.token),
            slug: clean_opt(self.slug),
            owner: clean_opt(self.owner),
            repo: clean_opt(self.repo),
            tag: clean_opt(self.tag),
            latest: self.latest,
            command: clean_opt(self.command),
            rel_name: clean_opt(self.rel_name),
            body: clean_opt(self.body),
            prerelease: self.prerelease.filter(|v| *v),
            draft: self.draft.filter(|v| *v),
            commitish: clean_opt(self.commitish),
            recreate_ok: self.recreate_ok,
            force: self.force,
            include_tag: self.include_tag,
            files: clean_list(self.files),
            labels: clean_list(self.labels),
            mimes: clean_list(self.mimes),
            files_file: clean_opt(self.files_file),
            file_sha: clean_opt(self.file_sha),
            working_dir: self.working_dir.filter(|p| !p.as_os_str().is_empty()),
        }
    }
}

/// Trim, drop one layer of matching quotes, and treat empty as absent.
pub fn clean(value: &str) -> Option<String> {
    let trimmed = value.trim();
    let unquoted = strip_quotes(trimmed).trim();
    if unquoted.is_empty() {
        None
    } else {
        Some(unquoted.to_string())
    }
}

fn strip_quotes(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

fn clean_opt(value: Option<String>) -> Option<String> {
    value.as_deref().and_then(clean)
}

fn clean_list(values: Vec<String>) -> Vec<String> {
    values.iter().filter_map(|v| clean(v)).collect()
}
