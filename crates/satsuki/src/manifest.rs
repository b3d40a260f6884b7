//! File manifest builder.
//!
//! Files come from three places, merged in this order:
//! 1. a generic JSON manifest (`--files-file`, or the configured default)
//! 2. the CI companion manifest (upsert only)
//! 3. command-line glob patterns with their labels and MIME types
//!
//! For uploads, missing files are dropped and hashes are attached according
//! to the [`HashMode`]. For deletes, nothing local needs to exist.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::FilesConfig;
use crate::engine::Reporter;
use crate::error::{Error, Result};
use crate::hash::{HashManifest, sha256_file, write_hash_manifest};
use crate::substitute::Variables;
use crate::types::{AssetDescriptor, HashMode, UserCommand};

/// MIME type of the hash manifest.
pub const HASH_MANIFEST_MIME: &str = "application/json";

/// One entry of a JSON files manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub filename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, rename = "mime-type", skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestMode {
    Upload,
    Delete,
}

impl From<UserCommand> for ManifestMode {
    fn from(command: UserCommand) -> Self {
        match command {
            UserCommand::Upsert => ManifestMode::Upload,
            UserCommand::Delete => ManifestMode::Delete,
        }
    }
}

/// Everything the builder needs; borrowed from the resolver.
#[derive(Debug, Clone, Copy)]
pub struct ManifestRequest<'a> {
    pub mode: ManifestMode,
    pub patterns: &'a [String],
    pub labels: &'a [String],
    pub mimes: &'a [String],
    pub manifest_path: Option<&'a str>,
    pub hash_mode: HashMode,
    pub working_dir: &'a Path,
    pub files: &'a FilesConfig,
    pub variables: &'a Variables,
    pub platform: &'a str,
}

/// Read a JSON files manifest.
pub fn read_manifest(path: &Path) -> Result<Vec<ManifestEntry>> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::read(path, e))?;
    serde_json::from_str(&content)
        .map_err(|e| Error::config(format!("invalid files manifest {}: {e}", path.display())))
}

/// Value for pattern `idx` under the 0 / 1 / N rule.
fn pick(values: &[String], idx: usize) -> Option<&str> {
    match values.len() {
        0 => None,
        1 => Some(values[0].as_str()),
        _ => values.get(idx).map(String::as_str),
    }
}

fn check_counts(what: &str, values: &[String], patterns: usize) -> Result<()> {
    let n = values.len();
    if n > 1 && n != patterns {
        return Err(Error::config(format!(
            "invalid number of {what}: got {n} for {patterns} file pattern(s); give 0, 1 or one per pattern"
        )));
    }
    Ok(())
}

/// Build the ordered list of asset descriptors.
pub fn build_manifest(
    req: &ManifestRequest<'_>,
    reporter: &mut dyn Reporter,
) -> Result<Vec<AssetDescriptor>> {
    let patterns = req.patterns;
    if !patterns.is_empty() {
        check_counts("labels", req.labels, patterns.len())?;
        check_counts("MIME types", req.mimes, patterns.len())?;
    }

    let mut found: Vec<AssetDescriptor> = Vec::new();

    if let Some(path) = generic_manifest_path(req) {
        reporter.info(&format!("reading files manifest {}", path.display()));
        for entry in read_manifest(&path)? {
            found.push(from_entry(req, entry));
        }
    }

    if req.mode == ManifestMode::Upload {
        let companion = req.working_dir.join(&req.files.companion_manifest);
        if companion.is_file() {
            reporter.info(&format!("reading companion manifest {}", companion.display()));
            for entry in read_manifest(&companion)? {
                found.push(from_entry(req, entry));
            }
        }
    }

    for (idx, pattern) in patterns.iter().enumerate() {
        let pattern = req.variables.substitute(pattern);
        for path in expand_pattern(&pattern, req.working_dir, req.mode)? {
            let Some(file_name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
                reporter.warn(&format!("skipping {}: no file name", path.display()));
                continue;
            };
            let label = pick(req.labels, idx)
                .map(|l| req.variables.substitute(l))
                .unwrap_or_else(|| file_name.clone());
            found.push(AssetDescriptor {
                file_name,
                local_path: path,
                label,
                mime_type: pick(req.mimes, idx).map(str::to_string),
                sha256: None,
            });
        }
    }

    if req.mode == ManifestMode::Upload {
        found.retain(|asset| {
            let exists = asset.local_path.is_file();
            if !exists {
                reporter.warn(&format!(
                    "skipping {}: {} does not exist",
                    asset.file_name,
                    asset.local_path.display()
                ));
            }
            exists
        });
    }

    if !patterns.is_empty() && found.is_empty() {
        return Err(Error::config(format!(
            "no files matched: {}",
            patterns.join(", ")
        )));
    }

    if req.mode == ManifestMode::Upload {
        attach_hashes(req, &mut found, reporter)?;
    }

    Ok(found)
}

fn generic_manifest_path(req: &ManifestRequest<'_>) -> Option<PathBuf> {
    match req.manifest_path {
        Some(path) => Some(req.working_dir.join(req.variables.substitute(path))),
        None if req.patterns.is_empty() => {
            let default = req.working_dir.join(&req.files.default_manifest);
            default.is_file().then_some(default)
        }
        None => None,
    }
}

fn from_entry(req: &ManifestRequest<'_>, entry: ManifestEntry) -> AssetDescriptor {
    let path = entry
        .path
        .as_deref()
        .map(|p| req.variables.substitute(p))
        .unwrap_or_else(|| entry.filename.clone());
    let label = entry
        .label
        .as_deref()
        .map(|l| req.variables.substitute(l))
        .filter(|l| !l.trim().is_empty())
        .unwrap_or_else(|| entry.filename.clone());

    AssetDescriptor {
        local_path: req.working_dir.join(path),
        label,
        mime_type: entry.mime_type,
        sha256: None,
        file_name: entry.filename,
    }
}

/// Glob `pattern` relative to `working_dir`. In delete mode a pattern that
/// matches nothing is kept as-is since the file may only exist remotely.
///
/// Only `pattern` is a glob; metacharacters in the directory are literal.
fn expand_pattern(pattern: &str, working_dir: &Path, mode: ManifestMode) -> Result<Vec<PathBuf>> {
    let full = working_dir.join(pattern);
    let escaped_dir = glob::Pattern::escape(&working_dir.to_string_lossy());
    let full_str = Path::new(&escaped_dir).join(pattern).to_string_lossy().into_owned();

    let matches: Vec<PathBuf> = match glob::glob(&full_str) {
        Ok(paths) => paths
            .filter_map(|entry| entry.ok())
            .filter(|p| mode == ManifestMode::Delete || p.is_file())
            .collect(),
        Err(err) if mode == ManifestMode::Upload => {
            return Err(Error::config(format!("invalid file pattern {pattern}: {err}")));
        }
        Err(_) => Vec::new(),
    };

    if matches.is_empty() && mode == ManifestMode::Delete {
        return Ok(vec![full]);
    }
    Ok(matches)
}

fn attach_hashes(
    req: &ManifestRequest<'_>,
    assets: &mut Vec<AssetDescriptor>,
    reporter: &mut dyn Reporter,
) -> Result<()> {
    if req.hash_mode == HashMode::None || assets.is_empty() {
        return Ok(());
    }

    let hash_file_name = req.variables.substitute(&req.files.sha_file_template);
    if req.hash_mode == HashMode::File {
        assets.retain(|asset| asset.file_name != hash_file_name);
    }

    let mut hashes = HashManifest::new();
    for asset in assets.iter_mut() {
        let Some(hex) = sha256_file(&asset.local_path) else {
            reporter.warn(&format!("could not hash {}", asset.local_path.display()));
            continue;
        };
        reporter.info(&format!("{}: sha256 {hex}", asset.file_name));

        match req.hash_mode {
            HashMode::Label => asset.label = format!("{}   (SHA256: {hex})", asset.label),
            HashMode::File => {
                hashes.insert(asset.file_name.clone(), hex.clone());
            }
            HashMode::None => {}
        }
        asset.sha256 = Some(hex);
    }

    if req.hash_mode == HashMode::File && !hashes.is_empty() {
        let path = req.working_dir.join(&hash_file_name);
        write_hash_manifest(&path, &hashes)?;
        reporter.info(&format!("wrote hash manifest {}", path.display()));

        let hash_asset = AssetDescriptor {
            label: hash_file_name.clone(),
            file_name: hash_file_name,
            local_path: path,
            mime_type: Some(HASH_MANIFEST_MIME.to_string()),
            sha256: None,
        };
        // Windows builds publish the hash manifest first.
        if req.platform == "windows" {
            assets.insert(0, hash_asset);
        } else {
            assets.push(hash_asset);
        }
    }

    Ok(())
}
