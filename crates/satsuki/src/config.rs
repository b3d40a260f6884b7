//! Configuration file support (`.satsuki.toml`).
//!
//! The file is optional and lives in the working directory. It tunes the
//! upload retry loop, the names of the companion files satsuki looks for,
//! the GitHub client timeouts, and the git remote used for tag deletion.

use std::path::Path;
use std::time::Duration;

use satsuki_retry::RetryStrategyConfig;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const CONFIG_FILE_NAME: &str = ".satsuki.toml";

/// File names satsuki reads and writes next to the build output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilesConfig {
    /// Companion info file providing substitution variables.
    #[serde(default = "default_info_file")]
    pub info_file: String,

    /// Companion manifest merged in upsert mode.
    #[serde(default = "default_companion_manifest")]
    pub companion_manifest: String,

    /// Generic manifest tried when no files and no manifest path are given.
    #[serde(default = "default_manifest")]
    pub default_manifest: String,

    /// Name of the hash manifest written in `file` hash mode.
    #[serde(default = "default_sha_file_template")]
    pub sha_file_template: String,
}

fn default_info_file() -> String {
    "gravitybee-info.json".to_string()
}

fn default_companion_manifest() -> String {
    "gravitybee-files.json".to_string()
}

fn default_manifest() -> String {
    "satsuki-files.json".to_string()
}

fn default_sha_file_template() -> String {
    "${platform}-sha256.json".to_string()
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            info_file: default_info_file(),
            companion_manifest: default_companion_manifest(),
            default_manifest: default_manifest(),
            sha_file_template: default_sha_file_template(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitConfig {
    /// Remote that tag deletions are pushed to.
    #[serde(default = "default_remote")]
    pub remote: String,
}

fn default_remote() -> String {
    satsuki_git::DEFAULT_REMOTE.to_string()
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            remote: default_remote(),
        }
    }
}

/// Timeouts for the GitHub client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitHubConfig {
    /// Timeout for API calls.
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,

    /// Timeout for one asset upload. Large assets on slow runners need more.
    #[serde(default = "default_upload_timeout", with = "humantime_serde")]
    pub upload_timeout: Duration,
}

fn default_timeout() -> Duration {
    satsuki_github::DEFAULT_TIMEOUT
}

fn default_upload_timeout() -> Duration {
    satsuki_github::DEFAULT_UPLOAD_TIMEOUT
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            upload_timeout: default_upload_timeout(),
        }
    }
}

/// Configuration loaded from `.satsuki.toml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SatsukiConfig {
    #[serde(default)]
    pub retry: RetryStrategyConfig,

    #[serde(default)]
    pub files: FilesConfig,

    #[serde(default)]
    pub github: GitHubConfig,

    #[serde(default)]
    pub git: GitConfig,
}

impl SatsukiConfig {
    /// Load `.satsuki.toml` from `dir`.
    ///
    /// Returns `Ok(None)` if no config file exists.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let path = dir.join(CONFIG_FILE_NAME);
        if !path.exists() {
            return Ok(None);
        }
        Self::load_from_file(&path).map(Some)
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::read(path, e))?;

        let config: SatsukiConfig = toml::from_str(&content).map_err(|e| {
            Error::config(format!("failed to parse config file {}: {e}", path.display()))
        })?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.retry.max_attempts == 0 {
            return Err(Error::config("retry.max_attempts must be greater than 0"));
        }

        if self.retry.max_pause < self.retry.pause {
            return Err(Error::config("retry.max_pause cannot be shorter than retry.pause"));
        }

        if !(0.0..=1.0).contains(&self.retry.jitter) {
            return Err(Error::config("retry.jitter must be between 0.0 and 1.0"));
        }

        if self.github.timeout.is_zero() || self.github.upload_timeout.is_zero() {
            return Err(Error::config("github timeouts must be greater than 0"));
        }

        for (key, value) in [
            ("files.info_file", &self.files.info_file),
            ("files.companion_manifest", &self.files.companion_manifest),
            ("files.default_manifest", &self.files.default_manifest),
            ("files.sha_file_template", &self.files.sha_file_template),
            ("git.remote", &self.git.remote),
        ] {
            if value.trim().is_empty() {
                return Err(Error::config(format!("{key} cannot be empty")));
            }
        }

        Ok(())
    }
}
