//! Git tag deletion for satsuki.
//!
//! Releases are tied to tags. When a release is removed (or recreated on a
//! new commit) the tag has to go too, both in the local clone and on the
//! remote. Both steps shell out to the system `git` binary.
//!
//! # Example
//!
//! ```no_run
//! use satsuki_git::{Git, TagDeleter};
//! use std::path::Path;
//!
//! let git = Git::new(Path::new("."), "origin");
//! if let Err(err) = git.delete_local_tag("v1.0.0") {
//!     eprintln!("local tag not deleted: {err:#}");
//! }
//! ```

use std::env;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use anyhow::{Context, Result, bail};

/// Environment variable overriding the git program.
pub const GIT_BIN_ENV: &str = "SATSUKI_GIT_BIN";

/// Remote used when none is configured.
pub const DEFAULT_REMOTE: &str = "origin";

/// Deletes a tag locally and on the remote.
pub trait TagDeleter {
    fn delete_local_tag(&self, tag: &str) -> Result<()>;
    fn delete_remote_tag(&self, tag: &str) -> Result<()>;
}

/// System git bound to a working directory and remote.
#[derive(Debug, Clone)]
pub struct Git {
    program: String,
    dir: PathBuf,
    remote: String,
}

impl Git {
    /// Git for `dir`, pushing deletions to `remote`. The program comes from
    /// `SATSUKI_GIT_BIN` when set.
    pub fn new(dir: &Path, remote: &str) -> Self {
        Self {
            program: git_program(),
            dir: dir.to_path_buf(),
            remote: remote.to_string(),
        }
    }

    fn run(&self, args: &[&str]) -> Result<Output> {
        let out = Command::new(&self.program)
            .args(args)
            .current_dir(&self.dir)
            .output()
            .with_context(|| format!("failed to execute git {}; is git installed?", args.join(" ")))?;

        if !out.status.success() {
            bail!(
                "git {} failed: {}",
                args.join(" "),
                String::from_utf8_lossy(&out.stderr).trim()
            );
        }
        Ok(out)
    }
}

impl TagDeleter for Git {
    fn delete_local_tag(&self, tag: &str) -> Result<()> {
        self.run(&["tag", "--delete", tag]).map(|_| ())
    }

    fn delete_remote_tag(&self, tag: &str) -> Result<()> {
        self.run(&["push", "--delete", &self.remote, tag]).map(|_| ())
    }
}

fn git_program() -> String {
    env::var(GIT_BIN_ENV).unwrap_or_else(|_| "git".to_string())
}
