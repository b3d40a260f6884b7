//! Domain types shared by the resolver and the coordinator.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use satsuki_github::{Release, Repository};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Mode requested by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserCommand {
    /// Create the release if absent, else update it, then upload files.
    #[default]
    Upsert,
    /// Delete files, the release, or the tag, depending on what exists.
    Delete,
}

impl FromStr for UserCommand {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "upsert" => Ok(UserCommand::Upsert),
            "delete" => Ok(UserCommand::Delete),
            other => Err(Error::InvalidArgument(format!(
                "invalid command: {other} (expected upsert or delete)"
            ))),
        }
    }
}

impl fmt::Display for UserCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UserCommand::Upsert => "upsert",
            UserCommand::Delete => "delete",
        })
    }
}

/// What actually happens, derived from the user command and remote state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InternalCommand {
    Create,
    /// Delete the release and its tag, then create it again on a new commit.
    Recreate,
    Update,
    DeleteFile,
    DeleteRelease,
    DeleteTag,
}

impl InternalCommand {
    pub fn as_str(self) -> &'static str {
        match self {
            InternalCommand::Create => "create",
            InternalCommand::Recreate => "recreate",
            InternalCommand::Update => "update",
            InternalCommand::DeleteFile => "delete_file",
            InternalCommand::DeleteRelease => "delete_release",
            InternalCommand::DeleteTag => "delete_tag",
        }
    }

    /// Commands that end with uploading files.
    pub fn uploads(self) -> bool {
        matches!(
            self,
            InternalCommand::Create | InternalCommand::Recreate | InternalCommand::Update
        )
    }
}

impl fmt::Display for InternalCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How file hashes are published.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashMode {
    #[default]
    None,
    /// Write a `{file name: sha256}` JSON manifest and upload it with the files.
    File,
    /// Append the hash to each asset label.
    Label,
}

impl FromStr for HashMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(HashMode::None),
            "file" => Ok(HashMode::File),
            "label" => Ok(HashMode::Label),
            other => Err(Error::InvalidArgument(format!(
                "invalid file-sha mode: {other} (expected none, file or label)"
            ))),
        }
    }
}

/// Which release to work on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetRef {
    Tag(String),
    Latest,
}

impl TargetRef {
    pub fn tag(&self) -> Option<&str> {
        match self {
            TargetRef::Tag(tag) => Some(tag),
            TargetRef::Latest => None,
        }
    }

    pub fn is_latest(&self) -> bool {
        matches!(self, TargetRef::Latest)
    }
}

impl fmt::Display for TargetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetRef::Tag(tag) => f.write_str(tag),
            TargetRef::Latest => f.write_str("latest"),
        }
    }
}

/// Release fields sent on create or update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleaseDescriptor {
    pub tag: String,
    pub title: String,
    pub body: String,
    pub prerelease: bool,
    pub draft: bool,
    pub target_commitish: Option<String>,
}

/// One file to upload or delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetDescriptor {
    /// Remote asset name; identity of the asset on the release.
    pub file_name: String,
    pub local_path: PathBuf,
    pub label: String,
    pub mime_type: Option<String>,
    pub sha256: Option<String>,
}

/// Fully resolved work for one invocation.
///
/// Produced once by the resolver and consumed by
/// [`Executor::execute`](crate::engine::Executor::execute).
#[derive(Debug, Clone)]
pub struct Operation {
    pub user_command: UserCommand,
    pub command: InternalCommand,
    pub repository: Repository,
    pub target: TargetRef,
    /// Tag name: the literal tag, or the tag of the latest release.
    pub tag: Option<String>,
    /// Remote release found during resolution.
    pub release: Option<Release>,
    /// Present for create, recreate and update.
    pub descriptor: Option<ReleaseDescriptor>,
    pub assets: Vec<AssetDescriptor>,
    pub include_tag: bool,
    pub force: bool,
}
