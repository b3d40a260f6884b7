use std::path::Path;

use serde::{Deserialize, Serialize};

/// A GitHub repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub id: u64,
    /// `owner/name`
    pub full_name: String,
    #[serde(default)]
    pub html_url: String,
}

/// A release as returned by the releases API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub id: u64,
    pub tag_name: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub draft: bool,
    #[serde(default)]
    pub prerelease: bool,
    #[serde(default)]
    pub target_commitish: Option<String>,
    #[serde(default)]
    pub html_url: String,
    /// URI template, e.g. `https://uploads.github.com/.../assets{?name,label}`.
    #[serde(default)]
    pub upload_url: String,
}

/// A file attached to a release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub label: Option<String>,
    pub size: u64,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub browser_download_url: String,
}

/// A tag and the commit it points to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    pub commit: TagCommit,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagCommit {
    pub sha: String,
}

impl Tag {
    pub fn commit_sha(&self) -> &str {
        &self.commit.sha
    }
}

/// Body of a create-release request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewRelease {
    pub tag_name: String,
    pub target_commitish: String,
    pub name: String,
    pub body: String,
    pub draft: bool,
    pub prerelease: bool,
}

/// Body of an edit-release request. Every field is sent so the remote
/// state ends up exactly as resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleaseEdit {
    pub name: String,
    pub body: String,
    pub draft: bool,
    pub prerelease: bool,
}

/// One asset upload request.
#[derive(Debug, Clone, Copy)]
pub struct AssetUpload<'a> {
    pub path: &'a Path,
    pub name: &'a str,
    pub label: &'a str,
    pub mime: &'a str,
}
