//! GitHub release gateway for satsuki.
//!
//! The core never talks HTTP directly. Everything it needs from the remote
//! side is expressed by the [`ReleaseGateway`] trait, and [`GitHubClient`]
//! implements it over the GitHub REST v3 API with a blocking `reqwest`
//! client.
//!
//! # Example
//!
//! ```no_run
//! use satsuki_github::{GitHubClient, ReleaseGateway};
//!
//! let client = GitHubClient::new("https://api.github.com", "ghp_token")?;
//! let repo = client.repository("YakDriver/satsuki")?;
//!
//! if let Some(release) = client.release_by_tag(&repo, "v1.0.0")? {
//!     for asset in client.list_assets(&repo, &release)? {
//!         println!("{} ({} bytes)", asset.name, asset.size);
//!     }
//! }
//! # Ok::<(), satsuki_github::GatewayError>(())
//! ```

mod client;
mod error;
mod types;

pub use client::{
    DEFAULT_API_URL, DEFAULT_MIME, DEFAULT_TIMEOUT, DEFAULT_UPLOAD_TIMEOUT, GitHubClient, PER_PAGE,
    USER_AGENT, upload_target,
};
pub use error::GatewayError;
pub use types::{Asset, AssetUpload, NewRelease, Release, ReleaseEdit, Repository, Tag, TagCommit};

/// Remote release-management capability used by the resolver and the
/// upload coordinator.
///
/// Lookups that can legitimately miss return `Ok(None)`; a missing
/// repository is an error because nothing else can proceed without it.
pub trait ReleaseGateway {
    /// Look up a repository by `owner/name`.
    fn repository(&self, slug: &str) -> Result<Repository, GatewayError>;

    /// Release attached to `tag`, if any.
    fn release_by_tag(&self, repo: &Repository, tag: &str)
    -> Result<Option<Release>, GatewayError>;

    /// Most recent published release, if any.
    fn latest_release(&self, repo: &Repository) -> Result<Option<Release>, GatewayError>;

    /// Re-read a release to pick up server-side changes.
    fn refresh_release(&self, repo: &Repository, release: &Release)
    -> Result<Release, GatewayError>;

    fn list_tags(&self, repo: &Repository) -> Result<Vec<Tag>, GatewayError>;

    fn list_assets(&self, repo: &Repository, release: &Release) -> Result<Vec<Asset>, GatewayError>;

    fn create_release(&self, repo: &Repository, release: &NewRelease)
    -> Result<Release, GatewayError>;

    fn update_release(
        &self,
        repo: &Repository,
        release: &Release,
        edit: &ReleaseEdit,
    ) -> Result<Release, GatewayError>;

    fn delete_release(&self, repo: &Repository, release: &Release) -> Result<(), GatewayError>;

    fn delete_asset(&self, repo: &Repository, asset: &Asset) -> Result<(), GatewayError>;

    /// Upload a local file as a release asset. The returned asset carries the
    /// size the server recorded.
    fn upload_asset(&self, release: &Release, upload: &AssetUpload<'_>)
    -> Result<Asset, GatewayError>;
}
