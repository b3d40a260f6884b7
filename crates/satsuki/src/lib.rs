//! # Satsuki
//!
//! Manage GitHub releases and their assets from CI.
//!
//! One invocation upserts a release for a tag and uploads files to it, or
//! deletes files, the release, or the tag. The user only says *upsert* or
//! *delete*; what actually happens is derived from the remote state.
//!
//! ## Pipeline
//!
//! 1. [`resolver::prepare`] validates the local inputs: token, repository,
//!    command, target tag, placeholders and the file manifest.
//! 2. [`resolver::resolve`] looks up the repository and release through a
//!    [`ReleaseGateway`](satsuki_github::ReleaseGateway) and derives one of
//!    six [`InternalCommand`](types::InternalCommand)s.
//! 3. [`engine::Executor::execute`] carries the resulting
//!    [`Operation`](types::Operation) out, retrying uploads and reconciling
//!    ambiguous failures against the asset list.
//!
//! ## Example
//!
//! ```no_run
//! use satsuki::config::SatsukiConfig;
//! use satsuki::engine::{Executor, Reporter};
//! use satsuki::environment::{CiEnvironment, platform};
//! use satsuki::input::Inputs;
//! use satsuki::resolver::{ResolveContext, prepare, resolve};
//! use satsuki_git::Git;
//! use satsuki_github::{DEFAULT_API_URL, GitHubClient};
//! use satsuki_retry::ThreadSleeper;
//!
//! struct Quiet;
//! impl Reporter for Quiet {
//!     fn info(&mut self, _: &str) {}
//!     fn warn(&mut self, msg: &str) { eprintln!("{msg}") }
//!     fn error(&mut self, msg: &str) { eprintln!("{msg}") }
//! }
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SatsukiConfig::default();
//! let env = CiEnvironment::from_process();
//! let ctx = ResolveContext { env: &env, files: &config.files, platform: platform() };
//! let inputs = Inputs {
//!     token: std::env::var("SATS_TOKEN").ok(),
//!     slug: Some("octo/app".into()),
//!     tag: Some("v1.0.0".into()),
//!     files: vec!["dist/*.zip".into()],
//!     ..Inputs::default()
//! };
//!
//! let mut reporter = Quiet;
//! let request = prepare(inputs, &ctx, &mut reporter)?;
//! let client = GitHubClient::new(DEFAULT_API_URL, &request.token)?;
//! let op = resolve(request, &client, &mut reporter)?;
//!
//! let git = Git::new(std::path::Path::new("."), &config.git.remote);
//! let mut sleeper = ThreadSleeper;
//! let report = Executor::new(&client, &git, &mut sleeper, config.retry).execute(op, &mut reporter)?;
//! println!("{}", serde_json::to_string_pretty(&report)?);
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`input`]: Typed inputs and their normalisation
//! - [`environment`]: CI variable snapshot (Travis CI, AppVeyor, GitHub Actions)
//! - [`config`]: `.satsuki.toml` loading and validation
//! - [`substitute`]: `$name` / `${name}` placeholder expansion
//! - [`hash`]: SHA-256 of files and the hash manifest
//! - [`manifest`]: Merging manifests and glob patterns into upload descriptors
//! - [`resolver`]: Deriving the operation from inputs and remote state
//! - [`engine`]: Executing operations, upload retries and reconciliation
//! - [`tags`]: Best-effort tag cleanup
//! - [`types`]: Commands, descriptors and the resolved operation
//! - [`error`]: Error type and categories

pub mod config;

/// Upload coordinator and the [`Reporter`](engine::Reporter) seam.
pub mod engine;

pub mod environment;
pub mod error;
pub mod hash;
pub mod input;
pub mod manifest;
pub mod resolver;
pub mod substitute;
pub mod tags;
pub mod types;

#[cfg(test)]
mod testing;

pub use error::{Error, ErrorCategory, Result};
