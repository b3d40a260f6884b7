//! Configuration resolver.
//!
//! Resolution is split in two so the front end can fail on bad local input
//! before any network client exists:
//!
//! - [`prepare`] does everything local (token, repository identity, command,
//!   target, placeholders and the file manifest) and yields a [`Request`].
//! - [`resolve`] asks the gateway about the repository, the release and,
//!   when it matters, the tag, then derives the [`InternalCommand`].
//!
//! Either step fails immediately with a typed error; no partial
//! [`Operation`] is ever returned.

use std::fmt;
use std::path::PathBuf;

use satsuki_github::{Release, ReleaseGateway};

use crate::config::FilesConfig;
use crate::engine::Reporter;
use crate::environment::CiEnvironment;
use crate::error::{Error, Result};
use crate::input::Inputs;
use crate::manifest::{ManifestMode, ManifestRequest, build_manifest};
use crate::substitute::Variables;
use crate::types::{
    AssetDescriptor, HashMode, InternalCommand, Operation, ReleaseDescriptor, TargetRef,
    UserCommand,
};

/// Process-level facts the resolver reads instead of touching globals.
#[derive(Debug, Clone, Copy)]
pub struct ResolveContext<'a> {
    pub env: &'a CiEnvironment,
    pub files: &'a FilesConfig,
    pub platform: &'a str,
}

/// Locally validated inputs, ready for the remote lookups.
#[derive(Clone)]
pub struct Request {
    pub token: String,
    pub slug: String,
    pub user_command: UserCommand,
    pub target: TargetRef,
    pub title: Option<String>,
    pub body: Option<String>,
    pub prerelease: Option<bool>,
    pub draft: Option<bool>,
    /// Explicit commitish, or the one CI is building.
    pub commitish: Option<String>,
    pub recreate_ok: bool,
    pub force: bool,
    pub include_tag: bool,
    pub hash_mode: HashMode,
    pub working_dir: PathBuf,
    pub assets: Vec<AssetDescriptor>,
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("token", &"<redacted>")
            .field("slug", &self.slug)
            .field("user_command", &self.user_command)
            .field("target", &self.target)
            .field("title", &self.title)
            .field("body", &self.body)
            .field("prerelease", &self.prerelease)
            .field("draft", &self.draft)
            .field("commitish", &self.commitish)
            .field("recreate_ok", &self.recreate_ok)
            .field("force", &self.force)
            .field("include_tag", &self.include_tag)
            .field("hash_mode", &self.hash_mode)
            .field("working_dir", &self.working_dir)
            .field("assets", &self.assets)
            .finish()
    }
}

/// Validate and normalise everything that does not need the network.
pub fn prepare(
    inputs: Inputs,
    ctx: &ResolveContext<'_>,
    reporter: &mut dyn Reporter,
) -> Result<Request> {
    let inputs = inputs.normalized();

    let token = inputs.token.clone().ok_or_else(|| {
        Error::PermissionDenied(
            "no GitHub API token was provided (use --token or SATS_TOKEN)".to_string(),
        )
    })?;

    let slug = resolve_slug(&inputs, ctx.env, reporter)?;

    let user_command = match inputs.command.as_deref() {
        Some(command) => command.parse()?,
        None => UserCommand::default(),
    };

    let hash_mode = match inputs.file_sha.as_deref() {
        Some(mode) => mode.parse()?,
        None => HashMode::default(),
    };

    let working_dir = inputs
        .working_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from("."));
    let variables = Variables::load(&working_dir.join(&ctx.files.info_file), ctx.platform)?;

    let target = resolve_target(&inputs, ctx.env, &variables)?;

    let assets = build_manifest(
        &ManifestRequest {
            mode: ManifestMode::from(user_command),
            patterns: &inputs.files,
            labels: &inputs.labels,
            mimes: &inputs.mimes,
            manifest_path: inputs.files_file.as_deref(),
            hash_mode,
            working_dir: &working_dir,
            files: ctx.files,
            variables: &variables,
            platform: ctx.platform,
        },
        reporter,
    )?;

    Ok(Request {
        token,
        slug,
        user_command,
        target,
        title: inputs.rel_name.as_deref().map(|s| variables.substitute(s)),
        body: inputs.body.as_deref().map(|s| variables.substitute(s)),
        prerelease: inputs.prerelease,
        draft: inputs.draft,
        commitish: inputs.commitish.clone().or_else(|| ctx.env.commitish()),
        recreate_ok: inputs.recreate_ok,
        force: inputs.force,
        include_tag: inputs.include_tag,
        hash_mode,
        working_dir,
        assets,
    })
}

/// Query the remote state and derive the operation.
pub fn resolve(
    request: Request,
    gateway: &dyn ReleaseGateway,
    reporter: &mut dyn Reporter,
) -> Result<Operation> {
    let repository = gateway.repository(&request.slug).map_err(|err| match err {
        satsuki_github::GatewayError::RepositoryNotFound(slug) => {
            Error::NotFound(format!("repository {slug} not found"))
        }
        other => Error::Gateway(other),
    })?;

    let release = match &request.target {
        TargetRef::Tag(tag) => gateway.release_by_tag(&repository, tag)?,
        TargetRef::Latest => gateway.latest_release(&repository)?,
    };

    match &release {
        Some(r) => reporter.info(&format!("found release {} for tag {}", r.id, r.tag_name)),
        None => reporter.info(&format!("no release found for {}", request.target)),
    }

    let recreate = match &release {
        Some(found) if request.user_command == UserCommand::Upsert => {
            needs_recreate(&request, gateway, &repository, found)?
        }
        _ => false,
    };

    let command = derive_command(
        request.user_command,
        release.is_some(),
        !request.assets.is_empty(),
        recreate,
    );

    let tag = request
        .target
        .tag()
        .map(str::to_string)
        .or_else(|| release.as_ref().map(|r| r.tag_name.clone()));

    let descriptor = match command {
        InternalCommand::Create => Some(blank_descriptor(&request)?),
        InternalCommand::Update | InternalCommand::Recreate => {
            let remote = release
                .as_ref()
                .ok_or_else(|| Error::config("no release to update"))?;
            Some(remote_descriptor(&request, remote, command))
        }
        _ => None,
    };

    let include_tag = request.include_tag
        || matches!(command, InternalCommand::DeleteTag | InternalCommand::Recreate);

    let op = Operation {
        user_command: request.user_command,
        command,
        repository,
        target: request.target,
        tag,
        release,
        descriptor,
        assets: request.assets,
        include_tag,
        force: request.force,
    };

    log_summary(&op, reporter);
    Ok(op)
}

/// [`prepare`] then [`resolve`].
pub fn resolve_operation(
    inputs: Inputs,
    ctx: &ResolveContext<'_>,
    gateway: &dyn ReleaseGateway,
    reporter: &mut dyn Reporter,
) -> Result<Operation> {
    let request = prepare(inputs, ctx, reporter)?;
    resolve(request, gateway, reporter)
}

/// The state machine over user command and remote state.
pub fn derive_command(
    user: UserCommand,
    release_found: bool,
    has_files: bool,
    recreate: bool,
) -> InternalCommand {
    match (user, release_found) {
        (UserCommand::Upsert, true) if recreate => InternalCommand::Recreate,
        (UserCommand::Upsert, true) => InternalCommand::Update,
        (UserCommand::Upsert, false) => InternalCommand::Create,
        (UserCommand::Delete, true) if has_files => InternalCommand::DeleteFile,
        (UserCommand::Delete, true) => InternalCommand::DeleteRelease,
        (UserCommand::Delete, false) => InternalCommand::DeleteTag,
    }
}

fn resolve_slug(inputs: &Inputs, env: &CiEnvironment, reporter: &mut dyn Reporter) -> Result<String> {
    let slug = inputs.slug.clone().or_else(|| env.slug()).filter(|slug| {
        let valid = slug.contains('/');
        if !valid {
            reporter.info(&format!("ignoring invalid repository slug: {slug}"));
        }
        valid
    });

    if let Some(slug) = slug {
        return Ok(slug);
    }

    match (&inputs.owner, &inputs.repo) {
        (Some(owner), Some(repo)) => Ok(format!("{owner}/{repo}")),
        _ => Err(Error::config(
            "a repository slug (owner/name) or both user and repo are required",
        )),
    }
}

fn resolve_target(inputs: &Inputs, env: &CiEnvironment, vars: &Variables) -> Result<TargetRef> {
    if let Some(tag) = &inputs.tag {
        return Ok(TargetRef::Tag(vars.substitute(tag)));
    }
    if inputs.latest {
        return Ok(TargetRef::Latest);
    }
    env.tag()
        .map(|tag| TargetRef::Tag(vars.substitute(&tag)))
        .ok_or_else(|| Error::config("either a tag or the latest flag is required"))
}

/// RECREATE applies when the caller asked for it and the tag points
/// elsewhere than the requested commitish.
fn needs_recreate(
    request: &Request,
    gateway: &dyn ReleaseGateway,
    repository: &satsuki_github::Repository,
    release: &Release,
) -> Result<bool> {
    let Some(commitish) = request.commitish.as_deref() else {
        return Ok(false);
    };
    if !request.recreate_ok {
        return Ok(false);
    }

    let tags = gateway.list_tags(repository)?;
    Ok(tags
        .iter()
        .find(|t| t.name == release.tag_name)
        .is_some_and(|t| t.commit_sha() != commitish))
}

fn blank_descriptor(request: &Request) -> Result<ReleaseDescriptor> {
    let TargetRef::Tag(tag) = &request.target else {
        return Err(Error::config(
            "no latest release exists and a new release needs an explicit tag",
        ));
    };

    Ok(ReleaseDescriptor {
        tag: tag.clone(),
        title: request.title.clone().unwrap_or_else(|| tag.clone()),
        body: request
            .body
            .clone()
            .unwrap_or_else(|| format!("Release {tag}")),
        prerelease: request.prerelease.unwrap_or(false),
        draft: request.draft.unwrap_or(false),
        target_commitish: request.commitish.clone(),
    })
}

/// Unset fields keep the remote value.
fn remote_descriptor(
    request: &Request,
    remote: &Release,
    command: InternalCommand,
) -> ReleaseDescriptor {
    let tag = request
        .target
        .tag()
        .unwrap_or(&remote.tag_name)
        .to_string();

    ReleaseDescriptor {
        title: request
            .title
            .clone()
            .or_else(|| remote.name.clone())
            .unwrap_or_else(|| tag.clone()),
        body: request
            .body
            .clone()
            .or_else(|| remote.body.clone())
            .unwrap_or_default(),
        prerelease: request.prerelease.unwrap_or(remote.prerelease),
        draft: request.draft.unwrap_or(remote.draft),
        target_commitish: match command {
            InternalCommand::Recreate => request.commitish.clone(),
            _ => None,
        },
        tag,
    }
}

fn log_summary(op: &Operation, reporter: &mut dyn Reporter) {
    reporter.info(&format!("user command: {}", op.user_command));
    reporter.info(&format!("internal command: {}", op.command));
    reporter.info(&format!("slug: {}", op.repository.full_name));
    reporter.info(&format!("tag: {}", op.tag.as_deref().unwrap_or("-")));
    reporter.info(&format!("latest: {}", op.target.is_latest()));
    if let Some(d) = &op.descriptor {
        reporter.info(&format!("release name: {}", d.title));
        reporter.info(&format!("body: {}", d.body));
        reporter.info(&format!("prerelease: {}", d.prerelease));
        reporter.info(&format!("draft: {}", d.draft));
        if let Some(commitish) = &d.target_commitish {
            reporter.info(&format!("commitish: {commitish}"));
        }
    }
    reporter.info(&format!("include tag: {}", op.include_tag));
    reporter.info(&format!("force: {}", op.force));
    for asset in &op.assets {
        reporter.info(&format!(
            "file: {} (label: {}, mime: {})",
            asset.file_name,
            asset.label,
            asset.mime_type.as_deref().unwrap_or("-")
        ));
    }
}
