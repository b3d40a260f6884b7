//! Upload coordinator.
//!
//! Executes a resolved [`Operation`] against the gateway. The asset list of
//! the working release is fetched at most once and kept in step with every
//! delete and upload; reconciliation re-fetches it.

use std::fs;

use satsuki_git::TagDeleter;
use satsuki_github::{
    Asset, AssetUpload, GatewayError, NewRelease, Release, ReleaseEdit, ReleaseGateway, Repository,
};
use satsuki_retry::{ErrorClass, RetryStrategyConfig, Sleeper, pause_after};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::tags::clean_tags;
use crate::types::{AssetDescriptor, InternalCommand, Operation, ReleaseDescriptor};

pub trait Reporter {
    fn info(&mut self, msg: &str);
    fn warn(&mut self, msg: &str);
    fn error(&mut self, msg: &str);
}

/// Result of one upload attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// The asset is on the release with the expected size.
    Confirmed(Asset),
    /// Not uploaded (or not verifiably); another attempt may succeed.
    RetryableFailure(String),
    /// Retrying cannot help.
    FatalFailure(String),
}

/// Decide what an upload attempt amounted to.
///
/// `reconcile` is only called for ambiguous errors, where the upload may
/// have landed even though the request failed. It returns the remote asset
/// with the same name, if any.
pub fn decide_upload(
    result: std::result::Result<Asset, GatewayError>,
    expected_size: u64,
    reconcile: impl FnOnce() -> Option<Asset>,
) -> UploadOutcome {
    match result {
        Ok(asset) if asset.size == expected_size => UploadOutcome::Confirmed(asset),
        Ok(asset) => UploadOutcome::RetryableFailure(format!(
            "size mismatch: uploaded {} bytes, expected {expected_size}",
            asset.size
        )),
        Err(err) => match err.class() {
            ErrorClass::Ambiguous => match reconcile() {
                Some(asset) if asset.size == expected_size => UploadOutcome::Confirmed(asset),
                Some(asset) => UploadOutcome::RetryableFailure(format!(
                    "{err}; remote copy has {} bytes, expected {expected_size}",
                    asset.size
                )),
                None => UploadOutcome::RetryableFailure(format!("{err}; asset not on release")),
            },
            ErrorClass::Retryable => UploadOutcome::RetryableFailure(err.to_string()),
            ErrorClass::Permanent => UploadOutcome::FatalFailure(err.to_string()),
        },
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadedAsset {
    pub name: String,
    pub size: u64,
    pub attempts: u32,
}

/// What an execution did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionReport {
    pub command: InternalCommand,
    pub tag: Option<String>,
    pub release_url: Option<String>,
    pub release_deleted: bool,
    pub uploaded: Vec<UploadedAsset>,
    pub deleted_assets: Vec<String>,
    pub deleted_tags: Vec<String>,
}

impl ExecutionReport {
    fn new(op: &Operation) -> Self {
        Self {
            command: op.command,
            tag: op.tag.clone(),
            release_url: op.release.as_ref().map(|r| r.html_url.clone()),
            release_deleted: false,
            uploaded: Vec::new(),
            deleted_assets: Vec::new(),
            deleted_tags: Vec::new(),
        }
    }
}

/// Runs operations against a gateway and git.
pub struct Executor<'a> {
    gateway: &'a dyn ReleaseGateway,
    git: &'a dyn TagDeleter,
    sleeper: &'a mut dyn Sleeper,
    retry: RetryStrategyConfig,
}

/// Per-execution state.
struct Session {
    repo: Repository,
    release: Option<Release>,
    assets: Option<Vec<Asset>>,
    report: ExecutionReport,
}

impl<'a> Executor<'a> {
    pub fn new(
        gateway: &'a dyn ReleaseGateway,
        git: &'a dyn TagDeleter,
        sleeper: &'a mut dyn Sleeper,
        retry: RetryStrategyConfig,
    ) -> Self {
        Self {
            gateway,
            git,
            sleeper,
            retry,
        }
    }

    /// Execute `op`. Consumes it: an operation runs exactly once.
    pub fn execute(&mut self, op: Operation, reporter: &mut dyn Reporter) -> Result<ExecutionReport> {
        let mut session = Session {
            report: ExecutionReport::new(&op),
            repo: op.repository.clone(),
            release: op.release.clone(),
            assets: None,
        };

        reporter.info(&format!("executing {} for {}", op.command, op.target));

        match op.command {
            InternalCommand::Create => {
                let descriptor = require_descriptor(&op)?;
                self.create_release(&mut session, descriptor, reporter)?;
                self.upload_all(&mut session, &op.assets, reporter)?;
            }
            InternalCommand::Update => {
                let descriptor = require_descriptor(&op)?;
                self.update_release(&mut session, descriptor, reporter)?;
                self.upload_all(&mut session, &op.assets, reporter)?;
            }
            InternalCommand::Recreate => {
                let descriptor = require_descriptor(&op)?;
                // Not transactional: a failure after this point leaves the
                // release gone.
                self.delete_release(&mut session, reporter)?;
                self.clean_tags(&mut session, &descriptor.tag, true, reporter);
                self.create_release(&mut session, descriptor, reporter)?;
                self.upload_all(&mut session, &op.assets, reporter)?;
            }
            InternalCommand::DeleteFile => {
                self.delete_files(&mut session, &op.assets, reporter)?;
            }
            InternalCommand::DeleteRelease => {
                self.delete_release(&mut session, reporter)?;
                if op.include_tag {
                    self.clean_tag_for(&mut session, &op, reporter);
                }
            }
            InternalCommand::DeleteTag => {
                self.clean_tag_for(&mut session, &op, reporter);
            }
        }

        Ok(session.report)
    }

    fn create_release(
        &mut self,
        session: &mut Session,
        descriptor: &ReleaseDescriptor,
        reporter: &mut dyn Reporter,
    ) -> Result<()> {
        let Some(commitish) = descriptor.target_commitish.clone() else {
            return Err(Error::config(format!(
                "a commitish (commit SHA or branch) is required to create release {}",
                descriptor.tag
            )));
        };

        reporter.info(&format!("creating release {}", descriptor.title));
        let created = self.gateway.create_release(
            &session.repo,
            &NewRelease {
                tag_name: descriptor.tag.clone(),
                target_commitish: commitish,
                name: descriptor.title.clone(),
                body: descriptor.body.clone(),
                draft: descriptor.draft,
                prerelease: descriptor.prerelease,
            },
        )?;

        session.report.release_url = Some(created.html_url.clone());
        session.release = Some(created);
        session.assets = Some(Vec::new());
        Ok(())
    }

    fn update_release(
        &mut self,
        session: &mut Session,
        descriptor: &ReleaseDescriptor,
        reporter: &mut dyn Reporter,
    ) -> Result<()> {
        let release = session.working_release()?;
        reporter.info(&format!("updating release {}", release.id));

        let updated = self.gateway.update_release(
            &session.repo,
            release,
            &ReleaseEdit {
                name: descriptor.title.clone(),
                body: descriptor.body.clone(),
                draft: descriptor.draft,
                prerelease: descriptor.prerelease,
            },
        )?;

        session.report.release_url = Some(updated.html_url.clone());
        session.release = Some(updated);
        Ok(())
    }

    fn delete_release(&mut self, session: &mut Session, reporter: &mut dyn Reporter) -> Result<()> {
        let release = session.working_release()?;
        reporter.info(&format!("deleting release {} ({})", release.id, release.tag_name));
        self.gateway.delete_release(&session.repo, release)?;

        session.release = None;
        session.assets = None;
        session.report.release_deleted = true;
        Ok(())
    }

    fn clean_tag_for(&mut self, session: &mut Session, op: &Operation, reporter: &mut dyn Reporter) {
        match op.tag.as_deref() {
            Some(tag) => self.clean_tags(session, tag, op.force, reporter),
            None => reporter.info(&format!("no release found for {}; no tag to clean", op.target)),
        }
    }

    fn clean_tags(
        &mut self,
        session: &mut Session,
        pattern: &str,
        force: bool,
        reporter: &mut dyn Reporter,
    ) {
        let deleted = clean_tags(self.gateway, &session.repo, pattern, force, self.git, reporter);
        session.report.deleted_tags.extend(deleted);
    }

    fn delete_files(
        &mut self,
        session: &mut Session,
        assets: &[AssetDescriptor],
        reporter: &mut dyn Reporter,
    ) -> Result<()> {
        for asset in assets {
            if self.delete_existing(session, &asset.file_name, reporter)? {
                session.report.deleted_assets.push(asset.file_name.clone());
            } else {
                reporter.info(&format!("{}: not on release; nothing to delete", asset.file_name));
            }
        }
        Ok(())
    }

    /// Cached asset list, fetched on first use.
    fn asset_list<'s>(&self, session: &'s mut Session) -> Result<&'s mut Vec<Asset>> {
        if session.assets.is_none() {
            let release = session.working_release()?;
            session.assets = Some(self.gateway.list_assets(&session.repo, release)?);
        }
        Ok(session.assets.get_or_insert_with(Vec::new))
    }

    /// Delete the asset named `name` if the release has one.
    fn delete_existing(
        &mut self,
        session: &mut Session,
        name: &str,
        reporter: &mut dyn Reporter,
    ) -> Result<bool> {
        let repo = session.repo.clone();
        let list = self.asset_list(session)?;
        let Some(idx) = list.iter().position(|a| a.name == name) else {
            return Ok(false);
        };

        reporter.info(&format!("deleting release asset {name}"));
        self.gateway.delete_asset(&repo, &list[idx])?;
        list.remove(idx);
        Ok(true)
    }

    fn upload_all(
        &mut self,
        session: &mut Session,
        assets: &[AssetDescriptor],
        reporter: &mut dyn Reporter,
    ) -> Result<()> {
        for asset in assets {
            let uploaded = self.upload_file(session, asset, reporter)?;
            session.report.uploaded.push(uploaded);
        }
        Ok(())
    }

    /// Upload one file with bounded retries. Any same-name asset is deleted
    /// before each attempt since GitHub cannot overwrite assets.
    fn upload_file(
        &mut self,
        session: &mut Session,
        asset: &AssetDescriptor,
        reporter: &mut dyn Reporter,
    ) -> Result<UploadedAsset> {
        let expected = fs::metadata(&asset.local_path)
            .map_err(|e| Error::read(&asset.local_path, e))?
            .len();
        reporter.info(&format!("uploading {} ({expected} bytes)", asset.file_name));

        let max_attempts = self.retry.max_attempts.max(1);
        let mut last_reason = None;

        for attempt in 1..=max_attempts {
            if attempt > 1 {
                let delay = pause_after(&self.retry, attempt - 1);
                reporter.info(&format!(
                    "{}: retrying in {}s (attempt {attempt}/{max_attempts})",
                    asset.file_name,
                    delay.as_secs()
                ));
                self.sleeper.sleep(delay);
            }

            self.delete_existing(session, &asset.file_name, reporter)?;

            let release = session.working_release()?.clone();
            let result = self.gateway.upload_asset(
                &release,
                &AssetUpload {
                    path: &asset.local_path,
                    name: &asset.file_name,
                    label: &asset.label,
                    mime: asset.mime_type.as_deref().unwrap_or_default(),
                },
            );

            // A wrong-size upload still occupies the name until deleted.
            if let Ok(stored) = &result
                && stored.size != expected
            {
                self.remember(session, stored.clone());
            }

            let outcome = decide_upload(result, expected, || {
                self.reconcile(session, &release, &asset.file_name, reporter)
            });

            self.refresh(session, reporter);

            match outcome {
                UploadOutcome::Confirmed(uploaded) => {
                    reporter.info(&format!(
                        "{}: uploaded {} bytes (attempt {attempt})",
                        asset.file_name, uploaded.size
                    ));
                    let size = uploaded.size;
                    self.remember(session, uploaded);
                    return Ok(UploadedAsset {
                        name: asset.file_name.clone(),
                        size,
                        attempts: attempt,
                    });
                }
                UploadOutcome::RetryableFailure(reason) => {
                    reporter.warn(&format!(
                        "{}: upload failed, {} attempt(s) left: {reason}",
                        asset.file_name,
                        max_attempts - attempt
                    ));
                    last_reason = Some(reason);
                }
                UploadOutcome::FatalFailure(reason) => {
                    return Err(Error::UploadFailed {
                        file: asset.file_name.clone(),
                        attempts: attempt,
                        reason,
                    });
                }
            }
        }

        Err(Error::UploadFailed {
            file: asset.file_name.clone(),
            attempts: max_attempts,
            reason: last_reason.unwrap_or_else(|| "could not connect to GitHub".to_string()),
        })
    }

    /// Re-list the release assets and find `name`.
    fn reconcile(
        &self,
        session: &mut Session,
        release: &Release,
        name: &str,
        reporter: &mut dyn Reporter,
    ) -> Option<Asset> {
        reporter.info(&format!("{name}: checking whether the upload landed"));
        match self.gateway.list_assets(&session.repo, release) {
            Ok(list) => {
                let found = list.iter().find(|a| a.name == name).cloned();
                session.assets = Some(list);
                found
            }
            Err(err) => {
                reporter.warn(&format!("{name}: could not list assets: {err}"));
                None
            }
        }
    }

    fn refresh(&self, session: &mut Session, reporter: &mut dyn Reporter) {
        let Some(release) = session.release.as_ref() else {
            return;
        };
        match self.gateway.refresh_release(&session.repo, release) {
            Ok(fresh) => session.release = Some(fresh),
            Err(err) => reporter.warn(&format!("could not refresh release {}: {err}", release.id)),
        }
    }

    /// Put `asset` into the cached list, replacing any same-name entry.
    fn remember(&self, session: &mut Session, asset: Asset) {
        if let Some(list) = session.assets.as_mut() {
            list.retain(|a| a.name != asset.name);
            list.push(asset);
        }
    }
}

impl Session {
    fn working_release(&self) -> Result<&Release> {
        self.release
            .as_ref()
            .ok_or_else(|| Error::config("no working release"))
    }
}

fn require_descriptor(op: &Operation) -> Result<&ReleaseDescriptor> {
    op.descriptor
        .as_ref()
        .ok_or_else(|| Error::config(format!("{} requires release details", op.command)))
}
