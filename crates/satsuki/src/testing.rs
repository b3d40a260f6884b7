//! In-memory doubles shared by the unit tests.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, VecDeque};
use std::fs;

use satsuki_git::TagDeleter;
use satsuki_github::{
    Asset, AssetUpload, GatewayError, NewRelease, Release, ReleaseEdit, ReleaseGateway, Repository,
    Tag, TagCommit,
};

use crate::engine::Reporter;

pub const SLUG: &str = "octo/app";

#[derive(Default)]
pub struct CollectingReporter {
    pub infos: Vec<String>,
    pub warns: Vec<String>,
    pub errors: Vec<String>,
}

impl Reporter for CollectingReporter {
    fn info(&mut self, msg: &str) {
        self.infos.push(msg.to_string());
    }

    fn warn(&mut self, msg: &str) {
        self.warns.push(msg.to_string());
    }

    fn error(&mut self, msg: &str) {
        self.errors.push(msg.to_string());
    }
}

pub fn asset(id: u64, name: &str, size: u64) -> Asset {
    Asset {
        id,
        name: name.to_string(),
        label: Some(name.to_string()),
        size,
        content_type: None,
        browser_download_url: format!("https://github.com/{SLUG}/releases/download/{name}"),
    }
}

/// What the next upload does.
#[derive(Clone, Copy)]
pub enum UploadScript {
    /// Store the file with its real size.
    Store,
    /// Store the file but report `size` bytes.
    StoreSize(u64),
    /// Store the file, then fail as if the response was lost.
    StoreThenFail(fn() -> GatewayError),
    /// Fail without storing anything.
    Fail(fn() -> GatewayError),
}

#[derive(Default)]
struct State {
    releases: Vec<Release>,
    tags: Vec<Tag>,
    assets: BTreeMap<u64, Vec<Asset>>,
    uploads: VecDeque<UploadScript>,
    created: Vec<NewRelease>,
    edits: Vec<ReleaseEdit>,
    deleted_assets: Vec<String>,
}

/// GitHub stand-in holding one repository.
#[derive(Default)]
pub struct FakeGateway {
    state: RefCell<State>,
    next_id: Cell<u64>,
    missing_repo: Cell<bool>,
    fail_tags: Cell<bool>,
    release_lookups: Cell<usize>,
    tag_lookups: Cell<usize>,
    upload_attempts: Cell<usize>,
    list_asset_calls: Cell<usize>,
}

impl FakeGateway {
    pub fn new() -> Self {
        let gh = Self::default();
        gh.next_id.set(100);
        gh
    }

    fn id(&self) -> u64 {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        id
    }

    pub fn repo(&self) -> Repository {
        Repository {
            id: 1,
            full_name: SLUG.to_string(),
            html_url: format!("https://github.com/{SLUG}"),
        }
    }

    pub fn remove_repo(&self) {
        self.missing_repo.set(true);
    }

    pub fn fail_tag_listing(&self) {
        self.fail_tags.set(true);
    }

    /// Add a published release titled `"<tag> title"`.
    pub fn add_release(&self, tag: &str) -> Release {
        let id = self.id();
        let release = Release {
            id,
            tag_name: tag.to_string(),
            name: Some(format!("{tag} title")),
            body: Some(format!("{tag} notes")),
            draft: false,
            prerelease: false,
            target_commitish: Some("main".to_string()),
            html_url: format!("https://github.com/{SLUG}/releases/tag/{tag}"),
            upload_url: format!(
                "https://uploads.github.com/repos/{SLUG}/releases/{id}/assets{{?name,label}}"
            ),
        };
        let mut state = self.state.borrow_mut();
        state.releases.push(release.clone());
        state.assets.insert(id, Vec::new());
        release
    }

    pub fn add_tag(&self, name: &str, sha: &str) {
        self.state.borrow_mut().tags.push(Tag {
            name: name.to_string(),
            commit: TagCommit {
                sha: sha.to_string(),
            },
        });
    }

    pub fn add_asset(&self, tag: &str, name: &str, size: u64) {
        let id = self.id();
        let mut state = self.state.borrow_mut();
        let release_id = state
            .releases
            .iter()
            .find(|r| r.tag_name == tag)
            .map(|r| r.id)
            .expect("release for asset");
        state
            .assets
            .entry(release_id)
            .or_default()
            .push(asset(id, name, size));
    }

    pub fn script_uploads(&self, script: impl IntoIterator<Item = UploadScript>) {
        self.state.borrow_mut().uploads.extend(script);
    }

    pub fn release_count(&self) -> usize {
        self.state.borrow().releases.len()
    }

    pub fn asset_names(&self, tag: &str) -> Vec<String> {
        let state = self.state.borrow();
        state
            .releases
            .iter()
            .find(|r| r.tag_name == tag)
            .and_then(|r| state.assets.get(&r.id))
            .map(|list| list.iter().map(|a| a.name.clone()).collect())
            .unwrap_or_default()
    }

    pub fn created_releases(&self) -> Vec<NewRelease> {
        self.state.borrow().created.clone()
    }

    pub fn edits(&self) -> Vec<ReleaseEdit> {
        self.state.borrow().edits.clone()
    }

    pub fn deleted_asset_names(&self) -> Vec<String> {
        self.state.borrow().deleted_assets.clone()
    }

    pub fn release_lookups(&self) -> usize {
        self.release_lookups.get()
    }

    pub fn tag_lookups(&self) -> usize {
        self.tag_lookups.get()
    }

    pub fn upload_attempts(&self) -> usize {
        self.upload_attempts.get()
    }

    pub fn list_asset_calls(&self) -> usize {
        self.list_asset_calls.get()
    }

    fn not_found() -> GatewayError {
        GatewayError::Api {
            status: 404,
            message: "Not Found".to_string(),
        }
    }

    fn store(&self, release: &Release, upload: &AssetUpload<'_>, size: u64) -> Asset {
        let stored = Asset {
            label: Some(upload.label.to_string()),
            content_type: Some(upload.mime.to_string()),
            ..asset(self.id(), upload.name, size)
        };
        self.state
            .borrow_mut()
            .assets
            .entry(release.id)
            .or_default()
            .push(stored.clone());
        stored
    }
}

impl ReleaseGateway for FakeGateway {
    fn repository(&self, slug: &str) -> Result<Repository, GatewayError> {
        if self.missing_repo.get() || slug != SLUG {
            return Err(GatewayError::RepositoryNotFound(slug.to_string()));
        }
        Ok(self.repo())
    }

    fn release_by_tag(&self, _repo: &Repository, tag: &str) -> Result<Option<Release>, GatewayError> {
        self.release_lookups.set(self.release_lookups.get() + 1);
        Ok(self
            .state
            .borrow()
            .releases
            .iter()
            .find(|r| r.tag_name == tag)
            .cloned())
    }

    fn latest_release(&self, _repo: &Repository) -> Result<Option<Release>, GatewayError> {
        self.release_lookups.set(self.release_lookups.get() + 1);
        Ok(self
            .state
            .borrow()
            .releases
            .iter()
            .rev()
            .find(|r| !r.draft && !r.prerelease)
            .cloned())
    }

    fn refresh_release(&self, _repo: &Repository, release: &Release) -> Result<Release, GatewayError> {
        self.state
            .borrow()
            .releases
            .iter()
            .find(|r| r.id == release.id)
            .cloned()
            .ok_or_else(Self::not_found)
    }

    fn list_tags(&self, _repo: &Repository) -> Result<Vec<Tag>, GatewayError> {
        self.tag_lookups.set(self.tag_lookups.get() + 1);
        if self.fail_tags.get() {
            return Err(GatewayError::Connect("connection refused".to_string()));
        }
        Ok(self.state.borrow().tags.clone())
    }

    fn list_assets(&self, _repo: &Repository, release: &Release) -> Result<Vec<Asset>, GatewayError> {
        self.list_asset_calls.set(self.list_asset_calls.get() + 1);
        self.state
            .borrow()
            .assets
            .get(&release.id)
            .cloned()
            .ok_or_else(Self::not_found)
    }

    fn create_release(&self, _repo: &Repository, new: &NewRelease) -> Result<Release, GatewayError> {
        let release = self.add_release(&new.tag_name);
        let mut state = self.state.borrow_mut();
        state.created.push(new.clone());

        let stored = state
            .releases
            .iter_mut()
            .find(|r| r.id == release.id)
            .ok_or_else(Self::not_found)?;
        stored.name = Some(new.name.clone());
        stored.body = Some(new.body.clone());
        stored.draft = new.draft;
        stored.prerelease = new.prerelease;
        stored.target_commitish = Some(new.target_commitish.clone());
        let created = stored.clone();

        if !state.tags.iter().any(|t| t.name == new.tag_name) {
            state.tags.push(Tag {
                name: new.tag_name.clone(),
                commit: TagCommit {
                    sha: new.target_commitish.clone(),
                },
            });
        }
        Ok(created)
    }

    fn update_release(
        &self,
        _repo: &Repository,
        release: &Release,
        edit: &ReleaseEdit,
    ) -> Result<Release, GatewayError> {
        let mut state = self.state.borrow_mut();
        state.edits.push(edit.clone());
        let stored = state
            .releases
            .iter_mut()
            .find(|r| r.id == release.id)
            .ok_or_else(Self::not_found)?;
        stored.name = Some(edit.name.clone());
        stored.body = Some(edit.body.clone());
        stored.draft = edit.draft;
        stored.prerelease = edit.prerelease;
        Ok(stored.clone())
    }

    fn delete_release(&self, _repo: &Repository, release: &Release) -> Result<(), GatewayError> {
        let mut state = self.state.borrow_mut();
        let before = state.releases.len();
        state.releases.retain(|r| r.id != release.id);
        if state.releases.len() == before {
            return Err(Self::not_found());
        }
        state.assets.remove(&release.id);
        Ok(())
    }

    fn delete_asset(&self, _repo: &Repository, target: &Asset) -> Result<(), GatewayError> {
        let mut state = self.state.borrow_mut();
        let mut found = false;
        for list in state.assets.values_mut() {
            let before = list.len();
            list.retain(|a| a.id != target.id);
            found |= list.len() != before;
        }
        if !found {
            return Err(Self::not_found());
        }
        state.deleted_assets.push(target.name.clone());
        Ok(())
    }

    fn upload_asset(&self, release: &Release, upload: &AssetUpload<'_>) -> Result<Asset, GatewayError> {
        self.upload_attempts.set(self.upload_attempts.get() + 1);

        let size = fs::metadata(upload.path)
            .map_err(|source| GatewayError::LocalFile {
                path: upload.path.to_path_buf(),
                source,
            })?
            .len();

        let taken = self
            .state
            .borrow()
            .assets
            .get(&release.id)
            .is_some_and(|list| list.iter().any(|a| a.name == upload.name));
        if taken {
            return Err(GatewayError::Api {
                status: 422,
                message: "Validation Failed: already_exists".to_string(),
            });
        }

        let script = self
            .state
            .borrow_mut()
            .uploads
            .pop_front()
            .unwrap_or(UploadScript::Store);

        match script {
            UploadScript::Store => Ok(self.store(release, upload, size)),
            UploadScript::StoreSize(reported) => Ok(self.store(release, upload, reported)),
            UploadScript::StoreThenFail(err) => {
                self.store(release, upload, size);
                Err(err())
            }
            UploadScript::Fail(err) => Err(err()),
        }
    }
}

/// Records tag deletions instead of running git.
#[derive(Default)]
pub struct FakeGit {
    failing: bool,
    local: RefCell<Vec<String>>,
    remote: RefCell<Vec<String>>,
}

impl FakeGit {
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn local_deleted(&self) -> Vec<String> {
        self.local.borrow().clone()
    }

    pub fn remote_deleted(&self) -> Vec<String> {
        self.remote.borrow().clone()
    }
}

impl TagDeleter for FakeGit {
    fn delete_local_tag(&self, tag: &str) -> anyhow::Result<()> {
        if self.failing {
            anyhow::bail!("error: tag '{tag}' not found.");
        }
        self.local.borrow_mut().push(tag.to_string());
        Ok(())
    }

    fn delete_remote_tag(&self, tag: &str) -> anyhow::Result<()> {
        if self.failing {
            anyhow::bail!("error: unable to delete '{tag}': remote ref does not exist");
        }
        self.remote.borrow_mut().push(tag.to_string());
        Ok(())
    }
}
