use std::fs::File;
use std::io;
use std::time::Duration;

use reqwest::Url;
use reqwest::blocking::{Body, Client, RequestBuilder, Response};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::GatewayError;
use crate::types::{Asset, AssetUpload, NewRelease, Release, ReleaseEdit, Repository, Tag};
use crate::ReleaseGateway;

/// Default API endpoint for github.com
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Content type used when an asset has no MIME type.
pub const DEFAULT_MIME: &str = "application/octet-stream";

/// Page size for list endpoints.
pub const PER_PAGE: usize = 100;

pub const USER_AGENT: &str = concat!("satsuki/", env!("CARGO_PKG_VERSION"));

const API_VERSION: &str = "2022-11-28";
/// Timeout for API calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for a single asset upload.
pub const DEFAULT_UPLOAD_TIMEOUT: Duration = Duration::from_secs(600);

/// Blocking GitHub REST client.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    base_url: Url,
    upload_timeout: Duration,
    client: Client,
}

impl GitHubClient {
    /// Create a client for `base_url` (github.com or a GitHub Enterprise
    /// `/api/v3` root) authenticated with `token`.
    pub fn new(base_url: &str, token: &str) -> Result<Self, GatewayError> {
        Self::with_timeout(base_url, token, DEFAULT_TIMEOUT)
    }

    /// Same as [`GitHubClient::new`] with a custom timeout for API calls.
    /// Uploads use a separate, longer timeout.
    pub fn with_timeout(base_url: &str, token: &str, timeout: Duration) -> Result<Self, GatewayError> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| GatewayError::InvalidUrl(format!("{base_url}: {e}")))?;

        let mut auth = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| GatewayError::InvalidHeader(format!("authorization: {e}")))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert(
            HeaderName::from_static("x-github-api-version"),
            HeaderValue::from_static(API_VERSION),
        );

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        Ok(Self {
            base_url,
            upload_timeout: DEFAULT_UPLOAD_TIMEOUT,
            client,
        })
    }

    /// Set the timeout used for asset uploads.
    pub fn with_upload_timeout(mut self, timeout: Duration) -> Self {
        self.upload_timeout = timeout;
        self
    }

    fn endpoint<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Result<Url, GatewayError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| GatewayError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn repo_endpoint(&self, full_name: &str, rest: &[&str]) -> Result<Url, GatewayError> {
        self.endpoint(
            ["repos"]
                .into_iter()
                .chain(full_name.split('/'))
                .chain(rest.iter().copied()),
        )
    }

    fn send(&self, request: RequestBuilder) -> Result<Response, GatewayError> {
        let response = request.send().map_err(transport_error)?;
        check_status(response)
    }

    fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, GatewayError> {
        self.send(request)?.json().map_err(transport_error)
    }

    /// GET that maps 404 to `None`.
    fn get_optional<T: DeserializeOwned>(&self, url: Url) -> Result<Option<T>, GatewayError> {
        let response = self.client.get(url).send().map_err(transport_error)?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let value = check_status(response)?.json().map_err(transport_error)?;
        Ok(Some(value))
    }

    /// GET every page of a list endpoint until a short page comes back.
    fn get_paged<T: DeserializeOwned>(&self, full_name: &str, rest: &[&str]) -> Result<Vec<T>, GatewayError> {
        let mut items = Vec::new();
        for page in 1u32.. {
            let mut url = self.repo_endpoint(full_name, rest)?;
            url.query_pairs_mut()
                .append_pair("per_page", &PER_PAGE.to_string())
                .append_pair("page", &page.to_string());

            let batch: Vec<T> = self.send_json(self.client.get(url))?;
            let last = batch.len() < PER_PAGE;
            items.extend(batch);
            if last {
                break;
            }
        }
        Ok(items)
    }
}

impl ReleaseGateway for GitHubClient {
    fn repository(&self, slug: &str) -> Result<Repository, GatewayError> {
        let url = self.repo_endpoint(slug, &[])?;
        self.get_optional(url)?
            .ok_or_else(|| GatewayError::RepositoryNotFound(slug.to_string()))
    }

    fn release_by_tag(&self, repo: &Repository, tag: &str) -> Result<Option<Release>, GatewayError> {
        let url = self.repo_endpoint(&repo.full_name, &["releases", "tags", tag])?;
        self.get_optional(url)
    }

    fn latest_release(&self, repo: &Repository) -> Result<Option<Release>, GatewayError> {
        let url = self.repo_endpoint(&repo.full_name, &["releases", "latest"])?;
        self.get_optional(url)
    }

    fn refresh_release(&self, repo: &Repository, release: &Release) -> Result<Release, GatewayError> {
        let id = release.id.to_string();
        let url = self.repo_endpoint(&repo.full_name, &["releases", &id])?;
        self.send_json(self.client.get(url))
    }

    fn list_tags(&self, repo: &Repository) -> Result<Vec<Tag>, GatewayError> {
        self.get_paged(&repo.full_name, &["tags"])
    }

    fn list_assets(&self, repo: &Repository, release: &Release) -> Result<Vec<Asset>, GatewayError> {
        let id = release.id.to_string();
        self.get_paged(&repo.full_name, &["releases", &id, "assets"])
    }

    fn create_release(&self, repo: &Repository, release: &NewRelease) -> Result<Release, GatewayError> {
        let url = self.repo_endpoint(&repo.full_name, &["releases"])?;
        self.send_json(self.client.post(url).json(release))
    }

    fn update_release(
        &self,
        repo: &Repository,
        release: &Release,
        edit: &ReleaseEdit,
    ) -> Result<Release, GatewayError> {
        let id = release.id.to_string();
        let url = self.repo_endpoint(&repo.full_name, &["releases", &id])?;
        self.send_json(self.client.patch(url).json(edit))
    }

    fn delete_release(&self, repo: &Repository, release: &Release) -> Result<(), GatewayError> {
        let id = release.id.to_string();
        let url = self.repo_endpoint(&repo.full_name, &["releases", &id])?;
        self.send(self.client.delete(url)).map(|_| ())
    }

    fn delete_asset(&self, repo: &Repository, asset: &Asset) -> Result<(), GatewayError> {
        let id = asset.id.to_string();
        let url = self.repo_endpoint(&repo.full_name, &["releases", "assets", &id])?;
        self.send(self.client.delete(url)).map(|_| ())
    }

    fn upload_asset(&self, release: &Release, upload: &AssetUpload<'_>) -> Result<Asset, GatewayError> {
        let local = |source: io::Error| GatewayError::LocalFile {
            path: upload.path.to_path_buf(),
            source,
        };
        let file = File::open(upload.path).map_err(local)?;
        let len = file.metadata().map_err(local)?.len();

        let target = upload_target(&release.upload_url);
        let mut url =
            Url::parse(target).map_err(|e| GatewayError::InvalidUrl(format!("{target}: {e}")))?;
        url.query_pairs_mut()
            .append_pair("name", upload.name)
            .append_pair("label", upload.label);

        let mime = if upload.mime.is_empty() {
            DEFAULT_MIME
        } else {
            upload.mime
        };

        let request = self
            .client
            .post(url)
            .header(CONTENT_TYPE, mime)
            .timeout(self.upload_timeout)
            .body(Body::sized(file, len));
        self.send_json(request)
    }
}

/// Strip the `{?name,label}` URI template suffix from a release upload URL.
pub fn upload_target(upload_url: &str) -> &str {
    upload_url
        .find('{')
        .map_or(upload_url, |idx| &upload_url[..idx])
}

#[derive(Deserialize)]
struct ApiMessage {
    message: String,
}

fn check_status(response: Response) -> Result<Response, GatewayError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let fallback = status.canonical_reason().unwrap_or("request failed").to_string();
    let message = response
        .json::<ApiMessage>()
        .map(|body| body.message)
        .unwrap_or(fallback);
    Err(GatewayError::Api {
        status: status.as_u16(),
        message,
    })
}

fn transport_error(err: reqwest::Error) -> GatewayError {
    let detail = err.to_string();

    match io_error_kind(&err) {
        Some(io::ErrorKind::BrokenPipe) => return GatewayError::BrokenPipe(detail),
        Some(io::ErrorKind::ConnectionAborted | io::ErrorKind::ConnectionReset) => {
            return GatewayError::ConnectionAborted(detail);
        }
        Some(io::ErrorKind::TimedOut) => return GatewayError::Timeout(detail),
        _ => {}
    }

    if err.is_timeout() {
        GatewayError::Timeout(detail)
    } else if err.is_connect() {
        GatewayError::Connect(detail)
    } else if err.is_decode() {
        GatewayError::Decode(detail)
    } else {
        GatewayError::Transport(detail)
    }
}

/// First `io::Error` in the source chain, if any.
fn io_error_kind(err: &reqwest::Error) -> Option<io::ErrorKind> {
    let mut source = std::error::Error::source(err);
    while let Some(inner) = source {
        if let Some(io_err) = inner.downcast_ref::<io::Error>() {
            return Some(io_err.kind());
        }
        source = inner.source();
    }
    None
}
