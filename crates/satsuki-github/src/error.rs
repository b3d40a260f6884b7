use std::io;
use std::path::PathBuf;

use satsuki_retry::ErrorClass;
use thiserror::Error;

/// Failures reported by a [`ReleaseGateway`](crate::ReleaseGateway).
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("repository {0} not found")]
    RepositoryNotFound(String),

    #[error("GitHub API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("broken pipe: {0}")]
    BrokenPipe(String),

    #[error("connection aborted: {0}")]
    ConnectionAborted(String),

    #[error("could not connect: {0}")]
    Connect(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("could not decode response: {0}")]
    Decode(String),

    #[error("invalid url {0}")]
    InvalidUrl(String),

    #[error("invalid request header: {0}")]
    InvalidHeader(String),

    #[error("could not read {}: {source}", path.display())]
    LocalFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl GatewayError {
    /// How the upload loop should treat this failure.
    ///
    /// Ambiguous errors may hide a completed upload, so the caller checks
    /// the remote asset list before trying again.
    pub fn class(&self) -> ErrorClass {
        match self {
            GatewayError::Timeout(_)
            | GatewayError::BrokenPipe(_)
            | GatewayError::ConnectionAborted(_)
            | GatewayError::Api { .. }
            | GatewayError::Decode(_) => ErrorClass::Ambiguous,
            GatewayError::Connect(_) | GatewayError::Transport(_) => ErrorClass::Retryable,
            GatewayError::RepositoryNotFound(_)
            | GatewayError::InvalidUrl(_)
            | GatewayError::InvalidHeader(_)
            | GatewayError::LocalFile { .. } => ErrorClass::Permanent,
        }
    }
}
