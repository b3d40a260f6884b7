//! Error taxonomy.
//!
//! Every failure surfaced to the caller is a [`Error`]. Its
//! [`category`](Error::category) is the machine-facing classification the
//! CLI prints; `Display` is the single human-readable message.

use std::fmt;
use std::io;
use std::path::Path;

use satsuki_github::GatewayError;
use serde::Serialize;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    PermissionDenied,
    InvalidArgument,
    Configuration,
    NotFound,
    Transport,
    Io,
}

impl ErrorCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCategory::PermissionDenied => "permission_denied",
            ErrorCategory::InvalidArgument => "invalid_argument",
            ErrorCategory::Configuration => "configuration",
            ErrorCategory::NotFound => "not_found",
            ErrorCategory::Transport => "transport",
            ErrorCategory::Io => "io",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    PermissionDenied(String),

    #[error("{0}")]
    InvalidArgument(String),

    #[error("{0}")]
    Configuration(String),

    #[error("{0}")]
    NotFound(String),

    #[error("upload of {file} failed after {attempts} attempt(s): {reason}")]
    UploadFailed {
        file: String,
        attempts: u32,
        reason: String,
    },

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Configuration(msg.into())
    }

    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        Error::Io {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn read(path: &Path, source: io::Error) -> Self {
        Error::io(format!("failed to read {}", path.display()), source)
    }

    pub(crate) fn write(path: &Path, source: io::Error) -> Self {
        Error::io(format!("failed to write {}", path.display()), source)
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::PermissionDenied(_) => ErrorCategory::PermissionDenied,
            Error::InvalidArgument(_) => ErrorCategory::InvalidArgument,
            Error::Configuration(_) => ErrorCategory::Configuration,
            Error::NotFound(_) => ErrorCategory::NotFound,
            Error::UploadFailed { .. } => ErrorCategory::Transport,
            Error::Io { .. } => ErrorCategory::Io,
            Error::Gateway(err) => match err {
                GatewayError::RepositoryNotFound(_) => ErrorCategory::NotFound,
                GatewayError::LocalFile { .. } => ErrorCategory::Io,
                GatewayError::InvalidUrl(_) | GatewayError::InvalidHeader(_) => {
                    ErrorCategory::Configuration
                }
                _ => ErrorCategory::Transport,
            },
        }
    }
}
