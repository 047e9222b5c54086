use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::deployment::DeploymentError;
use crate::manifest::ManifestError;

#[derive(Debug, Error)]
pub enum UpdateError {
    #[error(transparent)]
    ManifestFormat(#[from] ManifestError),
    #[error("{context} {}: {source}", path.display())]
    Io {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Network(#[from] NetworkError),
    #[error("update check was cancelled")]
    Cancelled,
    #[error("{operation} is not supported for update location {location}")]
    NotSupported {
        operation: &'static str,
        location: String,
    },
    #[error(transparent)]
    Deployment(#[from] DeploymentError),
    #[error("failed to start update check runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("failed to fetch manifest from {url}: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("manifest fetch from {url} failed with HTTP {status}{body_snippet}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
        body_snippet: String,
    },
    #[error("failed to read manifest body from {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl UpdateError {
    pub(crate) fn io(context: &'static str, path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            context,
            path: path.to_path_buf(),
            source,
        }
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
