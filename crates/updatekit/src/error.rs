use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("this application was not network deployed (no deployment variables found)")]
    NotNetworkDeployed,

    #[error(transparent)]
    Update(#[from] updatekit_core::UpdateError),

    #[error(transparent)]
    Deployment(#[from] updatekit_core::DeploymentError),

    #[error("failed to read manifest {}: {source}", path.display())]
    ManifestRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Manifest(#[from] updatekit_core::ManifestError),

    #[error("settings {action} failed for {}: {details}", path.display())]
    Settings {
        action: &'static str,
        path: PathBuf,
        details: String,
    },

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),

    #[error("failed to start async runtime: {0}")]
    Runtime(#[source] std::io::Error),

    #[error("update watch ended before an update was found")]
    WatchEnded,
}

impl AppError {
    pub fn settings(
        action: &'static str,
        path: impl Into<PathBuf>,
        details: impl std::fmt::Display,
    ) -> Self {
        Self::Settings {
            action,
            path: path.into(),
            details: details.to_string(),
        }
    }
}
