use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use log::{debug, info};
use reqwest::Url;
use tokio_util::sync::CancellationToken;
use updatekit_platform::{ProcessEnvironment, VariableSource};

use crate::deployment::ApplicationDeployment;
use crate::error::{NetworkError, UpdateError};
use crate::location::UpdateLocation;
use crate::manifest::manifest_version_from_bytes;
use crate::version::Version;

const BODY_SNIPPET_CHARS: usize = 160;

/// Outcome of the most recent update check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateState {
    pub current_version: Option<Version>,
    pub available_version: Option<Version>,
    pub is_update_available: bool,
    pub last_checked_at: Option<DateTime<Utc>>,
}

/// Compares the version published in the deployment manifest with the
/// running version.
pub struct UpdateChecker<S = ProcessEnvironment> {
    deployment: Arc<ApplicationDeployment<S>>,
    client: reqwest::Client,
    state: RwLock<UpdateState>,
}

impl<S: VariableSource> UpdateChecker<S> {
    #[must_use]
    pub fn new(deployment: Arc<ApplicationDeployment<S>>, client: reqwest::Client) -> Self {
        Self {
            deployment,
            client,
            state: RwLock::new(UpdateState::default()),
        }
    }

    #[must_use]
    pub fn deployment(&self) -> &Arc<ApplicationDeployment<S>> {
        &self.deployment
    }

    #[must_use]
    pub fn state(&self) -> UpdateState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn is_update_available(&self) -> bool {
        self.state().is_update_available
    }

    #[must_use]
    pub fn available_version(&self) -> Option<Version> {
        self.state().available_version
    }

    /// Fetch the deployment manifest and record whether it is newer than the
    /// running version.
    ///
    /// Returns `Ok(false)` without touching the state when no update location
    /// is configured or its kind is not supported; callers that need to tell
    /// "no update" from "cannot check" should inspect
    /// [`UpdateChecker::is_update_available`] and the configured location.
    ///
    /// `cancel` is checked once, after the manifest has been loaded.
    ///
    /// # Errors
    /// Returns an error when the manifest cannot be read or parsed, when the
    /// current version is unavailable, or when the check was cancelled. A
    /// cancelled check leaves the state unchanged; any other failure clears
    /// it.
    pub async fn check_for_update(&self, cancel: &CancellationToken) -> Result<bool, UpdateError> {
        let Some(location) = self.deployment.update_location() else {
            debug!("No update location configured, skipping update check");
            return Ok(false);
        };

        let bytes = match &location {
            UpdateLocation::Local(path) => read_local_manifest(path).await,
            UpdateLocation::Web(url) => fetch_remote_manifest(&self.client, url).await,
            UpdateLocation::Unknown(raw) => {
                debug!("Unsupported update location {raw}, skipping update check");
                return Ok(false);
            }
        };

        match self.evaluate(bytes, cancel) {
            Ok((current, available)) => {
                let is_newer = available > current;
                if is_newer {
                    info!("Update available: {current} -> {available} ({location})");
                } else {
                    debug!("No update: running {current}, manifest {available}");
                }
                self.record(UpdateState {
                    current_version: Some(current),
                    available_version: Some(available),
                    is_update_available: is_newer,
                    last_checked_at: Some(Utc::now()),
                });
                Ok(is_newer)
            }
            Err(UpdateError::Cancelled) => Err(UpdateError::Cancelled),
            Err(error) => {
                self.record(UpdateState {
                    last_checked_at: Some(Utc::now()),
                    ..UpdateState::default()
                });
                Err(error)
            }
        }
    }

    /// Blocking form of [`UpdateChecker::check_for_update`].
    ///
    /// Drives the same future on a private current-thread runtime.
    ///
    /// # Errors
    /// The errors of [`UpdateChecker::check_for_update`], plus
    /// [`UpdateError::Runtime`] when called from within a tokio runtime or
    /// when the runtime cannot be started.
    pub fn check_for_update_blocking(&self, cancel: &CancellationToken) -> Result<bool, UpdateError> {
        if tokio::runtime::Handle::try_current().is_ok() {
            return Err(UpdateError::Runtime(std::io::Error::other(
                "blocking update check called from within an async runtime",
            )));
        }
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(UpdateError::Runtime)?;
        runtime.block_on(self.check_for_update(cancel))
    }

    fn evaluate(
        &self,
        bytes: Result<Vec<u8>, UpdateError>,
        cancel: &CancellationToken,
    ) -> Result<(Version, Version), UpdateError> {
        let bytes = bytes?;
        if cancel.is_cancelled() {
            debug!("Update check cancelled after manifest load");
            return Err(UpdateError::Cancelled);
        }

        let available = manifest_version_from_bytes(&bytes)?;
        let current = self.deployment.current_version()?;
        Ok((current, available))
    }

    fn record(&self, state: UpdateState) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = state;
    }
}

async fn read_local_manifest(path: &Path) -> Result<Vec<u8>, UpdateError> {
    tokio::fs::read(path)
        .await
        .map_err(|source| UpdateError::io("failed to read manifest", path, source))
}

async fn fetch_remote_manifest(client: &reqwest::Client, url: &Url) -> Result<Vec<u8>, UpdateError> {
    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|source| NetworkError::Request {
            url: url.to_string(),
            source,
        })?;

    if !response.status().is_success() {
        let status = response.status();
        let body_snippet = response
            .text()
            .await
            .ok()
            .map(|body| response_snippet(&body, BODY_SNIPPET_CHARS))
            .unwrap_or_default();
        return Err(NetworkError::HttpStatus {
            url: url.to_string(),
            status,
            body_snippet,
        }
        .into());
    }

    let body = response.bytes().await.map_err(|source| NetworkError::Body {
        url: url.to_string(),
        source,
    })?;
    Ok(body.to_vec())
}

fn response_snippet(body: &str, max_chars: usize) -> String {
    let snippet: String = body.trim().chars().take(max_chars).collect();
    if snippet.is_empty() {
        String::new()
    } else {
        format!(": {snippet}")
    }
}
