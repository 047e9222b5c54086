use std::path::Path;
use std::sync::Arc;

use log::{debug, info};
use updatekit_platform::{ProcessEnvironment, VariableSource};

use crate::checker::UpdateChecker;
use crate::error::UpdateError;
use crate::location::UpdateLocation;

/// Starts the update target as a process that outlives the caller.
pub trait ProcessLauncher {
    /// # Errors
    /// Returns an error when the process cannot be started.
    fn launch_detached(&self, path: &Path) -> std::io::Result<()>;
}

/// Launches through the operating system, detached from this process.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellLauncher;

impl ProcessLauncher for ShellLauncher {
    fn launch_detached(&self, path: &Path) -> std::io::Result<()> {
        updatekit_platform::launch_detached(path)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchOutcome {
    /// The update was started; the caller is expected to exit.
    Launched,
    /// Nothing to launch: no update is available or the location is not a
    /// launchable file.
    Skipped,
}

pub struct UpdateLauncher<S = ProcessEnvironment, L = ShellLauncher> {
    checker: Arc<UpdateChecker<S>>,
    launcher: L,
}

impl<S: VariableSource> UpdateLauncher<S, ShellLauncher> {
    #[must_use]
    pub fn new(checker: Arc<UpdateChecker<S>>) -> Self {
        Self::with_launcher(checker, ShellLauncher)
    }
}

impl<S: VariableSource, L: ProcessLauncher> UpdateLauncher<S, L> {
    #[must_use]
    pub fn with_launcher(checker: Arc<UpdateChecker<S>>, launcher: L) -> Self {
        Self { checker, launcher }
    }

    /// Start the update if one is available at a local or UNC location.
    ///
    /// # Errors
    /// Returns [`UpdateError::NotSupported`] for web locations, which cannot
    /// be launched, and [`UpdateError::Io`] when the launch fails.
    pub fn launch(&self) -> Result<LaunchOutcome, UpdateError> {
        let location = self.checker.deployment().update_location();

        if let Some(location @ UpdateLocation::Web(_)) = &location {
            return Err(UpdateError::NotSupported {
                operation: "launching an update",
                location: location.to_string(),
            });
        }

        if !self.checker.is_update_available() {
            debug!("No update available, nothing to launch");
            return Ok(LaunchOutcome::Skipped);
        }

        let Some(UpdateLocation::Local(path)) = location else {
            debug!("Update location is not a local file, nothing to launch");
            return Ok(LaunchOutcome::Skipped);
        };

        info!("Launching update from {}", path.display());
        self.launcher
            .launch_detached(&path)
            .map_err(|source| UpdateError::io("failed to launch update", &path, source))?;
        Ok(LaunchOutcome::Launched)
    }

    /// Start the update and terminate the current process.
    ///
    /// Returns only when there was nothing to launch. On a successful launch
    /// the process exits immediately without running destructors or flushing
    /// buffers; persist anything that matters before calling this.
    ///
    /// # Errors
    /// See [`UpdateLauncher::launch`].
    pub fn update(&self) -> Result<(), UpdateError> {
        match self.launch()? {
            LaunchOutcome::Launched => {
                info!("Update launched, exiting");
                std::process::exit(0)
            }
            LaunchOutcome::Skipped => Ok(()),
        }
    }
}
