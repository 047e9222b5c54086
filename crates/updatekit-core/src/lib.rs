//! Update discovery and launch for network-deployed applications.
//!
//! This crate holds the logic that is independent of any front end:
//! - Deployment variables published by the launcher.
//! - Manifest parsing and version comparison.
//! - One-shot and periodic update checks.
//! - Launching the update and handing control over to it.

mod checker;
mod deployment;
mod error;
mod launcher;
mod location;
mod manifest;
mod scheduler;
mod version;

/// Update check service and its recorded state.
pub use checker::{UpdateChecker, UpdateState};
/// Deployment variable accessors.
pub use deployment::{ApplicationDeployment, DEFAULT_VARIABLE_PREFIX, DeploymentError};
/// Error taxonomy shared by checks and launches.
pub use error::{NetworkError, UpdateError};
/// Update launch service.
pub use launcher::{LaunchOutcome, ProcessLauncher, ShellLauncher, UpdateLauncher};
/// Update location classification.
pub use location::UpdateLocation;
/// Manifest reader.
pub use manifest::{
    ASM_V1_NAMESPACE, ManifestError, manifest_version_from_bytes, read_manifest_version,
};
/// Periodic checks and their notifications.
pub use scheduler::{
    DEFAULT_CHECK_INTERVAL, MIN_CHECK_INTERVAL, SchedulerState, UpdateAvailable, UpdateScheduler,
};
/// Deployment version type.
pub use version::{Version, VersionParseError};

pub use tokio_util::sync::CancellationToken;
pub use updatekit_platform::{ProcessEnvironment, VariableSource};
