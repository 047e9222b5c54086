//! Deployment information published by the launcher.
//!
//! Every accessor reads its variable again; nothing is cached, so values that
//! the host environment changes are picked up on the next access.

use std::path::PathBuf;

use chrono::{DateTime, NaiveDateTime, Utc};
use reqwest::Url;
use thiserror::Error;
use updatekit_platform::{ProcessEnvironment, VariableSource};

use crate::location::UpdateLocation;
use crate::version::{Version, VersionParseError};

pub const DEFAULT_VARIABLE_PREFIX: &str = "ClickOnce_";

const IS_NETWORK_DEPLOYED: &str = "IsNetworkDeployed";
const ACTIVATION_URI: &str = "ActivationUri";
const CURRENT_VERSION: &str = "CurrentVersion";
const DATA_DIRECTORY: &str = "DataDirectory";
const IS_FIRST_RUN: &str = "IsFirstRun";
const TIME_OF_LAST_UPDATE_CHECK: &str = "TimeOfLastUpdateCheck";
const UPDATED_APPLICATION_FULL_NAME: &str = "UpdatedApplicationFullName";
const UPDATED_VERSION: &str = "UpdatedVersion";
const UPDATE_LOCATION: &str = "UpdateLocation";
const LAUNCHER_VERSION: &str = "LauncherVersion";
const ACTIVATION_DATA: &str = "ActivationData";

const NAIVE_TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeploymentError {
    #[error("deployment variable {key} is not set")]
    MissingVariable { key: String },
    #[error("deployment variable {key} holds an invalid version: {source}")]
    InvalidVersion {
        key: String,
        #[source]
        source: VersionParseError,
    },
    #[error("deployment variable {key} holds an invalid value '{value}': expected {expected}")]
    InvalidValue {
        key: String,
        value: String,
        expected: &'static str,
    },
}

/// Read-only view of the deployment variables of a network-deployed
/// application.
#[derive(Debug, Clone)]
pub struct ApplicationDeployment<S = ProcessEnvironment> {
    source: S,
    prefix: String,
}

impl ApplicationDeployment<ProcessEnvironment> {
    /// Deployment information from the process environment, if the process
    /// was network deployed.
    #[must_use]
    pub fn from_process_env() -> Option<Self> {
        Self::detect(ProcessEnvironment)
    }
}

impl<S: VariableSource> ApplicationDeployment<S> {
    /// Returns `None` unless the source reports `IsNetworkDeployed=true`.
    #[must_use]
    pub fn detect(source: S) -> Option<Self> {
        Self::detect_with_prefix(source, DEFAULT_VARIABLE_PREFIX)
    }

    #[must_use]
    pub fn detect_with_prefix(source: S, prefix: impl Into<String>) -> Option<Self> {
        let deployment = Self {
            source,
            prefix: prefix.into(),
        };
        deployment
            .is_network_deployed()
            .then_some(deployment)
    }

    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    #[must_use]
    pub fn is_network_deployed(&self) -> bool {
        matches!(self.flag(IS_NETWORK_DEPLOYED), Ok(true))
    }

    /// # Errors
    /// Returns an error when the variable is missing or not a valid version.
    pub fn current_version(&self) -> Result<Version, DeploymentError> {
        self.optional_version(CURRENT_VERSION)?
            .ok_or_else(|| DeploymentError::MissingVariable {
                key: self.key(CURRENT_VERSION),
            })
    }

    /// The raw update location as configured, before classification.
    #[must_use]
    pub fn update_location_raw(&self) -> Option<String> {
        self.var(UPDATE_LOCATION)
    }

    /// The classified update location, or `None` when it is not configured
    /// or not an absolute URI.
    #[must_use]
    pub fn update_location(&self) -> Option<UpdateLocation> {
        self.update_location_raw()
            .and_then(|raw| UpdateLocation::classify(&raw))
    }

    /// # Errors
    /// Returns an error when the variable is set but not an absolute URI.
    pub fn activation_uri(&self) -> Result<Option<Url>, DeploymentError> {
        self.var(ACTIVATION_URI)
            .map(|value| {
                Url::parse(&value).map_err(|_| self.invalid(ACTIVATION_URI, value, "an absolute URI"))
            })
            .transpose()
    }

    #[must_use]
    pub fn data_directory(&self) -> Option<PathBuf> {
        self.var(DATA_DIRECTORY).map(PathBuf::from)
    }

    /// # Errors
    /// Returns an error when the variable is set but not a boolean.
    pub fn is_first_run(&self) -> Result<bool, DeploymentError> {
        self.flag(IS_FIRST_RUN)
    }

    /// # Errors
    /// Returns an error when the variable is set but not a recognized
    /// timestamp.
    pub fn time_of_last_update_check(&self) -> Result<Option<DateTime<Utc>>, DeploymentError> {
        self.var(TIME_OF_LAST_UPDATE_CHECK)
            .map(|value| {
                parse_timestamp(&value)
                    .ok_or_else(|| self.invalid(TIME_OF_LAST_UPDATE_CHECK, value, "a timestamp"))
            })
            .transpose()
    }

    #[must_use]
    pub fn updated_application_full_name(&self) -> Option<String> {
        self.var(UPDATED_APPLICATION_FULL_NAME)
    }

    /// # Errors
    /// Returns an error when the variable is set but not a valid version.
    pub fn updated_version(&self) -> Result<Option<Version>, DeploymentError> {
        self.optional_version(UPDATED_VERSION)
    }

    /// # Errors
    /// Returns an error when the variable is set but not a valid version.
    pub fn launcher_version(&self) -> Result<Option<Version>, DeploymentError> {
        self.optional_version(LAUNCHER_VERSION)
    }

    /// Activation arguments in launch order. Entries missing below the
    /// published count are returned as empty strings.
    ///
    /// # Errors
    /// Returns an error when the count is set but not a non-negative integer.
    pub fn activation_data(&self) -> Result<Vec<String>, DeploymentError> {
        let count_name = format!("{ACTIVATION_DATA}_Count");
        let Some(raw_count) = self.var(&count_name) else {
            return Ok(Vec::new());
        };
        let count = raw_count
            .trim()
            .parse::<usize>()
            .map_err(|_| self.invalid(&count_name, raw_count, "a non-negative integer"))?;

        Ok((0..count)
            .map(|index| {
                self.var(&format!("{ACTIVATION_DATA}_{index}"))
                    .unwrap_or_default()
            })
            .collect())
    }

    fn key(&self, name: &str) -> String {
        format!("{}{name}", self.prefix)
    }

    fn var(&self, name: &str) -> Option<String> {
        self.source.var(&self.key(name))
    }

    fn flag(&self, name: &str) -> Result<bool, DeploymentError> {
        match self.var(name) {
            None => Ok(false),
            Some(value) if value.trim().eq_ignore_ascii_case("true") => Ok(true),
            Some(value) if value.trim().eq_ignore_ascii_case("false") => Ok(false),
            Some(value) => Err(self.invalid(name, value, "true or false")),
        }
    }

    fn optional_version(&self, name: &str) -> Result<Option<Version>, DeploymentError> {
        self.var(name)
            .map(|value| {
                Version::parse(value.trim()).map_err(|source| DeploymentError::InvalidVersion {
                    key: self.key(name),
                    source,
                })
            })
            .transpose()
    }

    fn invalid(&self, name: &str, value: String, expected: &'static str) -> DeploymentError {
        DeploymentError::InvalidValue {
            key: self.key(name),
            value,
            expected,
        }
    }
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }

    NAIVE_TIMESTAMP_FORMATS.iter().find_map(|format| {
        NaiveDateTime::parse_from_str(value, format)
            .ok()
            .map(|naive| naive.and_utc())
    })
}
