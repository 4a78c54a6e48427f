//! Tuning configuration loaded via `ortho-config`.
//!
//! The site file names *what* to promote; this layer controls *how*: wait
//! timings, retry bounds, and the engine and instance class used when the
//! workflow has to create resources from scratch.

use std::ffi::OsString;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

use crate::control_plane::{DEFAULT_ENGINE, DEFAULT_INSTANCE_CLASS};
use crate::waiter::WaitPolicy;

/// Timing and provisioning settings merged from defaults, `rds-promote.toml`
/// and `RDS_PROMOTE_*` environment variables.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(
    prefix = "RDS_PROMOTE",
    discovery(
        app_name = "rds-promote",
        env_var = "RDS_PROMOTE_CONFIG_PATH",
        config_file_name = "rds-promote.toml",
        dotfile_name = ".rds-promote.toml",
        project_file_name = "rds-promote.toml"
    )
)]
pub struct PromoteConfig {
    /// Seconds between status checks.
    #[ortho_config(default = 10)]
    pub poll_interval_secs: u64,
    /// Seconds to wait after a rename before the first status check.
    #[ortho_config(default = 40)]
    pub rename_settle_secs: u64,
    /// Seconds between checks while a renamed identifier is not visible.
    #[ortho_config(default = 2)]
    pub not_found_retry_secs: u64,
    /// Not-found responses tolerated while waiting on a rename.
    #[ortho_config(default = 30)]
    pub max_not_found_retries: u32,
    /// Upper bound on any single wait, in seconds.
    #[ortho_config(default = 1800)]
    pub wait_timeout_secs: u64,
    /// Engine for newly created clusters and instances.
    #[ortho_config(default = DEFAULT_ENGINE.to_owned())]
    pub engine: String,
    /// Compute class for newly created instances.
    #[ortho_config(default = DEFAULT_INSTANCE_CLASS.to_owned())]
    pub instance_class: String,
}

impl Default for PromoteConfig {
    fn default() -> Self {
        let policy = WaitPolicy::default();
        Self {
            poll_interval_secs: policy.poll_interval.as_secs(),
            rename_settle_secs: policy.rename_settle_delay.as_secs(),
            not_found_retry_secs: policy.not_found_retry_interval.as_secs(),
            max_not_found_retries: policy.max_not_found_retries,
            wait_timeout_secs: policy.timeout.as_secs(),
            engine: DEFAULT_ENGINE.to_owned(),
            instance_class: DEFAULT_INSTANCE_CLASS.to_owned(),
        }
    }
}

impl PromoteConfig {
    /// Loads configuration without attempting to parse CLI arguments. Values
    /// merge defaults, configuration files, and environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the merge fails.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([OsString::from("rds-promote")])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Rejects zero intervals and blank provisioning values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the offending setting and how
    /// to override it.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_positive(self.poll_interval_secs, "poll_interval_secs")?;
        require_positive(self.not_found_retry_secs, "not_found_retry_secs")?;
        require_positive(self.wait_timeout_secs, "wait_timeout_secs")?;
        require_present(&self.engine, "engine")?;
        require_present(&self.instance_class, "instance_class")?;
        Ok(())
    }

    /// Wait policy built from the configured timings.
    #[must_use]
    pub const fn wait_policy(&self) -> WaitPolicy {
        WaitPolicy {
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            rename_settle_delay: Duration::from_secs(self.rename_settle_secs),
            not_found_retry_interval: Duration::from_secs(self.not_found_retry_secs),
            max_not_found_retries: self.max_not_found_retries,
            timeout: Duration::from_secs(self.wait_timeout_secs),
        }
    }
}

fn env_var_for(key: &str) -> String {
    format!("RDS_PROMOTE_{}", key.to_ascii_uppercase())
}

fn require_positive(value: u64, key: &str) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::Invalid(format!(
            "{key} must be greater than zero: set {} or {key} in rds-promote.toml",
            env_var_for(key)
        )));
    }
    Ok(())
}

fn require_present(value: &str, key: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Invalid(format!(
            "{key} must not be empty: set {} or {key} in rds-promote.toml",
            env_var_for(key)
        )));
    }
    Ok(())
}

/// Errors raised during configuration loading and validation.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Indicates a required setting is missing from the site file.
    #[error("missing configuration field: {0}")]
    MissingField(String),
    /// Indicates a setting holds an unusable value.
    #[error("invalid configuration: {0}")]
    Invalid(String),
    /// Indicates the site file could not be read.
    #[error("failed to read {path}: {message}")]
    Read {
        /// Path of the file.
        path: String,
        /// Underlying I/O error message.
        message: String,
    },
    /// Surfaces errors from the `ortho-config` loader.
    #[error("configuration parsing failed: {0}")]
    Parse(String),
}
