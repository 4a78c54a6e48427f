//! Loader for the flat `key: value` site file.
//!
//! The site file names the deployment being promoted:
//!
//! ```text
//! dbuser: admin
//! dbname: sitedb
//! awsRegion: eu-west-1
//! ```
//!
//! Each line is split on its first `:`, and both halves are trimmed. Blank
//! lines, `#` comments and unrecognised keys are skipped.

use camino::Utf8Path;
use cap_std::{ambient_authority, fs_utf8::Dir};

use crate::config::{ConfigError, PromoteConfig};
use crate::promotion::ProvisionSettings;

/// Deployment identity read from the site file.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SiteConfig {
    /// Master user name for clusters created from scratch.
    pub db_user: String,
    /// Database name; also the base cluster name and the prod identifier.
    pub db_name: String,
    /// AWS region hosting the clusters.
    pub aws_region: String,
}

#[derive(Default)]
struct PartialSite {
    db_user: Option<String>,
    db_name: Option<String>,
    aws_region: Option<String>,
}

impl SiteConfig {
    /// Reads and parses the site file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] when the file cannot be read and
    /// [`ConfigError::MissingField`] when a required key is absent or blank.
    pub fn load(path: &Utf8Path) -> Result<Self, ConfigError> {
        let content = read_site_file(path).map_err(|message| ConfigError::Read {
            path: path.to_string(),
            message,
        })?;
        Self::parse(&content)
    }

    /// Parses site-file content.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] naming the first required key
    /// that is absent or blank.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let mut partial = PartialSite::default();
        for line in content.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let Some((key, value)) = trimmed.split_once(':') else {
                continue;
            };
            let owned = value.trim().to_owned();
            match key.trim() {
                "dbuser" => partial.db_user = Some(owned),
                "dbname" => partial.db_name = Some(owned),
                "awsRegion" => partial.aws_region = Some(owned),
                other => tracing::debug!(key = other, "ignoring unknown site key"),
            }
        }

        Ok(Self {
            db_user: require(partial.db_user, "dbuser", "master user name")?,
            db_name: require(partial.db_name, "dbname", "database and cluster name")?,
            aws_region: require(partial.aws_region, "awsRegion", "AWS region")?,
        })
    }

    /// Base cluster name derived slot identifiers hang off.
    #[must_use]
    pub fn base_name(&self) -> &str {
        &self.db_name
    }

    /// Settings for resources created from scratch, combining the site
    /// identity with the tuning configuration.
    #[must_use]
    pub fn provision_settings(&self, tuning: &PromoteConfig) -> ProvisionSettings {
        ProvisionSettings {
            database_name: self.db_name.clone(),
            master_username: self.db_user.clone(),
            engine: tuning.engine.clone(),
            instance_class: tuning.instance_class.clone(),
        }
    }
}

fn require(value: Option<String>, key: &str, description: &str) -> Result<String, ConfigError> {
    match value {
        Some(found) if !found.is_empty() => Ok(found),
        _ => Err(ConfigError::MissingField(format!(
            "missing {description}: add a `{key}: <value>` line to the site file"
        ))),
    }
}

fn read_site_file(path: &Utf8Path) -> Result<String, String> {
    let file_name = path
        .file_name()
        .ok_or_else(|| format!("path has no file name: {path}"))?;
    let parent = match path.parent() {
        Some(dir) if !dir.as_str().is_empty() => dir,
        _ => Utf8Path::new("."),
    };
    let dir = Dir::open_ambient_dir(parent, ambient_authority()).map_err(|err| err.to_string())?;
    dir.read_to_string(file_name).map_err(|err| err.to_string())
}
