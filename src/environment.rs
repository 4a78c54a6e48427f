//! Environment slots and their mapping onto provider identifiers.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::types::{ClusterId, InstanceId};

/// One of the three named positions a cluster can occupy.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Environment {
    /// Publicly reachable working copy, refreshed on every promotion to dev.
    Dev,
    /// Private staging copy.
    Test,
    /// Canonical production cluster, named after the bare base name.
    Prod,
}

impl Environment {
    /// All slots in resolution order.
    pub const ALL: [Self; 3] = [Self::Dev, Self::Test, Self::Prod];

    /// Lowercase slot name as accepted on the command line.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dev => "dev",
            Self::Test => "test",
            Self::Prod => "prod",
        }
    }

    /// Cluster identifier occupying this slot for the given base name.
    ///
    /// Production uses the bare base name; the other slots append their
    /// slot name (`sitedb-test`, `sitedb-dev`).
    #[must_use]
    pub fn cluster_id(self, base: &str) -> ClusterId {
        match self {
            Self::Prod => ClusterId::new(base),
            Self::Dev | Self::Test => ClusterId::new(format!("{base}-{}", self.as_str())),
        }
    }

    /// Instance identifier occupying this slot; mirrors [`Self::cluster_id`].
    #[must_use]
    pub fn instance_id(self, base: &str) -> InstanceId {
        InstanceId::from(&self.cluster_id(base))
    }

    /// Whether instances in this slot are reachable from outside the
    /// private network.
    #[must_use]
    pub const fn publicly_accessible(self) -> bool {
        matches!(self, Self::Dev)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when a slot name is not one of `dev`, `test` or `prod`.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("unknown environment '{0}': expected dev, test, or prod")]
pub struct ParseEnvironmentError(pub String);

impl FromStr for Environment {
    type Err = ParseEnvironmentError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "dev" => Ok(Self::Dev),
            "test" => Ok(Self::Test),
            "prod" => Ok(Self::Prod),
            _ => Err(ParseEnvironmentError(value.to_owned())),
        }
    }
}
