//! Slot occupancy lookups.

use thiserror::Error;

use crate::control_plane::{ClassifyFault, ControlPlane};
use crate::environment::Environment;
use crate::types::ClusterId;

/// Whether a slot currently holds a cluster.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SlotState {
    /// The provider reported the slot's cluster as not found.
    Absent,
    /// A cluster occupies the slot.
    Present {
        /// Writer endpoint reported by the provider (may be empty while the
        /// cluster is still being created).
        endpoint: String,
    },
}

impl SlotState {
    /// Returns `true` when a cluster occupies the slot.
    #[must_use]
    pub const fn exists(&self) -> bool {
        matches!(self, Self::Present { .. })
    }

    /// Endpoint of the occupying cluster, or an empty string.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        match self {
            Self::Absent => "",
            Self::Present { endpoint } => endpoint,
        }
    }
}

/// Occupancy of all three slots, taken once at the start of a run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SlotSnapshot {
    /// State of the dev slot.
    pub dev: SlotState,
    /// State of the test slot.
    pub test: SlotState,
    /// State of the prod slot.
    pub prod: SlotState,
}

impl SlotSnapshot {
    /// State of the given slot.
    #[must_use]
    pub const fn slot(&self, env: Environment) -> &SlotState {
        match env {
            Environment::Dev => &self.dev,
            Environment::Test => &self.test,
            Environment::Prod => &self.prod,
        }
    }

    /// Existence flags only, in `(dev, test, prod)` order.
    #[must_use]
    pub const fn existence(&self) -> SlotExistence {
        SlotExistence {
            dev: self.dev.exists(),
            test: self.test.exists(),
            prod: self.prod.exists(),
        }
    }
}

/// Existence flags the planner decides on.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct SlotExistence {
    /// A cluster occupies the dev slot.
    pub dev: bool,
    /// A cluster occupies the test slot.
    pub test: bool,
    /// A cluster occupies the prod slot.
    pub prod: bool,
}

/// Raised when a slot lookup fails for any reason other than not-found.
#[derive(Debug, Error)]
#[error("could not determine whether {slot} slot ({cluster}) exists: {source}")]
pub struct ResolveError<E>
where
    E: std::error::Error + 'static,
{
    /// Slot being resolved.
    pub slot: Environment,
    /// Cluster identifier queried.
    pub cluster: ClusterId,
    /// Provider error.
    #[source]
    pub source: E,
}

/// Answers "does this slot hold a cluster?" against a control plane.
#[derive(Debug)]
pub struct EnvironmentResolver<'a, P> {
    plane: &'a P,
    base: &'a str,
}

impl<'a, P> EnvironmentResolver<'a, P>
where
    P: ControlPlane,
{
    /// Creates a resolver for clusters derived from `base`.
    #[must_use]
    pub const fn new(plane: &'a P, base: &'a str) -> Self {
        Self { plane, base }
    }

    /// Resolves a single slot.
    ///
    /// Not-found is the expected way of learning a slot is empty; every
    /// other provider error is returned rather than guessed at.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] when the provider fails with anything other
    /// than not-found.
    pub async fn exists(&self, slot: Environment) -> Result<SlotState, ResolveError<P::Error>> {
        let cluster = slot.cluster_id(self.base);
        match self.plane.describe_cluster(&cluster).await {
            Ok(status) => {
                tracing::debug!(%slot, %cluster, endpoint = %status.endpoint, "slot occupied");
                Ok(SlotState::Present {
                    endpoint: status.endpoint,
                })
            }
            Err(err) if err.is_not_found() => {
                tracing::debug!(%slot, %cluster, "slot empty");
                Ok(SlotState::Absent)
            }
            Err(source) => Err(ResolveError {
                slot,
                cluster,
                source,
            }),
        }
    }

    /// Resolves dev, test and prod, in that order.
    ///
    /// # Errors
    ///
    /// Returns the first [`ResolveError`] encountered.
    pub async fn snapshot(&self) -> Result<SlotSnapshot, ResolveError<P::Error>> {
        Ok(SlotSnapshot {
            dev: self.exists(Environment::Dev).await?,
            test: self.exists(Environment::Test).await?,
            prod: self.exists(Environment::Prod).await?,
        })
    }
}
