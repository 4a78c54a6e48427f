//! Transition table from (target, slot occupancy) to an ordered step list.

use std::fmt;

use crate::environment::Environment;
use crate::resolver::SlotExistence;
use crate::types::{ClusterId, InstanceId};

/// A single control-plane action, awaited to completion before the next.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Step {
    /// Create a fresh cluster with a newly generated master password.
    CreateCluster {
        /// Cluster to create.
        cluster: ClusterId,
    },
    /// Attach a new instance to a cluster.
    CreateInstance {
        /// Owning cluster.
        cluster: ClusterId,
        /// Instance to create.
        instance: InstanceId,
        /// Whether the instance is reachable from outside the VPC.
        publicly_accessible: bool,
    },
    /// Copy-on-write clone at the latest restorable time.
    CloneCluster {
        /// Cluster to clone.
        source: ClusterId,
        /// Identifier of the clone.
        dest: ClusterId,
    },
    /// Move a cluster to another slot's identifier.
    RenameCluster {
        /// Current identifier.
        from: ClusterId,
        /// New identifier.
        to: ClusterId,
    },
    /// Move an instance to another slot's identifier.
    RenameInstance {
        /// Current identifier.
        from: InstanceId,
        /// New identifier.
        to: InstanceId,
        /// Accessibility to apply in the same request, if any.
        publicly_accessible: Option<bool>,
    },
    /// Flip an instance's publicly-accessible flag.
    SetInstanceAccessibility {
        /// Instance to modify.
        instance: InstanceId,
        /// Desired accessibility.
        publicly_accessible: bool,
    },
    /// Replace the master password and wait for the cluster to settle.
    RotateCredential {
        /// Cluster whose password is rotated.
        cluster: ClusterId,
    },
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateCluster { cluster } => write!(f, "create cluster {cluster}"),
            Self::CreateInstance {
                instance,
                cluster,
                publicly_accessible,
            } => write!(
                f,
                "create instance {instance} in {cluster} (public: {publicly_accessible})"
            ),
            Self::CloneCluster { source, dest } => write!(f, "clone cluster {source} to {dest}"),
            Self::RenameCluster { from, to } => write!(f, "rename cluster {from} to {to}"),
            Self::RenameInstance {
                from,
                to,
                publicly_accessible: Some(public),
            } => write!(f, "rename instance {from} to {to} (public: {public})"),
            Self::RenameInstance { from, to, .. } => write!(f, "rename instance {from} to {to}"),
            Self::SetInstanceAccessibility {
                instance,
                publicly_accessible,
            } => write!(
                f,
                "set instance {instance} public access to {publicly_accessible}"
            ),
            Self::RotateCredential { cluster } => {
                write!(f, "rotate master credential of {cluster}")
            }
        }
    }
}

/// The named transitions of the promotion state machine.
///
/// Promotion to `test` or `prod` short-circuits when the slot is already
/// occupied. Promotion to `dev` never does: dev is always refreshed, so the
/// dev routes ignore whether a dev cluster already exists and rely on the
/// provider's already-exists signal to make repeated runs harmless.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Route {
    /// Prod exists: clone it into dev, attach an instance, rotate the
    /// credential.
    CloneProdIntoDev,
    /// Test exists (prod does not): move it back to dev and rotate the
    /// credential.
    RenameTestIntoDev,
    /// Nothing to copy from: create an empty dev cluster.
    CreateFreshDev,
    /// Test is absent: move dev into test and make it private.
    RenameDevIntoTest,
    /// Test is already occupied.
    TestAlreadyPresent,
    /// Prod is absent: move test into prod.
    RenameTestIntoProd,
    /// Prod is already occupied.
    ProdAlreadyPresent,
}

impl Route {
    /// Selects the transition for `target` given the slot occupancy.
    #[must_use]
    pub const fn select(target: Environment, slots: SlotExistence) -> Self {
        match target {
            Environment::Dev if slots.prod => Self::CloneProdIntoDev,
            Environment::Dev if slots.test => Self::RenameTestIntoDev,
            Environment::Dev => Self::CreateFreshDev,
            Environment::Test if slots.test => Self::TestAlreadyPresent,
            Environment::Test => Self::RenameDevIntoTest,
            Environment::Prod if slots.prod => Self::ProdAlreadyPresent,
            Environment::Prod => Self::RenameTestIntoProd,
        }
    }

    /// Returns `true` for routes that issue no control-plane calls.
    #[must_use]
    pub const fn is_noop(self) -> bool {
        matches!(self, Self::TestAlreadyPresent | Self::ProdAlreadyPresent)
    }

    /// Expands the route into concrete steps for clusters derived from
    /// `base`.
    #[must_use]
    pub fn steps(self, base: &str) -> Vec<Step> {
        let dev = Environment::Dev;
        let test = Environment::Test;
        let prod = Environment::Prod;
        match self {
            Self::CloneProdIntoDev => vec![
                Step::CloneCluster {
                    source: prod.cluster_id(base),
                    dest: dev.cluster_id(base),
                },
                Step::CreateInstance {
                    cluster: dev.cluster_id(base),
                    instance: dev.instance_id(base),
                    publicly_accessible: dev.publicly_accessible(),
                },
                Step::RotateCredential {
                    cluster: dev.cluster_id(base),
                },
            ],
            Self::RenameTestIntoDev => vec![
                Step::RenameCluster {
                    from: test.cluster_id(base),
                    to: dev.cluster_id(base),
                },
                Step::RenameInstance {
                    from: test.instance_id(base),
                    to: dev.instance_id(base),
                    publicly_accessible: Some(dev.publicly_accessible()),
                },
                Step::RotateCredential {
                    cluster: dev.cluster_id(base),
                },
            ],
            Self::CreateFreshDev => vec![
                Step::CreateCluster {
                    cluster: dev.cluster_id(base),
                },
                Step::CreateInstance {
                    cluster: dev.cluster_id(base),
                    instance: dev.instance_id(base),
                    publicly_accessible: dev.publicly_accessible(),
                },
            ],
            Self::RenameDevIntoTest => vec![
                Step::RenameCluster {
                    from: dev.cluster_id(base),
                    to: test.cluster_id(base),
                },
                Step::RenameInstance {
                    from: dev.instance_id(base),
                    to: test.instance_id(base),
                    publicly_accessible: None,
                },
                Step::SetInstanceAccessibility {
                    instance: test.instance_id(base),
                    publicly_accessible: test.publicly_accessible(),
                },
            ],
            Self::RenameTestIntoProd => vec![
                Step::RenameCluster {
                    from: test.cluster_id(base),
                    to: prod.cluster_id(base),
                },
                Step::RenameInstance {
                    from: test.instance_id(base),
                    to: prod.instance_id(base),
                    publicly_accessible: None,
                },
            ],
            Self::TestAlreadyPresent | Self::ProdAlreadyPresent => Vec::new(),
        }
    }
}

/// The route and steps chosen for one run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Plan {
    /// Target slot.
    pub target: Environment,
    /// Selected transition.
    pub route: Route,
    /// Ordered steps; empty for no-op routes.
    pub steps: Vec<Step>,
}

impl Plan {
    /// Plans a promotion. Pure: identical inputs yield identical plans.
    #[must_use]
    pub fn new(target: Environment, slots: SlotExistence, base: &str) -> Self {
        let route = Route::select(target, slots);
        Self {
            target,
            route,
            steps: route.steps(base),
        }
    }

    /// Returns `true` when nothing needs to change.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.steps.is_empty()
    }
}
