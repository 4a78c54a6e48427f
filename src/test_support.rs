//! Test support utilities shared across unit and integration tests.
//!
//! [`FakeControlPlane`] models a tiny provider: clusters and instances keyed
//! by identifier, mutations applied instantly, and scripted lag so the wait
//! paths (pending statuses, renamed identifiers that are not visible yet)
//! can be exercised deterministically.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};

use thiserror::Error;

use crate::control_plane::{
    ClassifyFault, ClusterSpec, ClusterStatus, ControlPlane, ControlPlaneFuture, InstanceSpec,
    InstanceStatus, ProviderFault,
};
use crate::credential::{Credential, CredentialError, CredentialGenerator};
use crate::types::{ClusterId, InstanceId};
use crate::waiter::AVAILABLE;

/// A control-plane call recorded by [`FakeControlPlane`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Call {
    /// `create_cluster`.
    CreateCluster(ClusterId),
    /// `create_instance`.
    CreateInstance {
        /// Owning cluster.
        cluster: ClusterId,
        /// New instance.
        instance: InstanceId,
        /// Requested accessibility.
        public: bool,
    },
    /// `clone_cluster_point_in_time`.
    CloneCluster {
        /// Source cluster.
        source: ClusterId,
        /// Destination cluster.
        dest: ClusterId,
    },
    /// `rename_cluster`.
    RenameCluster {
        /// Old identifier.
        from: ClusterId,
        /// New identifier.
        to: ClusterId,
    },
    /// `rename_instance`.
    RenameInstance {
        /// Old identifier.
        from: InstanceId,
        /// New identifier.
        to: InstanceId,
        /// Accessibility change requested with the rename.
        public: Option<bool>,
    },
    /// `modify_instance_accessibility`.
    ModifyInstanceAccessibility {
        /// Instance identifier.
        id: InstanceId,
        /// Requested accessibility.
        public: bool,
    },
    /// `modify_cluster_password`.
    ModifyClusterPassword(ClusterId),
    /// `describe_cluster`.
    DescribeCluster(ClusterId),
    /// `describe_instance`.
    DescribeInstance(InstanceId),
}

impl Call {
    /// Returns `true` for calls that change provider state.
    #[must_use]
    pub const fn is_mutating(&self) -> bool {
        !matches!(self, Self::DescribeCluster(_) | Self::DescribeInstance(_))
    }

    /// Short operation name used to inject failures.
    #[must_use]
    pub const fn operation(&self) -> &'static str {
        match self {
            Self::CreateCluster(_) => "create_cluster",
            Self::CreateInstance { .. } => "create_instance",
            Self::CloneCluster { .. } => "clone_cluster",
            Self::RenameCluster { .. } => "rename_cluster",
            Self::RenameInstance { .. } => "rename_instance",
            Self::ModifyInstanceAccessibility { .. } => "modify_instance_accessibility",
            Self::ModifyClusterPassword(_) => "modify_cluster_password",
            Self::DescribeCluster(_) => "describe_cluster",
            Self::DescribeInstance(_) => "describe_instance",
        }
    }
}

/// Errors produced by [`FakeControlPlane`].
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum FakeControlPlaneError {
    /// The addressed resource does not exist.
    #[error("{0} not found")]
    NotFound(String),
    /// The target identifier is already taken.
    #[error("{0} already exists")]
    AlreadyExists(String),
    /// A failure injected by the test.
    #[error("injected failure in {0}")]
    Injected(String),
}

impl ClassifyFault for FakeControlPlaneError {
    fn fault(&self) -> ProviderFault {
        match self {
            Self::NotFound(_) => ProviderFault::NotFound,
            Self::AlreadyExists(_) => ProviderFault::AlreadyExists,
            Self::Injected(_) => ProviderFault::Other,
        }
    }
}

#[derive(Clone, Debug)]
struct FakeResource {
    pending_polls: u32,
    hidden_polls: u32,
    public: bool,
    password: Option<String>,
    terminal_status: Option<String>,
}

impl FakeResource {
    const fn settled(public: bool) -> Self {
        Self {
            pending_polls: 0,
            hidden_polls: 0,
            public,
            password: None,
            terminal_status: None,
        }
    }
}

#[derive(Debug, Default)]
struct State {
    clusters: BTreeMap<String, FakeResource>,
    instances: BTreeMap<String, FakeResource>,
    calls: Vec<Call>,
    failing: BTreeSet<String>,
    settle_polls: u32,
    rename_lag: u32,
}

impl State {
    fn mutated(&self, public: bool) -> FakeResource {
        FakeResource {
            pending_polls: self.settle_polls,
            ..FakeResource::settled(public)
        }
    }

    fn check_injected(&self, call: &Call) -> Result<(), FakeControlPlaneError> {
        if self.failing.contains(call.operation()) {
            return Err(FakeControlPlaneError::Injected(call.operation().to_owned()));
        }
        Ok(())
    }
}

/// In-memory control plane that records every call.
#[derive(Clone, Debug, Default)]
pub struct FakeControlPlane {
    state: Arc<Mutex<State>>,
}

impl FakeControlPlane {
    /// Creates an empty provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Seeds a settled cluster and its instance under `id`.
    pub fn seed(&self, id: &ClusterId, public: bool) {
        let mut state = self.state();
        state
            .clusters
            .insert(id.to_string(), FakeResource::settled(public));
        state
            .instances
            .insert(id.to_string(), FakeResource::settled(public));
    }

    /// Number of non-`available` polls reported after each mutation.
    pub fn set_settle_polls(&self, polls: u32) {
        self.state().settle_polls = polls;
    }

    /// Number of not-found responses returned for a freshly renamed
    /// identifier.
    pub fn set_rename_lag(&self, polls: u32) {
        self.state().rename_lag = polls;
    }

    /// Makes every call of the named operation fail with an unclassified
    /// error (see [`Call::operation`]).
    pub fn fail_operation(&self, operation: &str) {
        self.state().failing.insert(operation.to_owned());
    }

    /// Forces the named cluster to report `status` on every describe.
    pub fn set_cluster_terminal_status(&self, id: &ClusterId, status: &str) {
        if let Some(cluster) = self.state().clusters.get_mut(id.as_str()) {
            cluster.terminal_status = Some(status.to_owned());
        }
    }

    /// All calls recorded so far.
    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    /// Recorded calls that change provider state.
    #[must_use]
    pub fn mutating_calls(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_mutating).collect()
    }

    /// Whether a cluster with this identifier currently exists.
    #[must_use]
    pub fn has_cluster(&self, id: &ClusterId) -> bool {
        self.state().clusters.contains_key(id.as_str())
    }

    /// Whether the instance is currently publicly accessible.
    #[must_use]
    pub fn instance_is_public(&self, id: &InstanceId) -> Option<bool> {
        self.state()
            .instances
            .get(id.as_str())
            .map(|instance| instance.public)
    }

    /// Master password last applied to the cluster.
    #[must_use]
    pub fn cluster_password(&self, id: &ClusterId) -> Option<String> {
        self.state()
            .clusters
            .get(id.as_str())
            .and_then(|cluster| cluster.password.clone())
    }

    fn record(&self, call: Call) -> Result<MutexGuard<'_, State>, FakeControlPlaneError> {
        let mut state = self.state();
        state.calls.push(call.clone());
        state.check_injected(&call)?;
        Ok(state)
    }

    fn cluster_view(id: &ClusterId, resource: &FakeResource) -> ClusterStatus {
        ClusterStatus {
            id: id.clone(),
            status: resource_status(resource),
            endpoint: format!("{id}.cluster-fake.local"),
            engine: String::from("aurora-mysql"),
        }
    }

    fn instance_view(id: &InstanceId, resource: &FakeResource) -> InstanceStatus {
        InstanceStatus {
            id: id.clone(),
            cluster_id: Some(ClusterId::new(id.as_str())),
            status: resource_status(resource),
            publicly_accessible: resource.public,
        }
    }
}

fn resource_status(resource: &FakeResource) -> String {
    if let Some(status) = &resource.terminal_status {
        return status.clone();
    }
    if resource.pending_polls > 0 {
        String::from("modifying")
    } else {
        String::from(AVAILABLE)
    }
}

fn observe(resource: &mut FakeResource, id: &str) -> Result<(), FakeControlPlaneError> {
    if resource.hidden_polls > 0 {
        resource.hidden_polls -= 1;
        return Err(FakeControlPlaneError::NotFound(id.to_owned()));
    }
    Ok(())
}

fn settle(resource: &mut FakeResource) {
    resource.pending_polls = resource.pending_polls.saturating_sub(1);
}

impl ControlPlane for FakeControlPlane {
    type Error = FakeControlPlaneError;

    fn create_cluster<'a>(
        &'a self,
        spec: &'a ClusterSpec,
    ) -> ControlPlaneFuture<'a, ClusterStatus, Self::Error> {
        Box::pin(async move {
            let mut state = self.record(Call::CreateCluster(spec.id.clone()))?;
            if state.clusters.contains_key(spec.id.as_str()) {
                return Err(FakeControlPlaneError::AlreadyExists(spec.id.to_string()));
            }
            let mut cluster = state.mutated(false);
            cluster.password = Some(spec.master_password.expose().to_owned());
            let view = Self::cluster_view(&spec.id, &cluster);
            state.clusters.insert(spec.id.to_string(), cluster);
            Ok(view)
        })
    }

    fn create_instance<'a>(
        &'a self,
        spec: &'a InstanceSpec,
    ) -> ControlPlaneFuture<'a, InstanceStatus, Self::Error> {
        Box::pin(async move {
            let mut state = self.record(Call::CreateInstance {
                cluster: spec.cluster_id.clone(),
                instance: spec.instance_id.clone(),
                public: spec.publicly_accessible,
            })?;
            if !state.clusters.contains_key(spec.cluster_id.as_str()) {
                return Err(FakeControlPlaneError::NotFound(spec.cluster_id.to_string()));
            }
            if state.instances.contains_key(spec.instance_id.as_str()) {
                return Err(FakeControlPlaneError::AlreadyExists(
                    spec.instance_id.to_string(),
                ));
            }
            let instance = state.mutated(spec.publicly_accessible);
            let view = Self::instance_view(&spec.instance_id, &instance);
            state.instances.insert(spec.instance_id.to_string(), instance);
            Ok(view)
        })
    }

    fn clone_cluster_point_in_time<'a>(
        &'a self,
        source: &'a ClusterId,
        dest: &'a ClusterId,
    ) -> ControlPlaneFuture<'a, ClusterStatus, Self::Error> {
        Box::pin(async move {
            let mut state = self.record(Call::CloneCluster {
                source: source.clone(),
                dest: dest.clone(),
            })?;
            let Some(origin) = state.clusters.get(source.as_str()).cloned() else {
                return Err(FakeControlPlaneError::NotFound(source.to_string()));
            };
            if state.clusters.contains_key(dest.as_str()) {
                return Err(FakeControlPlaneError::AlreadyExists(dest.to_string()));
            }
            let clone = FakeResource {
                password: origin.password,
                ..state.mutated(false)
            };
            let view = Self::cluster_view(dest, &clone);
            state.clusters.insert(dest.to_string(), clone);
            Ok(view)
        })
    }

    fn rename_cluster<'a>(
        &'a self,
        old: &'a ClusterId,
        new: &'a ClusterId,
    ) -> ControlPlaneFuture<'a, ClusterStatus, Self::Error> {
        Box::pin(async move {
            let mut state = self.record(Call::RenameCluster {
                from: old.clone(),
                to: new.clone(),
            })?;
            if state.clusters.contains_key(new.as_str()) {
                return Err(FakeControlPlaneError::AlreadyExists(new.to_string()));
            }
            let Some(existing) = state.clusters.remove(old.as_str()) else {
                return Err(FakeControlPlaneError::NotFound(old.to_string()));
            };
            let renamed = FakeResource {
                hidden_polls: state.rename_lag,
                password: existing.password,
                ..state.mutated(existing.public)
            };
            let view = Self::cluster_view(old, &renamed);
            state.clusters.insert(new.to_string(), renamed);
            Ok(view)
        })
    }

    fn rename_instance<'a>(
        &'a self,
        old: &'a InstanceId,
        new: &'a InstanceId,
        publicly_accessible: Option<bool>,
    ) -> ControlPlaneFuture<'a, InstanceStatus, Self::Error> {
        Box::pin(async move {
            let mut state = self.record(Call::RenameInstance {
                from: old.clone(),
                to: new.clone(),
                public: publicly_accessible,
            })?;
            if state.instances.contains_key(new.as_str()) {
                return Err(FakeControlPlaneError::AlreadyExists(new.to_string()));
            }
            let Some(existing) = state.instances.remove(old.as_str()) else {
                return Err(FakeControlPlaneError::NotFound(old.to_string()));
            };
            let renamed = FakeResource {
                hidden_polls: state.rename_lag,
                ..state.mutated(publicly_accessible.unwrap_or(existing.public))
            };
            let view = Self::instance_view(old, &renamed);
            state.instances.insert(new.to_string(), renamed);
            Ok(view)
        })
    }

    fn modify_instance_accessibility<'a>(
        &'a self,
        id: &'a InstanceId,
        publicly_accessible: bool,
    ) -> ControlPlaneFuture<'a, InstanceStatus, Self::Error> {
        Box::pin(async move {
            let mut state = self.record(Call::ModifyInstanceAccessibility {
                id: id.clone(),
                public: publicly_accessible,
            })?;
            let pending = state.settle_polls;
            let Some(instance) = state.instances.get_mut(id.as_str()) else {
                return Err(FakeControlPlaneError::NotFound(id.to_string()));
            };
            instance.public = publicly_accessible;
            instance.pending_polls = pending;
            Ok(Self::instance_view(id, instance))
        })
    }

    fn modify_cluster_password<'a>(
        &'a self,
        id: &'a ClusterId,
        password: &'a Credential,
    ) -> ControlPlaneFuture<'a, ClusterStatus, Self::Error> {
        Box::pin(async move {
            let mut state = self.record(Call::ModifyClusterPassword(id.clone()))?;
            let pending = state.settle_polls;
            let Some(cluster) = state.clusters.get_mut(id.as_str()) else {
                return Err(FakeControlPlaneError::NotFound(id.to_string()));
            };
            cluster.password = Some(password.expose().to_owned());
            cluster.pending_polls = pending;
            Ok(Self::cluster_view(id, cluster))
        })
    }

    fn describe_cluster<'a>(
        &'a self,
        id: &'a ClusterId,
    ) -> ControlPlaneFuture<'a, ClusterStatus, Self::Error> {
        Box::pin(async move {
            let mut state = self.record(Call::DescribeCluster(id.clone()))?;
            let Some(cluster) = state.clusters.get_mut(id.as_str()) else {
                return Err(FakeControlPlaneError::NotFound(id.to_string()));
            };
            observe(cluster, id.as_str())?;
            let view = Self::cluster_view(id, cluster);
            settle(cluster);
            Ok(view)
        })
    }

    fn describe_instance<'a>(
        &'a self,
        id: &'a InstanceId,
    ) -> ControlPlaneFuture<'a, InstanceStatus, Self::Error> {
        Box::pin(async move {
            let mut state = self.record(Call::DescribeInstance(id.clone()))?;
            let Some(instance) = state.instances.get_mut(id.as_str()) else {
                return Err(FakeControlPlaneError::NotFound(id.to_string()));
            };
            observe(instance, id.as_str())?;
            let view = Self::instance_view(id, instance);
            settle(instance);
            Ok(view)
        })
    }
}

/// Credential generator that always returns the same secret.
#[derive(Clone, Debug)]
pub struct FixedCredentialGenerator {
    secret: Option<String>,
}

impl FixedCredentialGenerator {
    /// Generator returning `secret` on every call.
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: Some(secret.into()),
        }
    }

    /// Generator that always fails.
    #[must_use]
    pub const fn failing() -> Self {
        Self { secret: None }
    }
}

impl CredentialGenerator for FixedCredentialGenerator {
    fn generate(&self) -> Result<Credential, CredentialError> {
        self.secret
            .as_ref()
            .map(|secret| Credential::new(secret.clone()))
            .ok_or_else(|| CredentialError::Generation(String::from("generator disabled")))
    }
}
