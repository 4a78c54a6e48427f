//! Control-plane abstraction for managed database clusters and instances.
//!
//! Every mutating call returns the provider's initial status for the
//! resource. That status is never terminal; callers pair each call with the
//! [`crate::waiter::Waiter`] before acting on the result.

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

use crate::credential::Credential;
use crate::types::{ClusterId, InstanceId};

/// Engine requested for new clusters unless configured otherwise.
pub const DEFAULT_ENGINE: &str = "aurora-mysql";
/// Instance class requested for new instances unless configured otherwise.
pub const DEFAULT_INSTANCE_CLASS: &str = "db.t3.small";

/// Parameters required to create a new cluster.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClusterSpec {
    /// Identifier of the new cluster.
    pub id: ClusterId,
    /// Name of the initial database.
    pub database_name: String,
    /// Master user name.
    pub master_username: String,
    /// Master user password.
    pub master_password: Credential,
    /// Database engine (for example `aurora-mysql`).
    pub engine: String,
}

impl ClusterSpec {
    /// Starts a builder for a [`ClusterSpec`].
    #[must_use]
    pub fn builder() -> ClusterSpecBuilder {
        ClusterSpecBuilder::default()
    }

    /// Validates the spec, returning the name of the first empty field.
    ///
    /// # Errors
    ///
    /// Returns [`SpecError::Validation`] when any string field is empty.
    pub fn validate(&self) -> Result<(), SpecError> {
        if self.id.is_empty() {
            return Err(SpecError::Validation(String::from("id")));
        }
        if self.database_name.is_empty() {
            return Err(SpecError::Validation(String::from("database_name")));
        }
        if self.master_username.is_empty() {
            return Err(SpecError::Validation(String::from("master_username")));
        }
        if self.master_password.expose().is_empty() {
            return Err(SpecError::Validation(String::from("master_password")));
        }
        if self.engine.is_empty() {
            return Err(SpecError::Validation(String::from("engine")));
        }
        Ok(())
    }
}

/// Builder for [`ClusterSpec`] that trims inputs and validates on build.
#[derive(Clone, Debug, Default)]
pub struct ClusterSpecBuilder {
    id: String,
    database_name: String,
    master_username: String,
    master_password: Option<Credential>,
    engine: Option<String>,
}

impl ClusterSpecBuilder {
    /// Sets the cluster identifier.
    #[must_use]
    pub fn id(mut self, value: impl Into<String>) -> Self {
        self.id = value.into();
        self
    }

    /// Sets the initial database name.
    #[must_use]
    pub fn database_name(mut self, value: impl Into<String>) -> Self {
        self.database_name = value.into();
        self
    }

    /// Sets the master user name.
    #[must_use]
    pub fn master_username(mut self, value: impl Into<String>) -> Self {
        self.master_username = value.into();
        self
    }

    /// Sets the master password.
    #[must_use]
    pub fn master_password(mut self, value: Credential) -> Self {
        self.master_password = Some(value);
        self
    }

    /// Overrides the engine; defaults to [`DEFAULT_ENGINE`].
    #[must_use]
    pub fn engine(mut self, value: impl Into<String>) -> Self {
        self.engine = Some(value.into());
        self
    }

    /// Builds and validates the [`ClusterSpec`].
    ///
    /// # Errors
    ///
    /// Returns [`SpecError::Validation`] when a required field is empty.
    pub fn build(self) -> Result<ClusterSpec, SpecError> {
        let spec = ClusterSpec {
            id: ClusterId::new(self.id.trim()),
            database_name: self.database_name.trim().to_owned(),
            master_username: self.master_username.trim().to_owned(),
            master_password: self.master_password.unwrap_or_default(),
            engine: self
                .engine
                .map_or_else(|| DEFAULT_ENGINE.to_owned(), |engine| engine.trim().to_owned()),
        };
        spec.validate()?;
        Ok(spec)
    }
}

/// Parameters required to attach a new instance to a cluster.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InstanceSpec {
    /// Cluster the instance joins.
    pub cluster_id: ClusterId,
    /// Identifier of the new instance.
    pub instance_id: InstanceId,
    /// Whether the instance endpoint is reachable from outside the VPC.
    pub publicly_accessible: bool,
    /// Compute class (for example `db.t3.small`).
    pub instance_class: String,
    /// Database engine; must match the cluster's engine.
    pub engine: String,
}

impl InstanceSpec {
    /// Creates a spec with the default class and engine.
    #[must_use]
    pub fn new(cluster_id: ClusterId, instance_id: InstanceId, publicly_accessible: bool) -> Self {
        Self {
            cluster_id,
            instance_id,
            publicly_accessible,
            instance_class: DEFAULT_INSTANCE_CLASS.to_owned(),
            engine: DEFAULT_ENGINE.to_owned(),
        }
    }

    /// Overrides the instance class.
    #[must_use]
    pub fn instance_class(mut self, value: impl Into<String>) -> Self {
        self.instance_class = value.into().trim().to_owned();
        self
    }

    /// Overrides the engine.
    #[must_use]
    pub fn engine(mut self, value: impl Into<String>) -> Self {
        self.engine = value.into().trim().to_owned();
        self
    }
}

/// Point-in-time view of a cluster as reported by the provider.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ClusterStatus {
    /// Cluster identifier.
    pub id: ClusterId,
    /// Provider-defined status string (`available` when settled).
    pub status: String,
    /// Writer endpoint; empty until the provider assigns one.
    pub endpoint: String,
    /// Database engine.
    pub engine: String,
}

/// Point-in-time view of an instance as reported by the provider.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct InstanceStatus {
    /// Instance identifier.
    pub id: InstanceId,
    /// Owning cluster, when the provider reports one.
    pub cluster_id: Option<ClusterId>,
    /// Provider-defined status string.
    pub status: String,
    /// Whether the instance is reachable from outside the VPC.
    pub publicly_accessible: bool,
}

/// Coarse classification of a provider failure.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProviderFault {
    /// The addressed cluster or instance does not exist (yet).
    NotFound,
    /// A create, clone or rename targeted an identifier already in use.
    AlreadyExists,
    /// Anything else; always fatal for the current step.
    Other,
}

/// Implemented by control-plane errors so callers can branch on the two
/// conditions the promotion workflow treats as expected outcomes.
pub trait ClassifyFault {
    /// Classifies this error.
    fn fault(&self) -> ProviderFault;

    /// Returns `true` when the addressed resource does not exist.
    fn is_not_found(&self) -> bool {
        self.fault() == ProviderFault::NotFound
    }

    /// Returns `true` when the target identifier is already taken.
    fn is_already_exists(&self) -> bool {
        self.fault() == ProviderFault::AlreadyExists
    }
}

/// Errors raised while building control-plane requests.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum SpecError {
    /// Raised when a request is missing a required field.
    #[error("missing or empty field: {0}")]
    Validation(String),
}

/// Future returned by control-plane operations.
pub type ControlPlaneFuture<'a, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'a>>;

/// Operations the promotion workflow requires from a managed database
/// provider.
pub trait ControlPlane: Sync {
    /// Provider specific error type.
    type Error: std::error::Error + ClassifyFault + Send + Sync + 'static;

    /// Creates a new cluster.
    fn create_cluster<'a>(
        &'a self,
        spec: &'a ClusterSpec,
    ) -> ControlPlaneFuture<'a, ClusterStatus, Self::Error>;

    /// Creates a new instance inside an existing cluster.
    fn create_instance<'a>(
        &'a self,
        spec: &'a InstanceSpec,
    ) -> ControlPlaneFuture<'a, InstanceStatus, Self::Error>;

    /// Clones `source` into `dest` at the latest restorable time using
    /// copy-on-write storage.
    fn clone_cluster_point_in_time<'a>(
        &'a self,
        source: &'a ClusterId,
        dest: &'a ClusterId,
    ) -> ControlPlaneFuture<'a, ClusterStatus, Self::Error>;

    /// Renames a cluster, applying immediately.
    fn rename_cluster<'a>(
        &'a self,
        old: &'a ClusterId,
        new: &'a ClusterId,
    ) -> ControlPlaneFuture<'a, ClusterStatus, Self::Error>;

    /// Renames an instance, optionally changing its accessibility in the
    /// same request.
    fn rename_instance<'a>(
        &'a self,
        old: &'a InstanceId,
        new: &'a InstanceId,
        publicly_accessible: Option<bool>,
    ) -> ControlPlaneFuture<'a, InstanceStatus, Self::Error>;

    /// Sets whether an instance is reachable from outside the VPC.
    fn modify_instance_accessibility<'a>(
        &'a self,
        id: &'a InstanceId,
        publicly_accessible: bool,
    ) -> ControlPlaneFuture<'a, InstanceStatus, Self::Error>;

    /// Replaces a cluster's master password, applying immediately.
    fn modify_cluster_password<'a>(
        &'a self,
        id: &'a ClusterId,
        password: &'a Credential,
    ) -> ControlPlaneFuture<'a, ClusterStatus, Self::Error>;

    /// Describes a single cluster.
    fn describe_cluster<'a>(
        &'a self,
        id: &'a ClusterId,
    ) -> ControlPlaneFuture<'a, ClusterStatus, Self::Error>;

    /// Describes a single instance.
    fn describe_instance<'a>(
        &'a self,
        id: &'a InstanceId,
    ) -> ControlPlaneFuture<'a, InstanceStatus, Self::Error>;
}
