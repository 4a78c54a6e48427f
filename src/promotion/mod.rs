//! The promotion state machine.
//!
//! A run snapshots all three slots, selects a [`Route`] through the
//! transition table in [`plan`], and executes the resulting steps in order.
//! Each state-changing call is followed by a wait for `available` before
//! the next step starts. A failing step aborts the run; completed steps are
//! left in place.

mod error;
mod plan;

#[cfg(test)]
mod tests;

use crate::control_plane::{
    ClassifyFault, ClusterSpec, ControlPlane, DEFAULT_ENGINE, DEFAULT_INSTANCE_CLASS, InstanceSpec,
};
use crate::credential::{Credential, CredentialGenerator, CredentialRotator};
use crate::environment::Environment;
use crate::resolver::{EnvironmentResolver, SlotSnapshot};
use crate::types::{ClusterId, InstanceId};
use crate::waiter::{OperationKind, Waiter};

pub use error::{PromotionError, RequestError, StepError};
pub use plan::{Plan, Route, Step};

/// Target slot and base cluster name for one run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PromotionRequest {
    target: Environment,
    base: String,
}

impl PromotionRequest {
    /// Creates a request, trimming the base name.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::EmptyBaseName`] when `base` is blank.
    pub fn new(target: Environment, base: impl Into<String>) -> Result<Self, RequestError> {
        let trimmed = base.into().trim().to_owned();
        if trimmed.is_empty() {
            return Err(RequestError::EmptyBaseName);
        }
        Ok(Self {
            target,
            base: trimmed,
        })
    }

    /// Slot to promote into.
    #[must_use]
    pub const fn target(&self) -> Environment {
        self.target
    }

    /// Base cluster name; the prod slot's identifier.
    #[must_use]
    pub fn base(&self) -> &str {
        &self.base
    }
}

/// Values used when the workflow creates resources from scratch.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProvisionSettings {
    /// Initial database name for new clusters.
    pub database_name: String,
    /// Master user name for new clusters.
    pub master_username: String,
    /// Engine for new clusters and instances.
    pub engine: String,
    /// Compute class for new instances.
    pub instance_class: String,
}

impl ProvisionSettings {
    /// Settings with the default engine and instance class.
    #[must_use]
    pub fn new(database_name: impl Into<String>, master_username: impl Into<String>) -> Self {
        Self {
            database_name: database_name.into(),
            master_username: master_username.into(),
            engine: DEFAULT_ENGINE.to_owned(),
            instance_class: DEFAULT_INSTANCE_CLASS.to_owned(),
        }
    }
}

/// What happened to one planned step.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StepReport {
    /// The step.
    pub step: Step,
    /// `false` when the provider reported the target as already existing
    /// and the call was treated as a no-op.
    pub applied: bool,
}

/// Summary of a completed run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PromotionReport {
    /// Target slot.
    pub target: Environment,
    /// Selected transition.
    pub route: Route,
    /// Slot occupancy observed at the start of the run.
    pub snapshot: SlotSnapshot,
    /// Executed steps, in order.
    pub steps: Vec<StepReport>,
    /// Endpoint of the target slot's cluster, when known.
    pub endpoint: String,
    /// Master password generated or rotated during the run.
    pub credential: Option<Credential>,
}

impl PromotionReport {
    /// Returns `true` when the target was already in the desired state.
    #[must_use]
    pub const fn is_noop(&self) -> bool {
        self.route.is_noop()
    }
}

#[derive(Debug, Default)]
struct StepOutcome {
    applied: bool,
    endpoint: Option<String>,
    credential: Option<Credential>,
}

/// Drives a promotion against a control plane.
#[derive(Debug)]
pub struct Promoter<'a, P, G> {
    plane: &'a P,
    generator: &'a G,
    waiter: Waiter,
    settings: ProvisionSettings,
}

impl<'a, P, G> Promoter<'a, P, G>
where
    P: ControlPlane,
    G: CredentialGenerator,
{
    /// Creates a promoter.
    #[must_use]
    pub const fn new(
        plane: &'a P,
        generator: &'a G,
        waiter: Waiter,
        settings: ProvisionSettings,
    ) -> Self {
        Self {
            plane,
            generator,
            waiter,
            settings,
        }
    }

    /// Snapshots the slots and returns the plan without executing it.
    ///
    /// # Errors
    ///
    /// Returns [`PromotionError::Resolve`] when occupancy cannot be
    /// determined.
    pub async fn plan(
        &self,
        request: &PromotionRequest,
    ) -> Result<(SlotSnapshot, Plan), PromotionError<P::Error>> {
        let snapshot = EnvironmentResolver::new(self.plane, request.base())
            .snapshot()
            .await?;
        let plan = Plan::new(request.target(), snapshot.existence(), request.base());
        Ok((snapshot, plan))
    }

    /// Promotes the deployment into the requested slot.
    ///
    /// # Errors
    ///
    /// Returns [`PromotionError`] when slot resolution or any step fails.
    /// Steps completed before the failure are not rolled back.
    pub async fn promote(
        &self,
        request: &PromotionRequest,
    ) -> Result<PromotionReport, PromotionError<P::Error>> {
        let (snapshot, plan) = self.plan(request).await?;
        let target = request.target();
        tracing::info!(
            env = %target,
            route = ?plan.route,
            steps = plan.steps.len(),
            "selected promotion route"
        );

        let mut report = PromotionReport {
            target,
            route: plan.route,
            endpoint: snapshot.slot(target).endpoint().to_owned(),
            snapshot,
            steps: Vec::with_capacity(plan.steps.len()),
            credential: None,
        };

        if plan.is_noop() {
            tracing::info!(env = %target, "slot already in desired state");
            return Ok(report);
        }

        for (position, step) in plan.steps.into_iter().enumerate() {
            let index = position + 1;
            tracing::info!(index, %step, "executing step");
            let outcome = match self.execute(&step).await {
                Ok(outcome) => outcome,
                Err(source) => {
                    tracing::error!(index, %step, error = %source, "step failed");
                    return Err(PromotionError::Step {
                        index,
                        last_status: source.last_status().map(str::to_owned),
                        step,
                        source,
                    });
                }
            };

            if let Some(endpoint) = outcome.endpoint {
                report.endpoint = endpoint;
            }
            if outcome.credential.is_some() {
                report.credential = outcome.credential;
            }
            report.steps.push(StepReport {
                step,
                applied: outcome.applied,
            });
        }

        Ok(report)
    }

    async fn execute(&self, step: &Step) -> Result<StepOutcome, StepError<P::Error>> {
        match step {
            Step::CreateCluster { cluster } => self.create_cluster(cluster).await,
            Step::CreateInstance {
                cluster,
                instance,
                publicly_accessible,
            } => {
                self.create_instance(cluster, instance, *publicly_accessible)
                    .await
            }
            Step::CloneCluster { source, dest } => self.clone_cluster(source, dest).await,
            Step::RenameCluster { from, to } => self.rename_cluster(from, to).await,
            Step::RenameInstance {
                from,
                to,
                publicly_accessible,
            } => self.rename_instance(from, to, *publicly_accessible).await,
            Step::SetInstanceAccessibility {
                instance,
                publicly_accessible,
            } => {
                self.set_accessibility(instance, *publicly_accessible)
                    .await
            }
            Step::RotateCredential { cluster } => {
                let (credential, status) =
                    CredentialRotator::new(self.plane, self.generator, self.waiter)
                        .rotate(cluster)
                        .await?;
                Ok(StepOutcome {
                    applied: true,
                    endpoint: Some(status.endpoint),
                    credential: Some(credential),
                })
            }
        }
    }

    async fn create_cluster(
        &self,
        cluster: &ClusterId,
    ) -> Result<StepOutcome, StepError<P::Error>> {
        let credential = self.generator.generate()?;
        let spec = ClusterSpec::builder()
            .id(cluster.as_str())
            .database_name(&self.settings.database_name)
            .master_username(&self.settings.master_username)
            .master_password(credential.clone())
            .engine(&self.settings.engine)
            .build()?;
        let applied = accept_existing(self.plane.create_cluster(&spec).await, cluster.as_str())?;
        let endpoint = self.await_cluster(cluster, OperationKind::InPlace).await?;
        Ok(StepOutcome {
            applied,
            endpoint: Some(endpoint),
            credential: applied.then_some(credential),
        })
    }

    async fn create_instance(
        &self,
        cluster: &ClusterId,
        instance: &InstanceId,
        publicly_accessible: bool,
    ) -> Result<StepOutcome, StepError<P::Error>> {
        let spec = InstanceSpec::new(cluster.clone(), instance.clone(), publicly_accessible)
            .instance_class(&self.settings.instance_class)
            .engine(&self.settings.engine);
        let applied =
            accept_existing(self.plane.create_instance(&spec).await, instance.as_str())?;
        self.await_instance(instance, OperationKind::InPlace).await?;
        Ok(StepOutcome {
            applied,
            ..StepOutcome::default()
        })
    }

    async fn clone_cluster(
        &self,
        source: &ClusterId,
        dest: &ClusterId,
    ) -> Result<StepOutcome, StepError<P::Error>> {
        let applied = accept_existing(
            self.plane.clone_cluster_point_in_time(source, dest).await,
            dest.as_str(),
        )?;
        let endpoint = self.await_cluster(dest, OperationKind::InPlace).await?;
        Ok(StepOutcome {
            applied,
            endpoint: Some(endpoint),
            credential: None,
        })
    }

    async fn rename_cluster(
        &self,
        from: &ClusterId,
        to: &ClusterId,
    ) -> Result<StepOutcome, StepError<P::Error>> {
        let applied = accept_existing(self.plane.rename_cluster(from, to).await, to.as_str())?;
        let endpoint = self.await_cluster(to, rename_kind(applied)).await?;
        Ok(StepOutcome {
            applied,
            endpoint: Some(endpoint),
            credential: None,
        })
    }

    async fn rename_instance(
        &self,
        from: &InstanceId,
        to: &InstanceId,
        publicly_accessible: Option<bool>,
    ) -> Result<StepOutcome, StepError<P::Error>> {
        let applied = accept_existing(
            self.plane
                .rename_instance(from, to, publicly_accessible)
                .await,
            to.as_str(),
        )?;
        self.await_instance(to, rename_kind(applied)).await?;
        Ok(StepOutcome {
            applied,
            ..StepOutcome::default()
        })
    }

    async fn set_accessibility(
        &self,
        instance: &InstanceId,
        publicly_accessible: bool,
    ) -> Result<StepOutcome, StepError<P::Error>> {
        self.plane
            .modify_instance_accessibility(instance, publicly_accessible)
            .await
            .map_err(StepError::Provider)?;
        self.await_instance(instance, OperationKind::InPlace).await?;
        Ok(StepOutcome {
            applied: true,
            ..StepOutcome::default()
        })
    }

    async fn await_cluster(
        &self,
        cluster: &ClusterId,
        kind: OperationKind,
    ) -> Result<String, StepError<P::Error>> {
        let outcome = self
            .waiter
            .await_available(cluster.as_str(), kind, || self.plane.describe_cluster(cluster))
            .await?;
        Ok(outcome.resource.endpoint)
    }

    async fn await_instance(
        &self,
        instance: &InstanceId,
        kind: OperationKind,
    ) -> Result<(), StepError<P::Error>> {
        self.waiter
            .await_available(instance.as_str(), kind, || {
                self.plane.describe_instance(instance)
            })
            .await?;
        Ok(())
    }
}

/// Treats the provider's already-exists signal as a successful no-op.
/// Returns whether the call actually changed anything.
fn accept_existing<T, E>(result: Result<T, E>, target: &str) -> Result<bool, StepError<E>>
where
    E: std::error::Error + ClassifyFault + 'static,
{
    match result {
        Ok(_) => Ok(true),
        Err(err) if err.is_already_exists() => {
            tracing::info!(resource = target, "resource already exists, no action required");
            Ok(false)
        }
        Err(err) => Err(StepError::Provider(err)),
    }
}

/// A rename that was skipped leaves nothing to propagate.
const fn rename_kind(applied: bool) -> OperationKind {
    if applied {
        OperationKind::Rename
    } else {
        OperationKind::InPlace
    }
}
