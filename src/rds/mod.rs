//! Amazon RDS implementation of the control plane.

mod error;

use std::error::Error as StdError;
use std::fmt::Debug;

use aws_config::{BehaviorVersion, Region};
use aws_sdk_rds::Client;
use aws_sdk_rds::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_rds::types::{DbCluster, DbInstance};

use crate::control_plane::{
    ClusterSpec, ClusterStatus, ControlPlane, ControlPlaneFuture, InstanceSpec, InstanceStatus,
};
use crate::credential::Credential;
use crate::types::{ClusterId, InstanceId};

pub use error::RdsError;

const COPY_ON_WRITE: &str = "copy-on-write";

/// Control plane backed by the Amazon RDS API.
#[derive(Clone, Debug)]
pub struct RdsControlPlane {
    client: Client,
}

impl RdsControlPlane {
    /// Wraps an existing SDK client.
    #[must_use]
    pub const fn new(client: Client) -> Self {
        Self { client }
    }

    /// Loads credentials from the standard AWS sources and targets `region`.
    pub async fn connect(region: &str) -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_owned()))
            .load()
            .await;
        tracing::debug!(region, "connected RDS client");
        Self::new(Client::new(&config))
    }
}

fn service_error<E, R>(operation: &'static str, resource: &str, err: &SdkError<E, R>) -> RdsError
where
    E: ProvideErrorMetadata + StdError + 'static,
    R: Debug,
{
    RdsError::Service {
        operation,
        resource: resource.to_owned(),
        code: err
            .as_service_error()
            .and_then(ProvideErrorMetadata::code)
            .map(str::to_owned),
        message: DisplayErrorContext(err).to_string(),
    }
}

fn cluster_status(cluster: &DbCluster, requested: &ClusterId) -> ClusterStatus {
    ClusterStatus {
        id: cluster
            .db_cluster_identifier()
            .map_or_else(|| requested.clone(), ClusterId::from),
        status: cluster.status().unwrap_or_default().to_owned(),
        endpoint: cluster.endpoint().unwrap_or_default().to_owned(),
        engine: cluster.engine().unwrap_or_default().to_owned(),
    }
}

fn instance_status(instance: &DbInstance, requested: &InstanceId) -> InstanceStatus {
    InstanceStatus {
        id: instance
            .db_instance_identifier()
            .map_or_else(|| requested.clone(), InstanceId::from),
        cluster_id: instance.db_cluster_identifier().map(ClusterId::from),
        status: instance.db_instance_status().unwrap_or_default().to_owned(),
        publicly_accessible: instance.publicly_accessible().unwrap_or(false),
    }
}

fn require_cluster(
    cluster: Option<&DbCluster>,
    operation: &'static str,
    requested: &ClusterId,
) -> Result<ClusterStatus, RdsError> {
    cluster
        .map(|found| cluster_status(found, requested))
        .ok_or_else(|| RdsError::EmptyResponse {
            operation,
            resource: requested.to_string(),
        })
}

fn require_instance(
    instance: Option<&DbInstance>,
    operation: &'static str,
    requested: &InstanceId,
) -> Result<InstanceStatus, RdsError> {
    instance
        .map(|found| instance_status(found, requested))
        .ok_or_else(|| RdsError::EmptyResponse {
            operation,
            resource: requested.to_string(),
        })
}

impl ControlPlane for RdsControlPlane {
    type Error = RdsError;

    fn create_cluster<'a>(
        &'a self,
        spec: &'a ClusterSpec,
    ) -> ControlPlaneFuture<'a, ClusterStatus, Self::Error> {
        const OPERATION: &str = "CreateDBCluster";
        Box::pin(async move {
            let output = self
                .client
                .create_db_cluster()
                .db_cluster_identifier(spec.id.as_str())
                .engine(&spec.engine)
                .database_name(&spec.database_name)
                .master_username(&spec.master_username)
                .master_user_password(spec.master_password.expose())
                .send()
                .await
                .map_err(|err| service_error(OPERATION, &spec.id, &err))?;
            require_cluster(output.db_cluster(), OPERATION, &spec.id)
        })
    }

    fn create_instance<'a>(
        &'a self,
        spec: &'a InstanceSpec,
    ) -> ControlPlaneFuture<'a, InstanceStatus, Self::Error> {
        const OPERATION: &str = "CreateDBInstance";
        Box::pin(async move {
            let output = self
                .client
                .create_db_instance()
                .db_instance_identifier(spec.instance_id.as_str())
                .db_cluster_identifier(spec.cluster_id.as_str())
                .db_instance_class(&spec.instance_class)
                .engine(&spec.engine)
                .publicly_accessible(spec.publicly_accessible)
                .multi_az(false)
                .auto_minor_version_upgrade(true)
                .send()
                .await
                .map_err(|err| service_error(OPERATION, &spec.instance_id, &err))?;
            require_instance(output.db_instance(), OPERATION, &spec.instance_id)
        })
    }

    fn clone_cluster_point_in_time<'a>(
        &'a self,
        source: &'a ClusterId,
        dest: &'a ClusterId,
    ) -> ControlPlaneFuture<'a, ClusterStatus, Self::Error> {
        const OPERATION: &str = "RestoreDBClusterToPointInTime";
        Box::pin(async move {
            let output = self
                .client
                .restore_db_cluster_to_point_in_time()
                .source_db_cluster_identifier(source.as_str())
                .db_cluster_identifier(dest.as_str())
                .restore_type(COPY_ON_WRITE)
                .use_latest_restorable_time(true)
                .send()
                .await
                .map_err(|err| service_error(OPERATION, dest, &err))?;
            require_cluster(output.db_cluster(), OPERATION, dest)
        })
    }

    fn rename_cluster<'a>(
        &'a self,
        old: &'a ClusterId,
        new: &'a ClusterId,
    ) -> ControlPlaneFuture<'a, ClusterStatus, Self::Error> {
        const OPERATION: &str = "ModifyDBCluster";
        Box::pin(async move {
            let output = self
                .client
                .modify_db_cluster()
                .db_cluster_identifier(old.as_str())
                .new_db_cluster_identifier(new.as_str())
                .apply_immediately(true)
                .send()
                .await
                .map_err(|err| service_error(OPERATION, old, &err))?;
            require_cluster(output.db_cluster(), OPERATION, new)
        })
    }

    fn rename_instance<'a>(
        &'a self,
        old: &'a InstanceId,
        new: &'a InstanceId,
        publicly_accessible: Option<bool>,
    ) -> ControlPlaneFuture<'a, InstanceStatus, Self::Error> {
        const OPERATION: &str = "ModifyDBInstance";
        Box::pin(async move {
            let output = self
                .client
                .modify_db_instance()
                .db_instance_identifier(old.as_str())
                .new_db_instance_identifier(new.as_str())
                .set_publicly_accessible(publicly_accessible)
                .apply_immediately(true)
                .send()
                .await
                .map_err(|err| service_error(OPERATION, old, &err))?;
            require_instance(output.db_instance(), OPERATION, new)
        })
    }

    fn modify_instance_accessibility<'a>(
        &'a self,
        id: &'a InstanceId,
        publicly_accessible: bool,
    ) -> ControlPlaneFuture<'a, InstanceStatus, Self::Error> {
        const OPERATION: &str = "ModifyDBInstance";
        Box::pin(async move {
            let output = self
                .client
                .modify_db_instance()
                .db_instance_identifier(id.as_str())
                .publicly_accessible(publicly_accessible)
                .apply_immediately(true)
                .send()
                .await
                .map_err(|err| service_error(OPERATION, id, &err))?;
            require_instance(output.db_instance(), OPERATION, id)
        })
    }

    fn modify_cluster_password<'a>(
        &'a self,
        id: &'a ClusterId,
        password: &'a Credential,
    ) -> ControlPlaneFuture<'a, ClusterStatus, Self::Error> {
        const OPERATION: &str = "ModifyDBCluster";
        Box::pin(async move {
            let output = self
                .client
                .modify_db_cluster()
                .db_cluster_identifier(id.as_str())
                .master_user_password(password.expose())
                .apply_immediately(true)
                .send()
                .await
                .map_err(|err| service_error(OPERATION, id, &err))?;
            require_cluster(output.db_cluster(), OPERATION, id)
        })
    }

    fn describe_cluster<'a>(
        &'a self,
        id: &'a ClusterId,
    ) -> ControlPlaneFuture<'a, ClusterStatus, Self::Error> {
        Box::pin(async move {
            let output = self
                .client
                .describe_db_clusters()
                .db_cluster_identifier(id.as_str())
                .send()
                .await
                .map_err(|err| service_error("DescribeDBClusters", id, &err))?;
            output
                .db_clusters()
                .first()
                .map(|cluster| cluster_status(cluster, id))
                .ok_or_else(|| RdsError::Absent {
                    resource: id.to_string(),
                })
        })
    }

    fn describe_instance<'a>(
        &'a self,
        id: &'a InstanceId,
    ) -> ControlPlaneFuture<'a, InstanceStatus, Self::Error> {
        Box::pin(async move {
            let output = self
                .client
                .describe_db_instances()
                .db_instance_identifier(id.as_str())
                .send()
                .await
                .map_err(|err| service_error("DescribeDBInstances", id, &err))?;
            output
                .db_instances()
                .first()
                .map(|instance| instance_status(instance, id))
                .ok_or_else(|| RdsError::Absent {
                    resource: id.to_string(),
                })
        })
    }
}
