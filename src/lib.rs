//! Core library for the `rds-promote` tool.
//!
//! A deployment lives in up to three slots (`dev`, `test`, `prod`), each a
//! managed database cluster with one instance. The crate exposes a
//! control-plane abstraction, an RDS implementation of it, and the promotion
//! state machine that moves a deployment between slots (resolve slots →
//! plan steps → run each step and wait for `available`).

pub mod config;
pub mod control_plane;
pub mod credential;
pub mod environment;
pub mod promotion;
pub mod rds;
pub mod resolver;
pub mod site;
#[cfg(test)]
pub mod test_helpers;
pub mod test_support;
pub mod types;
pub mod waiter;

pub use config::{ConfigError, PromoteConfig};
pub use control_plane::{
    ClassifyFault, ClusterSpec, ClusterSpecBuilder, ClusterStatus, ControlPlane,
    ControlPlaneFuture, InstanceSpec, InstanceStatus, ProviderFault, SpecError,
};
pub use credential::{
    Credential, CredentialError, CredentialGenerator, CredentialRotator,
    RandomCredentialGenerator, RotateError,
};
pub use environment::{Environment, ParseEnvironmentError};
pub use promotion::{
    Plan, PromotionError, PromotionReport, PromotionRequest, Promoter, ProvisionSettings,
    RequestError, Route, Step, StepError, StepReport,
};
pub use rds::{RdsControlPlane, RdsError};
pub use resolver::{EnvironmentResolver, ResolveError, SlotExistence, SlotSnapshot, SlotState};
pub use site::SiteConfig;
pub use types::{ClusterId, InstanceId};
pub use waiter::{OperationKind, WaitError, WaitOutcome, WaitPolicy, Waiter};
