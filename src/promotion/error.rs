//! Error types for the promotion workflow.

use thiserror::Error;

use super::plan::Step;
use crate::control_plane::SpecError;
use crate::credential::{CredentialError, RotateError};
use crate::resolver::ResolveError;
use crate::waiter::WaitError;

/// Raised when a promotion request is malformed.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum RequestError {
    /// Raised when the base cluster name is blank.
    #[error("base cluster name must not be empty")]
    EmptyBaseName,
}

/// Why a single step failed.
#[derive(Debug, Error)]
pub enum StepError<E>
where
    E: std::error::Error + 'static,
{
    /// The mutating call was rejected.
    #[error("provider rejected the request: {0}")]
    Provider(#[source] E),
    /// The resource did not reach `available`.
    #[error(transparent)]
    Wait(#[from] WaitError<E>),
    /// Credential rotation failed.
    #[error(transparent)]
    Rotate(#[from] RotateError<E>),
    /// No master password could be generated for a new cluster.
    #[error(transparent)]
    Credential(#[from] CredentialError),
    /// The request built for the provider was incomplete.
    #[error("invalid request: {0}")]
    Spec(#[from] SpecError),
}

impl<E> StepError<E>
where
    E: std::error::Error + 'static,
{
    /// Last provider status known when the step failed.
    #[must_use]
    pub fn last_status(&self) -> Option<&str> {
        match self {
            Self::Wait(source) => source.last_status(),
            Self::Rotate(source) => source.last_status(),
            Self::Provider(_) | Self::Credential(_) | Self::Spec(_) => None,
        }
    }
}

/// Errors that abort a promotion run.
#[derive(Debug, Error)]
pub enum PromotionError<E>
where
    E: std::error::Error + 'static,
{
    /// Raised when slot occupancy cannot be determined.
    #[error(transparent)]
    Resolve(#[from] ResolveError<E>),
    /// Raised when a step fails; earlier steps are not rolled back.
    #[error("step {index} ({step}) failed (last status: {}): {source}", last_status.as_deref().unwrap_or("unknown"))]
    Step {
        /// One-based position of the failed step in the plan.
        index: usize,
        /// The failed step.
        step: Step,
        /// Last provider status observed for the step's resource.
        last_status: Option<String>,
        /// Underlying failure.
        #[source]
        source: StepError<E>,
    },
}
