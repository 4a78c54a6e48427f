//! Deadline-bound polling until a provider resource reports `available`.
//!
//! All timing goes through `tokio::time`, so tests drive the waiter on a
//! paused clock and production waits can be cancelled by dropping the
//! future.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::{Instant, sleep, timeout_at};

use crate::control_plane::{ClassifyFault, ClusterStatus, InstanceStatus};


/// The only status treated as operation-complete.
pub const AVAILABLE: &str = "available";

/// Statuses from which a resource never reaches [`AVAILABLE`] on its own.
pub const FAILED_STATUSES: &[&str] = &[
    "failed",
    "deleting",
    "inaccessible-encryption-credentials",
    "incompatible-network",
    "incompatible-option-group",
    "incompatible-parameters",
    "incompatible-restore",
    "restore-error",
    "storage-full",
];

const POLL_INTERVAL: Duration = Duration::from_secs(10);
const RENAME_SETTLE_DELAY: Duration = Duration::from_secs(40);
const NOT_FOUND_RETRY_INTERVAL: Duration = Duration::from_secs(2);
const MAX_NOT_FOUND_RETRIES: u32 = 30;
const WAIT_TIMEOUT: Duration = Duration::from_secs(30 * 60);
/// Longest deadline the clock can represent without overflowing.
const MAX_WAIT: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Timing and retry bounds for a single wait.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct WaitPolicy {
    /// Delay between status checks once polling has started.
    pub poll_interval: Duration,
    /// Delay before the first check after a rename.
    pub rename_settle_delay: Duration,
    /// Delay before re-checking a renamed identifier that is not visible yet.
    pub not_found_retry_interval: Duration,
    /// Number of not-found responses tolerated during a rename wait.
    pub max_not_found_retries: u32,
    /// Upper bound on the whole wait, settle delay included.
    pub timeout: Duration,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            poll_interval: POLL_INTERVAL,
            rename_settle_delay: RENAME_SETTLE_DELAY,
            not_found_retry_interval: NOT_FOUND_RETRY_INTERVAL,
            max_not_found_retries: MAX_NOT_FOUND_RETRIES,
            timeout: WAIT_TIMEOUT,
        }
    }
}

/// How the operation being awaited interacts with provider propagation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OperationKind {
    /// Create, clone or modify: the identifier is visible immediately.
    InPlace,
    /// Rename: the new identifier may not resolve for a while.
    Rename,
}

/// Resources whose provider status string can be polled.
pub trait ReportsStatus {
    /// Current provider status.
    fn status(&self) -> &str;
}

impl ReportsStatus for ClusterStatus {
    fn status(&self) -> &str {
        &self.status
    }
}

impl ReportsStatus for InstanceStatus {
    fn status(&self) -> &str {
        &self.status
    }
}

/// Result of a successful wait.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WaitOutcome<S> {
    /// The resource as observed when it became available.
    pub resource: S,
    /// Number of successful status fetches, including the final one.
    pub polls: u32,
    /// Number of not-found responses absorbed along the way.
    pub not_found_retries: u32,
}

/// Errors raised while waiting for a resource.
#[derive(Debug, Error)]
pub enum WaitError<E>
where
    E: std::error::Error + 'static,
{
    /// Raised when the deadline passes before the resource settles.
    #[error("timeout waiting for {resource} to become available (last status: {})", last_status.as_deref().unwrap_or("unknown"))]
    Timeout {
        /// Resource being awaited.
        resource: String,
        /// Last status observed, if any fetch succeeded.
        last_status: Option<String>,
    },
    /// Raised when a renamed identifier never becomes visible.
    #[error("rename of {resource} did not converge after {attempts} not-found responses")]
    RenameDidNotConverge {
        /// Resource being awaited.
        resource: String,
        /// Not-found responses observed before giving up.
        attempts: u32,
    },
    /// Raised when the resource enters a status it cannot leave on its own.
    #[error("{resource} entered terminal status {status}")]
    TerminalStatus {
        /// Resource being awaited.
        resource: String,
        /// Status reported by the provider.
        status: String,
    },
    /// Raised when a status fetch fails for any other reason.
    #[error("failed to fetch status of {resource}: {source}")]
    Provider {
        /// Resource being awaited.
        resource: String,
        /// Last status observed before the failure.
        last_status: Option<String>,
        /// Provider error.
        #[source]
        source: E,
    },
}

impl<E> WaitError<E>
where
    E: std::error::Error + 'static,
{
    /// Last provider status known when the wait failed.
    #[must_use]
    pub fn last_status(&self) -> Option<&str> {
        match self {
            Self::Timeout { last_status, .. } | Self::Provider { last_status, .. } => {
                last_status.as_deref()
            }
            Self::TerminalStatus { status, .. } => Some(status.as_str()),
            Self::RenameDidNotConverge { .. } => None,
        }
    }
}

/// Returns `true` for statuses in [`FAILED_STATUSES`].
#[must_use]
pub fn is_failed_status(status: &str) -> bool {
    FAILED_STATUSES.contains(&status)
}

/// Polls a status source until it reports [`AVAILABLE`].
#[derive(Clone, Copy, Debug, Default)]
pub struct Waiter {
    policy: WaitPolicy,
}

impl Waiter {
    /// Creates a waiter with the given policy.
    #[must_use]
    pub const fn new(policy: WaitPolicy) -> Self {
        Self { policy }
    }

    /// Blocks until `fetch` yields a resource whose status is exactly
    /// [`AVAILABLE`].
    ///
    /// Rename waits sleep for the settle delay first and absorb up to
    /// `max_not_found_retries` not-found responses. Any other fetch error
    /// ends the wait. The deadline also bounds each individual fetch, so a
    /// request that never completes still ends in [`WaitError::Timeout`].
    ///
    /// # Errors
    ///
    /// Returns [`WaitError`] on deadline expiry, retry exhaustion, a
    /// terminal failure status, or an unclassified fetch error.
    pub async fn await_available<S, E, F, Fut>(
        &self,
        resource: &str,
        kind: OperationKind,
        mut fetch: F,
    ) -> Result<WaitOutcome<S>, WaitError<E>>
    where
        S: ReportsStatus,
        E: std::error::Error + ClassifyFault + 'static,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<S, E>>,
    {
        let deadline = Instant::now() + self.policy.timeout.min(MAX_WAIT);
        if kind == OperationKind::Rename && !self.policy.rename_settle_delay.is_zero() {
            tracing::debug!(
                resource,
                delay_secs = self.policy.rename_settle_delay.as_secs(),
                "waiting for rename to propagate"
            );
            sleep(self.policy.rename_settle_delay).await;
        }

        let mut polls = 0_u32;
        let mut not_found_retries = 0_u32;
        let mut last_status: Option<String> = None;

        while Instant::now() <= deadline {
            let Ok(fetched) = timeout_at(deadline, fetch()).await else {
                tracing::warn!(resource, "status request outlived the wait deadline");
                break;
            };
            match fetched {
                Ok(observed) => {
                    polls += 1;
                    let status = observed.status();
                    tracing::info!(resource, status, polls, "polled resource status");
                    if status == AVAILABLE {
                        return Ok(WaitOutcome {
                            resource: observed,
                            polls,
                            not_found_retries,
                        });
                    }
                    if is_failed_status(status) {
                        return Err(WaitError::TerminalStatus {
                            resource: resource.to_owned(),
                            status: status.to_owned(),
                        });
                    }
                    last_status = Some(status.to_owned());
                    sleep(self.policy.poll_interval).await;
                }
                Err(err) if kind == OperationKind::Rename && err.is_not_found() => {
                    if not_found_retries >= self.policy.max_not_found_retries {
                        return Err(WaitError::RenameDidNotConverge {
                            resource: resource.to_owned(),
                            attempts: not_found_retries,
                        });
                    }
                    not_found_retries += 1;
                    tracing::debug!(
                        resource,
                        attempt = not_found_retries,
                        "renamed resource not visible yet"
                    );
                    sleep(self.policy.not_found_retry_interval).await;
                }
                Err(err) => {
                    return Err(WaitError::Provider {
                        resource: resource.to_owned(),
                        last_status,
                        source: err,
                    });
                }
            }
        }

        tracing::warn!(resource, ?last_status, "wait deadline expired");
        Err(WaitError::Timeout {
            resource: resource.to_owned(),
            last_status,
        })
    }
}
