//! Master credential generation and rotation.

use std::fmt;

use rand::Rng;
use rand::distributions::Alphanumeric;
use rand::seq::SliceRandom;
use thiserror::Error;

use crate::control_plane::{ClusterStatus, ControlPlane};
use crate::types::ClusterId;
use crate::waiter::{OperationKind, WaitError, Waiter};

/// Length of generated master passwords.
pub const CREDENTIAL_LENGTH: usize = 21;
/// Minimum number of digits in a generated master password.
pub const CREDENTIAL_MIN_DIGITS: usize = 5;

const DIGITS: &[u8] = b"0123456789";

/// A master password held only in memory.
///
/// `Debug` is redacted; use [`Credential::expose`] where the secret must
/// leave the process.
#[derive(Clone, Default, Eq, PartialEq)]
pub struct Credential(String);

impl Credential {
    /// Wraps an existing secret.
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Returns the secret.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Errors raised while producing a credential.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum CredentialError {
    /// Raised when the generator cannot satisfy its policy.
    #[error("failed to generate credential: {0}")]
    Generation(String),
}

/// Source of fresh master passwords.
pub trait CredentialGenerator {
    /// Produces a new credential.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError`] when no credential can be produced.
    fn generate(&self) -> Result<Credential, CredentialError>;
}

/// Generates letters-and-digits passwords with a minimum digit count.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RandomCredentialGenerator {
    length: usize,
    min_digits: usize,
}

impl Default for RandomCredentialGenerator {
    fn default() -> Self {
        Self {
            length: CREDENTIAL_LENGTH,
            min_digits: CREDENTIAL_MIN_DIGITS,
        }
    }
}

impl RandomCredentialGenerator {
    /// Creates a generator with a custom policy.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::Generation`] when the policy is
    /// unsatisfiable (empty, or more digits than characters).
    pub fn new(length: usize, min_digits: usize) -> Result<Self, CredentialError> {
        if length == 0 || min_digits > length {
            return Err(CredentialError::Generation(format!(
                "cannot place {min_digits} digits in a {length}-character password"
            )));
        }
        Ok(Self { length, min_digits })
    }
}

impl CredentialGenerator for RandomCredentialGenerator {
    fn generate(&self) -> Result<Credential, CredentialError> {
        let mut rng = rand::thread_rng();
        let mut chars: Vec<char> = (0..self.min_digits)
            .filter_map(|_| DIGITS.choose(&mut rng).copied().map(char::from))
            .collect();
        chars.extend(
            (&mut rng)
                .sample_iter(&Alphanumeric)
                .take(self.length.saturating_sub(chars.len()))
                .map(char::from),
        );
        chars.shuffle(&mut rng);

        if chars.len() != self.length {
            return Err(CredentialError::Generation(String::from(
                "random source produced too few characters",
            )));
        }
        Ok(Credential::new(chars.into_iter().collect::<String>()))
    }
}

/// Errors raised while rotating a cluster's master password.
#[derive(Debug, Error)]
pub enum RotateError<E>
where
    E: std::error::Error + 'static,
{
    /// Raised when no credential could be generated.
    #[error(transparent)]
    Credential(#[from] CredentialError),
    /// Raised when the provider rejects the password change.
    #[error("failed to apply new password to {cluster}: {source}")]
    Apply {
        /// Target cluster.
        cluster: ClusterId,
        /// Provider error.
        #[source]
        source: E,
    },
    /// Raised when the cluster does not settle after the change.
    #[error("cluster {cluster} did not settle after credential rotation: {source}")]
    Wait {
        /// Target cluster.
        cluster: ClusterId,
        /// Wait failure.
        #[source]
        source: WaitError<E>,
    },
}

impl<E> RotateError<E>
where
    E: std::error::Error + 'static,
{
    /// Last provider status known when rotation failed.
    #[must_use]
    pub fn last_status(&self) -> Option<&str> {
        match self {
            Self::Wait { source, .. } => source.last_status(),
            Self::Credential(_) | Self::Apply { .. } => None,
        }
    }
}

/// Generates a new master password, applies it, and waits for the cluster
/// to become available again.
#[derive(Debug)]
pub struct CredentialRotator<'a, P, G> {
    plane: &'a P,
    generator: &'a G,
    waiter: Waiter,
}

impl<'a, P, G> CredentialRotator<'a, P, G>
where
    P: ControlPlane,
    G: CredentialGenerator,
{
    /// Creates a rotator over the given control plane.
    #[must_use]
    pub const fn new(plane: &'a P, generator: &'a G, waiter: Waiter) -> Self {
        Self {
            plane,
            generator,
            waiter,
        }
    }

    /// Rotates the master password of `cluster`.
    ///
    /// # Errors
    ///
    /// Returns [`RotateError`] when generation, the modify call, or the
    /// subsequent wait fails.
    pub async fn rotate(
        &self,
        cluster: &ClusterId,
    ) -> Result<(Credential, ClusterStatus), RotateError<P::Error>> {
        let credential = self.generator.generate()?;
        tracing::info!(%cluster, "rotating master credential");
        self.plane
            .modify_cluster_password(cluster, &credential)
            .await
            .map_err(|source| RotateError::Apply {
                cluster: cluster.clone(),
                source,
            })?;

        let outcome = self
            .waiter
            .await_available(cluster.as_str(), OperationKind::InPlace, || {
                self.plane.describe_cluster(cluster)
            })
            .await
            .map_err(|source| RotateError::Wait {
                cluster: cluster.clone(),
                source,
            })?;

        Ok((credential, outcome.resource))
    }
}
