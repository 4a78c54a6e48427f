//! Error types for the RDS control plane.

use thiserror::Error;

use crate::control_plane::{ClassifyFault, ProviderFault};

const NOT_FOUND_CODES: &[&str] = &["DBClusterNotFoundFault", "DBInstanceNotFound"];
const ALREADY_EXISTS_CODES: &[&str] = &["DBClusterAlreadyExistsFault", "DBInstanceAlreadyExists"];

/// Errors raised by the RDS control plane.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum RdsError {
    /// Raised when the RDS API rejects a request.
    #[error("{operation} failed for {resource}: {message}")]
    Service {
        /// API operation that failed (for example `ModifyDBCluster`).
        operation: &'static str,
        /// Cluster or instance identifier addressed by the request.
        resource: String,
        /// Error code reported by the service, when any.
        code: Option<String>,
        /// Rendered error chain.
        message: String,
    },
    /// Raised when a describe call returns an empty result set.
    #[error("{resource} not found")]
    Absent {
        /// Identifier that was described.
        resource: String,
    },
    /// Raised when a successful response omits the resource body.
    #[error("{operation} returned no resource for {resource}")]
    EmptyResponse {
        /// API operation that returned the empty body.
        operation: &'static str,
        /// Identifier addressed by the request.
        resource: String,
    },
}

impl RdsError {
    /// Service error code, when the API reported one.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Service { code, .. } => code.as_deref(),
            Self::Absent { .. } | Self::EmptyResponse { .. } => None,
        }
    }
}

impl ClassifyFault for RdsError {
    fn fault(&self) -> ProviderFault {
        match (self, self.code()) {
            (Self::Absent { .. }, _) => ProviderFault::NotFound,
            (_, Some(code)) if NOT_FOUND_CODES.contains(&code) => ProviderFault::NotFound,
            (_, Some(code)) if ALREADY_EXISTS_CODES.contains(&code) => {
                ProviderFault::AlreadyExists
            }
            _ => ProviderFault::Other,
        }
    }
}
