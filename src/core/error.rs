//! Error types for scheduler operations.

use thiserror::Error;

use crate::core::job::{JobKind, JobStatus};
use crate::util::ids::JobId;

/// Errors produced by scheduler components.
///
/// Every caller-facing operation returns one of these synchronously and leaves
/// scheduler state untouched when it does.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    /// Referenced job or queue does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// A live job already covers this package and operation.
    #[error("conflict: {kind} job for package `{package_id}` already exists")]
    Conflict {
        /// Operation kind that collided.
        kind: JobKind,
        /// Package the operation targets.
        package_id: String,
    },
    /// Requested status change is not reachable from the current status.
    #[error("job {job} cannot transition from {from} to {to}")]
    InvalidTransition {
        /// Job the transition was requested on.
        job: JobId,
        /// Status at the time of the request.
        from: JobStatus,
        /// Requested status.
        to: JobStatus,
    },
    /// Backend declined or failed to cancel an in-flight execution.
    #[error("abort failed: {0}")]
    AbortFailed(String),
    /// Configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl SchedulerError {
    /// Not-found error for a job id.
    #[must_use]
    pub fn job_not_found(id: &JobId) -> Self {
        Self::NotFound(format!("job {id}"))
    }

    /// Not-found error for a queue name.
    #[must_use]
    pub fn queue_not_found(name: &str) -> Self {
        Self::NotFound(format!("queue `{name}`"))
    }
}

/// Error reported by a [`JobBackend`](crate::core::JobBackend).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct BackendError(pub String);

impl From<&str> for BackendError {
    fn from(msg: &str) -> Self {
        Self(msg.to_owned())
    }
}

impl From<String> for BackendError {
    fn from(msg: String) -> Self {
        Self(msg)
    }
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
