//! Execution backend and runtime spawning contracts.

use std::future::Future;

use async_trait::async_trait;

use crate::core::error::BackendError;
use crate::core::job::Job;
use crate::util::ids::JobId;

/// The component that actually performs package operations.
///
/// The scheduler only decides *when* a job may run; the backend decides *how*.
/// Outcomes flow back through [`Scheduler::handle_progress`], keyed by job id.
///
/// [`Scheduler::handle_progress`]: crate::core::Scheduler::handle_progress
///
/// # Example
///
/// ```rust,ignore
/// use async_trait::async_trait;
/// use package_job_scheduler::core::{BackendError, Job, JobBackend};
/// use package_job_scheduler::util::JobId;
///
/// #[derive(Clone)]
/// struct AptBackend;
///
/// #[async_trait]
/// impl JobBackend for AptBackend {
///     async fn execute(&self, job: Job) -> Result<(), BackendError> {
///         // spawn apt-get for job.kind() / job.package_id() and return
///         Ok(())
///     }
///
///     async fn abort(&self, id: JobId) -> Result<(), BackendError> {
///         Err(BackendError::from("not cancellable"))
///     }
/// }
/// ```
#[async_trait]
pub trait JobBackend: Send + Sync + Clone + 'static {
    /// Accept a job for execution and return promptly.
    ///
    /// `Ok` means the backend will eventually report terminal progress for
    /// this job id. The call must not wait for the operation to finish.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the backend refuses the job.
    async fn execute(&self, job: Job) -> Result<(), BackendError>;

    /// Best-effort cancellation of an in-flight execution.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the operation could not be cancelled.
    async fn abort(&self, id: JobId) -> Result<(), BackendError>;
}

/// Abstraction for spawning backend hand-offs on a runtime.
pub trait Spawn {
    /// Spawn a detached future.
    fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static;
}
