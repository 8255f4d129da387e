//! API-facing request/response models.
//!
//! Transport-agnostic: an IPC or HTTP layer deserializes these, calls the
//! helpers, and serializes the answers.

use serde::{Deserialize, Serialize};

use crate::core::{
    JobBackend, JobKind, JobProgress, JobStatus, Scheduler, SchedulerError, Spawn,
};
use crate::util::ids::JobId;

/// Job creation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSubmission {
    /// Operation to perform.
    pub kind: JobKind,
    /// Target package; empty for whole-system operations.
    #[serde(default)]
    pub package_id: String,
    /// Operation to run on the same job afterwards.
    #[serde(default)]
    pub follow_up: Option<JobKind>,
}

/// Job status response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatusResponse {
    /// Job identifier.
    pub job_id: JobId,
    /// Current operation.
    pub kind: JobKind,
    /// Target package.
    pub package_id: String,
    /// Current status.
    pub status: JobStatus,
    /// Latest progress.
    pub progress: JobProgress,
    /// Pending follow-up operation.
    pub follow_up: Option<JobKind>,
}

/// Health response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Health {
    /// Healthy flag.
    pub ok: bool,
    /// Number of queues served.
    pub queues: usize,
}

/// Create a job from a submission.
///
/// # Errors
///
/// Propagates `SchedulerError::Conflict` and `SchedulerError::NotFound` from
/// job creation.
pub fn submit_job<B, S>(
    scheduler: &Scheduler<B, S>,
    req: &JobSubmission,
) -> Result<JobStatusResponse, SchedulerError>
where
    B: JobBackend,
    S: Spawn + Clone + Send + Sync + 'static,
{
    let job = scheduler.create_job_with_follow_up(req.kind, &req.package_id, req.follow_up)?;
    Ok(JobStatusResponse {
        job_id: job.id(),
        kind: job.kind(),
        package_id: job.package_id().to_owned(),
        status: job.status(),
        progress: job.progress().clone(),
        follow_up: job.next().map(|next| next.kind),
    })
}

/// Look up a job's status.
///
/// # Errors
///
/// Returns `SchedulerError::NotFound` if the job does not exist.
pub fn job_status<B, S>(
    scheduler: &Scheduler<B, S>,
    id: &JobId,
) -> Result<JobStatusResponse, SchedulerError>
where
    B: JobBackend,
    S: Spawn + Clone + Send + Sync + 'static,
{
    let job = scheduler
        .get_job(id)
        .ok_or_else(|| SchedulerError::job_not_found(id))?;
    Ok(JobStatusResponse {
        job_id: job.id(),
        kind: job.kind(),
        package_id: job.package_id().to_owned(),
        status: job.status(),
        progress: job.progress().clone(),
        follow_up: job.next().map(|next| next.kind),
    })
}

/// Return a health payload.
pub fn health<B, S>(scheduler: &Scheduler<B, S>) -> Health
where
    B: JobBackend,
    S: Spawn + Clone + Send + Sync + 'static,
{
    Health {
        ok: true,
        queues: scheduler.list_queues().len(),
    }
}
