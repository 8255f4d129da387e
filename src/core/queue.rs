//! Named, capacity-bounded job queues.
//!
//! A queue owns its jobs exclusively, keeps them ordered by creation and
//! decides how many `Ready` jobs may be promoted given the number already
//! running. It never rejects a job for capacity reasons: excess jobs simply
//! wait for a later dispatch tick.

use serde::{Deserialize, Serialize};

use crate::core::job::{Job, JobStatus};
use crate::core::SchedulerError;
use crate::util::ids::JobId;

/// Queue admitting download jobs.
pub const DOWNLOAD_QUEUE: &str = "download";
/// Default number of concurrent downloads.
pub const DOWNLOAD_QUEUE_CAPACITY: usize = 3;
/// Queue admitting jobs that mutate the package database.
pub const SYSTEM_CHANGE_QUEUE: &str = "system-change";
/// Package database mutations are serialized.
pub const SYSTEM_CHANGE_QUEUE_CAPACITY: usize = 1;

/// Point-in-time view of a queue for listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    /// Queue name.
    pub name: String,
    /// Maximum number of running jobs.
    pub capacity: usize,
    /// Jobs currently running.
    pub running: usize,
    /// Jobs waiting for promotion.
    pub ready: usize,
    /// All jobs held by the queue.
    pub total: usize,
}

/// Ordered collection of jobs sharing one admission policy.
#[derive(Debug, Clone)]
pub struct JobQueue {
    name: String,
    capacity: usize,
    jobs: Vec<Job>,
}

impl JobQueue {
    /// Create an empty queue running at most `capacity` jobs at once.
    pub fn new(name: impl Into<String>, capacity: usize) -> Self {
        Self {
            name: name.into(),
            capacity,
            jobs: Vec::new(),
        }
    }

    /// Queue name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Maximum number of simultaneously running jobs.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Jobs in consideration order.
    #[must_use]
    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    /// Number of jobs held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    /// Whether the queue holds no jobs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Look up a job by id.
    #[must_use]
    pub fn find(&self, id: &JobId) -> Option<&Job> {
        self.jobs.iter().find(|job| job.id() == *id)
    }

    /// Look up a job by id for mutation.
    pub fn find_mut(&mut self, id: &JobId) -> Option<&mut Job> {
        self.jobs.iter_mut().find(|job| job.id() == *id)
    }

    /// Admit a job.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::Conflict` if a job for the same package and
    /// kind is already in the queue.
    pub fn add(&mut self, job: Job) -> Result<(), SchedulerError> {
        if self
            .jobs
            .iter()
            .any(|j| j.package_id() == job.package_id() && j.kind() == job.kind())
        {
            return Err(SchedulerError::Conflict {
                kind: job.kind(),
                package_id: job.package_id().to_owned(),
            });
        }
        self.jobs.push(job);
        self.sort();
        Ok(())
    }

    /// Admit a job and move it straight to the front of the queue.
    ///
    /// # Errors
    ///
    /// Same as [`add`](Self::add); the queue is unchanged on error.
    pub fn add_raised(&mut self, job: Job) -> Result<(), SchedulerError> {
        let id = job.id();
        self.add(job)?;
        if let Some(index) = self.jobs.iter().position(|job| job.id() == id) {
            self.jobs[..=index].rotate_right(1);
        }
        Ok(())
    }

    /// Remove a job and hand it back to the caller.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::NotFound` if the job is not in this queue.
    pub fn remove(&mut self, id: &JobId) -> Result<Job, SchedulerError> {
        let index = self.position(id)?;
        let job = self.jobs.remove(index);
        self.sort();
        Ok(job)
    }

    /// Move a job to the front of the queue, keeping the others in order.
    ///
    /// The effect lasts until the next `add` or `remove`, which restore
    /// creation order.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::NotFound` if the job is not in this queue.
    pub fn raise(&mut self, id: &JobId) -> Result<(), SchedulerError> {
        let index = self.position(id)?;
        self.jobs[..=index].rotate_right(1);
        Ok(())
    }

    /// Number of jobs currently running.
    #[must_use]
    pub fn running_count(&self) -> usize {
        self.count(JobStatus::Running)
    }

    /// Ready jobs that fit in the remaining capacity, in queue order.
    #[must_use]
    pub fn pending_jobs(&self) -> Vec<&Job> {
        self.pending_jobs_where(|_| true)
    }

    /// Like [`pending_jobs`](Self::pending_jobs), skipping ready jobs for
    /// which `eligible` returns `false`.
    #[must_use]
    pub fn pending_jobs_where<F>(&self, eligible: F) -> Vec<&Job>
    where
        F: Fn(&Job) -> bool,
    {
        let space = self.capacity.saturating_sub(self.running_count());
        let mut ready: Vec<&Job> = self
            .jobs
            .iter()
            .filter(|job| job.status() == JobStatus::Ready && eligible(*job))
            .collect();
        if ready.len() > space {
            let waiting: Vec<String> = ready[space..].iter().map(|j| j.id().to_string()).collect();
            tracing::debug!(queue = %self.name, ?waiting, "jobs waiting for capacity");
            ready.truncate(space);
        }
        ready
    }

    /// Counts for listings.
    #[must_use]
    pub fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            name: self.name.clone(),
            capacity: self.capacity,
            running: self.running_count(),
            ready: self.count(JobStatus::Ready),
            total: self.jobs.len(),
        }
    }

    fn count(&self, status: JobStatus) -> usize {
        self.jobs.iter().filter(|job| job.status() == status).count()
    }

    fn position(&self, id: &JobId) -> Result<usize, SchedulerError> {
        self.jobs
            .iter()
            .position(|job| job.id() == *id)
            .ok_or_else(|| SchedulerError::job_not_found(id))
    }

    fn sort(&mut self) {
        self.jobs.sort_by_key(Job::created_seq);
    }
}
