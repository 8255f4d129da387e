//! Multi-queue job scheduler.
//!
//! The scheduler owns every queue behind a single `parking_lot::Mutex`. All
//! mutating operations (create, start, pause, clean, progress updates and the
//! dispatch tick) take that lock for their whole critical section, and none of
//! them holds it across an `.await`: backend aborts and execution hand-offs run
//! outside the lock, with only the resulting status change applied under it.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::core::audit::{build_audit_event, AuditAction, AuditSink};
use crate::core::backend::{JobBackend, Spawn};
use crate::core::error::BackendError;
use crate::core::job::{Job, JobKind, JobStatus, ProgressReport};
use crate::core::queue::{
    JobQueue, QueueSnapshot, DOWNLOAD_QUEUE, DOWNLOAD_QUEUE_CAPACITY, SYSTEM_CHANGE_QUEUE,
    SYSTEM_CHANGE_QUEUE_CAPACITY,
};
use crate::core::SchedulerError;
use crate::util::ids::JobId;

/// Buffered change notifications per subscriber before old ones are dropped.
pub const NOTIFICATION_BUFFER: usize = 64;

type SharedAudit = Arc<Mutex<Box<dyn AuditSink>>>;

/// Change notification emitted at most once per dispatch tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobsChanged {
    /// Dispatch tick that observed the changes.
    pub tick: u64,
    /// Snapshot of every job after the tick.
    pub jobs: Vec<Job>,
}

/// Summary of one dispatch tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Tick number, starting at 1.
    pub tick: u64,
    /// Jobs promoted to running.
    pub promoted: usize,
    /// Ended jobs revived as their follow-up.
    pub followed_up: usize,
    /// Ended jobs removed.
    pub reaped: usize,
    /// Whether a change notification was emitted.
    pub notified: bool,
}

/// State guarded by the scheduler-wide lock.
struct SchedulerState {
    queues: BTreeMap<String, JobQueue>,
    /// Running jobs with a backend abort in flight, and the terminal report
    /// held back while it is.
    aborting: HashMap<JobId, Option<ProgressReport>>,
    changed: bool,
    next_seq: u64,
    tick: u64,
}

impl SchedulerState {
    fn jobs(&self) -> impl Iterator<Item = &Job> {
        self.queues.values().flat_map(|queue| queue.jobs().iter())
    }

    fn queue_of(&self, id: &JobId) -> Option<&JobQueue> {
        self.queues.values().find(|queue| queue.find(id).is_some())
    }

    fn queue_of_mut(&mut self, id: &JobId) -> Option<&mut JobQueue> {
        self.queues
            .values_mut()
            .find(|queue| queue.find(id).is_some())
    }

    /// Resolve a job for mutation, returning its queue name alongside.
    fn job_mut(&mut self, id: &JobId) -> Result<(String, &mut Job), SchedulerError> {
        let queue = self
            .queue_of_mut(id)
            .ok_or_else(|| SchedulerError::job_not_found(id))?;
        let name = queue.name().to_owned();
        let job = queue
            .find_mut(id)
            .ok_or_else(|| SchedulerError::job_not_found(id))?;
        Ok((name, job))
    }
}

/// Job scheduler coordinating package operations across named queues.
///
/// Cloning is cheap and yields a handle to the same scheduler.
#[derive(Clone)]
pub struct Scheduler<B, S> {
    state: Arc<Mutex<SchedulerState>>,
    backend: B,
    spawner: S,
    notifier: broadcast::Sender<JobsChanged>,
    audit: Option<SharedAudit>,
}

impl<B, S> Scheduler<B, S>
where
    B: JobBackend,
    S: Spawn + Clone + Send + Sync + 'static,
{
    /// Create a scheduler owning `queues`.
    ///
    /// Download jobs are routed to [`DOWNLOAD_QUEUE`] and everything else to
    /// [`SYSTEM_CHANGE_QUEUE`]; creating a job whose queue is missing fails
    /// with `NotFound`.
    pub fn new(queues: impl IntoIterator<Item = JobQueue>, backend: B, spawner: S) -> Self {
        let queues = queues
            .into_iter()
            .map(|queue| (queue.name().to_owned(), queue))
            .collect();
        let (notifier, _) = broadcast::channel(NOTIFICATION_BUFFER);
        Self {
            state: Arc::new(Mutex::new(SchedulerState {
                queues,
                aborting: HashMap::new(),
                changed: false,
                next_seq: 0,
                tick: 0,
            })),
            backend,
            spawner,
            notifier,
            audit: None,
        }
    }

    /// Create a scheduler with the standard download and system-change queues.
    pub fn with_default_queues(backend: B, spawner: S) -> Self {
        Self::new(
            [
                JobQueue::new(DOWNLOAD_QUEUE, DOWNLOAD_QUEUE_CAPACITY),
                JobQueue::new(SYSTEM_CHANGE_QUEUE, SYSTEM_CHANGE_QUEUE_CAPACITY),
            ],
            backend,
            spawner,
        )
    }

    /// Attach an audit sink.
    #[must_use]
    pub fn with_audit(mut self, audit: Box<dyn AuditSink>) -> Self {
        self.audit = Some(Arc::new(Mutex::new(audit)));
        self
    }

    /// Receive a [`JobsChanged`] notification after every tick that changed state.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<JobsChanged> {
        self.notifier.subscribe()
    }

    /// Create a job and make it runnable.
    ///
    /// # Errors
    ///
    /// - `SchedulerError::Conflict` if a live job for `package_id` already
    ///   performs `kind`, now or as its follow-up
    /// - `SchedulerError::NotFound` if the target queue does not exist
    pub fn create_job(&self, kind: JobKind, package_id: &str) -> Result<Job, SchedulerError> {
        self.create_job_with_follow_up(kind, package_id, None)
    }

    /// Create a job that continues as `next` once `kind` completes.
    ///
    /// A chain ending in a system change lives in the system-change queue for
    /// its whole life, so package database mutations stay serialized.
    ///
    /// # Errors
    ///
    /// Same as [`create_job`](Self::create_job); `next` is also checked for
    /// conflicts.
    pub fn create_job_with_follow_up(
        &self,
        kind: JobKind,
        package_id: &str,
        next: Option<JobKind>,
    ) -> Result<Job, SchedulerError> {
        let mut state = self.state.lock();

        let mut job = Job::new(kind, package_id, state.next_seq);
        if let Some(next) = next {
            job = job.with_follow_up(next);
        }
        job.transition(JobStatus::Ready)?;

        let requested = std::iter::once(kind).chain(next);
        for wanted in requested {
            if state
                .jobs()
                .any(|live| live.package_id() == job.package_id() && live.covers(wanted))
            {
                tracing::warn!(%wanted, package_id = job.package_id(), "rejecting duplicate job");
                return Err(SchedulerError::Conflict {
                    kind: wanted,
                    package_id: job.package_id().to_owned(),
                });
            }
        }

        let queue_name = JobKind::queue_for(kind, next);
        let created = job.clone();
        let queue = state
            .queues
            .get_mut(queue_name)
            .ok_or_else(|| SchedulerError::queue_not_found(queue_name))?;
        queue.add_raised(job)?;
        state.next_seq += 1;
        state.changed = true;

        let id = created.id();
        self.record(id, queue_name, AuditAction::Create, None);
        self.record(id, queue_name, AuditAction::Start, None);
        tracing::info!(job_id = %id, %kind, package_id, queue = queue_name, "job created");
        Ok(created)
    }

    /// Make a job runnable and move it to the front of its queue.
    ///
    /// # Errors
    ///
    /// - `SchedulerError::NotFound` if no queue holds the job
    /// - `SchedulerError::InvalidTransition` if the job cannot become ready
    pub fn start_job(&self, id: &JobId) -> Result<(), SchedulerError> {
        let mut state = self.state.lock();
        self.start_locked(&mut state, id)
    }

    /// Mark a job finished; the next dispatch tick reaps it or runs its
    /// follow-up.
    ///
    /// # Errors
    ///
    /// - `SchedulerError::NotFound` if no queue holds the job
    /// - `SchedulerError::InvalidTransition` if the job already ended
    pub fn clean_job(&self, id: &JobId) -> Result<(), SchedulerError> {
        let mut state = self.state.lock();
        let (queue, job) = state.job_mut(id)?;
        job.transition(JobStatus::End)?;
        state.changed = true;
        self.record(*id, &queue, AuditAction::Clean, None);
        tracing::info!(job_id = %id, %queue, "job cleaned");
        Ok(())
    }

    /// Pause a job.
    ///
    /// A running job is aborted through the backend first, without holding the
    /// scheduler lock; it is paused only if the abort succeeds. Terminal
    /// progress arriving while the abort is in flight is recorded but does not
    /// end the job; it takes effect only if the abort fails. A ready job has
    /// nothing in flight and is paused directly.
    ///
    /// # Errors
    ///
    /// - `SchedulerError::NotFound` if no queue holds the job
    /// - `SchedulerError::AbortFailed` if the backend could not abort it, or
    ///   another abort for it is already in flight
    /// - `SchedulerError::InvalidTransition` if the job is neither ready nor
    ///   running, or was cleaned while the abort was in flight
    pub async fn pause_job(&self, id: &JobId) -> Result<(), SchedulerError> {
        {
            let mut state = self.state.lock();
            if state.aborting.contains_key(id) {
                return Err(SchedulerError::AbortFailed(format!(
                    "abort already in flight for job {id}"
                )));
            }
            let (queue, job) = state.job_mut(id)?;
            if job.status() != JobStatus::Running {
                job.transition(JobStatus::Paused)?;
                state.changed = true;
                self.record(*id, &queue, AuditAction::Pause, None);
                tracing::info!(job_id = %id, %queue, "job paused");
                return Ok(());
            }
            state.aborting.insert(*id, None);
        }

        let mut in_flight = AbortInFlight {
            state: &self.state,
            id: *id,
            settled: false,
        };
        let aborted = self.backend.abort(*id).await;

        let mut state = self.state.lock();
        in_flight.settled = true;
        let held_back = state.aborting.remove(id).flatten();
        if let Err(err) = aborted {
            tracing::warn!(job_id = %id, error = %err, "abort failed, job left running");
            if let Some(report) = held_back {
                self.apply_progress_locked(&mut state, &report);
            }
            return Err(SchedulerError::AbortFailed(err.to_string()));
        }

        let (queue, job) = state.job_mut(id)?;
        job.transition(JobStatus::Paused)?;
        state.changed = true;
        self.record(*id, &queue, AuditAction::Pause, Some("aborted".into()));
        tracing::info!(job_id = %id, %queue, "running job aborted and paused");
        Ok(())
    }

    /// Merge a backend progress report into its job.
    ///
    /// Reports for unknown jobs are logged and dropped; the backend and the
    /// scheduler may briefly disagree on job lifetimes. Returns whether the
    /// report was applied.
    pub fn handle_progress(&self, report: &ProgressReport) -> bool {
        let mut state = self.state.lock();
        self.apply_progress_locked(&mut state, report)
    }

    /// Run one dispatch tick.
    ///
    /// For each queue: ended jobs are revived as their follow-up or removed,
    /// then as many ready jobs as capacity allows are marked running and handed
    /// to the backend. A job revived in this tick waits for the next one. If
    /// anything changed since the previous tick, exactly one [`JobsChanged`]
    /// notification is sent.
    ///
    /// Never fails and never waits on the backend.
    pub fn dispatch(&self) -> DispatchReport {
        let (promoted, notification, mut report) = {
            let mut state = self.state.lock();
            state.tick += 1;
            let mut report = DispatchReport {
                tick: state.tick,
                ..DispatchReport::default()
            };
            let mut promoted = Vec::new();
            let mut changed = false;

            for queue in state.queues.values_mut() {
                let name = queue.name().to_owned();
                let ended: Vec<JobId> = queue
                    .jobs()
                    .iter()
                    .filter(|job| job.status() == JobStatus::End)
                    .map(Job::id)
                    .collect();

                let mut revived = Vec::new();
                for id in ended {
                    changed = true;
                    if queue
                        .find_mut(&id)
                        .is_some_and(|job| job.advance_follow_up())
                    {
                        report.followed_up += 1;
                        revived.push(id);
                        self.record(id, &name, AuditAction::FollowUp, None);
                        tracing::info!(job_id = %id, queue = %name, "job continues with follow-up");
                    } else if queue.remove(&id).is_ok() {
                        report.reaped += 1;
                        self.record(id, &name, AuditAction::Reap, None);
                        tracing::info!(job_id = %id, queue = %name, "job reaped");
                    }
                }

                let ready: Vec<JobId> = queue
                    .pending_jobs_where(|job| !revived.contains(&job.id()))
                    .into_iter()
                    .map(Job::id)
                    .collect();
                for id in ready {
                    let Some(job) = queue.find_mut(&id) else {
                        continue;
                    };
                    if job.transition(JobStatus::Running).is_ok() {
                        changed = true;
                        report.promoted += 1;
                        promoted.push(job.clone());
                        self.record(id, &name, AuditAction::Promote, None);
                        tracing::info!(job_id = %id, queue = %name, kind = %job.kind(), "job promoted");
                    }
                }
            }

            state.changed |= changed;
            let notification = std::mem::take(&mut state.changed).then(|| JobsChanged {
                tick: report.tick,
                jobs: state.jobs().cloned().collect(),
            });
            (promoted, notification, report)
        };

        for job in promoted {
            self.hand_off(job);
        }

        if let Some(notification) = notification {
            report.notified = true;
            if self.notifier.send(notification).is_err() {
                tracing::trace!(tick = report.tick, "no change subscribers");
            }
        }
        report
    }

    /// Snapshot of every job, queue by queue in consideration order.
    #[must_use]
    pub fn list_jobs(&self) -> Vec<Job> {
        self.state.lock().jobs().cloned().collect()
    }

    /// Snapshot of a single job.
    #[must_use]
    pub fn get_job(&self, id: &JobId) -> Option<Job> {
        let state = self.state.lock();
        state.queue_of(id).and_then(|queue| queue.find(id)).cloned()
    }

    /// Per-queue counts.
    #[must_use]
    pub fn list_queues(&self) -> Vec<QueueSnapshot> {
        self.state
            .lock()
            .queues
            .values()
            .map(JobQueue::snapshot)
            .collect()
    }

    fn apply_progress_locked(&self, state: &mut SchedulerState, report: &ProgressReport) -> bool {
        let holding = state.aborting.contains_key(&report.job_id);
        let Ok((queue, job)) = state.job_mut(&report.job_id) else {
            tracing::warn!(
                job_id = %report.job_id,
                description = %report.description,
                "dropping progress for unknown job"
            );
            return false;
        };
        let ended = if holding {
            job.record_progress(report);
            false
        } else {
            job.apply_progress(report)
        };
        state.changed = true;

        if holding && report.terminal {
            tracing::debug!(job_id = %report.job_id, %queue, "holding terminal report until abort settles");
            state.aborting.insert(report.job_id, Some(report.clone()));
        }
        if ended {
            let action = if report.failure.is_some() {
                AuditAction::Fail
            } else {
                AuditAction::Complete
            };
            self.record(report.job_id, &queue, action, report.failure.clone());
            tracing::info!(job_id = %report.job_id, %queue, %action, "job finished");
        }
        true
    }

    fn start_locked(&self, state: &mut SchedulerState, id: &JobId) -> Result<(), SchedulerError> {
        let queue = state
            .queue_of_mut(id)
            .ok_or_else(|| SchedulerError::job_not_found(id))?;
        let job = queue
            .find_mut(id)
            .ok_or_else(|| SchedulerError::job_not_found(id))?;
        job.transition(JobStatus::Ready)?;
        queue.raise(id)?;
        let name = queue.name().to_owned();
        state.changed = true;
        self.record(*id, &name, AuditAction::Start, None);
        tracing::info!(job_id = %id, queue = %name, "job started");
        Ok(())
    }

    /// Hand a promoted job to the backend without waiting for it.
    fn hand_off(&self, job: Job) {
        let backend = self.backend.clone();
        let state = Arc::clone(&self.state);
        let audit = self.audit.clone();
        self.spawner.spawn(async move {
            let id = job.id();
            tracing::debug!(job_id = %id, kind = %job.kind(), "handing job to backend");
            if let Err(err) = backend.execute(job).await {
                reject_hand_off(&state, audit.as_ref(), id, &err);
            }
        });
    }

    fn record(&self, id: JobId, queue: &str, action: AuditAction, detail: Option<String>) {
        record_audit(self.audit.as_ref(), id, queue, action, detail);
    }
}

/// Clears a pending abort if `pause_job` is dropped before the backend answers.
///
/// The outcome is unknown, so any held-back terminal report is applied as if
/// the abort had failed.
struct AbortInFlight<'a> {
    state: &'a Mutex<SchedulerState>,
    id: JobId,
    settled: bool,
}

impl Drop for AbortInFlight<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut state = self.state.lock();
        let Some(held_back) = state.aborting.remove(&self.id) else {
            return;
        };
        if let Some(report) = held_back {
            if let Ok((_, job)) = state.job_mut(&self.id) {
                job.apply_progress(&report);
            }
            state.changed = true;
        }
        tracing::debug!(job_id = %self.id, "pause dropped while abort in flight");
    }
}

/// End a job whose hand-off the backend refused. No retry is attempted.
fn reject_hand_off(
    state: &Mutex<SchedulerState>,
    audit: Option<&SharedAudit>,
    id: JobId,
    err: &BackendError,
) {
    tracing::warn!(job_id = %id, error = %err, "backend rejected job");
    let mut state = state.lock();
    let Ok((queue, job)) = state.job_mut(&id) else {
        tracing::debug!(job_id = %id, "rejected job already gone");
        return;
    };
    if job.status() != JobStatus::Running {
        return;
    }
    let reason = format!("backend rejected job: {err}");
    job.fail(reason.clone());
    state.changed = true;
    record_audit(audit, id, &queue, AuditAction::Fail, Some(reason));
}

fn record_audit(
    audit: Option<&SharedAudit>,
    id: JobId,
    queue: &str,
    action: AuditAction,
    detail: Option<String>,
) {
    if let Some(sink) = audit {
        sink.lock()
            .record(build_audit_event(id, queue, action, detail));
    }
}
