//! Job entity, operation kinds, and the status state machine.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::queue::{DOWNLOAD_QUEUE, SYSTEM_CHANGE_QUEUE};
use crate::core::SchedulerError;
use crate::util::clock::now_ms;
use crate::util::ids::JobId;

/// Package operation a job performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Fetch package archives without touching the system.
    Download,
    /// Install a package.
    Install,
    /// Remove a package.
    Remove,
    /// Upgrade a single package.
    Upgrade,
    /// Upgrade the whole distribution.
    DistUpgrade,
}

impl JobKind {
    /// Whether the operation mutates the package database.
    #[must_use]
    pub const fn changes_system(self) -> bool {
        !matches!(self, Self::Download)
    }

    /// Queue that admits a job of `kind` chained with `next`.
    ///
    /// A chain that changes the system at any step lives in the system-change
    /// queue for its whole life.
    #[must_use]
    pub const fn queue_for(kind: Self, next: Option<Self>) -> &'static str {
        let follow_up_changes = match next {
            Some(next) => next.changes_system(),
            None => false,
        };
        if kind.changes_system() || follow_up_changes {
            SYSTEM_CHANGE_QUEUE
        } else {
            DOWNLOAD_QUEUE
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Download => write!(f, "download"),
            Self::Install => write!(f, "install"),
            Self::Remove => write!(f, "remove"),
            Self::Upgrade => write!(f, "upgrade"),
            Self::DistUpgrade => write!(f, "dist_upgrade"),
        }
    }
}

/// Lifecycle status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Eligible for promotion by the next dispatch tick.
    Ready,
    /// Handed to the execution backend.
    Running,
    /// Not eligible for automatic promotion. New jobs start here.
    Paused,
    /// Terminal; reaped on the next dispatch tick unless a follow-up is chained.
    End,
}

impl JobStatus {
    /// Whether a requested transition from `self` to `to` is allowed.
    ///
    /// `End -> Ready` is deliberately absent: only [`Job::advance_follow_up`]
    /// may revive an ended job.
    #[must_use]
    pub const fn can_transition_to(self, to: Self) -> bool {
        matches!(
            (self, to),
            (Self::Paused, Self::Ready | Self::End)
                | (Self::Ready, Self::Running | Self::Paused | Self::End)
                | (Self::Running, Self::Paused | Self::End)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready => write!(f, "ready"),
            Self::Running => write!(f, "running"),
            Self::Paused => write!(f, "paused"),
            Self::End => write!(f, "end"),
        }
    }
}

/// Operation to run on the same job once the current one completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowUp {
    /// Kind the job switches to.
    pub kind: JobKind,
}

/// Last progress snapshot reported by the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobProgress {
    /// Completion percentage in `0.0..=100.0`.
    pub percentage: f64,
    /// Human-readable stage description.
    pub description: String,
    /// Failure detail, if the operation failed.
    pub failure: Option<String>,
    /// Time of the last update (ms since epoch), 0 if never updated.
    pub updated_at_ms: u128,
}

/// Progress report delivered by the backend for a job id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressReport {
    /// Job the report belongs to.
    pub job_id: JobId,
    /// Completion percentage.
    pub percentage: f64,
    /// Stage description.
    pub description: String,
    /// Whether the backend is done with this job.
    pub terminal: bool,
    /// Failure detail for a failed operation.
    pub failure: Option<String>,
}

impl ProgressReport {
    /// Non-terminal progress update.
    pub fn running(job_id: JobId, percentage: f64, description: impl Into<String>) -> Self {
        Self {
            job_id,
            percentage,
            description: description.into(),
            terminal: false,
            failure: None,
        }
    }

    /// Terminal report for a successful operation.
    pub fn succeeded(job_id: JobId) -> Self {
        Self {
            job_id,
            percentage: 100.0,
            description: "succeeded".into(),
            terminal: true,
            failure: None,
        }
    }

    /// Terminal report for a failed operation.
    pub fn failed(job_id: JobId, reason: impl Into<String>) -> Self {
        Self {
            job_id,
            percentage: 0.0,
            description: "failed".into(),
            terminal: true,
            failure: Some(reason.into()),
        }
    }
}

/// A single schedulable package operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    id: JobId,
    package_id: String,
    kind: JobKind,
    status: JobStatus,
    created_at_ms: u128,
    created_seq: u64,
    next: Option<FollowUp>,
    progress: JobProgress,
}

impl Job {
    /// Construct a job in the `Paused` state.
    ///
    /// `created_seq` orders jobs inside a queue and must increase with every
    /// job the scheduler creates. Whole-system upgrades carry no package id.
    pub fn new(kind: JobKind, package_id: impl Into<String>, created_seq: u64) -> Self {
        let package_id = match kind {
            JobKind::DistUpgrade => String::new(),
            _ => package_id.into(),
        };
        Self {
            id: JobId::new(),
            package_id,
            kind,
            status: JobStatus::Paused,
            created_at_ms: now_ms(),
            created_seq,
            next: None,
            progress: JobProgress::default(),
        }
    }

    /// Chain a follow-up operation onto this job.
    #[must_use]
    pub fn with_follow_up(mut self, kind: JobKind) -> Self {
        self.next = Some(FollowUp { kind });
        self
    }

    /// Job identifier.
    #[must_use]
    pub const fn id(&self) -> JobId {
        self.id
    }

    /// Target package (empty for whole-system operations).
    #[must_use]
    pub fn package_id(&self) -> &str {
        &self.package_id
    }

    /// Current operation kind.
    #[must_use]
    pub const fn kind(&self) -> JobKind {
        self.kind
    }

    /// Current status.
    #[must_use]
    pub const fn status(&self) -> JobStatus {
        self.status
    }

    /// Creation time in milliseconds since epoch.
    #[must_use]
    pub const fn created_at_ms(&self) -> u128 {
        self.created_at_ms
    }

    /// Creation sequence used for queue ordering.
    #[must_use]
    pub const fn created_seq(&self) -> u64 {
        self.created_seq
    }

    /// Pending follow-up, if any.
    #[must_use]
    pub const fn next(&self) -> Option<FollowUp> {
        self.next
    }

    /// Latest progress snapshot.
    #[must_use]
    pub const fn progress(&self) -> &JobProgress {
        &self.progress
    }

    /// Whether this job performs `kind` now or after its follow-up.
    #[must_use]
    pub fn covers(&self, kind: JobKind) -> bool {
        self.kind == kind || self.next.is_some_and(|next| next.kind == kind)
    }

    /// Apply a requested status transition.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::InvalidTransition` and leaves the status
    /// untouched if `to` is not reachable from the current status.
    pub fn transition(&mut self, to: JobStatus) -> Result<(), SchedulerError> {
        if !self.status.can_transition_to(to) {
            return Err(SchedulerError::InvalidTransition {
                job: self.id,
                from: self.status,
                to,
            });
        }
        tracing::debug!(job_id = %self.id, from = %self.status, to = %to, "job transition");
        self.status = to;
        Ok(())
    }

    /// Revive an ended job as its follow-up operation.
    ///
    /// The job keeps its id and creation order, switches to the follow-up kind,
    /// becomes `Ready` and loses its previous progress. Returns `false` (and
    /// changes nothing) when the job has not ended or has no follow-up.
    pub fn advance_follow_up(&mut self) -> bool {
        if self.status != JobStatus::End {
            return false;
        }
        let Some(next) = self.next.take() else {
            return false;
        };
        tracing::debug!(job_id = %self.id, from = %self.kind, to = %next.kind, "job follows up");
        self.kind = next.kind;
        self.status = JobStatus::Ready;
        self.progress = JobProgress::default();
        true
    }

    /// End the job with a failure detail and drop any follow-up.
    pub fn fail(&mut self, reason: impl Into<String>) {
        self.progress.failure = Some(reason.into());
        self.progress.updated_at_ms = now_ms();
        self.next = None;
        if self.status.can_transition_to(JobStatus::End) {
            self.status = JobStatus::End;
        }
    }

    /// Store the report's progress fields without touching the status.
    pub fn record_progress(&mut self, report: &ProgressReport) {
        self.progress.percentage = report.percentage.clamp(0.0, 100.0);
        self.progress.description.clone_from(&report.description);
        if report.failure.is_some() {
            self.progress.failure.clone_from(&report.failure);
        }
        self.progress.updated_at_ms = now_ms();
    }

    /// Merge a backend progress report. Returns `true` if the status changed.
    ///
    /// Terminal reports end `Ready` and `Running` jobs; a failed report also
    /// drops the follow-up. Paused jobs only record the progress: a report
    /// caused by an abort must not end a job the caller paused.
    pub fn apply_progress(&mut self, report: &ProgressReport) -> bool {
        self.record_progress(report);
        if !report.terminal {
            return false;
        }
        match self.status {
            JobStatus::Ready | JobStatus::Running => {
                if report.failure.is_some() {
                    self.next = None;
                }
                self.status = JobStatus::End;
                true
            }
            JobStatus::Paused | JobStatus::End => false,
        }
    }
}
