//! Core scheduling abstractions: jobs, queues, the scheduler and its contracts.

pub mod audit;
pub mod backend;
pub mod error;
pub mod job;
pub mod queue;
pub mod scheduler;

pub use audit::{
    build_audit_event, AuditAction, AuditEvent, AuditSink, InMemoryAuditSink, TracingAuditSink,
};
pub use backend::{JobBackend, Spawn};
pub use error::{AppResult, BackendError, SchedulerError};
pub use job::{FollowUp, Job, JobKind, JobProgress, JobStatus, ProgressReport};
pub use queue::{
    JobQueue, QueueSnapshot, DOWNLOAD_QUEUE, DOWNLOAD_QUEUE_CAPACITY, SYSTEM_CHANGE_QUEUE,
    SYSTEM_CHANGE_QUEUE_CAPACITY,
};
pub use scheduler::{DispatchReport, JobsChanged, Scheduler, NOTIFICATION_BUFFER};
