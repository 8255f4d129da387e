//! Audit trail of job lifecycle events.

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::util::clock::now_ms;
use crate::util::ids::JobId;

/// Lifecycle action recorded for a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Job admitted to a queue.
    Create,
    /// Job made runnable.
    Start,
    /// Job paused.
    Pause,
    /// Job marked finished by a caller.
    Clean,
    /// Job promoted to running by dispatch.
    Promote,
    /// Backend reported the job finished.
    Complete,
    /// Ended job revived as its follow-up.
    FollowUp,
    /// Ended job removed by dispatch.
    Reap,
    /// Job ended with a failure.
    Fail,
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Create => "create",
            Self::Start => "start",
            Self::Pause => "pause",
            Self::Clean => "clean",
            Self::Promote => "promote",
            Self::Complete => "complete",
            Self::FollowUp => "follow_up",
            Self::Reap => "reap",
            Self::Fail => "fail",
        };
        f.write_str(name)
    }
}

/// Audit event structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Event identifier.
    pub event_id: String,
    /// Related job.
    pub job_id: JobId,
    /// Queue holding the job.
    pub queue: String,
    /// Action taken.
    pub action: AuditAction,
    /// Timestamp milliseconds.
    pub created_at_ms: u128,
    /// Additional context.
    pub detail: Option<String>,
}

/// Audit sink abstraction.
pub trait AuditSink: Send {
    /// Record an audit event.
    fn record(&mut self, event: AuditEvent);
}

/// In-memory audit sink keeping the most recent events.
pub struct InMemoryAuditSink {
    events: VecDeque<AuditEvent>,
    max_events: usize,
}

impl InMemoryAuditSink {
    /// Create a new in-memory sink with a bounded buffer.
    #[must_use]
    pub fn new(max_events: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(max_events),
            max_events,
        }
    }

    /// Retrieve a snapshot of stored events.
    #[must_use]
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.iter().cloned().collect()
    }
}

impl AuditSink for InMemoryAuditSink {
    fn record(&mut self, event: AuditEvent) {
        if self.max_events == 0 {
            return;
        }
        if self.events.len() >= self.max_events {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }
}

/// Sink that forwards events to `tracing` at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&mut self, event: AuditEvent) {
        tracing::info!(
            target: "package_job_scheduler::audit",
            job_id = %event.job_id,
            queue = %event.queue,
            action = %event.action,
            detail = event.detail.as_deref().unwrap_or(""),
            "job audit"
        );
    }
}

/// Helper to build an audit event with a fresh id and the current time.
pub fn build_audit_event(
    job_id: JobId,
    queue: impl Into<String>,
    action: AuditAction,
    detail: Option<String>,
) -> AuditEvent {
    AuditEvent {
        event_id: Uuid::new_v4().to_string(),
        job_id,
        queue: queue.into(),
        action,
        created_at_ms: now_ms(),
        detail,
    }
}
