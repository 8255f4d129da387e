//! Tests for audit sinks

use package_job_scheduler::core::{
    build_audit_event, AuditAction, AuditSink, InMemoryAuditSink, TracingAuditSink,
};
use package_job_scheduler::util::JobId;

#[test]
fn test_in_memory_audit_sink() {
    let mut sink = InMemoryAuditSink::new(10);
    let id = JobId::new();

    sink.record(build_audit_event(
        id,
        "download",
        AuditAction::Create,
        Some("vim".to_string()),
    ));

    let events = sink.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].job_id, id);
    assert_eq!(events[0].queue, "download");
    assert_eq!(events[0].action, AuditAction::Create);
    assert_eq!(events[0].detail.as_deref(), Some("vim"));
}

#[test]
fn test_audit_sink_overflow() {
    let mut sink = InMemoryAuditSink::new(2);
    let ids = [JobId::new(), JobId::new(), JobId::new()];

    for id in ids {
        sink.record(build_audit_event(id, "download", AuditAction::Start, None));
    }

    let events = sink.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].job_id, ids[1]); // oldest dropped
    assert_eq!(events[1].job_id, ids[2]);
}

#[test]
fn test_zero_capacity_sink_keeps_nothing() {
    let mut sink = InMemoryAuditSink::new(0);
    sink.record(build_audit_event(JobId::new(), "download", AuditAction::Reap, None));
    assert!(sink.events().is_empty());
}

#[test]
fn test_build_audit_event() {
    let id = JobId::new();
    let a = build_audit_event(id, "system-change", AuditAction::Fail, Some("boom".into()));
    let b = build_audit_event(id, "system-change", AuditAction::Fail, None);

    assert_ne!(a.event_id, b.event_id);
    assert_eq!(a.queue, "system-change");
    assert!(a.created_at_ms > 0);
}

#[test]
fn test_audit_action_serde_matches_display() {
    for action in [
        AuditAction::Create,
        AuditAction::FollowUp,
        AuditAction::Reap,
    ] {
        let json = serde_json::to_string(&action).unwrap();
        assert_eq!(json, format!("\"{action}\""));
    }
}

#[test]
fn test_tracing_sink_accepts_events() {
    let mut sink = TracingAuditSink;
    sink.record(build_audit_event(JobId::new(), "download", AuditAction::Promote, None));
}
