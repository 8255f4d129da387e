//! Tests for error types

use package_job_scheduler::core::{BackendError, JobKind, JobStatus, SchedulerError};
use package_job_scheduler::util::JobId;

#[test]
fn test_not_found_display() {
    let err = SchedulerError::queue_not_found("download");
    assert_eq!(err.to_string(), "not found: queue `download`");

    let id = JobId::new();
    let err = SchedulerError::job_not_found(&id);
    assert_eq!(err.to_string(), format!("not found: job {id}"));
}

#[test]
fn test_conflict_display() {
    let err = SchedulerError::Conflict {
        kind: JobKind::Install,
        package_id: "vim".into(),
    };
    assert_eq!(
        err.to_string(),
        "conflict: install job for package `vim` already exists"
    );
}

#[test]
fn test_invalid_transition_display() {
    let id = JobId::new();
    let err = SchedulerError::InvalidTransition {
        job: id,
        from: JobStatus::End,
        to: JobStatus::Ready,
    };
    assert_eq!(
        err.to_string(),
        format!("job {id} cannot transition from end to ready")
    );
}

#[test]
fn test_abort_and_config_display() {
    assert_eq!(
        SchedulerError::AbortFailed("busy".into()).to_string(),
        "abort failed: busy"
    );
    assert_eq!(
        SchedulerError::InvalidConfig("capacity".into()).to_string(),
        "invalid configuration: capacity"
    );
}

#[test]
fn test_backend_error_conversions() {
    let from_str = BackendError::from("dpkg locked");
    let from_string = BackendError::from(String::from("dpkg locked"));
    assert_eq!(from_str, from_string);
    assert_eq!(from_str.to_string(), "dpkg locked");
}

#[test]
fn test_scheduler_error_into_anyhow() {
    let err: anyhow::Error = SchedulerError::AbortFailed("busy".into()).into();
    assert!(err.downcast_ref::<SchedulerError>().is_some());
}
