//! Tests for runtime adapters and the API surface

use std::time::Duration;

use package_job_scheduler::core::{JobKind, JobStatus, Scheduler, SchedulerError};
use package_job_scheduler::runtime::{
    health, job_status, submit_job, DispatchLoop, JobSubmission, TokioSpawner,
};
use package_job_scheduler::util::JobId;

use crate::{NoopSpawner, RecordingBackend};

#[tokio::test]
async fn test_tokio_spawner_runs_hand_offs() {
    let backend = RecordingBackend::default();
    let scheduler = Scheduler::with_default_queues(backend.clone(), TokioSpawner::current());
    let job = scheduler.create_job(JobKind::Download, "vim").unwrap();

    assert_eq!(scheduler.dispatch().promoted, 1);
    for _ in 0..50 {
        if !backend.executed().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(backend.executed(), vec![job.id()]);
}

#[test]
fn test_health_reports_queues() {
    let scheduler = Scheduler::with_default_queues(RecordingBackend::default(), NoopSpawner);
    let h = health(&scheduler);
    assert!(h.ok);
    assert_eq!(h.queues, 2);
}

#[test]
fn test_submit_and_query_job() {
    let scheduler = Scheduler::with_default_queues(RecordingBackend::default(), NoopSpawner);
    let req: JobSubmission = serde_json::from_str(
        r#"{ "kind": "download", "package_id": "vim", "follow_up": "install" }"#,
    )
    .unwrap();

    let created = submit_job(&scheduler, &req).unwrap();
    assert_eq!(created.status, JobStatus::Ready);
    assert_eq!(created.follow_up, Some(JobKind::Install));

    let status = job_status(&scheduler, &created.job_id).unwrap();
    assert_eq!(status.package_id, "vim");
    assert_eq!(status.kind, JobKind::Download);

    let err = submit_job(&scheduler, &req).unwrap_err();
    assert!(matches!(err, SchedulerError::Conflict { .. }));
}

#[test]
fn test_submission_defaults() {
    let req: JobSubmission = serde_json::from_str(r#"{ "kind": "dist_upgrade" }"#).unwrap();
    assert!(req.package_id.is_empty());
    assert!(req.follow_up.is_none());
}

#[test]
fn test_job_status_unknown() {
    let scheduler = Scheduler::with_default_queues(RecordingBackend::default(), NoopSpawner);
    let err = job_status(&scheduler, &JobId::new()).unwrap_err();
    assert!(matches!(err, SchedulerError::NotFound(_)));
}

#[tokio::test]
async fn test_dispatch_loop_shutdown() {
    let scheduler = Scheduler::with_default_queues(RecordingBackend::default(), NoopSpawner);
    let handle = DispatchLoop::spawn(scheduler, Duration::from_millis(10));
    assert!(!handle.is_finished());
    handle.shutdown().await.unwrap();
}
