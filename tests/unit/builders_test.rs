//! Tests for builder modules

use package_job_scheduler::builders::build_scheduler;
use package_job_scheduler::config::{QueueConfig, SchedulerConfig};
use package_job_scheduler::core::{JobKind, SchedulerError, DOWNLOAD_QUEUE, SYSTEM_CHANGE_QUEUE};

use crate::{NoopSpawner, RecordingBackend};

#[test]
fn test_build_scheduler_from_config() {
    let mut cfg = SchedulerConfig::default();
    cfg.queues
        .insert(DOWNLOAD_QUEUE.to_owned(), QueueConfig { capacity: 5 });

    let scheduler = build_scheduler(&cfg, RecordingBackend::default(), NoopSpawner).unwrap();
    let queues = scheduler.list_queues();

    let names: Vec<&str> = queues.iter().map(|q| q.name.as_str()).collect();
    assert_eq!(names, vec![DOWNLOAD_QUEUE, SYSTEM_CHANGE_QUEUE]);
    assert_eq!(queues[0].capacity, 5);
    assert_eq!(queues[1].capacity, 1);
    assert!(queues.iter().all(|q| q.total == 0));
}

#[test]
fn test_build_scheduler_rejects_invalid_config() {
    let mut cfg = SchedulerConfig::default();
    cfg.queues.remove(DOWNLOAD_QUEUE);

    let Err(err) = build_scheduler(&cfg, RecordingBackend::default(), NoopSpawner) else {
        panic!("config without a download queue must be rejected");
    };
    assert!(matches!(err, SchedulerError::InvalidConfig(_)));
}

#[test]
fn test_built_scheduler_routes_jobs() {
    let scheduler =
        build_scheduler(&SchedulerConfig::default(), RecordingBackend::default(), NoopSpawner)
            .unwrap();
    scheduler.create_job(JobKind::Download, "vim").unwrap();
    scheduler.create_job(JobKind::Remove, "nano").unwrap();

    for queue in scheduler.list_queues() {
        assert_eq!(queue.total, 1, "queue {} holds one job", queue.name);
    }
}
