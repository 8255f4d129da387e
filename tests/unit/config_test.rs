//! Tests for configuration validation and loading

use std::collections::HashMap;
use std::time::Duration;

use package_job_scheduler::config::scheduler::{
    DEFAULT_DISPATCH_INTERVAL_MS, ENV_DISPATCH_INTERVAL_MS, ENV_DOWNLOAD_CAPACITY,
    ENV_SYSTEM_CHANGE_CAPACITY,
};
use package_job_scheduler::config::{QueueConfig, SchedulerConfig};
use package_job_scheduler::core::{
    DOWNLOAD_QUEUE, DOWNLOAD_QUEUE_CAPACITY, SYSTEM_CHANGE_QUEUE, SYSTEM_CHANGE_QUEUE_CAPACITY,
};

fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
        .collect();
    move |key: &str| map.get(key).cloned()
}

#[test]
fn test_default_config() {
    let cfg = SchedulerConfig::default();
    assert!(cfg.validate().is_ok());
    assert_eq!(cfg.dispatch_interval(), Duration::from_millis(500));
    assert_eq!(cfg.queues[DOWNLOAD_QUEUE].capacity, DOWNLOAD_QUEUE_CAPACITY);
    assert_eq!(
        cfg.queues[SYSTEM_CHANGE_QUEUE].capacity,
        SYSTEM_CHANGE_QUEUE_CAPACITY
    );
}

#[test]
fn test_queue_config_invalid_capacity() {
    assert!(QueueConfig { capacity: 0 }.validate().is_err());
    assert!(QueueConfig { capacity: 1 }.validate().is_ok());
}

#[test]
fn test_scheduler_config_invalid_interval() {
    let cfg = SchedulerConfig {
        dispatch_interval_ms: 0,
        ..SchedulerConfig::default()
    };
    assert!(cfg.validate().is_err());
}

#[test]
fn test_scheduler_config_requires_both_queues() {
    let mut cfg = SchedulerConfig::default();
    cfg.queues.remove(SYSTEM_CHANGE_QUEUE);
    let err = cfg.validate().unwrap_err();
    assert!(err.contains(SYSTEM_CHANGE_QUEUE));
}

#[test]
fn test_scheduler_config_from_json() {
    let json = r#"{
        "queues": {
            "download": { "capacity": 5 },
            "system-change": { "capacity": 1 }
        }
    }"#;
    let cfg = SchedulerConfig::from_json_str(json).unwrap();
    assert_eq!(cfg.dispatch_interval_ms, DEFAULT_DISPATCH_INTERVAL_MS);
    assert_eq!(cfg.queues[DOWNLOAD_QUEUE].capacity, 5);
}

#[test]
fn test_scheduler_config_from_json_rejects_invalid() {
    assert!(SchedulerConfig::from_json_str("{not json").is_err());

    let zero = r#"{
        "queues": {
            "download": { "capacity": 0 },
            "system-change": { "capacity": 1 }
        }
    }"#;
    let err = SchedulerConfig::from_json_str(zero).unwrap_err();
    assert!(err.contains("download"));
}

#[test]
fn test_from_lookup_without_overrides_is_default() {
    let cfg = SchedulerConfig::from_lookup(lookup(&[])).unwrap();
    assert_eq!(cfg, SchedulerConfig::default());
}

#[test]
fn test_from_lookup_overrides() {
    let cfg = SchedulerConfig::from_lookup(lookup(&[
        (ENV_DISPATCH_INTERVAL_MS, "250"),
        (ENV_DOWNLOAD_CAPACITY, " 8 "),
        (ENV_SYSTEM_CHANGE_CAPACITY, "2"),
    ]))
    .unwrap();
    assert_eq!(cfg.dispatch_interval_ms, 250);
    assert_eq!(cfg.queues[DOWNLOAD_QUEUE].capacity, 8);
    assert_eq!(cfg.queues[SYSTEM_CHANGE_QUEUE].capacity, 2);
}

#[test]
fn test_from_lookup_rejects_garbage() {
    let err = SchedulerConfig::from_lookup(lookup(&[(ENV_DOWNLOAD_CAPACITY, "many")]))
        .unwrap_err();
    assert!(err.to_string().contains(ENV_DOWNLOAD_CAPACITY));
}

#[test]
fn test_from_lookup_rejects_zero_capacity() {
    assert!(SchedulerConfig::from_lookup(lookup(&[(ENV_SYSTEM_CHANGE_CAPACITY, "0")])).is_err());
}
