//! Tests for utility helpers

use std::str::FromStr;

use package_job_scheduler::util::{now_ms, JobId};
use uuid::Uuid;

#[test]
fn test_job_id_roundtrip_display() {
    let id = JobId::new();
    let parsed = JobId::from_str(&id.to_string()).unwrap();
    assert_eq!(parsed, id);
}

#[test]
fn test_job_id_rejects_garbage() {
    assert!("not-a-uuid".parse::<JobId>().is_err());
}

#[test]
fn test_job_id_unique_and_wraps_uuid() {
    assert_ne!(JobId::new(), JobId::new());

    let raw = Uuid::new_v4();
    assert_eq!(JobId::from_uuid(raw).as_uuid(), &raw);
}

#[test]
fn test_job_id_serializes_as_plain_string() {
    let id = JobId::new();
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, format!("\"{id}\""));
}

#[test]
fn test_now_ms_monotonic_enough() {
    let a = now_ms();
    let b = now_ms();
    assert!(a > 0);
    assert!(b >= a);
}
