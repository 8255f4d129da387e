//! Unit tests for individual components

mod audit_test;
mod builders_test;
mod config_test;
mod error_test;
mod runtime_test;
mod util_test;

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use package_job_scheduler::core::{BackendError, Job, JobBackend, Spawn};
use package_job_scheduler::util::JobId;
use parking_lot::Mutex;

/// Backend that records hand-offs and never reports progress.
#[derive(Clone, Default)]
struct RecordingBackend {
    executed: Arc<Mutex<Vec<JobId>>>,
}

impl RecordingBackend {
    fn executed(&self) -> Vec<JobId> {
        self.executed.lock().clone()
    }
}

#[async_trait]
impl JobBackend for RecordingBackend {
    async fn execute(&self, job: Job) -> Result<(), BackendError> {
        self.executed.lock().push(job.id());
        Ok(())
    }

    async fn abort(&self, _id: JobId) -> Result<(), BackendError> {
        Ok(())
    }
}

/// Spawner that drops the future; for tests that never await hand-offs.
#[derive(Clone, Copy, Default)]
struct NoopSpawner;

impl Spawn for NoopSpawner {
    fn spawn<F>(&self, _fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
    }
}
