//! Runtime adapters: tokio spawning, the dispatch loop, and the API surface.

pub mod api;
pub mod dispatch_loop;
pub mod tokio_spawner;

pub use api::{health, job_status, submit_job, Health, JobStatusResponse, JobSubmission};
pub use dispatch_loop::{DispatchHandle, DispatchLoop};
pub use tokio_spawner::TokioSpawner;
