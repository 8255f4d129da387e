//! Configuration models for queues and the dispatch loop.

pub mod scheduler;

pub use scheduler::{QueueConfig, SchedulerConfig};
