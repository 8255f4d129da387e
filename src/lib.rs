//! # Package Job Scheduler
//!
//! A multi-queue scheduler for package-management operations: downloads,
//! installs, removals, single-package upgrades and whole-distribution upgrades.
//!
//! Jobs are routed to named, capacity-bounded queues. Downloads share a
//! `download` queue that runs a few at once; everything that mutates the
//! package database goes through a `system-change` queue running one job at a
//! time. A periodic dispatch tick promotes ready jobs within capacity, hands
//! them to an execution backend, reaps finished jobs and continues chained
//! follow-ups (download, then install) under the same job id.
//!
//! ## Key Features
//!
//! - **Per-queue concurrency limits**: excess jobs wait, they are never rejected
//! - **Duplicate detection**: one live job per package and operation
//! - **Follow-up chaining**: a job can switch to a second operation when the first completes
//! - **Coalesced notifications**: at most one change event per dispatch tick
//! - **Pluggable backend**: the scheduler decides *when*, a [`core::JobBackend`] decides *how*
//!
//! ## Example
//!
//! ```rust,ignore
//! use package_job_scheduler::core::{JobKind, Scheduler};
//! use package_job_scheduler::runtime::{DispatchLoop, TokioSpawner};
//!
//! let scheduler = Scheduler::with_default_queues(my_backend, TokioSpawner::current());
//! let job = scheduler.create_job_with_follow_up(JobKind::Download, "vim", Some(JobKind::Install))?;
//!
//! let dispatch = DispatchLoop::spawn(scheduler.clone(), Duration::from_millis(500));
//! // backend reports progress through scheduler.handle_progress(..)
//! dispatch.shutdown().await?;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Jobs, queues, the scheduler and its backend contracts.
pub mod core;
/// Configuration models for queues and the dispatch interval.
pub mod config;
/// Builders to construct the scheduler from configuration.
pub mod builders;
/// Tokio spawning, the dispatch loop, and the API surface.
pub mod runtime;
/// Shared utilities.
pub mod util;
