//! Build a scheduler and its queues from configuration.

use crate::config::SchedulerConfig;
use crate::core::{JobBackend, JobQueue, Scheduler, SchedulerError, Spawn};

/// Build a scheduler with one queue per configured entry.
///
/// Queues are created in name order so listings are stable.
///
/// # Errors
///
/// Returns `SchedulerError::InvalidConfig` if the configuration fails validation.
pub fn build_scheduler<B, S>(
    cfg: &SchedulerConfig,
    backend: B,
    spawner: S,
) -> Result<Scheduler<B, S>, SchedulerError>
where
    B: JobBackend,
    S: Spawn + Clone + Send + Sync + 'static,
{
    cfg.validate().map_err(SchedulerError::InvalidConfig)?;

    let mut names: Vec<&String> = cfg.queues.keys().collect();
    names.sort();
    let queues = names.into_iter().map(|name| {
        let capacity = cfg.queues[name].capacity;
        tracing::debug!(queue = %name, capacity, "configuring queue");
        JobQueue::new(name.clone(), capacity)
    });

    Ok(Scheduler::new(queues, backend, spawner))
}
