//! Periodic dispatch task.
//!
//! Runs [`Scheduler::dispatch`] on a fixed interval until cancelled. The tick
//! itself is synchronous and only triggers backend work, so a slow backend
//! never delays the loop.

use std::time::Duration;

use tokio::task::{JoinError, JoinHandle};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::core::{JobBackend, Scheduler, Spawn};

/// Starts dispatch loops.
pub struct DispatchLoop;

impl DispatchLoop {
    /// Spawn the loop on the current tokio runtime.
    ///
    /// The first tick runs one `interval` after spawning. A zero interval is
    /// raised to one millisecond.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn spawn<B, S>(scheduler: Scheduler<B, S>, interval: Duration) -> DispatchHandle
    where
        B: JobBackend,
        S: Spawn + Clone + Send + Sync + 'static,
    {
        let interval = interval.max(Duration::from_millis(1));
        let token = CancellationToken::new();
        let cancelled = token.clone();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick of a tokio interval completes immediately.
            ticker.tick().await;
            tracing::info!(interval_ms = interval.as_millis(), "dispatch loop started");

            loop {
                tokio::select! {
                    () = cancelled.cancelled() => {
                        tracing::info!("dispatch loop shutting down");
                        break;
                    }
                    _ = ticker.tick() => {
                        let report = scheduler.dispatch();
                        if report.promoted > 0 || report.reaped > 0 || report.followed_up > 0 {
                            tracing::debug!(
                                tick = report.tick,
                                promoted = report.promoted,
                                reaped = report.reaped,
                                followed_up = report.followed_up,
                                "dispatch tick"
                            );
                        }
                    }
                }
            }
        });

        DispatchHandle { token, task }
    }
}

/// Owner of a running dispatch loop.
///
/// Dropping the handle cancels the loop; no timer outlives it.
#[derive(Debug)]
pub struct DispatchHandle {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl DispatchHandle {
    /// Ask the loop to stop after the current tick.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Whether the loop task has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the loop and wait for it to exit.
    ///
    /// # Errors
    ///
    /// Returns the `JoinError` if the loop task panicked.
    pub async fn shutdown(mut self) -> Result<(), JoinError> {
        self.token.cancel();
        (&mut self.task).await
    }
}

impl Drop for DispatchHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
