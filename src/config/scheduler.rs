//! Queue and scheduler configuration structures.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::core::{
    AppResult, DOWNLOAD_QUEUE, DOWNLOAD_QUEUE_CAPACITY, SYSTEM_CHANGE_QUEUE,
    SYSTEM_CHANGE_QUEUE_CAPACITY,
};

/// Default pause between dispatch ticks.
pub const DEFAULT_DISPATCH_INTERVAL_MS: u64 = 500;

/// Environment variable overriding the dispatch interval.
pub const ENV_DISPATCH_INTERVAL_MS: &str = "SCHEDULER_DISPATCH_INTERVAL_MS";
/// Environment variable overriding the download queue capacity.
pub const ENV_DOWNLOAD_CAPACITY: &str = "SCHEDULER_DOWNLOAD_CAPACITY";
/// Environment variable overriding the system-change queue capacity.
pub const ENV_SYSTEM_CHANGE_CAPACITY: &str = "SCHEDULER_SYSTEM_CHANGE_CAPACITY";

/// Queue configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Maximum number of jobs running at once.
    pub capacity: usize,
}

impl QueueConfig {
    /// Validate queue configuration values.
    ///
    /// # Errors
    ///
    /// Returns a message describing the first invalid value.
    pub fn validate(&self) -> Result<(), String> {
        if self.capacity == 0 {
            return Err("capacity must be greater than 0".into());
        }
        Ok(())
    }
}

/// Root scheduler configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Pause between dispatch ticks in milliseconds.
    #[serde(default = "default_dispatch_interval_ms")]
    pub dispatch_interval_ms: u64,
    /// Map of queue name to configuration.
    pub queues: HashMap<String, QueueConfig>,
}

const fn default_dispatch_interval_ms() -> u64 {
    DEFAULT_DISPATCH_INTERVAL_MS
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        let queues = HashMap::from([
            (
                DOWNLOAD_QUEUE.to_owned(),
                QueueConfig {
                    capacity: DOWNLOAD_QUEUE_CAPACITY,
                },
            ),
            (
                SYSTEM_CHANGE_QUEUE.to_owned(),
                QueueConfig {
                    capacity: SYSTEM_CHANGE_QUEUE_CAPACITY,
                },
            ),
        ]);
        Self {
            dispatch_interval_ms: DEFAULT_DISPATCH_INTERVAL_MS,
            queues,
        }
    }
}

impl SchedulerConfig {
    /// Validate the interval and every queue, and ensure both routed queues exist.
    ///
    /// # Errors
    ///
    /// Returns a message describing the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        if self.dispatch_interval_ms == 0 {
            return Err("dispatch_interval_ms must be greater than 0".into());
        }
        for required in [DOWNLOAD_QUEUE, SYSTEM_CHANGE_QUEUE] {
            if !self.queues.contains_key(required) {
                return Err(format!("queue `{required}` must be defined"));
            }
        }
        for (name, queue) in &self.queues {
            queue
                .validate()
                .map_err(|e| format!("queue `{name}` invalid: {e}"))?;
        }
        Ok(())
    }

    /// Dispatch interval as a `Duration`.
    #[must_use]
    pub const fn dispatch_interval(&self) -> Duration {
        Duration::from_millis(self.dispatch_interval_ms)
    }

    /// Parse scheduler configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Returns a message if the JSON is malformed or fails validation.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Defaults overridden by the process environment, after loading `.env`.
    ///
    /// # Errors
    ///
    /// Fails if an override is not a valid number or the result is invalid.
    pub fn from_env() -> AppResult<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "loaded .env");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by values from `lookup`, keyed by the `ENV_*` names.
    ///
    /// # Errors
    ///
    /// Fails if an override is not a valid number or the result is invalid.
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        if let Some(raw) = lookup(ENV_DISPATCH_INTERVAL_MS) {
            cfg.dispatch_interval_ms = raw
                .trim()
                .parse()
                .with_context(|| format!("{ENV_DISPATCH_INTERVAL_MS}={raw:?}"))?;
        }
        for (key, queue) in [
            (ENV_DOWNLOAD_CAPACITY, DOWNLOAD_QUEUE),
            (ENV_SYSTEM_CHANGE_CAPACITY, SYSTEM_CHANGE_QUEUE),
        ] {
            if let Some(raw) = lookup(key) {
                let capacity = raw
                    .trim()
                    .parse()
                    .with_context(|| format!("{key}={raw:?}"))?;
                cfg.queues.insert(queue.to_owned(), QueueConfig { capacity });
            }
        }
        cfg.validate().map_err(anyhow::Error::msg)?;
        Ok(cfg)
    }
}
