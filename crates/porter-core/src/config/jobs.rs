//! Job supervision and retention configuration.

use serde::{Deserialize, Serialize};

/// Settings governing asynchronous job execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobsConfig {
    /// Hard deadline in seconds after which the watchdog kills a running job.
    #[serde(default = "default_deadline")]
    pub deadline_seconds: u64,
    /// Interval in seconds between watchdog polls of the job record.
    #[serde(default = "default_watchdog_poll")]
    pub watchdog_poll_seconds: u64,
    /// Retention of finished job records and artifacts, in hours.
    #[serde(default = "default_retention")]
    pub retention_hours: u64,
    /// Retention of failed job records and artifacts, in hours.
    #[serde(default = "default_failed_retention")]
    pub failed_retention_hours: u64,
    /// How many times a cancellation request polls for the worker handle.
    #[serde(default = "default_cancel_poll_attempts")]
    pub cancel_poll_attempts: u32,
    /// Delay in milliseconds between cancellation polls.
    #[serde(default = "default_cancel_poll_millis")]
    pub cancel_poll_millis: u64,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            deadline_seconds: default_deadline(),
            watchdog_poll_seconds: default_watchdog_poll(),
            retention_hours: default_retention(),
            failed_retention_hours: default_failed_retention(),
            cancel_poll_attempts: default_cancel_poll_attempts(),
            cancel_poll_millis: default_cancel_poll_millis(),
        }
    }
}

fn default_deadline() -> u64 {
    3600
}

fn default_watchdog_poll() -> u64 {
    1
}

fn default_retention() -> u64 {
    // Five days.
    120
}

fn default_failed_retention() -> u64 {
    1
}

fn default_cancel_poll_attempts() -> u32 {
    25
}

fn default_cancel_poll_millis() -> u64 {
    200
}
