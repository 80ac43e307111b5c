//! Polling configuration
//!
//! Bounds for the job polling loop.

use std::time::Duration;

/// Default delay between status reads
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Default wall-clock bound for one job
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(120);

/// Configuration for the polling loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollConfig {
    /// Delay between status reads
    pub interval: Duration,
    /// Give up once a job has been polled for this long
    pub max_wait: Duration,
    /// Give up after this many status reads (None = bounded by time only)
    pub max_polls: Option<u32>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_wait: DEFAULT_MAX_WAIT,
            max_polls: None,
        }
    }
}

impl PollConfig {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    pub fn with_max_polls(mut self, max_polls: Option<u32>) -> Self {
        self.max_polls = max_polls;
        self
    }

    /// Check if we've used up the allowed status reads
    pub fn exceeded_max_polls(&self, polls: u32) -> bool {
        self.max_polls.is_some_and(|max| polls >= max)
    }
}
