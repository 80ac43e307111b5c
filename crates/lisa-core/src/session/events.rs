//! Session events
//!
//! Events that occur while a submission moves through the job lifecycle.

use serde::Serialize;

use crate::assistant::JobStatus;

/// Events during a submission
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A new remote thread was created for this session
    ThreadCreated { thread_id: String },
    /// The user message was appended to the thread
    MessageSubmitted { thread_id: String, turn: usize },
    /// A job was started for the message
    JobStarted { thread_id: String, job_id: String },
    /// One status read of the job
    JobPolled {
        job_id: String,
        attempt: u32,
        status: JobStatus,
    },
    /// The job completed and its reply was fetched
    JobCompleted {
        job_id: String,
        polls: u32,
        duration_ms: u64,
    },
    /// The job reported failure
    JobFailed { job_id: String, reason: String },
    /// Polling gave up at its bound
    TimedOut { job_id: String, duration_ms: u64 },
    /// The caller stopped waiting, before or after a job started
    Cancelled {
        thread_id: String,
        job_id: Option<String>,
    },
}
