//! Session error types

use std::time::Duration;

use thiserror::Error;

/// Failures surfaced by the session orchestrator and the assistant service.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The assistant service could not be reached at all
    #[error("assistant service unreachable: {0}")]
    RemoteUnavailable(String),

    /// The assistant service answered with an error status
    #[error("assistant service rejected the request ({status}): {message}")]
    Remote { status: u16, message: String },

    /// The remote job reached the failed state
    #[error("{reason}")]
    JobFailed { job_id: String, reason: String },

    /// The job did not reach a terminal state within the polling bound
    #[error("assistant job {job_id} did not finish within {elapsed:?}")]
    Timeout { job_id: String, elapsed: Duration },

    /// The caller gave up waiting. `job_id` is set when a job had already
    /// started; that job keeps running remotely.
    #[error("stopped waiting for the assistant")]
    Cancelled { job_id: Option<String> },

    /// The job completed but the thread holds no assistant message
    #[error("thread {thread_id} has no assistant reply")]
    MissingReply { thread_id: String },

    /// The service answered with something we could not interpret
    #[error("unexpected response from assistant service: {0}")]
    Protocol(String),
}

pub type SessionResult<T> = Result<T, SessionError>;

impl SessionError {
    pub fn remote(status: u16, message: impl Into<String>) -> Self {
        Self::Remote {
            status,
            message: message.into(),
        }
    }

    /// Errors that come from the remote job itself rather than from transport
    pub fn is_job_outcome(&self) -> bool {
        matches!(
            self,
            Self::JobFailed { .. } | Self::Timeout { .. } | Self::MissingReply { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_failed_displays_reason_verbatim() {
        let err = SessionError::JobFailed {
            job_id: "run_1".to_string(),
            reason: "Assistant run failed".to_string(),
        };
        assert_eq!(err.to_string(), "Assistant run failed");
        assert!(err.is_job_outcome());
    }

    #[test]
    fn test_transport_errors_are_not_job_outcomes() {
        assert!(!SessionError::RemoteUnavailable("connection refused".into()).is_job_outcome());
        assert!(!SessionError::remote(404, "No thread found").is_job_outcome());
    }
}
