//! Session orchestrator
//!
//! One `submit` call is one conversational turn: resolve the thread, append
//! the user message, start a job, poll it until it is terminal, then read
//! back the newest assistant message.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::event_bus::SessionEventBus;
use super::events::SessionEvent;
use super::registry::{ThreadHandle, ThreadRegistry};
use super::state::PollConfig;
use crate::assistant::{AssistantService, Job, JobStatus, MessageRole, ReplyPayload};
use crate::error::{SessionError, SessionResult};

/// Reason used when the service reports failure without one
const DEFAULT_FAILURE_REASON: &str = "Assistant run failed";

/// Outcome of a successful submission
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    /// Thread the turn ran on (newly created when none was given)
    pub thread_id: String,
    pub payload: ReplyPayload,
}

/// Drives user messages through the assistant-job service
pub struct SessionOrchestrator {
    service: Arc<dyn AssistantService>,
    registry: Arc<ThreadRegistry>,
    poll: PollConfig,
    events: SessionEventBus,
}

impl SessionOrchestrator {
    pub fn new(service: Arc<dyn AssistantService>, registry: Arc<ThreadRegistry>) -> Self {
        Self {
            service,
            registry,
            poll: PollConfig::default(),
            events: SessionEventBus::new(),
        }
    }

    pub fn with_poll_config(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    pub fn registry(&self) -> &Arc<ThreadRegistry> {
        &self.registry
    }

    /// Receive lifecycle events for every submission on this orchestrator
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Submit one user message and wait for the assistant's reply
    pub async fn submit(&self, thread_id: Option<&str>, user_text: &str) -> SessionResult<Reply> {
        self.submit_with_cancel(thread_id, user_text, CancellationToken::new())
            .await
    }

    /// Like [`submit`](Self::submit), but stops waiting once `cancel` fires
    ///
    /// Cancelling before the job starts leaves the thread untouched; after
    /// that the remote job keeps running. Either way the thread stays usable.
    pub async fn submit_with_cancel(
        &self,
        thread_id: Option<&str>,
        user_text: &str,
        cancel: CancellationToken,
    ) -> SessionResult<Reply> {
        let handle = self.resolve_thread(thread_id).await?;
        let result = self.run_turn(&handle, user_text, &cancel).await;

        if !handle.is_confirmed() {
            let id = handle.id().to_string();
            drop(handle);
            if self.registry.forget_unconfirmed(&id) {
                debug!(thread_id = %id, "Dropped unconfirmed thread");
            }
        }
        result
    }

    async fn run_turn(
        &self,
        handle: &ThreadHandle,
        user_text: &str,
        cancel: &CancellationToken,
    ) -> SessionResult<Reply> {
        let thread_id = handle.id();
        let turn = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(self.cancelled(thread_id, None)),
            turn = handle.begin_turn() => turn,
        };

        self.service.append_message(thread_id, user_text).await?;
        handle.confirm();
        self.events.emit(SessionEvent::MessageSubmitted {
            thread_id: thread_id.to_string(),
            turn: turn.turn(),
        });

        if cancel.is_cancelled() {
            return Err(self.cancelled(thread_id, None));
        }
        let job = self.service.create_job(thread_id).await?;
        info!(thread_id = %thread_id, job_id = %job.id, "Started assistant job");
        self.events.emit(SessionEvent::JobStarted {
            thread_id: thread_id.to_string(),
            job_id: job.id.clone(),
        });

        let started = Instant::now();
        let polls = self.wait_for_job(&job, cancel).await?;
        let payload = self.latest_reply(thread_id).await?;

        let duration_ms = started.elapsed().as_millis() as u64;
        info!(
            job_id = %job.id,
            polls,
            duration_ms,
            "Assistant job completed"
        );
        self.events.emit(SessionEvent::JobCompleted {
            job_id: job.id,
            polls,
            duration_ms,
        });

        Ok(Reply {
            thread_id: thread_id.to_string(),
            payload,
        })
    }

    /// Reuse the caller's thread id as-is, or create a thread when there is none
    async fn resolve_thread(&self, thread_id: Option<&str>) -> SessionResult<Arc<ThreadHandle>> {
        if let Some(id) = thread_id.map(str::trim).filter(|id| !id.is_empty()) {
            return Ok(self.registry.get_or_insert(id));
        }

        let id = self.service.create_thread().await?;
        info!(thread_id = %id, "Created conversation thread");
        self.events.emit(SessionEvent::ThreadCreated {
            thread_id: id.clone(),
        });
        Ok(self.registry.get_or_insert(&id))
    }

    /// Poll until the job is terminal, the bound is hit, or `cancel` fires
    ///
    /// Returns the number of status reads on success.
    async fn wait_for_job(&self, job: &Job, cancel: &CancellationToken) -> SessionResult<u32> {
        let started = Instant::now();
        let deadline = started + self.poll.max_wait;
        let mut polls: u32 = 0;

        loop {
            let current = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(self.cancelled(&job.thread_id, Some(job))),
                current = self.service.job_status(&job.thread_id, &job.id) => current?,
            };
            polls += 1;

            debug!(job_id = %job.id, attempt = polls, status = %current.status, "Polled job");
            self.events.emit(SessionEvent::JobPolled {
                job_id: job.id.clone(),
                attempt: polls,
                status: current.status,
            });

            match current.status {
                JobStatus::Completed => return Ok(polls),
                JobStatus::Failed => {
                    let reason = current
                        .failure
                        .unwrap_or_else(|| DEFAULT_FAILURE_REASON.to_string());
                    warn!(job_id = %job.id, reason = %reason, "Assistant job failed");
                    self.events.emit(SessionEvent::JobFailed {
                        job_id: job.id.clone(),
                        reason: reason.clone(),
                    });
                    return Err(SessionError::JobFailed {
                        job_id: job.id.clone(),
                        reason,
                    });
                }
                JobStatus::Pending | JobStatus::Running => {}
            }

            let now = Instant::now();
            if now >= deadline || self.poll.exceeded_max_polls(polls) {
                let elapsed = now - started;
                warn!(job_id = %job.id, polls, "Gave up waiting for assistant job after {:?}", elapsed);
                self.events.emit(SessionEvent::TimedOut {
                    job_id: job.id.clone(),
                    duration_ms: elapsed.as_millis() as u64,
                });
                return Err(SessionError::Timeout {
                    job_id: job.id.clone(),
                    elapsed,
                });
            }

            let wake = (now + self.poll.interval).min(deadline);
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(self.cancelled(&job.thread_id, Some(job))),
                _ = sleep_until(wake) => {}
            }
        }
    }

    fn cancelled(&self, thread_id: &str, job: Option<&Job>) -> SessionError {
        let job_id = job.map(|job| job.id.clone());
        info!(thread_id = %thread_id, job_id = ?job_id, "Stopped waiting for assistant");
        self.events.emit(SessionEvent::Cancelled {
            thread_id: thread_id.to_string(),
            job_id: job_id.clone(),
        });
        SessionError::Cancelled { job_id }
    }

    /// Newest assistant-authored message on the thread
    async fn latest_reply(&self, thread_id: &str) -> SessionResult<ReplyPayload> {
        let messages = self.service.list_messages(thread_id).await?;
        messages
            .into_iter()
            .find(|m| m.role == MessageRole::Assistant)
            .map(ReplyPayload::from)
            .ok_or_else(|| SessionError::MissingReply {
                thread_id: thread_id.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::assistant::{InMemoryAssistant, ScriptedTurn};

    fn orchestrator(service: &Arc<InMemoryAssistant>) -> SessionOrchestrator {
        let service: Arc<dyn AssistantService> = service.clone();
        SessionOrchestrator::new(service, Arc::new(ThreadRegistry::new()))
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_without_thread_creates_one() {
        let service = Arc::new(InMemoryAssistant::echo());
        let orch = orchestrator(&service);

        let reply = orch.submit(None, "hello").await.unwrap();

        assert_eq!(service.calls().threads_created, 1);
        assert_eq!(orch.registry().len(), 1);
        assert_eq!(reply.thread_id, "thread_1");
        assert_eq!(reply.payload.text, "You said: hello");
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_with_thread_never_creates_one() {
        let service = Arc::new(InMemoryAssistant::echo());
        let orch = orchestrator(&service);

        let first = orch.submit(None, "one").await.unwrap();
        let second = orch.submit(Some(&first.thread_id), "two").await.unwrap();

        assert_eq!(second.thread_id, first.thread_id);
        assert_eq!(service.calls().threads_created, 1);
        assert_eq!(second.payload.text, "You said: two");
        assert_eq!(orch.registry().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_blank_thread_id_counts_as_absent() {
        let service = Arc::new(InMemoryAssistant::echo());
        let orch = orchestrator(&service);

        orch.submit(Some("  "), "hi").await.unwrap();
        assert_eq!(service.calls().threads_created, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_completed_sequence_returns_last_assistant_message() {
        let service = Arc::new(InMemoryAssistant::scripted(vec![ScriptedTurn::reply(
            vec![JobStatus::Pending, JobStatus::Running, JobStatus::Completed],
            ReplyPayload::text("The brake valve is part **BV-2**."),
        )]));
        let orch = orchestrator(&service);

        let reply = orch.submit(None, "which brake valve?").await.unwrap();

        assert_eq!(reply.payload.text, "The brake valve is part **BV-2**.");
        assert_eq!(service.calls().status_reads, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_job_stops_polling() {
        let service = Arc::new(InMemoryAssistant::scripted(vec![ScriptedTurn::failing(
            vec![JobStatus::Pending, JobStatus::Failed],
            "Assistant run failed",
        )]));
        let orch = orchestrator(&service);

        let err = orch.submit(None, "hello").await.unwrap_err();

        assert!(matches!(err, SessionError::JobFailed { ref reason, .. } if reason == "Assistant run failed"));
        assert_eq!(service.calls().status_reads, 2);
        assert_eq!(service.calls().message_lists, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stuck_job_times_out() {
        let service = Arc::new(InMemoryAssistant::scripted(vec![ScriptedTurn::reply(
            vec![JobStatus::Running],
            ReplyPayload::text("never"),
        )]));
        let orch = orchestrator(&service).with_poll_config(
            PollConfig::default()
                .with_interval(Duration::from_secs(1))
                .with_max_wait(Duration::from_secs(5)),
        );

        let err = orch.submit(None, "hello").await.unwrap_err();

        match err {
            SessionError::Timeout { elapsed, .. } => {
                assert!(elapsed >= Duration::from_secs(5));
                assert!(elapsed < Duration::from_secs(6));
            }
            other => panic!("expected timeout, got {other:?}"),
        }
        // Reads at t = 0, 1, 2, 3, 4, 5
        assert_eq!(service.calls().status_reads, 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_max_polls_bounds_the_loop() {
        let service = Arc::new(InMemoryAssistant::scripted(vec![ScriptedTurn::reply(
            vec![JobStatus::Pending],
            ReplyPayload::text("never"),
        )]));
        let orch = orchestrator(&service)
            .with_poll_config(PollConfig::default().with_max_polls(Some(3)));

        let err = orch.submit(None, "hello").await.unwrap_err();

        assert!(matches!(err, SessionError::Timeout { .. }));
        assert_eq!(service.calls().status_reads, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_waiting() {
        let service = Arc::new(InMemoryAssistant::scripted(vec![ScriptedTurn::reply(
            vec![JobStatus::Running],
            ReplyPayload::text("never"),
        )]));
        let orch = orchestrator(&service);
        let token = CancellationToken::new();

        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(2500)).await;
            trigger.cancel();
        });

        let err = orch
            .submit_with_cancel(None, "hello", token)
            .await
            .unwrap_err();

        assert!(matches!(err, SessionError::Cancelled { job_id: Some(_) }));
        assert_eq!(service.calls().status_reads, 3);
        assert_eq!(service.calls().jobs_created, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_while_queued_behind_another_turn() {
        let service = Arc::new(InMemoryAssistant::scripted(vec![ScriptedTurn::reply(
            vec![JobStatus::Running],
            ReplyPayload::text("never"),
        )]));
        let orch = orchestrator(&service)
            .with_poll_config(PollConfig::default().with_max_wait(Duration::from_secs(10)));
        let thread_id = service.create_thread().await.unwrap();

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let queued = async {
            let result = orch
                .submit_with_cancel(Some(&thread_id), "second", cancel)
                .await;
            (result, started.elapsed())
        };
        let (first, (second, waited)) = tokio::join!(orch.submit(Some(&thread_id), "first"), queued);

        assert!(matches!(first, Err(SessionError::Timeout { .. })));
        assert_eq!(second, Err(SessionError::Cancelled { job_id: None }));
        assert!(waited < Duration::from_secs(2));
        assert_eq!(service.calls().messages_appended, 1);
        assert_eq!(service.calls().jobs_created, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_thread_ids_are_not_kept() {
        let service = Arc::new(InMemoryAssistant::echo());
        let orch = orchestrator(&service);
        let known = orch.submit(None, "hi").await.unwrap().thread_id;

        for i in 0..50 {
            let err = orch
                .submit(Some(&format!("bogus_{i}")), "hi")
                .await
                .unwrap_err();
            assert!(matches!(err, SessionError::Remote { status: 404, .. }));
        }
        assert_eq!(orch.registry().len(), 1);

        orch.submit(Some(&known), "again").await.unwrap();
        assert_eq!(orch.registry().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_thread_error_is_surfaced_unchanged() {
        let service = Arc::new(InMemoryAssistant::echo());
        let orch = orchestrator(&service);

        let err = orch.submit(Some("thread_gone"), "hi").await.unwrap_err();

        assert_eq!(
            err,
            SessionError::remote(404, "No thread found with id 'thread_gone'.")
        );
        assert_eq!(service.calls().threads_created, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_thread_submissions_do_not_interleave() {
        let service = Arc::new(InMemoryAssistant::echo());
        let orch = orchestrator(&service);
        let thread_id = orch.submit(None, "start").await.unwrap().thread_id;

        let (a, b) = tokio::join!(
            orch.submit(Some(&thread_id), "first"),
            orch.submit(Some(&thread_id), "second")
        );
        a.unwrap();
        b.unwrap();

        let roles: Vec<MessageRole> = service
            .thread_messages(&thread_id)
            .unwrap()
            .iter()
            .map(|m| m.role)
            .collect();
        assert_eq!(
            roles,
            vec![
                MessageRole::User,
                MessageRole::Assistant,
                MessageRole::User,
                MessageRole::Assistant,
                MessageRole::User,
                MessageRole::Assistant,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_events_follow_the_job_lifecycle() {
        let service = Arc::new(InMemoryAssistant::echo());
        let orch = orchestrator(&service);
        let mut events = orch.subscribe();

        let reply = orch.submit(None, "hi").await.unwrap();

        let mut seen = Vec::new();
        while let Ok(event) = events.try_recv() {
            seen.push(event);
        }
        assert_eq!(
            seen.first(),
            Some(&SessionEvent::ThreadCreated {
                thread_id: reply.thread_id.clone()
            })
        );
        assert!(matches!(
            seen.last(),
            Some(SessionEvent::JobCompleted { polls: 2, .. })
        ));
    }
}
