//! In-process assistant service
//!
//! Jobs advance through a scripted status sequence, one step per status
//! read. When a job first reads as completed, its reply is appended to the
//! thread as an assistant message.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

use super::types::{Job, JobStatus, MessageRole, ReplyPayload, ThreadMessage};
use super::AssistantService;
use crate::error::{SessionError, SessionResult};

/// How one job behaves: the statuses it reports, then its outcome
#[derive(Debug, Clone)]
pub struct ScriptedTurn {
    pub statuses: Vec<JobStatus>,
    pub reply: ReplyPayload,
    pub failure: Option<String>,
}

impl ScriptedTurn {
    /// Job that reports `statuses` and answers with `reply` once completed
    pub fn reply(statuses: Vec<JobStatus>, reply: ReplyPayload) -> Self {
        Self {
            statuses,
            reply,
            failure: None,
        }
    }

    /// Job that reports `statuses` and fails with `reason`
    pub fn failing(statuses: Vec<JobStatus>, reason: impl Into<String>) -> Self {
        Self {
            statuses,
            reply: ReplyPayload::text(""),
            failure: Some(reason.into()),
        }
    }
}

/// Counters for every operation the service has served
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallLog {
    pub threads_created: usize,
    pub messages_appended: usize,
    pub jobs_created: usize,
    pub status_reads: usize,
    pub message_lists: usize,
}

type Responder = Box<dyn Fn(&str) -> ScriptedTurn + Send + Sync>;

struct JobProgress {
    job: Job,
    remaining: VecDeque<JobStatus>,
    reply: ReplyPayload,
    failure: Option<String>,
}

#[derive(Default)]
struct MemoryState {
    /// Messages per thread, oldest first
    threads: HashMap<String, Vec<ThreadMessage>>,
    jobs: HashMap<String, JobProgress>,
    scripted: VecDeque<ScriptedTurn>,
    next_id: u64,
    calls: CallLog,
}

impl MemoryState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}_{}", self.next_id)
    }
}

/// Assistant service kept entirely in memory
pub struct InMemoryAssistant {
    state: Mutex<MemoryState>,
    responder: Responder,
}

impl InMemoryAssistant {
    /// Answers each message by repeating it back after one running poll
    pub fn echo() -> Self {
        Self::with_responder(|text| {
            ScriptedTurn::reply(
                vec![JobStatus::Running, JobStatus::Completed],
                ReplyPayload::text(format!("You said: {text}")),
            )
        })
    }

    /// Decide each job's behaviour from the latest user message
    pub fn with_responder(responder: impl Fn(&str) -> ScriptedTurn + Send + Sync + 'static) -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            responder: Box::new(responder),
        }
    }

    /// Play `turns` in order, one per created job; falls back to echo afterwards
    pub fn scripted(turns: Vec<ScriptedTurn>) -> Self {
        let service = Self::echo();
        service.state.lock().scripted = turns.into();
        service
    }

    pub fn calls(&self) -> CallLog {
        self.state.lock().calls
    }

    /// Snapshot of a thread's messages, oldest first
    pub fn thread_messages(&self, thread_id: &str) -> Option<Vec<ThreadMessage>> {
        self.state.lock().threads.get(thread_id).cloned()
    }

    fn unknown_thread(thread_id: &str) -> SessionError {
        SessionError::remote(404, format!("No thread found with id '{thread_id}'."))
    }
}

#[async_trait]
impl AssistantService for InMemoryAssistant {
    async fn create_thread(&self) -> SessionResult<String> {
        let mut state = self.state.lock();
        state.calls.threads_created += 1;
        let id = state.next_id("thread");
        state.threads.insert(id.clone(), Vec::new());
        Ok(id)
    }

    async fn append_message(&self, thread_id: &str, text: &str) -> SessionResult<()> {
        let mut state = self.state.lock();
        state.calls.messages_appended += 1;
        let id = state.next_id("msg");
        let messages = state
            .threads
            .get_mut(thread_id)
            .ok_or_else(|| Self::unknown_thread(thread_id))?;
        messages.push(ThreadMessage {
            id,
            role: MessageRole::User,
            text: text.to_string(),
            attachment: None,
        });
        Ok(())
    }

    async fn create_job(&self, thread_id: &str) -> SessionResult<Job> {
        let mut state = self.state.lock();
        state.calls.jobs_created += 1;
        let latest_user_text = state
            .threads
            .get(thread_id)
            .ok_or_else(|| Self::unknown_thread(thread_id))?
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::User)
            .map(|m| m.text.clone())
            .unwrap_or_default();

        let turn = match state.scripted.pop_front() {
            Some(turn) => turn,
            None => (self.responder)(&latest_user_text),
        };

        let job = Job {
            id: state.next_id("run"),
            thread_id: thread_id.to_string(),
            status: JobStatus::Pending,
            created_at: Utc::now(),
            failure: None,
        };
        state.jobs.insert(
            job.id.clone(),
            JobProgress {
                job: job.clone(),
                remaining: turn.statuses.into(),
                reply: turn.reply,
                failure: turn.failure,
            },
        );
        Ok(job)
    }

    async fn job_status(&self, thread_id: &str, job_id: &str) -> SessionResult<Job> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        state.calls.status_reads += 1;

        let progress = state
            .jobs
            .get_mut(job_id)
            .filter(|p| p.job.thread_id == thread_id)
            .ok_or_else(|| SessionError::remote(404, format!("No run found with id '{job_id}'.")))?;

        let was_terminal = progress.job.status.is_terminal();
        if !was_terminal {
            if let Some(next) = progress.remaining.pop_front() {
                progress.job.status = next;
            }
        }

        if !was_terminal {
            match progress.job.status {
                JobStatus::Completed => {
                    state.next_id += 1;
                    let message = ThreadMessage {
                        id: format!("msg_{}", state.next_id),
                        role: MessageRole::Assistant,
                        text: progress.reply.text.clone(),
                        attachment: progress.reply.attachment.clone(),
                    };
                    if let Some(messages) = state.threads.get_mut(thread_id) {
                        messages.push(message);
                    }
                }
                JobStatus::Failed => {
                    progress.job.failure = Some(
                        progress
                            .failure
                            .clone()
                            .unwrap_or_else(|| "Assistant run failed".to_string()),
                    );
                }
                JobStatus::Pending | JobStatus::Running => {}
            }
        }

        Ok(progress.job.clone())
    }

    async fn list_messages(&self, thread_id: &str) -> SessionResult<Vec<ThreadMessage>> {
        let mut state = self.state.lock();
        state.calls.message_lists += 1;
        let messages = state
            .threads
            .get(thread_id)
            .ok_or_else(|| Self::unknown_thread(thread_id))?;
        Ok(messages.iter().rev().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_job_advances_one_status_per_read() {
        let service = InMemoryAssistant::scripted(vec![ScriptedTurn::reply(
            vec![JobStatus::Pending, JobStatus::Running, JobStatus::Completed],
            ReplyPayload::text("done"),
        )]);

        let thread = service.create_thread().await.unwrap();
        service.append_message(&thread, "hello").await.unwrap();
        let job = service.create_job(&thread).await.unwrap();

        let mut seen = Vec::new();
        for _ in 0..4 {
            seen.push(service.job_status(&thread, &job.id).await.unwrap().status);
        }
        assert_eq!(
            seen,
            vec![
                JobStatus::Pending,
                JobStatus::Running,
                JobStatus::Completed,
                JobStatus::Completed
            ]
        );

        let messages = service.list_messages(&thread).await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, MessageRole::Assistant);
        assert_eq!(messages[0].text, "done");
    }

    #[tokio::test]
    async fn test_unknown_thread_is_rejected() {
        let service = InMemoryAssistant::echo();
        let err = service.append_message("thread_missing", "hi").await.unwrap_err();
        assert!(matches!(err, SessionError::Remote { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_echo_responder_uses_latest_user_text() {
        let service = InMemoryAssistant::echo();
        let thread = service.create_thread().await.unwrap();
        service.append_message(&thread, "ping").await.unwrap();
        let job = service.create_job(&thread).await.unwrap();
        service.job_status(&thread, &job.id).await.unwrap();
        service.job_status(&thread, &job.id).await.unwrap();

        let messages = service.list_messages(&thread).await.unwrap();
        assert_eq!(messages[0].text, "You said: ping");
        assert_eq!(service.calls().status_reads, 2);
    }
}
