//! Remote assistant-job service
//!
//! The orchestrator only sees the [`AssistantService`] trait. Two
//! implementations live here:
//! - `openai` - OpenAI Assistants compatible HTTP client
//! - `memory` - in-process service with scripted job progressions

mod memory;
mod openai;
mod types;

use async_trait::async_trait;

use crate::error::SessionResult;

pub use memory::{CallLog, InMemoryAssistant, ScriptedTurn};
pub use openai::{OpenAiAssistant, DEFAULT_BASE_URL};
pub use types::{ImageAttachment, Job, JobStatus, MessageRole, ReplyPayload, ThreadMessage};

/// Operations consumed from the assistant-job service
///
/// Implementations report their own errors for unknown thread ids; callers
/// surface them unchanged.
#[async_trait]
pub trait AssistantService: Send + Sync {
    /// Create a conversation thread and return its id
    async fn create_thread(&self) -> SessionResult<String>;

    /// Append a user-authored message to a thread
    async fn append_message(&self, thread_id: &str, text: &str) -> SessionResult<()>;

    /// Start a job that answers the thread's latest message
    async fn create_job(&self, thread_id: &str) -> SessionResult<Job>;

    /// Read the current state of a job
    async fn job_status(&self, thread_id: &str, job_id: &str) -> SessionResult<Job>;

    /// List thread messages, most recent first
    async fn list_messages(&self, thread_id: &str) -> SessionResult<Vec<ThreadMessage>>;
}
