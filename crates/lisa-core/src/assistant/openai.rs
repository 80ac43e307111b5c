//! OpenAI Assistants API client
//!
//! Threads, messages, and runs over the `assistants=v2` REST surface. A run
//! is the job; its status strings are folded into [`JobStatus`].

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, warn};

use super::types::{ImageAttachment, Job, JobStatus, MessageRole, ThreadMessage};
use super::AssistantService;
use crate::error::{SessionError, SessionResult};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// How many recent messages to fetch when looking for the reply
const MESSAGE_PAGE_SIZE: usize = 20;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Client for an OpenAI Assistants compatible service
#[derive(Clone)]
pub struct OpenAiAssistant {
    client: reqwest::Client,
    api_key: String,
    assistant_id: String,
    base_url: Url,
}

impl OpenAiAssistant {
    pub fn new(
        api_key: impl Into<String>,
        assistant_id: impl Into<String>,
        base_url: impl Into<String>,
    ) -> anyhow::Result<Self> {
        let base_url: String = base_url.into();
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .with_context(|| format!("invalid assistant base URL '{base_url}'"))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("assistant base URL '{base_url}' cannot take a path");
        }

        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("building HTTP client")?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            assistant_id: assistant_id.into(),
            base_url,
        })
    }

    /// Base URL plus one percent-encoded path segment per item, so ids
    /// can never add or remove segments
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn build_request(&self, method: reqwest::Method, segments: &[&str]) -> RequestBuilder {
        self.client
            .request(method, self.url(segments))
            .bearer_auth(&self.api_key)
            .header("OpenAI-Beta", "assistants=v2")
    }

    async fn send(&self, request: RequestBuilder) -> SessionResult<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| SessionError::RemoteUnavailable(e.to_string()))?;
        handle_error_response(response).await
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> SessionResult<T> {
        let response = self.send(request).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| SessionError::Protocol(e.to_string()))
    }
}

/// Turn non-2xx responses into [`SessionError::Remote`], keeping the API's message
async fn handle_error_response(response: Response) -> SessionResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|json| {
            json.get("error")?
                .get("message")?
                .as_str()
                .map(str::to_string)
        })
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            } else {
                body
            }
        });

    warn!("Assistant API error {}: {}", status, message);
    Err(SessionError::remote(status.as_u16(), message))
}

#[async_trait]
impl AssistantService for OpenAiAssistant {
    async fn create_thread(&self) -> SessionResult<String> {
        let request = self
            .build_request(reqwest::Method::POST, &["threads"])
            .json(&serde_json::json!({}));
        let thread: ThreadObject = self.send_json(request).await?;
        debug!("Created thread {}", thread.id);
        Ok(thread.id)
    }

    async fn append_message(&self, thread_id: &str, text: &str) -> SessionResult<()> {
        let body = serde_json::json!({
            "role": "user",
            "content": text
        });
        let request = self
            .build_request(reqwest::Method::POST, &["threads", thread_id, "messages"])
            .json(&body);
        self.send(request).await?;
        Ok(())
    }

    async fn create_job(&self, thread_id: &str) -> SessionResult<Job> {
        let body = serde_json::json!({ "assistant_id": self.assistant_id });
        let request = self
            .build_request(reqwest::Method::POST, &["threads", thread_id, "runs"])
            .json(&body);
        let run: RunObject = self.send_json(request).await?;
        Ok(run.into_job())
    }

    async fn job_status(&self, thread_id: &str, job_id: &str) -> SessionResult<Job> {
        let request =
            self.build_request(reqwest::Method::GET, &["threads", thread_id, "runs", job_id]);
        let run: RunObject = self.send_json(request).await?;
        Ok(run.into_job())
    }

    async fn list_messages(&self, thread_id: &str) -> SessionResult<Vec<ThreadMessage>> {
        let request = self
            .build_request(reqwest::Method::GET, &["threads", thread_id, "messages"])
            .query(&[("order", "desc"), ("limit", MESSAGE_PAGE_SIZE.to_string().as_str())]);
        let list: MessageList = self.send_json(request).await?;
        Ok(list.data.into_iter().map(MessageObject::into_message).collect())
    }
}

#[derive(Deserialize)]
struct ThreadObject {
    id: String,
}

#[derive(Deserialize)]
struct RunObject {
    id: String,
    thread_id: String,
    status: String,
    #[serde(default)]
    created_at: i64,
    #[serde(default)]
    last_error: Option<RunError>,
}

#[derive(Deserialize)]
struct RunError {
    message: String,
}

impl RunObject {
    fn into_job(self) -> Job {
        let status = map_run_status(&self.status);
        let failure = match status {
            JobStatus::Failed => Some(
                self.last_error
                    .map(|e| e.message)
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| format!("run {}", self.status)),
            ),
            _ => None,
        };

        Job {
            id: self.id,
            thread_id: self.thread_id,
            status,
            created_at: DateTime::from_timestamp(self.created_at, 0).unwrap_or_else(Utc::now),
            failure,
        }
    }
}

/// Fold the service's run statuses into the four job states
fn map_run_status(status: &str) -> JobStatus {
    match status {
        "queued" => JobStatus::Pending,
        "in_progress" | "requires_action" | "cancelling" => JobStatus::Running,
        "completed" => JobStatus::Completed,
        "failed" | "cancelled" | "expired" | "incomplete" => JobStatus::Failed,
        other => {
            warn!("Unknown run status '{}', treating as running", other);
            JobStatus::Running
        }
    }
}

#[derive(Deserialize)]
struct MessageList {
    data: Vec<MessageObject>,
}

#[derive(Deserialize)]
struct MessageObject {
    id: String,
    role: String,
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    metadata: Option<Map<String, Value>>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        text: TextContent,
    },
    ImageUrl {
        image_url: ImageUrlContent,
    },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
struct TextContent {
    value: String,
}

#[derive(Deserialize)]
struct ImageUrlContent {
    url: String,
}

impl MessageObject {
    fn into_message(self) -> ThreadMessage {
        let role = if self.role == "assistant" {
            MessageRole::Assistant
        } else {
            MessageRole::User
        };

        let text = self
            .content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.value.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n");

        let attachment = attachment_from(self.metadata.as_ref(), &self.content);

        ThreadMessage {
            id: self.id,
            role,
            text,
            attachment,
        }
    }
}

/// Metadata `image_url`/`display_name` wins over an `image_url` content block
fn attachment_from(
    metadata: Option<&Map<String, Value>>,
    content: &[ContentBlock],
) -> Option<ImageAttachment> {
    if let Some(meta) = metadata {
        let field = |key: &str| meta.get(key).and_then(Value::as_str).map(str::to_string);
        if let Some(url) = field("image_url").filter(|u| !u.trim().is_empty()) {
            let mut attachment = ImageAttachment::new(field("display_name").unwrap_or_default(), url);
            attachment.name = field("name");
            attachment.description = field("description");
            return Some(attachment);
        }
    }

    content.iter().find_map(|block| match block {
        ContentBlock::ImageUrl { image_url } => Some(ImageAttachment::new("", &image_url.url)),
        _ => None,
    })
}
