//! Assistant service data types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of one remote job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::Running => write!(f, "running"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

/// One remote computation triggered by a submitted message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub thread_id: String,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    /// Reason reported by the service when the job failed
    #[serde(default)]
    pub failure: Option<String>,
}

/// Author of a thread message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
}

/// A message as listed by the assistant service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadMessage {
    pub id: String,
    pub role: MessageRole,
    pub text: String,
    #[serde(default)]
    pub attachment: Option<ImageAttachment>,
}

/// Structured image reference bundled with a reply
///
/// Serialized in the shape the chat page expects under `trainPart`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageAttachment {
    #[serde(default)]
    pub display_name: String,
    pub image_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Any other fields the service attached; passed through untouched
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ImageAttachment {
    pub fn new(display_name: impl Into<String>, image_url: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            image_url: image_url.into(),
            name: None,
            description: None,
            extra: serde_json::Map::new(),
        }
    }

    /// Human label: display name, then name, then a generic fallback
    pub fn label(&self) -> &str {
        let display = self.display_name.trim();
        if !display.is_empty() {
            return display;
        }
        match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name,
            _ => "image",
        }
    }
}

/// The assistant's answer to one user message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyPayload {
    pub text: String,
    #[serde(default)]
    pub attachment: Option<ImageAttachment>,
}

impl ReplyPayload {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            attachment: None,
        }
    }

    pub fn with_attachment(mut self, attachment: ImageAttachment) -> Self {
        self.attachment = Some(attachment);
        self
    }
}

impl From<ThreadMessage> for ReplyPayload {
    fn from(message: ThreadMessage) -> Self {
        Self {
            text: message.text,
            attachment: message.attachment,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_statuses() {
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
    }

    #[test]
    fn test_attachment_label_fallbacks() {
        let mut part = ImageAttachment::new("Brake Assembly", "http://x/img.png");
        assert_eq!(part.label(), "Brake Assembly");

        part.display_name = "  ".to_string();
        part.name = Some("brake_assembly".to_string());
        assert_eq!(part.label(), "brake_assembly");

        part.name = None;
        assert_eq!(part.label(), "image");
    }

    #[test]
    fn test_attachment_keeps_extra_fields() {
        let json = serde_json::json!({
            "displayName": "Coupler",
            "imageUrl": "http://x/coupler.png",
            "partNumber": "C-114"
        });
        let part: ImageAttachment = serde_json::from_value(json).unwrap();
        assert_eq!(part.extra.get("partNumber").unwrap(), "C-114");

        let back = serde_json::to_value(&part).unwrap();
        assert_eq!(back["displayName"], "Coupler");
        assert_eq!(back["partNumber"], "C-114");
        assert!(back.get("name").is_none());
    }
}
