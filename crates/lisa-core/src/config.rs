//! Configuration
//!
//! Read from `~/.lisa/config.toml` (or an explicit path), then overridden by
//! environment variables. Every field has a default; a missing default file
//! is not an error.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::assistant::{OpenAiAssistant, DEFAULT_BASE_URL};
use crate::render::RenderConfig;
use crate::session::{PollConfig, DEFAULT_MAX_WAIT, DEFAULT_POLL_INTERVAL};

pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_HOST: &str = "127.0.0.1";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LisaConfig {
    pub assistant: AssistantConfig,
    pub polling: PollingConfig,
    pub server: ServerConfig,
    pub render: RenderConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    pub api_key: Option<String>,
    pub assistant_id: Option<String>,
    pub base_url: String,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            assistant_id: None,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub interval_ms: u64,
    pub max_wait_secs: u64,
    pub max_polls: Option<u32>,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
            max_wait_secs: DEFAULT_MAX_WAIT.as_secs(),
            max_polls: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl LisaConfig {
    /// `~/.lisa/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".lisa").join("config.toml"))
    }

    /// Load from `path` (must exist) or the default location (may be absent),
    /// then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };
        config.apply_env_from(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Apply `OPENAI_API_KEY`, `ASSISTANT_ID`, `OPENAI_BASE_URL`, `HOST` and
    /// `PORT` from `lookup`. Empty values are ignored.
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = var("OPENAI_API_KEY") {
            self.assistant.api_key = Some(key);
        }
        if let Some(id) = var("ASSISTANT_ID") {
            self.assistant.assistant_id = Some(id);
        }
        if let Some(url) = var("OPENAI_BASE_URL") {
            self.assistant.base_url = url;
        }
        if let Some(host) = var("HOST") {
            self.server.host = host;
        }
        if let Some(port) = var("PORT") {
            self.server.port = port
                .trim()
                .parse()
                .with_context(|| format!("Invalid PORT value: {port}"))?;
        }
        Ok(())
    }

    pub fn poll_config(&self) -> PollConfig {
        PollConfig::default()
            .with_interval(Duration::from_millis(self.polling.interval_ms.max(1)))
            .with_max_wait(Duration::from_secs(self.polling.max_wait_secs))
            .with_max_polls(self.polling.max_polls)
    }

    /// API key and assistant id, or an error naming what is missing
    pub fn require_credentials(&self) -> Result<(&str, &str)> {
        let api_key = self
            .assistant
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .context("No API key configured (set OPENAI_API_KEY or assistant.api_key)")?;
        let assistant_id = self
            .assistant
            .assistant_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .context("No assistant configured (set ASSISTANT_ID or assistant.assistant_id)")?;
        Ok((api_key, assistant_id))
    }

    /// Build the remote assistant client from these settings
    pub fn remote_assistant(&self) -> Result<OpenAiAssistant> {
        let (api_key, assistant_id) = self.require_credentials()?;
        OpenAiAssistant::new(api_key, assistant_id, self.assistant.base_url.clone())
    }
}
