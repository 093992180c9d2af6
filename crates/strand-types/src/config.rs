use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BackendConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_secs: 120,
        }
    }
}

impl BackendConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReplyConfig {
    pub default_model: String,
    /// Substituted when the configured model is rejected or returns nothing
    pub safe_default_model: String,
    pub grace_period_ms: u64,
    /// Silence on an open stream after which the reply fails
    pub stream_idle_timeout_ms: u64,
    pub max_continuation_steps: usize,
    pub window_pages: u32,
    /// Conversation entries sent with each request
    pub history_limit: usize,
    pub sentinel: String,
}

impl Default for ReplyConfig {
    fn default() -> Self {
        Self {
            default_model: "gpt-4o-mini".to_string(),
            safe_default_model: "gpt-4o-mini".to_string(),
            grace_period_ms: 900,
            stream_idle_timeout_ms: 120_000,
            max_continuation_steps: 5,
            window_pages: 3,
            history_limit: 20,
            sentinel: "MER_SIDOR".to_string(),
        }
    }
}

impl ReplyConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_grace_period(mut self, grace: Duration) -> Self {
        self.grace_period_ms = grace.as_millis() as u64;
        self
    }

    pub fn with_stream_idle_timeout(mut self, idle: Duration) -> Self {
        self.stream_idle_timeout_ms = idle.as_millis() as u64;
        self
    }

    pub fn with_max_continuation_steps(mut self, steps: usize) -> Self {
        self.max_continuation_steps = steps;
        self
    }

    pub fn with_window_pages(mut self, pages: u32) -> Self {
        self.window_pages = pages;
        self
    }

    pub fn with_safe_default_model(mut self, model: impl Into<String>) -> Self {
        self.safe_default_model = model.into();
        self
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }

    pub fn stream_idle_timeout(&self) -> Duration {
        Duration::from_millis(self.stream_idle_timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Token budget used when a destination declares no max_tokens
    pub default_budget: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { default_budget: 800 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// `pretty` or `json`
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct RelayConfig {
    pub backend: BackendConfig,
    pub reply: ReplyConfig,
    pub chunking: ChunkingConfig,
    pub logging: LoggingConfig,
}

impl RelayConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_backend(mut self, backend: BackendConfig) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_reply(mut self, reply: ReplyConfig) -> Self {
        self.reply = reply;
        self
    }
}
