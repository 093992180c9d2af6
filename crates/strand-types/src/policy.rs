use serde::{Deserialize, Serialize};

/// Per-source chunking switches, as set in the source node's panel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkPolicy {
    pub enabled: bool,
    pub numbering_enabled: bool,
    pub line_batch_enabled: bool,
    pub token_budget_enabled: bool,
    pub batch_size: usize,
    pub token_size: usize,
    pub allow_node_to_node: bool,
    pub allow_to_section_sink: bool,
    /// Drop a non-numbered preamble from numbered chunk forwards
    pub trim_preamble: bool,
}

impl ChunkPolicy {
    pub const MIN_BATCH: usize = 1;
    pub const MAX_BATCH: usize = 50;
    pub const MIN_TOKENS: usize = 200;
    pub const MAX_TOKENS: usize = 2000;

    pub fn new() -> Self {
        Self::default()
    }

    /// Enabled policy with the default strategy mix
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            ..Self::default()
        }
    }

    pub fn with_numbering(mut self, on: bool) -> Self {
        self.numbering_enabled = on;
        self
    }

    pub fn with_line_batches(mut self, on: bool, batch_size: usize) -> Self {
        self.line_batch_enabled = on;
        self.batch_size = batch_size;
        self
    }

    pub fn with_token_budget(mut self, on: bool, token_size: usize) -> Self {
        self.token_budget_enabled = on;
        self.token_size = token_size;
        self
    }

    pub fn with_targets(mut self, node_to_node: bool, to_section: bool) -> Self {
        self.allow_node_to_node = node_to_node;
        self.allow_to_section_sink = to_section;
        self
    }

    pub fn with_trim_preamble(mut self, on: bool) -> Self {
        self.trim_preamble = on;
        self
    }

    pub fn effective_batch_size(&self) -> usize {
        self.batch_size.clamp(Self::MIN_BATCH, Self::MAX_BATCH)
    }

    pub fn effective_token_size(&self) -> usize {
        self.token_size.clamp(Self::MIN_TOKENS, Self::MAX_TOKENS)
    }
}

impl Default for ChunkPolicy {
    fn default() -> Self {
        Self {
            enabled: false,
            numbering_enabled: false,
            line_batch_enabled: true,
            token_budget_enabled: false,
            batch_size: 3,
            token_size: 800,
            allow_node_to_node: true,
            allow_to_section_sink: true,
            trim_preamble: false,
        }
    }
}

/// Web search options forwarded verbatim to the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebOptions {
    pub enable: bool,
    #[serde(default = "default_true")]
    pub use_open_ai_tool: bool,
    #[serde(default = "default_max_results")]
    pub max_results: u32,
    #[serde(default = "default_per_page_chars")]
    pub per_page_chars: u32,
    #[serde(default = "default_total_chars")]
    pub total_chars_cap: u32,
}

fn default_true() -> bool {
    true
}

fn default_max_results() -> u32 {
    3
}

fn default_per_page_chars() -> u32 {
    3000
}

fn default_total_chars() -> u32 {
    9000
}

impl Default for WebOptions {
    fn default() -> Self {
        Self {
            enable: true,
            use_open_ai_tool: true,
            max_results: default_max_results(),
            per_page_chars: default_per_page_chars(),
            total_chars_cap: default_total_chars(),
        }
    }
}

/// Reply settings of an agent node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct NodeSettings {
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub api_key: Option<String>,
    pub use_role: bool,
    pub role: String,
    pub topic: String,
    /// Page through attached materials when replying to another agent
    pub pagewise: bool,
    pub web: Option<WebOptions>,
}

impl NodeSettings {
    pub const DEFAULT_MAX_TOKENS: u32 = 1000;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_role(mut self, role: impl Into<String>, topic: impl Into<String>) -> Self {
        self.use_role = true;
        self.role = role.into();
        self.topic = topic.into();
        self
    }

    pub fn with_pagewise(mut self, on: bool) -> Self {
        self.pagewise = on;
        self
    }

    pub fn with_web(mut self, web: WebOptions) -> Self {
        self.web = Some(web);
        self
    }

    pub fn effective_max_tokens(&self) -> u32 {
        self.max_tokens
            .unwrap_or(Self::DEFAULT_MAX_TOKENS)
            .clamp(256, 30_000)
    }

    /// Role and topic folded into a system prompt, when enabled
    pub fn system_prompt(&self) -> Option<String> {
        if !self.use_role {
            return None;
        }
        let role = self.role.trim();
        let topic = self.topic.trim();
        match (role.is_empty(), topic.is_empty()) {
            (true, true) => None,
            (false, true) => Some(role.to_string()),
            (true, false) => Some(format!("Topic: {}", topic)),
            (false, false) => Some(format!("{}\n\nTopic: {}", role, topic)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_policy_defaults() {
        let policy = ChunkPolicy::default();
        assert!(!policy.enabled);
        assert!(policy.line_batch_enabled);
        assert_eq!(policy.batch_size, 3);
        assert_eq!(policy.token_size, 800);
    }

    #[test]
    fn test_chunk_policy_clamps() {
        let policy = ChunkPolicy::enabled()
            .with_line_batches(true, 0)
            .with_token_budget(true, 10_000);
        assert_eq!(policy.effective_batch_size(), 1);
        assert_eq!(policy.effective_token_size(), 2000);
    }

    #[test]
    fn test_system_prompt() {
        assert_eq!(NodeSettings::new().system_prompt(), None);
        let settings = NodeSettings::new().with_role("You are a grader.", "Algebra");
        assert_eq!(
            settings.system_prompt().as_deref(),
            Some("You are a grader.\n\nTopic: Algebra")
        );
    }

    #[test]
    fn test_max_tokens_clamp() {
        assert_eq!(NodeSettings::new().effective_max_tokens(), 1000);
        assert_eq!(NodeSettings::new().with_max_tokens(10).effective_max_tokens(), 256);
        assert_eq!(NodeSettings::new().with_max_tokens(90_000).effective_max_tokens(), 30_000);
    }

    #[test]
    fn test_settings_partial_deserialize() {
        let settings: NodeSettings = serde_json::from_str(r#"{"model":"gpt-4o","pagewise":true}"#).unwrap();
        assert_eq!(settings.model.as_deref(), Some("gpt-4o"));
        assert!(settings.pagewise);
        assert!(settings.web.is_none());
    }
}
