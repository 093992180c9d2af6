use serde::{Deserialize, Serialize};
use serde_json::Value;
use strand_types::Citation;

/// Note carried by a `meta` event while the backend runs tool calls
pub const TOOL_CALLS_PENDING: &str = "tool_calls_pending";

/// One record of the `/chat/stream` NDJSON protocol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    Meta {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        note: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tools: Vec<Value>,
    },

    ToolDelta {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(default, rename = "delta", alias = "args_delta")]
        args_delta: String,
    },

    Delta {
        #[serde(default, rename = "delta", alias = "text")]
        text: String,
    },

    Error {
        #[serde(default, alias = "error")]
        message: String,
    },

    Done {
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        citations: Vec<Citation>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tool_debug: Option<Value>,
    },
}

impl StreamEvent {
    pub fn delta(text: impl Into<String>) -> Self {
        Self::Delta { text: text.into() }
    }

    pub fn done() -> Self {
        Self::Done {
            citations: Vec::new(),
            tool_debug: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    pub fn tool_calls_pending() -> Self {
        Self::Meta {
            note: Some(TOOL_CALLS_PENDING.to_string()),
            tools: Vec::new(),
        }
    }

    pub fn is_tool_pending(&self) -> bool {
        matches!(self, Self::Meta { note: Some(note), .. } if note == TOOL_CALLS_PENDING)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. } | Self::Error { .. })
    }
}
