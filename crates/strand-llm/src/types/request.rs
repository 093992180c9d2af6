use serde::Serialize;
use serde_json::Value;
use strand_types::{Who, WebOptions};

/// One prior turn of the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatTurn {
    pub role: String,
    pub content: String,
}

impl ChatTurn {
    pub fn new(who: Who, content: impl Into<String>) -> Self {
        Self {
            role: who.role().to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Who::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Who::Assistant, content)
    }
}

/// Page window the backend should read from the attached materials
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagewise {
    pub enable: bool,
    #[serde(rename = "startPage")]
    pub start_page: u32,
    pub window: u32,
}

impl Pagewise {
    pub fn new(start_page: u32, window: u32) -> Self {
        Self {
            enable: true,
            start_page,
            window,
        }
    }
}

/// Body of `POST /chat` and `POST /chat/stream`
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct ReplyRequest {
    pub model: String,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<ChatTurn>,
    #[serde(rename = "apiKey", skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pgwise: Option<Pagewise>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub web: Option<WebOptions>,
}

impl ReplyRequest {
    pub fn new(model: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            model: model.into(),
            max_tokens,
            ..Self::default()
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_messages(mut self, messages: Vec<ChatTurn>) -> Self {
        self.messages = messages;
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_tools(mut self, tools: Vec<Value>) -> Self {
        self.tools = Some(tools);
        self
    }

    pub fn with_tool_choice(mut self, choice: Value) -> Self {
        self.tool_choice = Some(choice);
        self
    }

    pub fn with_pagewise(mut self, pgwise: Pagewise) -> Self {
        self.pgwise = Some(pgwise);
        self
    }

    pub fn with_web(mut self, web: WebOptions) -> Self {
        self.web = Some(web);
        self
    }

    /// Whether the backend may invoke any tool for this request
    pub fn has_tools(&self) -> bool {
        self.tools.as_ref().is_some_and(|t| !t.is_empty())
            || self.tool_choice.is_some()
            || self
                .web
                .as_ref()
                .is_some_and(|w| w.enable && w.use_open_ai_tool)
    }

    /// Same request with every tool-use path switched off
    ///
    /// Web search falls back to plain fetching instead of the hosted tool.
    pub fn without_tools(&self) -> Self {
        let mut request = self.clone();
        request.tools = None;
        request.tool_choice = None;
        if let Some(web) = request.web.as_mut() {
            web.use_open_ai_tool = false;
        }
        request
    }
}

/// Map legacy or unsupported model names onto `safe_default`
pub fn coerce_model(requested: Option<&str>, safe_default: &str) -> String {
    let model = requested.map(str::trim).unwrap_or_default();
    let lower = model.to_ascii_lowercase();
    if model.is_empty() || lower.starts_with("gpt-5") || matches!(lower.as_str(), "o3" | "3o" | "mini") {
        safe_default.to_string()
    } else {
        model.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_body() {
        let request = ReplyRequest::new("gpt-4o-mini", 1000)
            .with_system("Be brief.")
            .with_messages(vec![ChatTurn::user("hi")])
            .with_api_key("sk-1")
            .with_pagewise(Pagewise::new(4, 3));

        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(
            body,
            json!({
                "model": "gpt-4o-mini",
                "max_tokens": 1000,
                "system": "Be brief.",
                "messages": [{"role": "user", "content": "hi"}],
                "apiKey": "sk-1",
                "pgwise": {"enable": true, "startPage": 4, "window": 3}
            })
        );
    }

    #[test]
    fn test_without_tools() {
        let request = ReplyRequest::new("gpt-4o", 500)
            .with_tools(vec![json!({"type": "web_search"})])
            .with_web(WebOptions::default());
        assert!(request.has_tools());

        let stripped = request.without_tools();
        assert!(!stripped.has_tools());
        assert!(stripped.web.as_ref().is_some_and(|w| w.enable));
        assert!(!ReplyRequest::new("gpt-4o", 500).has_tools());
    }

    #[test]
    fn test_coerce_model() {
        assert_eq!(coerce_model(None, "gpt-4o-mini"), "gpt-4o-mini");
        assert_eq!(coerce_model(Some("  "), "gpt-4o-mini"), "gpt-4o-mini");
        assert_eq!(coerce_model(Some("gpt-5-turbo"), "gpt-4o-mini"), "gpt-4o-mini");
        assert_eq!(coerce_model(Some("o3"), "gpt-4o-mini"), "gpt-4o-mini");
        assert_eq!(coerce_model(Some("mini"), "gpt-4o-mini"), "gpt-4o-mini");
        assert_eq!(coerce_model(Some("gpt-4o"), "gpt-4o-mini"), "gpt-4o");
    }
}
