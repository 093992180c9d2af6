use serde::{Deserialize, Serialize};
use serde_json::Value;
use strand_types::Citation;

/// Placeholder text for a reply that produced nothing
pub const EMPTY_REPLY: &str = "(empty reply)";

/// `200` body of `POST /chat`
#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct ChatReply {
    #[serde(default)]
    pub reply: String,
    #[serde(default, deserialize_with = "lenient_citations")]
    pub citations: Vec<Citation>,
    #[serde(default)]
    pub tool_debug: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ChatReply {
    pub fn has_text(&self) -> bool {
        !self.reply.trim().is_empty()
    }

    pub fn into_result(self) -> ReplyResult {
        ReplyResult {
            text: self.reply,
            citations: self.citations,
            tool_debug: self.tool_debug,
        }
    }
}

/// Citations that are not a list of `{title, url}` are dropped
fn lenient_citations<'de, D>(deserializer: D) -> Result<Vec<Citation>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let items = match value {
        Value::Array(items) => items,
        _ => return Ok(Vec::new()),
    };
    Ok(items
        .into_iter()
        .filter_map(|item| serde_json::from_value::<Citation>(item).ok())
        .filter(|c| !c.url.is_empty() || !c.title.is_empty())
        .collect())
}

/// Final reply handed back to the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ReplyResult {
    pub text: String,
    #[serde(default)]
    pub citations: Vec<Citation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_debug: Option<Value>,
}

impl ReplyResult {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn with_citations(mut self, citations: Vec<Citation>) -> Self {
        self.citations = citations;
        self
    }

    pub fn is_placeholder(&self) -> bool {
        self.text == EMPTY_REPLY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_reply_lenient() {
        let reply: ChatReply = serde_json::from_str(
            r#"{"reply":"ok","citations":[{"title":"A","url":"https://a"}, 7, {"bogus":true}]}"#,
        )
        .unwrap();
        assert_eq!(reply.citations, vec![Citation::new("A", "https://a")]);

        let reply: ChatReply = serde_json::from_str(r#"{"reply":"ok","citations":"none"}"#).unwrap();
        assert!(reply.citations.is_empty());
        assert!(reply.has_text());
    }

    #[test]
    fn test_empty_reply_with_error() {
        let reply: ChatReply = serde_json::from_str(r#"{"reply":"  ","error":"quota"}"#).unwrap();
        assert!(!reply.has_text());
        assert_eq!(reply.error.as_deref(), Some("quota"));
    }
}
