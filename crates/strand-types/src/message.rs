use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Who {
    User,
    #[default]
    Assistant,
}

impl Who {
    /// Chat role name used on the wire
    pub fn role(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// Source reference returned by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Citation {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
}

impl Citation {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
        }
    }
}

/// Reference material attached to a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Attachment {
    pub name: String,
    #[serde(default)]
    pub chars: usize,
    /// Page count for paged documents (PDF)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Attachment {
    pub fn new(name: impl Into<String>, chars: usize) -> Self {
        Self {
            name: name.into(),
            chars,
            pages: None,
            url: None,
        }
    }

    pub fn with_pages(mut self, pages: u32) -> Self {
        self.pages = Some(pages);
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct MessageMeta {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub citations: Vec<Citation>,
    /// Local to one hop, cleared by [`MessageMeta::relayed`]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub via: Option<String>,
}

impl MessageMeta {
    pub fn with_citations(mut self, citations: Vec<Citation>) -> Self {
        self.citations = citations;
        self
    }

    pub fn with_attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachments = attachments;
        self
    }

    /// Copy for forwarding over `via`: citations survive, attachments do not
    pub fn relayed(&self, via: impl Into<String>) -> Self {
        Self {
            citations: self.citations.clone(),
            attachments: Vec::new(),
            via: Some(via.into()),
        }
    }
}

/// A message as delivered to one destination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub source_id: String,
    pub text: String,
    pub author: String,
    pub who: Who,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub meta: MessageMeta,
}

impl Message {
    pub const DEFAULT_AUTHOR: &'static str = "Incoming";

    pub fn new(source_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            text: text.into(),
            author: Self::DEFAULT_AUTHOR.to_string(),
            who: Who::Assistant,
            timestamp: Utc::now(),
            meta: MessageMeta::default(),
        }
    }

    /// Same message carrying different text (used for chunk parts)
    pub fn with_text(&self, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..self.clone()
        }
    }
}

/// Caller-supplied metadata for a route call
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RouteMeta {
    pub author: Option<String>,
    pub who: Option<Who>,
    pub timestamp: Option<DateTime<Utc>>,
    pub meta: MessageMeta,
}

impl RouteMeta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn who(mut self, who: Who) -> Self {
        self.who = Some(who);
        self
    }

    pub fn timestamp(mut self, ts: DateTime<Utc>) -> Self {
        self.timestamp = Some(ts);
        self
    }

    pub fn citations(mut self, citations: Vec<Citation>) -> Self {
        self.meta.citations = citations;
        self
    }

    pub fn attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.meta.attachments = attachments;
        self
    }

    /// Concrete message for one hop, defaults applied
    pub fn to_message(&self, source_id: &str, text: &str, via: String) -> Message {
        Message {
            source_id: source_id.to_string(),
            text: text.to_string(),
            author: self
                .author
                .clone()
                .unwrap_or_else(|| Message::DEFAULT_AUTHOR.to_string()),
            who: self.who.unwrap_or_default(),
            timestamp: self.timestamp.unwrap_or_else(Utc::now),
            meta: self.meta.relayed(via),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_meta_defaults() {
        let msg = RouteMeta::new().to_message("a", "hi", "a->b".to_string());
        assert_eq!(msg.author, "Incoming");
        assert_eq!(msg.who, Who::Assistant);
        assert_eq!(msg.meta.via.as_deref(), Some("a->b"));
    }

    #[test]
    fn test_relay_strips_attachments_keeps_citations() {
        let meta = RouteMeta::new()
            .citations(vec![Citation::new("Doc", "https://example.com")])
            .attachments(vec![Attachment::new("notes.pdf", 1200)]);
        let msg = meta.to_message("a", "hi", "a->b".to_string());
        assert_eq!(msg.meta.citations.len(), 1);
        assert!(msg.meta.attachments.is_empty());
    }

    #[test]
    fn test_who_serialization() {
        assert_eq!(serde_json::to_string(&Who::User).unwrap(), "\"user\"");
        assert_eq!(Who::Assistant.role(), "assistant");
    }
}
