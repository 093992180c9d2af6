use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strand_llm::{ReplyResult, StreamObserver};
use strand_types::{Attachment, ChunkPolicy, Citation, Message, NodeSettings, Who};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// Message delivered over an edge
    Incoming,
    /// Reply produced by the node itself
    Reply,
    /// Failed reply attempt; never sent back to the backend
    Error,
}

/// One line of a node's conversation log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: Uuid,
    pub kind: EntryKind,
    pub who: Who,
    pub author: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub citations: Vec<Citation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub via: Option<String>,
}

impl LogEntry {
    pub fn incoming(message: &Message, who: Who) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: EntryKind::Incoming,
            who,
            author: message.author.clone(),
            text: message.text.clone(),
            timestamp: message.timestamp,
            citations: message.meta.citations.clone(),
            attachments: Vec::new(),
            via: message.meta.via.clone(),
        }
    }

    pub fn reply(author: impl Into<String>, reply: &ReplyResult, attachments: Vec<Attachment>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: EntryKind::Reply,
            who: Who::Assistant,
            author: author.into(),
            text: reply.text.clone(),
            timestamp: Utc::now(),
            citations: reply.citations.clone(),
            attachments,
            via: None,
        }
    }

    pub fn error(author: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: EntryKind::Error,
            who: Who::Assistant,
            author: author.into(),
            text: text.into(),
            timestamp: Utc::now(),
            citations: Vec::new(),
            attachments: Vec::new(),
            via: None,
        }
    }
}

/// Per-node message history
#[async_trait]
pub trait ConversationLog: Send + Sync {
    async fn append(&self, node_id: &str, entry: LogEntry) -> Result<()>;

    /// Most recent `limit` entries, oldest first
    async fn history(&self, node_id: &str, limit: usize) -> Result<Vec<LogEntry>>;
}

/// Document sections that collect forwarded text
#[async_trait]
pub trait SectionSink: Send + Sync {
    async fn append(&self, section_id: &str, message: &Message) -> Result<()>;
}

/// Node configuration, read fresh for every delivery
pub trait SettingsStore: Send + Sync {
    fn chunk_policy(&self, node_id: &str) -> ChunkPolicy;

    fn node_settings(&self, node_id: &str) -> NodeSettings;

    /// Reference material attached to the node
    fn attachments(&self, node_id: &str) -> Vec<Attachment>;
}

/// Live view of replies as they are produced
pub trait LiveObserver: Send + Sync {
    fn on_delta(&self, owner_id: &str, delta: &str, accumulated: &str);

    fn on_reply(&self, _owner_id: &str, _reply: &ReplyResult) {}
}

/// Adapts a [`LiveObserver`] to the session's observer hook
pub(crate) struct ObserverBridge(pub(crate) std::sync::Arc<dyn LiveObserver>);

impl StreamObserver for ObserverBridge {
    fn on_delta(&self, owner_id: &str, delta: &str, accumulated: &str) {
        self.0.on_delta(owner_id, delta, accumulated);
    }
}
