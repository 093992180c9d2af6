use crate::error::Result;
use crate::streaming::StreamEvent;
use crate::types::{ChatReply, ReplyRequest};
use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent>> + Send>>;

/// What `POST /chat/stream` handed back
pub enum StreamStart {
    Events(EventStream),
    /// 200 response in a non-stream content type
    NoStream { content_type: String },
}

impl std::fmt::Debug for StreamStart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Events(_) => f.write_str("StreamStart::Events(..)"),
            Self::NoStream { content_type } => f
                .debug_struct("StreamStart::NoStream")
                .field("content_type", content_type)
                .finish(),
        }
    }
}

/// Client for the chat backend
///
/// Provides the synchronous reply, the NDJSON event stream and the key probe.
#[async_trait]
pub trait ReplyClient: Send + Sync {
    async fn chat(&self, request: &ReplyRequest) -> Result<ChatReply>;

    async fn chat_stream(&self, request: &ReplyRequest) -> Result<StreamStart>;

    /// Whether the backend holds a usable API key
    async fn key_status(&self) -> Result<bool>;
}

/// Receives partial text while a reply streams in
pub trait StreamObserver: Send + Sync {
    fn on_delta(&self, owner_id: &str, delta: &str, accumulated: &str);
}
