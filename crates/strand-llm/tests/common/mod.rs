#![allow(dead_code)]

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::collections::VecDeque;
use std::sync::Mutex;
use strand_llm::{
    ChatReply, EventStream, ReplyClient, ReplyError, ReplyRequest, Result, StreamEvent,
    StreamStart,
};

/// Reply client that plays back canned responses and records requests
#[derive(Default)]
pub struct ScriptedClient {
    chat_replies: Mutex<VecDeque<Result<ChatReply>>>,
    streams: Mutex<VecDeque<Result<StreamStart>>>,
    requests: Mutex<Vec<ReplyRequest>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, text: &str) -> Self {
        self.push_chat(Ok(ChatReply {
            reply: text.to_string(),
            ..ChatReply::default()
        }))
    }

    pub fn empty(self, error: Option<&str>) -> Self {
        self.push_chat(Ok(ChatReply {
            error: error.map(str::to_string),
            ..ChatReply::default()
        }))
    }

    pub fn fail(self, error: ReplyError) -> Self {
        self.push_chat(Err(error))
    }

    pub fn push_chat(self, reply: Result<ChatReply>) -> Self {
        self.chat_replies.lock().unwrap().push_back(reply);
        self
    }

    pub fn stream(self, start: Result<StreamStart>) -> Self {
        self.streams.lock().unwrap().push_back(start);
        self
    }

    pub fn requests(&self) -> Vec<ReplyRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReplyClient for ScriptedClient {
    async fn chat(&self, request: &ReplyRequest) -> Result<ChatReply> {
        self.requests.lock().unwrap().push(request.clone());
        self.chat_replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(ChatReply::default()))
    }

    async fn chat_stream(&self, request: &ReplyRequest) -> Result<StreamStart> {
        self.requests.lock().unwrap().push(request.clone());
        self.streams.lock().unwrap().pop_front().unwrap_or_else(|| {
            Ok(StreamStart::NoStream {
                content_type: "application/json".to_string(),
            })
        })
    }

    async fn key_status(&self) -> Result<bool> {
        Ok(true)
    }
}

/// Finite event stream
pub fn events(items: Vec<StreamEvent>) -> EventStream {
    Box::pin(stream::iter(items.into_iter().map(Ok::<_, ReplyError>)))
}

/// Event stream that goes silent after `items` without ending
pub fn hanging(items: Vec<StreamEvent>) -> EventStream {
    Box::pin(stream::iter(items.into_iter().map(Ok::<_, ReplyError>)).chain(stream::pending()))
}
