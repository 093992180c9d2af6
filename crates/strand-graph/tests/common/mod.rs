#![allow(dead_code)]

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;
use strand_llm::{
    ChatReply, ReplyClient, ReplyError, ReplyRequest, Result, StreamEvent, StreamStart,
};

/// How the fake backend answers
#[derive(Clone)]
pub enum Mode {
    /// Stream back `echo: <last user turn>`
    Echo,
    /// Fail every stream request with this HTTP status
    Fail(u16),
    /// Open a stream that never produces anything
    Hang,
    /// Hang for requests using this model, echo for every other model
    HangModel(String),
    /// No stream; `/chat` answers with this text
    Sync(String),
    /// No stream; `/chat` answers `page <startPage> MER_SIDOR`
    Paged,
}

pub struct FakeBackend {
    mode: Mode,
    delay: Duration,
    requests: Mutex<Vec<ReplyRequest>>,
}

impl FakeBackend {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            delay: Duration::ZERO,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn requests(&self) -> Vec<ReplyRequest> {
        self.requests.lock().unwrap().clone()
    }
}

fn last_user_turn(request: &ReplyRequest) -> String {
    request
        .messages
        .iter()
        .rev()
        .find(|t| t.role == "user")
        .map(|t| t.content.clone())
        .unwrap_or_default()
}

#[async_trait]
impl ReplyClient for FakeBackend {
    async fn chat(&self, request: &ReplyRequest) -> Result<ChatReply> {
        self.requests.lock().unwrap().push(request.clone());
        let reply = match &self.mode {
            Mode::Sync(text) => text.clone(),
            Mode::Paged => {
                let start = request.pgwise.map(|p| p.start_page).unwrap_or(0);
                format!("page {} MER_SIDOR", start)
            }
            _ => String::new(),
        };
        Ok(ChatReply {
            reply,
            ..ChatReply::default()
        })
    }

    async fn chat_stream(&self, request: &ReplyRequest) -> Result<StreamStart> {
        self.requests.lock().unwrap().push(request.clone());
        match &self.mode {
            Mode::HangModel(model) if request.model == *model => {
                Ok(StreamStart::Events(Box::pin(stream::pending::<Result<StreamEvent>>())))
            }
            Mode::Echo | Mode::HangModel(_) => {
                let text = format!("echo: {}", last_user_turn(request));
                let delay = self.delay;
                let first = stream::once(async move {
                    tokio::time::sleep(delay).await;
                    Ok::<_, ReplyError>(StreamEvent::delta(text))
                });
                let rest = stream::iter(vec![Ok(StreamEvent::done())]);
                Ok(StreamStart::Events(Box::pin(first.chain(rest))))
            }
            Mode::Fail(status) => Err(ReplyError::Http {
                status: *status,
                message: format!("HTTP {}", status),
            }),
            Mode::Hang => Ok(StreamStart::Events(Box::pin(stream::pending::<Result<StreamEvent>>()))),
            Mode::Sync(_) | Mode::Paged => Ok(StreamStart::NoStream {
                content_type: "application/json".to_string(),
            }),
        }
    }

    async fn key_status(&self) -> Result<bool> {
        Ok(!matches!(self.mode, Mode::Fail(_)))
    }
}

/// Poll `check` until it holds or two seconds pass
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..200 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
