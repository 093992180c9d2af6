use crate::continuation::strip_sentinel;
use crate::error::{ReplyError, Result};
use crate::streaming::StreamEvent;
use crate::traits::{EventStream, ReplyClient, StreamObserver, StreamStart};
use crate::types::{ReplyRequest, ReplyResult, EMPTY_REPLY};
use futures::StreamExt;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use strand_types::Citation;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Idle,
    Requesting,
    Streaming,
    Completed,
    FallbackToSync,
    Aborted,
    Failed,
}

impl StreamState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Idle | Self::Requesting | Self::Streaming)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    /// `/chat/stream` answered in a non-stream content type
    NoStream,
    /// Tool calls were announced and the stream went quiet
    ToolPending,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StreamOutcome {
    Completed(ReplyResult),
    FallbackToSync(FallbackReason),
}

#[derive(Default)]
struct Accumulator {
    text: String,
    citations: Vec<Citation>,
    tools: Vec<Value>,
    /// Tool argument fragments, per name in first-seen order
    tool_args: Vec<(String, String)>,
    tool_debug: Option<Value>,
}

impl Accumulator {
    fn push_tool_delta(&mut self, name: Option<String>, fragment: &str) {
        let name = name.unwrap_or_default();
        match self.tool_args.iter_mut().find(|(n, _)| *n == name) {
            Some((_, args)) => args.push_str(fragment),
            None => self.tool_args.push((name, fragment.to_string())),
        }
    }

    fn finish(self, sentinel: &str) -> ReplyResult {
        let cleaned = strip_sentinel(&self.text, sentinel);
        let text = if cleaned.is_empty() {
            EMPTY_REPLY.to_string()
        } else {
            cleaned
        };

        let tool_debug = self.tool_debug.or_else(|| {
            if self.tools.is_empty() && self.tool_args.is_empty() {
                return None;
            }
            let calls: Vec<Value> = self
                .tool_args
                .into_iter()
                .map(|(name, arguments)| json!({ "name": name, "arguments": arguments }))
                .collect();
            Some(json!({ "tools": self.tools, "calls": calls }))
        });

        ReplyResult {
            text,
            citations: self.citations,
            tool_debug,
        }
    }
}

/// One streamed reply for one owner node
///
/// Walks `Idle -> Requesting -> Streaming` and ends in exactly one terminal
/// state. Cancellation of the owner's token is honoured at every await.
pub struct StreamingSession {
    client: Arc<dyn ReplyClient>,
    owner_id: String,
    cancel: CancellationToken,
    grace: Duration,
    /// Longest silence tolerated between stream events
    idle: Duration,
    sentinel: String,
    observer: Option<Arc<dyn StreamObserver>>,
    state: StreamState,
}

impl StreamingSession {
    pub const DEFAULT_GRACE: Duration = Duration::from_millis(900);
    pub const DEFAULT_IDLE: Duration = Duration::from_secs(120);

    pub fn new(
        client: Arc<dyn ReplyClient>,
        owner_id: impl Into<String>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            client,
            owner_id: owner_id.into(),
            cancel,
            grace: Self::DEFAULT_GRACE,
            idle: Self::DEFAULT_IDLE,
            sentinel: String::new(),
            observer: None,
            state: StreamState::Idle,
        }
    }

    pub fn with_grace_period(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    pub fn with_idle_timeout(mut self, idle: Duration) -> Self {
        self.idle = idle;
        self
    }

    pub fn with_sentinel(mut self, sentinel: impl Into<String>) -> Self {
        self.sentinel = sentinel.into();
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn StreamObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    fn transition(&mut self, next: StreamState) {
        debug!(owner = %self.owner_id, from = ?self.state, to = ?next, "stream state");
        self.state = next;
    }

    fn fail(&mut self, error: ReplyError) -> ReplyError {
        if error.is_aborted() {
            self.transition(StreamState::Aborted);
        } else {
            self.transition(StreamState::Failed);
        }
        error
    }

    pub async fn run(&mut self, request: &ReplyRequest) -> Result<StreamOutcome> {
        self.transition(StreamState::Requesting);
        let cancel = self.cancel.clone();
        let client = Arc::clone(&self.client);

        let start = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ReplyError::Aborted),
            start = client.chat_stream(request) => start,
        };

        match start {
            Err(e) => Err(self.fail(e)),
            Ok(StreamStart::NoStream { content_type }) => {
                debug!(owner = %self.owner_id, %content_type, "no stream available");
                self.transition(StreamState::FallbackToSync);
                Ok(StreamOutcome::FallbackToSync(FallbackReason::NoStream))
            }
            Ok(StreamStart::Events(events)) => self.consume(events).await,
        }
    }

    /// Drain an already-open event stream
    pub async fn consume(&mut self, mut events: EventStream) -> Result<StreamOutcome> {
        self.transition(StreamState::Streaming);
        let cancel = self.cancel.clone();
        let mut acc = Accumulator::default();

        let grace = sleep(self.grace);
        tokio::pin!(grace);
        let mut pending = false;
        let idle = sleep(self.idle);
        tokio::pin!(idle);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(self.fail(ReplyError::Aborted));
                }
                _ = grace.as_mut(), if pending => {
                    warn!(owner = %self.owner_id, "tool calls pending past grace period, falling back");
                    self.transition(StreamState::FallbackToSync);
                    return Ok(StreamOutcome::FallbackToSync(FallbackReason::ToolPending));
                }
                _ = idle.as_mut() => {
                    warn!(owner = %self.owner_id, idle = ?self.idle, "stream went silent");
                    return Err(self.fail(ReplyError::StreamIdle(self.idle)));
                }
                next = events.next() => {
                    idle.as_mut().reset(Instant::now() + self.idle);
                    let event = match next {
                        None if pending => {
                            self.transition(StreamState::FallbackToSync);
                            return Ok(StreamOutcome::FallbackToSync(FallbackReason::ToolPending));
                        }
                        None => break,
                        Some(Err(e)) => return Err(self.fail(e)),
                        Some(Ok(event)) => event,
                    };

                    if event.is_tool_pending() {
                        pending = true;
                        grace.as_mut().reset(Instant::now() + self.grace);
                        if let StreamEvent::Meta { tools, .. } = event {
                            acc.tools.extend(tools);
                        }
                        continue;
                    }
                    pending = false;

                    match event {
                        StreamEvent::Delta { text } => {
                            acc.text.push_str(&text);
                            if let Some(observer) = &self.observer {
                                observer.on_delta(&self.owner_id, &text, &acc.text);
                            }
                        }
                        StreamEvent::ToolDelta { name, args_delta } => {
                            acc.push_tool_delta(name, &args_delta);
                        }
                        StreamEvent::Meta { tools, .. } => acc.tools.extend(tools),
                        StreamEvent::Error { message } => {
                            return Err(self.fail(ReplyError::Backend(message)));
                        }
                        StreamEvent::Done { citations, tool_debug } => {
                            acc.citations = citations;
                            if tool_debug.is_some() {
                                acc.tool_debug = tool_debug;
                            }
                            break;
                        }
                    }
                }
            }
        }

        self.transition(StreamState::Completed);
        Ok(StreamOutcome::Completed(acc.finish(&self.sentinel)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulator_tool_debug() {
        let mut acc = Accumulator::default();
        acc.push_tool_delta(Some("search".to_string()), "{\"q\":");
        acc.push_tool_delta(Some("fetch".to_string()), "{}");
        acc.push_tool_delta(Some("search".to_string()), "\"rust\"}");
        acc.text.push_str("  MER_SIDOR ");

        let result = acc.finish("MER_SIDOR");
        assert_eq!(result.text, EMPTY_REPLY);
        let debug = result.tool_debug.unwrap();
        assert_eq!(debug["calls"][0]["name"], "search");
        assert_eq!(debug["calls"][0]["arguments"], "{\"q\":\"rust\"}");
        assert_eq!(debug["calls"][1]["name"], "fetch");
    }

    #[test]
    fn test_terminal_states() {
        assert!(!StreamState::Streaming.is_terminal());
        assert!(StreamState::FallbackToSync.is_terminal());
    }
}
