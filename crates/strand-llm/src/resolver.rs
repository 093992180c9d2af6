use crate::error::{ReplyError, Result};
use crate::traits::ReplyClient;
use crate::types::{ChatReply, ReplyRequest, ReplyResult, EMPTY_REPLY};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Outcome of a synchronous reply after fallbacks
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    Reply(ReplyResult),
    /// Every attempt came back without text
    Empty { backend_error: Option<String> },
}

impl Resolved {
    /// Collapse into a result, substituting the placeholder for no text
    pub fn into_result(self) -> ReplyResult {
        match self {
            Self::Reply(reply) => reply,
            Self::Empty {
                backend_error: Some(error),
            } => ReplyResult::new(format!("Error: {}", error)),
            Self::Empty { backend_error: None } => ReplyResult::new(EMPTY_REPLY),
        }
    }
}

enum Attempt {
    Text(ReplyResult),
    Empty(Option<String>),
    ModelError(ReplyError),
}

/// Synchronous `/chat` with a fixed fallback ladder
///
/// Primary request, then the safe-default model, then tools disabled. Each
/// rung is tried at most once and only while no text has come back.
#[derive(Clone)]
pub struct FallbackResolver {
    client: Arc<dyn ReplyClient>,
    safe_default_model: String,
}

impl FallbackResolver {
    pub fn new(client: Arc<dyn ReplyClient>, safe_default_model: impl Into<String>) -> Self {
        Self {
            client,
            safe_default_model: safe_default_model.into(),
        }
    }

    pub fn safe_default_model(&self) -> &str {
        &self.safe_default_model
    }

    pub async fn resolve(
        &self,
        request: &ReplyRequest,
        cancel: &CancellationToken,
    ) -> Result<ReplyResult> {
        Ok(self.try_resolve(request, cancel).await?.into_result())
    }

    pub async fn try_resolve(
        &self,
        request: &ReplyRequest,
        cancel: &CancellationToken,
    ) -> Result<Resolved> {
        let mut last = match self.attempt(request, cancel).await? {
            Attempt::Text(reply) => return Ok(Resolved::Reply(reply)),
            other => other,
        };

        let mut current = request.clone();
        if current.model != self.safe_default_model {
            warn!(
                model = %current.model,
                fallback = %self.safe_default_model,
                "no usable reply, retrying with safe default model"
            );
            current = current.with_model(self.safe_default_model.clone());
            last = match self.attempt(&current, cancel).await? {
                Attempt::Text(reply) => return Ok(Resolved::Reply(reply)),
                other => other,
            };
        }

        if current.has_tools() {
            warn!(model = %current.model, "no usable reply, retrying with tools disabled");
            current = current.without_tools();
            last = match self.attempt(&current, cancel).await? {
                Attempt::Text(reply) => return Ok(Resolved::Reply(reply)),
                other => other,
            };
        }

        match last {
            Attempt::ModelError(e) => Err(e),
            Attempt::Empty(backend_error) => Ok(Resolved::Empty { backend_error }),
            Attempt::Text(reply) => Ok(Resolved::Reply(reply)),
        }
    }

    /// One `/chat` call; errors a fallback cannot fix propagate
    async fn attempt(&self, request: &ReplyRequest, cancel: &CancellationToken) -> Result<Attempt> {
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ReplyError::Aborted),
            outcome = self.client.chat(request) => outcome,
        };

        match outcome {
            Ok(reply) if reply.has_text() => Ok(Attempt::Text(ChatReply::into_result(reply))),
            Ok(reply) => {
                debug!(model = %request.model, error = ?reply.error, "empty reply");
                Ok(Attempt::Empty(reply.error.filter(|e| !e.trim().is_empty())))
            }
            Err(e) if e.is_model_related() => {
                warn!(model = %request.model, error = %e, "model-related failure");
                Ok(Attempt::ModelError(e))
            }
            Err(e) => Err(e),
        }
    }
}
