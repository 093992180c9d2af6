use thiserror::Error;

/// Longest slice of a non-JSON error body kept in messages
const ERROR_BODY_LIMIT: usize = 200;

#[derive(Error, Debug)]
pub enum ReplyError {
    /// Network failure before any response arrived (or mid-body)
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{message}")]
    Http { status: u16, message: String },

    /// Error reported by the backend itself (stream `error` event)
    #[error("backend error: {0}")]
    Backend(String),

    /// Stream stayed open without producing an event
    #[error("stream idle for {0:?}")]
    StreamIdle(std::time::Duration),

    #[error("unexpected response (not JSON)")]
    UnexpectedContent,

    #[error("json error: {0}")]
    Encode(#[from] serde_json::Error),

    /// Deliberate cancellation by the owning node
    #[error("request aborted")]
    Aborted,
}

impl ReplyError {
    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted)
    }

    /// Heuristic for errors a different model might avoid
    pub fn is_model_related(&self) -> bool {
        match self {
            Self::Aborted | Self::UnexpectedContent | Self::Encode(_) => false,
            other => {
                let text = other.to_string().to_lowercase();
                ["model", "invalid", "not found"]
                    .iter()
                    .any(|needle| text.contains(needle))
            }
        }
    }

    /// Build an HTTP error from a non-2xx response
    ///
    /// JSON bodies contribute their `error`, `message` or `hint` field; other
    /// bodies are truncated to the first 200 characters.
    pub fn from_response_parts(status: u16, content_type: &str, body: &str) -> Self {
        let message = if is_json(content_type) {
            serde_json::from_str::<serde_json::Value>(body)
                .ok()
                .and_then(|value| {
                    ["error", "message", "hint"].iter().find_map(|key| {
                        value
                            .get(key)
                            .and_then(|v| v.as_str())
                            .filter(|s| !s.is_empty())
                            .map(str::to_string)
                    })
                })
                .unwrap_or_else(|| format!("HTTP {}", status))
        } else if body.is_empty() {
            format!("HTTP {}", status)
        } else {
            let head: String = body.chars().take(ERROR_BODY_LIMIT).collect();
            format!("HTTP {}: {}", status, head)
        };

        Self::Http { status, message }
    }
}

pub(crate) fn is_json(content_type: &str) -> bool {
    content_type.to_ascii_lowercase().contains("application/json")
}

pub type Result<T> = std::result::Result<T, ReplyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_error_fields() {
        let err = ReplyError::from_response_parts(401, "application/json", r#"{"error":"missing key"}"#);
        assert_eq!(err.to_string(), "missing key");

        let err = ReplyError::from_response_parts(400, "application/json", r#"{"hint":"try again"}"#);
        assert_eq!(err.to_string(), "try again");

        let err = ReplyError::from_response_parts(500, "application/json", "not json at all");
        assert_eq!(err.to_string(), "HTTP 500");
    }

    #[test]
    fn test_plain_error_truncated() {
        let body = "x".repeat(500);
        let err = ReplyError::from_response_parts(502, "text/html", &body);
        let text = err.to_string();
        assert!(text.starts_with("HTTP 502: "));
        assert_eq!(text.len(), "HTTP 502: ".len() + 200);
    }

    #[test]
    fn test_model_heuristic() {
        let err = ReplyError::Http {
            status: 404,
            message: "The model `gpt-9` does not exist".to_string(),
        };
        assert!(err.is_model_related());
        assert!(ReplyError::Backend("Invalid parameter".to_string()).is_model_related());
        assert!(!ReplyError::Backend("rate limited".to_string()).is_model_related());
        assert!(!ReplyError::Aborted.is_model_related());
        assert!(!ReplyError::StreamIdle(std::time::Duration::from_secs(2)).is_model_related());
    }
}
