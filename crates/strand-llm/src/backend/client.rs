use crate::buffer_utils::parse_ndjson_stream;
use crate::error::{is_json, ReplyError, Result};
use crate::traits::{ReplyClient, StreamStart};
use crate::types::{ChatReply, ReplyRequest};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::Response;
use serde::Deserialize;
use std::time::Duration;
use strand_types::BackendConfig;
use tracing::debug;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const NDJSON: &str = "x-ndjson";

/// HTTP client for the chat backend (`/chat`, `/chat/stream`, `/key-status`)
pub struct HttpReplyClient {
    http_client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

#[derive(Deserialize)]
struct KeyStatus {
    #[serde(default, rename = "hasKey")]
    has_key: bool,
}

impl HttpReplyClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::from_config(&BackendConfig::new(base_url))
    }

    pub fn from_config(config: &BackendConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http_client = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: config.timeout(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Non-2xx responses become [`ReplyError::Http`]
    async fn check_status(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let content_type = content_type(&response);
        let body = response.text().await.unwrap_or_default();
        Err(ReplyError::from_response_parts(
            status.as_u16(),
            &content_type,
            &body,
        ))
    }
}

fn content_type(response: &Response) -> String {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

#[async_trait]
impl ReplyClient for HttpReplyClient {
    async fn chat(&self, request: &ReplyRequest) -> Result<ChatReply> {
        debug!(model = %request.model, "POST /chat");
        let response = self
            .http_client
            .post(self.url("/chat"))
            .timeout(self.timeout)
            .json(request)
            .send()
            .await?;
        let response = Self::check_status(response).await?;

        if !is_json(&content_type(&response)) {
            return Err(ReplyError::UnexpectedContent);
        }
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            debug!(error = %e, "malformed /chat body");
            ReplyError::UnexpectedContent
        })
    }

    async fn chat_stream(&self, request: &ReplyRequest) -> Result<StreamStart> {
        debug!(model = %request.model, "POST /chat/stream");
        let response = self
            .http_client
            .post(self.url("/chat/stream"))
            .header(ACCEPT, "application/x-ndjson")
            .json(request)
            .send()
            .await?;
        let response = Self::check_status(response).await?;

        let content_type = content_type(&response);
        if !content_type.to_ascii_lowercase().contains(NDJSON) {
            return Ok(StreamStart::NoStream { content_type });
        }
        Ok(StreamStart::Events(parse_ndjson_stream(response.bytes_stream())))
    }

    async fn key_status(&self) -> Result<bool> {
        let response = self
            .http_client
            .get(self.url("/key-status"))
            .timeout(self.timeout)
            .send()
            .await?;
        let response = Self::check_status(response).await?;
        let status: KeyStatus = response.json().await?;
        Ok(status.has_key)
    }
}
