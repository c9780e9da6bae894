//! Backend for the Gemini `generateContent` API.
//!
//! [`GeminiBackend`] translates normalized [`LlmRequest`]s into
//! `POST {base}/models/{model}:generateContent?key={key}` calls and pulls the
//! text out of the first candidate.

use super::{Backend, LlmRequest, LlmResponse};
use crate::error::Result;
use crate::GenerationError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

/// Default public endpoint.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Backend for Google's Gemini API.
///
/// The API key travels in the query string, so URLs are never logged and
/// transport errors are stripped of their URL before they propagate.
#[derive(Clone)]
pub struct GeminiBackend {
    client: Client,
    base_url: String,
    api_key: String,
}

impl GeminiBackend {
    /// Create a backend against the public endpoint.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_client(Client::new(), DEFAULT_BASE_URL, api_key)
    }

    /// Create a backend with a custom HTTP client and base URL.
    pub fn with_client(
        client: Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    fn url(&self, model: &str) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, model, self.api_key
        )
    }

    /// Build the `generateContent` JSON body.
    fn build_body(request: &LlmRequest) -> Value {
        let mut generation_config = serde_json::Map::new();
        if let Some(temperature) = request.config.temperature {
            generation_config.insert("temperature".into(), json!(temperature));
        }
        if let Some(max_tokens) = request.config.max_tokens {
            generation_config.insert("maxOutputTokens".into(), json!(max_tokens));
        }
        if request.config.json_mode {
            generation_config.insert("responseMimeType".into(), json!("application/json"));
        }

        let mut body = json!({
            "contents": [{ "parts": [{ "text": request.prompt }] }],
        });
        if !generation_config.is_empty() {
            body["generationConfig"] = Value::Object(generation_config);
        }
        body
    }

    /// Pull the generated text out of a response envelope.
    ///
    /// Joins the text of every part of the first candidate; returns `None`
    /// when that yields nothing.
    fn extract_text(envelope: &Value) -> Option<String> {
        let parts = envelope
            .pointer("/candidates/0/content/parts")
            .and_then(|p| p.as_array())?;
        let joined: String = parts
            .iter()
            .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
            .collect();
        if !joined.is_empty() {
            return Some(joined);
        }
        parts
            .first()
            .and_then(|p| p.get("text"))
            .and_then(|t| t.as_str())
            .filter(|t| !t.is_empty())
            .map(str::to_string)
    }

    /// Parse a Retry-After header value as seconds.
    fn parse_retry_after(value: &str) -> Option<Duration> {
        value.trim().parse::<u64>().ok().map(Duration::from_secs)
    }
}

impl std::fmt::Debug for GeminiBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiBackend")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// Map a non-success HTTP status onto the upstream error kinds.
pub(crate) fn classify_status(
    status: u16,
    body: String,
    retry_after: Option<Duration>,
) -> GenerationError {
    match status {
        401 | 403 => GenerationError::UpstreamAuth { status, body },
        429 => GenerationError::RateLimited { body, retry_after },
        s if s >= 500 => GenerationError::UpstreamServer { status, body },
        _ => GenerationError::UpstreamStatus { status, body },
    }
}

#[async_trait]
impl Backend for GeminiBackend {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse> {
        let body = Self::build_body(request);

        let resp = self
            .client
            .post(self.url(&request.model))
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerationError::Request(e.without_url()))?;

        let status = resp.status().as_u16();
        tracing::debug!(model = %request.model, status, "gemini responded");

        if !resp.status().is_success() {
            let retry_after = resp
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(Self::parse_retry_after);
            let text = resp.text().await.unwrap_or_default();
            return Err(classify_status(status, text, retry_after));
        }

        let raw = resp
            .text()
            .await
            .map_err(|e| GenerationError::Request(e.without_url()))?;
        let envelope: Value = match serde_json::from_str(&raw) {
            Ok(v) => v,
            Err(_) => return Err(GenerationError::EmptyResult { raw }),
        };

        match Self::extract_text(&envelope) {
            Some(text) => Ok(LlmResponse { text, status }),
            None => Err(GenerationError::EmptyResult { raw }),
        }
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}
