//! Backend trait and normalized request/response types.
//!
//! The [`Backend`] trait abstracts over the completion service, translating
//! between normalized [`LlmRequest`]/[`LlmResponse`] types and the provider's
//! HTTP API. Built-in implementations: [`GeminiBackend`], [`MockBackend`].
//!
//! ## Architecture
//!
//! ```text
//! scheduler / LlmCall ──► LlmRequest ──► complete_with_deadline() ──► LlmResponse
//!                                               │
//!                                     Backend::complete()
//!                                    ┌──────────┴──────────┐
//!                              GeminiBackend           MockBackend
//!                          :generateContent        scripted replies
//! ```
//!
//! No retries happen at this layer; see [`crate::retry`].

pub mod backoff;
pub mod gemini;
pub mod mock;

pub use backoff::BackoffConfig;
pub use gemini::GeminiBackend;
pub use mock::{MockBackend, MockReply};

use crate::client::LlmConfig;
use crate::error::Result;
use crate::GenerationError;
use async_trait::async_trait;
use std::sync::Arc;

/// A normalized completion request.
#[derive(Debug, Clone)]
pub struct LlmRequest {
    /// Model identifier (e.g. `"gemini-2.5-flash"`).
    pub model: String,

    /// The full instruction text.
    pub prompt: String,

    /// Temperature, token budget, JSON mode and deadline.
    pub config: LlmConfig,
}

impl LlmRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>, config: LlmConfig) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            config,
        }
    }
}

/// A normalized completion response.
#[derive(Debug)]
pub struct LlmResponse {
    /// The generated text content.
    pub text: String,

    /// HTTP status code (for diagnostics/logging).
    pub status: u16,
}

/// Abstraction over completion providers.
///
/// Implementors issue exactly one outbound call per invocation and map
/// provider failures onto the [`GenerationError`] upstream variants.
///
/// # Object Safety
///
/// This trait is object-safe and designed to be used as `Arc<dyn Backend>`.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Execute a single completion call.
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse>;

    /// Human-readable name for logging and diagnostics.
    fn name(&self) -> &'static str;
}

/// Issue one completion call bounded by the request's hard deadline.
///
/// The deadline timer lives inside the returned future's scope, so it is
/// dropped on success, on failure and on expiry alike.
pub async fn complete_with_deadline(
    backend: &Arc<dyn Backend>,
    request: &LlmRequest,
) -> Result<LlmResponse> {
    let deadline = request.config.timeout;
    match tokio::time::timeout(deadline, backend.complete(request)).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(
                backend = backend.name(),
                model = %request.model,
                timeout_ms = deadline.as_millis() as u64,
                "completion call exceeded its deadline"
            );
            Err(GenerationError::Timeout { after: deadline })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio_test::assert_ok;

    fn request(timeout: Duration) -> LlmRequest {
        LlmRequest::new(
            "gemini-2.5-flash",
            "hello",
            LlmConfig::default().with_timeout(timeout),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_turns_stall_into_timeout() {
        let backend: Arc<dyn Backend> = Arc::new(MockBackend::new(vec![MockReply::Stall]));
        let err = complete_with_deadline(&backend, &request(Duration::from_secs(20)))
            .await
            .unwrap_err();
        match err {
            GenerationError::Timeout { after } => assert_eq!(after, Duration::from_secs(20)),
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_deadline_passes_through_success() {
        let backend: Arc<dyn Backend> = Arc::new(MockBackend::fixed("ok"));
        let resp = assert_ok!(complete_with_deadline(&backend, &request(Duration::from_secs(5))).await);
        assert_eq!(resp.text, "ok");
        assert_eq!(resp.status, 200);
    }

    #[tokio::test]
    async fn test_deadline_passes_through_upstream_error() {
        let backend: Arc<dyn Backend> =
            Arc::new(MockBackend::new(vec![MockReply::status(503, "overloaded")]));
        let err = complete_with_deadline(&backend, &request(Duration::from_secs(5)))
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::UpstreamServer { status: 503, .. }));
    }
}
