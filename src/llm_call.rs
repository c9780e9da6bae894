//! Single-shot completion calls for the develop, analyze, script and motion tools.
//!
//! [`LlmCall`] issues exactly one deadline-bounded request. It does not
//! retry; the tools surface the first failure to the user.

use crate::backend::{complete_with_deadline, LlmRequest};
use crate::client::LlmConfig;
use crate::error::Result;
use crate::exec_ctx::ExecCtx;
use crate::parsing::parse_loose;
use crate::types::DEFAULT_TOOL_MODEL;
use crate::GenerationError;
use serde_json::Value;
use std::time::Instant;

/// A named single-shot call with its model and generation settings.
///
/// # Example
///
/// ```
/// use classtoon::{ExecCtx, LlmCall, LlmConfig, MockBackend};
/// use std::sync::Arc;
///
/// # tokio_test::block_on(async {
/// let ctx = ExecCtx::builder(Arc::new(MockBackend::fixed(r#"{"plot": "..."}"#))).build();
/// let call = LlmCall::new("develop").with_config(LlmConfig::develop());
/// let value = call.invoke_json(&ctx, "Kembangkan ide ini").await.unwrap();
/// assert_eq!(value["plot"], "...");
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct LlmCall {
    name: String,
    model: String,
    config: LlmConfig,
}

impl LlmCall {
    /// Create a call using the default tool model and settings.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model: DEFAULT_TOOL_MODEL.to_string(),
            config: LlmConfig::default(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Set the model. Blank values keep the current one.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        let model = model.into();
        if !model.trim().is_empty() {
            self.model = model;
        }
        self
    }

    pub fn with_config(mut self, config: LlmConfig) -> Self {
        self.config = config;
        self
    }

    /// Send `prompt` and return the reply text as-is.
    pub async fn invoke_text(&self, ctx: &ExecCtx, prompt: &str) -> Result<String> {
        let request = LlmRequest::new(&self.model, prompt, self.config.clone());
        let started = Instant::now();
        tracing::debug!(call = %self.name, model = %self.model, "invoking");

        match complete_with_deadline(&ctx.backend, &request).await {
            Ok(response) => {
                tracing::debug!(
                    call = %self.name,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    chars = response.text.len(),
                    "call complete"
                );
                Ok(response.text)
            }
            Err(err) => {
                tracing::warn!(call = %self.name, error = %err, "call failed");
                Err(err)
            }
        }
    }

    /// Send `prompt` and loosely parse the reply, which must be a JSON object.
    pub async fn invoke_json(&self, ctx: &ExecCtx, prompt: &str) -> Result<Value> {
        let text = self.invoke_text(ctx, prompt).await?;
        let value = parse_loose(&text)?;
        if !value.is_object() {
            return Err(GenerationError::ShapeMismatch {
                expected: "a JSON object",
                raw: text,
            });
        }
        Ok(value)
    }
}
