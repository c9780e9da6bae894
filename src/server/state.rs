use std::sync::Arc;

use crate::backend::{Backend, BackoffConfig, GeminiBackend};
use crate::error::Result;
use crate::exec_ctx::ExecCtx;
use crate::history::{HistoryStore, TracingHistory};
use crate::GenerationError;

use super::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; everything inside is behind an `Arc` or small config.
#[derive(Clone)]
pub struct AppState {
    /// Completion backend, absent when no API key is configured.
    pub backend: Option<Arc<dyn Backend>>,
    /// Retry budget for outline chunks.
    pub backoff: BackoffConfig,
    /// Generation history sink.
    pub history: Arc<dyn HistoryStore>,
}

impl AppState {
    /// Build state from configuration, using the Gemini backend when a key
    /// is present. History records go to the log.
    pub fn from_config(config: ServerConfig) -> Self {
        let backend = config.gemini_api_key.as_ref().map(|key| {
            Arc::new(GeminiBackend::with_client(
                reqwest::Client::new(),
                config.gemini_base_url.clone(),
                key.clone(),
            )) as Arc<dyn Backend>
        });
        if backend.is_none() {
            tracing::warn!("GEMINI_API_KEY is not set; generation endpoints will return 500");
        }
        Self {
            backoff: config.backoff(),
            backend,
            history: Arc::new(TracingHistory),
        }
    }

    /// Execution context for one request.
    ///
    /// Fails with a configuration error when no backend is available.
    pub fn exec_ctx(&self) -> Result<ExecCtx> {
        let backend = self
            .backend
            .clone()
            .ok_or_else(|| GenerationError::Config("Server missing GEMINI_API_KEY".into()))?;
        Ok(ExecCtx::builder(backend).backoff(self.backoff.clone()).build())
    }
}
