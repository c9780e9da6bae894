//! Execution context for one generation run.
//!
//! [`ExecCtx`] carries the completion backend, the retry budget and an
//! optional event handler. It holds no per-request state, so handlers build
//! one per request (cheap: everything inside is an `Arc` or small config).

use crate::backend::{Backend, BackoffConfig};
use crate::events::{emit, Event, EventHandler};
use std::sync::Arc;
use std::time::Duration;

/// Shared execution context for generation calls.
///
/// # Example
///
/// ```
/// use classtoon::{ExecCtx, MockBackend};
/// use std::sync::Arc;
///
/// let ctx = ExecCtx::builder(Arc::new(MockBackend::fixed("[]"))).build();
/// assert_eq!(ctx.backoff.max_attempts, 3);
/// ```
pub struct ExecCtx {
    /// Completion backend.
    pub backend: Arc<dyn Backend>,
    /// Retry budget and delay schedule. Default: [`BackoffConfig::standard()`].
    pub backoff: BackoffConfig,
    /// Optional event handler for lifecycle events.
    pub event_handler: Option<Arc<dyn EventHandler>>,
}

impl ExecCtx {
    /// Create a new builder.
    pub fn builder(backend: Arc<dyn Backend>) -> ExecCtxBuilder {
        ExecCtxBuilder {
            backend,
            backoff: None,
            event_handler: None,
        }
    }

    pub(crate) fn emit(&self, event: Event) {
        emit(&self.event_handler, event);
    }

    /// Log and emit a retry decision.
    pub(crate) fn report_retry(
        &self,
        name: &str,
        attempt: u32,
        delay: Duration,
        error: &crate::GenerationError,
    ) {
        tracing::warn!(
            operation = name,
            attempt,
            delay_ms = delay.as_millis() as u64,
            error = %error,
            "retrying completion call"
        );
        self.emit(Event::Retry {
            name: name.to_string(),
            attempt,
            delay_ms: delay.as_millis() as u64,
            reason: error.to_string(),
        });
    }
}

impl std::fmt::Debug for ExecCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecCtx")
            .field("backend", &self.backend.name())
            .field("backoff", &self.backoff)
            .field("has_event_handler", &self.event_handler.is_some())
            .finish()
    }
}

/// Builder for [`ExecCtx`].
pub struct ExecCtxBuilder {
    backend: Arc<dyn Backend>,
    backoff: Option<BackoffConfig>,
    event_handler: Option<Arc<dyn EventHandler>>,
}

impl ExecCtxBuilder {
    /// Set the retry configuration. Default: [`BackoffConfig::standard()`].
    pub fn backoff(mut self, config: BackoffConfig) -> Self {
        self.backoff = Some(config);
        self
    }

    /// Set the event handler.
    pub fn event_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.event_handler = Some(handler);
        self
    }

    /// Build the execution context.
    pub fn build(self) -> ExecCtx {
        ExecCtx {
            backend: self.backend,
            backoff: self.backoff.unwrap_or_default(),
            event_handler: self.event_handler,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockBackend;
    use crate::events::FnEventHandler;
    use std::sync::Mutex;

    #[test]
    fn test_builder_defaults() {
        let ctx = ExecCtx::builder(Arc::new(MockBackend::fixed("x"))).build();
        assert_eq!(ctx.backoff.max_attempts, 3);
        assert!(ctx.event_handler.is_none());
        assert!(format!("{ctx:?}").contains("mock"));
    }

    #[test]
    fn test_report_retry_emits_event() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let ctx = ExecCtx::builder(Arc::new(MockBackend::fixed("x")))
            .backoff(BackoffConfig::none())
            .event_handler(Arc::new(FnEventHandler(move |e: Event| {
                sink.lock().unwrap().push(e)
            })))
            .build();

        ctx.report_retry(
            "outline",
            1,
            Duration::from_millis(500),
            &crate::GenerationError::EmptyResult { raw: String::new() },
        );

        let events = seen.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0],
            Event::Retry { attempt: 1, delay_ms: 500, .. }
        ));
    }
}
