//! Mock backend for testing without a live completion service.
//!
//! [`MockBackend`] plays back scripted replies in order, allowing the
//! scheduler, the retry controller and the HTTP layer to be tested
//! deterministically.
//!
//! # Example
//!
//! ```
//! use classtoon::backend::{MockBackend, MockReply};
//!
//! let mock = MockBackend::new(vec![
//!     MockReply::status(429, "quota"),
//!     MockReply::text("[]"),
//! ]);
//! assert_eq!(mock.calls(), 0);
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::gemini::classify_status;
use super::{Backend, LlmRequest, LlmResponse};
use crate::error::Result;
use crate::GenerationError;

/// One scripted reply.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// A 200 with this text.
    Text(String),
    /// A non-success status with this body, classified like a real response.
    Status { status: u16, body: String },
    /// A 200 whose envelope carries no text.
    Empty,
    /// Never answers; only a deadline ends the call.
    Stall,
}

impl MockReply {
    pub fn text(text: impl Into<String>) -> Self {
        MockReply::Text(text.into())
    }

    pub fn status(status: u16, body: impl Into<String>) -> Self {
        MockReply::Status {
            status,
            body: body.into(),
        }
    }
}

/// A test backend that returns scripted replies in order.
///
/// Cycles back to the beginning when all replies have been consumed.
/// Every request is recorded so tests can inspect the prompts sent.
#[derive(Debug)]
pub struct MockBackend {
    replies: Vec<MockReply>,
    index: AtomicUsize,
    requests: Mutex<Vec<LlmRequest>>,
}

impl MockBackend {
    /// Create a mock backend with the given scripted replies.
    pub fn new(replies: Vec<MockReply>) -> Self {
        assert!(!replies.is_empty(), "MockBackend requires at least one reply");
        Self {
            replies,
            index: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Create a mock that always returns the same text.
    pub fn fixed(text: impl Into<String>) -> Self {
        Self::new(vec![MockReply::text(text)])
    }

    /// Number of calls made so far.
    pub fn calls(&self) -> usize {
        self.index.load(Ordering::SeqCst)
    }

    /// Prompts received so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.requests
            .lock()
            .map(|reqs| reqs.iter().map(|r| r.prompt.clone()).collect())
            .unwrap_or_default()
    }

    /// Models requested so far, in call order.
    pub fn models(&self) -> Vec<String> {
        self.requests
            .lock()
            .map(|reqs| reqs.iter().map(|r| r.model.clone()).collect())
            .unwrap_or_default()
    }

    fn next_reply(&self) -> MockReply {
        let idx = self.index.fetch_add(1, Ordering::SeqCst) % self.replies.len();
        self.replies[idx].clone()
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse> {
        if let Ok(mut reqs) = self.requests.lock() {
            reqs.push(request.clone());
        }
        match self.next_reply() {
            MockReply::Text(text) => Ok(LlmResponse { text, status: 200 }),
            MockReply::Status { status, body } => Err(classify_status(status, body, None)),
            MockReply::Empty => Err(GenerationError::EmptyResult {
                raw: r#"{"candidates":[]}"#.to_string(),
            }),
            MockReply::Stall => {
                tokio::time::sleep(Duration::from_secs(24 * 60 * 60)).await;
                Err(GenerationError::Other("mock stall elapsed".into()))
            }
        }
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
