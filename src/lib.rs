//! # ClassToon
//!
//! Batched, retrying story-outline generation for children's educational
//! videos, backed by the Gemini `generateContent` API.
//!
//! A request for N scenes is split into windows of at most ten, each window
//! is sent to the completion service with a bounded retry budget, the reply
//! is loosely parsed, and the chunks are merged into one renumbered outline
//! with a metadata block.
//!
//! ## Core Concepts
//!
//! - **[`GenerationRequest`]**: the validated user parameters.
//! - **[`ExecCtx`]**: backend, retry budget and optional [`events::EventHandler`].
//! - **[`generate_outline`]**: the chunk scheduler; returns a [`GenerationResult`].
//! - **[`LlmCall`]**: single-shot calls for the develop, analyze, script and
//!   motion tools.
//! - **[`server`]**: the axum HTTP surface.
//!
//! ## Quick Start
//!
//! ```
//! use classtoon::{generate_outline, ExecCtx, GenerationRequest, MockBackend, OutputMode};
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let backend = Arc::new(MockBackend::fixed(
//!     r#"[{"beat": "Kenalan", "visual": "Hutan", "aksi": "Melompat",
//!         "dialog": "Halo!", "audio": "Burung", "exit": "Senyum", "transisi": "cut"}]"#,
//! ));
//! let ctx = ExecCtx::builder(backend).build();
//! let request = GenerationRequest {
//!     output_mode: OutputMode::PlainLocal,
//!     scene_count: 1,
//!     idea: "kelinci belajar berbagi".into(),
//!     ..Default::default()
//! };
//!
//! let result = generate_outline(&ctx, &request).await.unwrap();
//! assert_eq!(result.scenes()[0].timecode.to_string(), "0s–8s");
//! # });
//! ```

pub mod backend;
pub mod client;
pub mod error;
pub mod events;
pub mod exec_ctx;
pub mod history;
pub mod llm_call;
pub mod merge;
pub mod metadata;
pub mod parsing;
pub mod prompt;
pub mod retry;
pub mod scene;
pub mod scheduler;
pub mod server;
pub mod types;

pub use backend::{BackoffConfig, GeminiBackend, MockBackend, MockReply};
pub use client::LlmConfig;
pub use error::{GenerationError, Result};
pub use exec_ctx::{ExecCtx, ExecCtxBuilder};
pub use history::{HistoryRecord, HistoryStore, InMemoryHistory, TracingHistory};
pub use llm_call::LlmCall;
pub use metadata::GenerationMetadata;
pub use scene::{NormalizedScene, SceneDraft};
pub use scheduler::{generate_outline, generate_outline_dated};
pub use types::{ChunkWindow, GenerationRequest, GenerationResult, OutputMode};
