//! Event system for generation lifecycle hooks.
//!
//! Provides an optional, non-intrusive way to observe a generation run.
//! The scheduler emits events when chunks start and finish and when the
//! retry controller re-issues a call. Implement [`EventHandler`] to receive
//! them for progress tracking or metrics; structured logs are written via
//! `tracing` regardless.

use std::sync::Arc;

/// Events emitted during a generation run.
#[derive(Debug, Clone)]
pub enum Event {
    /// A chunk request is about to be issued.
    ChunkStart {
        /// 0-based chunk index.
        index: usize,
        /// Absolute 0-based offset of the first scene in this chunk.
        offset: u32,
        /// Number of scenes requested in this chunk.
        count: u32,
    },
    /// A chunk produced a valid scene array.
    ChunkEnd {
        /// 0-based chunk index.
        index: usize,
        /// Number of scene drafts the chunk returned.
        scenes: usize,
        /// Attempts it took (1 = first call succeeded).
        attempts: u32,
    },
    /// A failed call is about to be re-issued.
    Retry {
        /// Operation being retried (e.g. `"outline chunk 2"`).
        name: String,
        /// The attempt that failed (1-indexed).
        attempt: u32,
        /// Delay before the next attempt in milliseconds.
        delay_ms: u64,
        /// Why the attempt failed.
        reason: String,
    },
    /// The whole run finished.
    GenerationEnd {
        /// Whether a result was produced.
        ok: bool,
        /// Number of merged scenes (0 on failure).
        scenes: usize,
    },
}

/// Handler for generation lifecycle events.
///
/// # Example
///
/// ```
/// use classtoon::events::{Event, EventHandler};
///
/// struct PrintHandler;
///
/// impl EventHandler for PrintHandler {
///     fn on_event(&self, event: Event) {
///         if let Event::Retry { name, attempt, .. } = event {
///             println!("[retry] {} after attempt {}", name, attempt);
///         }
///     }
/// }
/// ```
pub trait EventHandler: Send + Sync {
    /// Called when the run emits an event.
    fn on_event(&self, event: Event);
}

/// Emit an event if a handler is present. No-op otherwise.
pub(crate) fn emit(handler: &Option<Arc<dyn EventHandler>>, event: Event) {
    if let Some(ref h) = handler {
        h.on_event(event);
    }
}

/// An [`EventHandler`] backed by a closure.
///
/// # Example
///
/// ```
/// use classtoon::events::{Event, FnEventHandler};
/// use std::sync::Arc;
///
/// let handler = Arc::new(FnEventHandler(|event: Event| {
///     if let Event::ChunkEnd { index, scenes, .. } = event {
///         println!("chunk {index}: {scenes} scenes");
///     }
/// }));
/// ```
pub struct FnEventHandler<F: Fn(Event) + Send + Sync>(pub F);

impl<F: Fn(Event) + Send + Sync> EventHandler for FnEventHandler<F> {
    fn on_event(&self, event: Event) {
        (self.0)(event);
    }
}
