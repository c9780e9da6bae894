//! Shared application router builder.
//!
//! Both the binary and the integration tests build the app through
//! [`build_app_router`] so they exercise the same middleware stack.

use axum::routing::post;
use axum::Router;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use super::handlers::{health, motion, story};
use super::state::AppState;

/// Build the full application [`Router`].
pub fn build_app_router(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .route("/api/story/generate", post(story::generate))
        .route("/api/story/develop", post(story::develop))
        .route("/api/story/analyze", post(story::analyze))
        .route("/api/story/script", post(story::script))
        .route("/api/motion/generate", post(motion::generate))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}
