#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use classtoon::backend::{Backend, MockBackend};
use classtoon::server::{build_app_router, AppState, ServerConfig};
use classtoon::InMemoryHistory;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        gemini_api_key: Some("test-key".to_string()),
        ..Default::default()
    }
}

/// Handles a test keeps after building the app.
pub struct TestApp {
    pub router: Router,
    pub backend: Arc<MockBackend>,
    pub history: Arc<InMemoryHistory>,
}

/// Build the full router around a scripted backend.
///
/// Uses the same [`build_app_router`] the binary uses.
pub fn build_test_app(backend: MockBackend) -> TestApp {
    let backend = Arc::new(backend);
    let history = Arc::new(InMemoryHistory::new());
    let state = AppState {
        backend: Some(Arc::clone(&backend) as Arc<dyn Backend>),
        backoff: test_config().backoff(),
        history: Arc::clone(&history) as _,
    };
    TestApp {
        router: build_app_router(state),
        backend,
        history,
    }
}

/// Build the router with no API key configured.
pub fn build_unconfigured_app() -> Router {
    build_app_router(AppState::from_config(ServerConfig {
        gemini_api_key: None,
        ..test_config()
    }))
}

/// Send a GET request.
pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// Send a POST request with a JSON body.
pub async fn post_json(app: Router, uri: &str, body: Value) -> Response<Body> {
    post_raw(app, uri, body.to_string()).await
}

/// Send a POST request with a raw body labelled as JSON.
pub async fn post_raw(app: Router, uri: &str, body: String) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .header("x-user-id", "user-123")
        .body(Body::from(body))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// Collect a response body as JSON.
pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
