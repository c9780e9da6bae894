use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::GenerationError;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`GenerationError`] and renders `{ error, raw_ai_text? }` bodies.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain error from the generation core.
    #[error(transparent)]
    Generation(#[from] GenerationError),

    /// A request body that could not be read.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl AppError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Generation(err) => match err {
                GenerationError::Validation(_) => StatusCode::BAD_REQUEST,
                GenerationError::Config(_) | GenerationError::Other(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
                _ => StatusCode::BAD_GATEWAY,
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            AppError::BadRequest(msg) => json!({ "error": msg }),
            AppError::Generation(err) => {
                match err {
                    GenerationError::Config(msg) => {
                        tracing::error!(error = %msg, "configuration error");
                    }
                    GenerationError::Other(msg) => {
                        tracing::error!(error = %msg, "internal error");
                    }
                    GenerationError::Validation(_) => {}
                    upstream => tracing::warn!(error = %upstream, "upstream failure"),
                }
                let message = match err {
                    GenerationError::Config(msg) => msg.clone(),
                    GenerationError::Other(_) => "Internal error".to_string(),
                    other => other.user_message(),
                };
                match err.raw_text() {
                    Some(raw) => json!({ "error": message, "raw_ai_text": raw }),
                    None => json!({ "error": message }),
                }
            }
        };

        (status, axum::Json(body)).into_response()
    }
}
