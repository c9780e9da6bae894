use std::time::Duration;
use thiserror::Error;

/// Errors produced while generating content.
///
/// Every upstream variant keeps the raw payload the completion service sent
/// back so the caller can show or log it after retries are exhausted.
#[derive(Error, Debug)]
pub enum GenerationError {
    /// The service is missing credentials or has an unusable setting.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Caller input is missing or out of range.
    #[error("Invalid request: {0}")]
    Validation(String),

    /// The completion service rejected the API key (401/403).
    #[error("HTTP {status}: upstream rejected credentials")]
    UpstreamAuth {
        /// HTTP status code.
        status: u16,
        /// Response body text.
        body: String,
    },

    /// The completion service quota was exceeded (429).
    #[error("HTTP 429: rate limited")]
    RateLimited {
        /// Response body text.
        body: String,
        /// Parsed `Retry-After` header value, if present.
        retry_after: Option<Duration>,
    },

    /// The completion service failed on its side (5xx).
    #[error("HTTP {status}: upstream server error")]
    UpstreamServer {
        /// HTTP status code.
        status: u16,
        /// Response body text.
        body: String,
    },

    /// Any other non-success status (400, 404, ...).
    #[error("HTTP {status}: {body}")]
    UpstreamStatus {
        /// HTTP status code.
        status: u16,
        /// Response body text.
        body: String,
    },

    /// Success status, but no usable text in the response envelope.
    #[error("upstream returned no text")]
    EmptyResult {
        /// Raw response body.
        raw: String,
    },

    /// The returned text holds no recoverable JSON value.
    #[error("no JSON value found in model output")]
    Parse {
        /// The model text as received.
        raw: String,
    },

    /// JSON was found but it is not the expected shape.
    #[error("model output is not {expected}")]
    ShapeMismatch {
        /// Short description of the expected shape.
        expected: &'static str,
        /// The model text as received.
        raw: String,
    },

    /// The per-call deadline elapsed before the service answered.
    #[error("completion call timed out after {after:?}")]
    Timeout {
        /// The deadline that was exceeded.
        after: Duration,
    },

    /// Low-level HTTP transport failure (connection refused, reset, ...).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Catch-all for unexpected internal failures.
    #[error("{0}")]
    Other(String),
}

impl GenerationError {
    /// Whether the retry controller may re-issue the failed operation.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            GenerationError::Config(_) | GenerationError::Validation(_) | GenerationError::Other(_)
        )
    }

    /// Whether the failure is about the model's text rather than the transport.
    pub fn is_format_failure(&self) -> bool {
        matches!(
            self,
            GenerationError::Parse { .. } | GenerationError::ShapeMismatch { .. }
        )
    }

    /// The raw upstream payload attached to this error, if any.
    pub fn raw_text(&self) -> Option<&str> {
        match self {
            GenerationError::UpstreamAuth { body, .. }
            | GenerationError::RateLimited { body, .. }
            | GenerationError::UpstreamServer { body, .. }
            | GenerationError::UpstreamStatus { body, .. } => Some(body),
            GenerationError::EmptyResult { raw }
            | GenerationError::Parse { raw }
            | GenerationError::ShapeMismatch { raw, .. } => Some(raw),
            _ => None,
        }
    }

    /// Message suitable for showing to the end user.
    pub fn user_message(&self) -> String {
        match self {
            GenerationError::Config(msg) => format!("Server misconfigured: {msg}"),
            GenerationError::Validation(msg) => msg.clone(),
            GenerationError::UpstreamAuth { .. } => {
                "Kunci API tidak valid atau akses ditolak.".to_string()
            }
            GenerationError::RateLimited { .. } => {
                "Batas penggunaan (rate limit) tercapai. Coba lagi nanti.".to_string()
            }
            GenerationError::UpstreamServer { .. } => {
                "Layanan Gemini sedang bermasalah. Coba beberapa saat lagi.".to_string()
            }
            GenerationError::UpstreamStatus { status, .. } => format!("Gemini error {status}"),
            GenerationError::EmptyResult { .. } => "AI tidak mengembalikan hasil.".to_string(),
            GenerationError::Parse { .. } | GenerationError::ShapeMismatch { .. } => {
                "Format AI tidak valid.".to_string()
            }
            GenerationError::Timeout { .. } => "Permintaan timeout. Coba lagi.".to_string(),
            GenerationError::Request(_) => "Gagal memanggil AI".to_string(),
            GenerationError::Other(msg) => msg.clone(),
        }
    }
}

pub type Result<T> = std::result::Result<T, GenerationError>;
