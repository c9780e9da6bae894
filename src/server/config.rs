use crate::backend::gemini::DEFAULT_BASE_URL;
use crate::backend::BackoffConfig;
use crate::error::Result;
use crate::GenerationError;

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development except the API
/// key, whose absence is reported per request rather than at boot.
#[derive(Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Completion service key. `None` makes every generation call a 500.
    pub gemini_api_key: Option<String>,
    /// Completion service base URL.
    pub gemini_base_url: String,
    /// Randomize retry delays (equal jitter).
    pub retry_jitter: bool,
    /// Wait for the service's `Retry-After` hint on 429s.
    pub respect_retry_after: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            gemini_api_key: None,
            gemini_base_url: DEFAULT_BASE_URL.to_string(),
            retry_jitter: false,
            respect_retry_after: false,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var           | Default                                              |
    /// |-------------------|------------------------------------------------------|
    /// | `HOST`            | `0.0.0.0`                                            |
    /// | `PORT`            | `3000`                                               |
    /// | `GEMINI_API_KEY`  | unset                                                |
    /// | `GEMINI_BASE_URL` | `https://generativelanguage.googleapis.com/v1beta`   |
    /// | `RETRY_JITTER`    | `false`                                              |
    /// | `RETRY_RESPECT_RETRY_AFTER` | `false`                                    |
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup` instead of the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let host = non_empty("HOST").unwrap_or(defaults.host);
        let port = match non_empty("PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|_| {
                GenerationError::Config(format!("PORT must be a valid u16, got {raw:?}"))
            })?,
            None => defaults.port,
        };

        let flag = |key: &str, default: bool| match non_empty(key) {
            Some(raw) => parse_flag(key, &raw),
            None => Ok(default),
        };

        Ok(Self {
            host,
            port,
            gemini_api_key: non_empty("GEMINI_API_KEY"),
            gemini_base_url: non_empty("GEMINI_BASE_URL").unwrap_or(defaults.gemini_base_url),
            retry_jitter: flag("RETRY_JITTER", defaults.retry_jitter)?,
            respect_retry_after: flag("RETRY_RESPECT_RETRY_AFTER", defaults.respect_retry_after)?,
        })
    }

    /// Retry budget for outline chunks with the configured options applied.
    pub fn backoff(&self) -> BackoffConfig {
        let backoff = BackoffConfig {
            respect_retry_after: self.respect_retry_after,
            ..BackoffConfig::standard()
        };
        if self.retry_jitter {
            backoff.with_jitter()
        } else {
            backoff
        }
    }
}

fn parse_flag(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(GenerationError::Config(format!(
            "{key} must be a boolean, got {raw:?}"
        ))),
    }
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("gemini_api_key", &self.gemini_api_key.as_ref().map(|_| "<redacted>"))
            .field("gemini_base_url", &self.gemini_base_url)
            .field("retry_jitter", &self.retry_jitter)
            .field("respect_retry_after", &self.respect_retry_after)
            .finish()
    }
}
