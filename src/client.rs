//! Per-call-site generation settings.
//!
//! Every place that talks to the completion service picks one of the presets
//! below. The deadline differs per call site: single-shot tools get short
//! ones, the large structured outline batches get the longest.

use std::time::Duration;

/// Configuration for one completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmConfig {
    /// Temperature. `None` leaves the provider default.
    pub temperature: Option<f64>,

    /// Maximum tokens to generate. `None` leaves the provider default.
    pub max_tokens: Option<u32>,

    /// Ask the provider for an `application/json` response.
    pub json_mode: bool,

    /// Hard wall-clock deadline for a single call.
    pub timeout: Duration,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            temperature: None,
            max_tokens: None,
            json_mode: false,
            timeout: Duration::from_secs(30),
        }
    }
}

impl LlmConfig {
    /// Structured-JSON outline batches (scene objects plus metadata block).
    pub fn structured_outline() -> Self {
        Self {
            temperature: Some(0.35),
            max_tokens: Some(6144),
            json_mode: true,
            timeout: Duration::from_secs(90),
        }
    }

    /// Plain outline batches (flat scene arrays).
    pub fn plain_outline() -> Self {
        Self {
            max_tokens: Some(2048),
            ..Self::structured_outline()
        }
    }

    /// Idea development: small JSON object.
    pub fn develop() -> Self {
        Self {
            json_mode: true,
            timeout: Duration::from_secs(25),
            ..Self::default()
        }
    }

    /// Feasibility analysis: JSON object.
    pub fn analyze() -> Self {
        Self {
            json_mode: true,
            timeout: Duration::from_secs(35),
            ..Self::default()
        }
    }

    /// Free-text narrative script.
    pub fn script() -> Self {
        Self {
            timeout: Duration::from_secs(45),
            ..Self::default()
        }
    }

    /// Motion prompt passthrough.
    pub fn motion() -> Self {
        Self {
            timeout: Duration::from_secs(20),
            ..Self::default()
        }
    }

    pub fn with_temperature(mut self, temp: f64) -> Self {
        self.temperature = Some(temp);
        self
    }

    pub fn with_max_tokens(mut self, tokens: u32) -> Self {
        self.max_tokens = Some(tokens);
        self
    }

    pub fn with_json_mode(mut self, enabled: bool) -> Self {
        self.json_mode = enabled;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
