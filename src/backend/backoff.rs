//! Delay schedule for the retry controller.
//!
//! [`BackoffConfig`] bounds the number of attempts and computes a linear
//! delay (`attempt × base`) before each re-issue. Failures about the model's
//! text (unparseable or wrongly shaped) wait on a slightly longer base than
//! transport and upstream failures.

use crate::GenerationError;
use std::time::Duration;

/// Configuration for the bounded linear backoff.
///
/// # Example
///
/// ```
/// use classtoon::backend::BackoffConfig;
/// use std::time::Duration;
///
/// let standard = BackoffConfig::standard();
/// assert_eq!(standard.max_attempts, 3);
/// assert_eq!(standard.base_delay, Duration::from_millis(500));
/// ```
#[derive(Debug, Clone)]
pub struct BackoffConfig {
    /// Total attempts, including the first call. Default: 3.
    pub max_attempts: u32,

    /// Base delay after a transport or upstream failure. Default: 500ms.
    pub base_delay: Duration,

    /// Base delay after a parse or shape failure. Default: 600ms.
    pub format_base_delay: Duration,

    /// Upper bound for any single delay. Default: 30 seconds.
    pub max_delay: Duration,

    /// Jitter strategy. Default: None.
    pub jitter: JitterStrategy,

    /// Whether to wait for the provider's `Retry-After` hint on 429s
    /// (still capped at `max_delay`). Default: `false`.
    pub respect_retry_after: bool,
}

/// Jitter strategy applied on top of the linear delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JitterStrategy {
    /// Delay is exactly the calculated value.
    None,

    /// `calculated_delay/2 + random in [0, calculated_delay/2]`.
    Equal,
}

impl BackoffConfig {
    /// Three attempts, 500ms / 600ms linear bases, no jitter.
    pub fn standard() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            format_base_delay: Duration::from_millis(600),
            max_delay: Duration::from_secs(30),
            jitter: JitterStrategy::None,
            respect_retry_after: false,
        }
    }

    /// A single attempt, no retry.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::standard()
        }
    }

    /// Enable equal jitter (for many tenants sharing one upstream quota).
    pub fn with_jitter(mut self) -> Self {
        self.jitter = JitterStrategy::Equal;
        self
    }

    /// Calculate the delay after failed attempt N (1-indexed).
    ///
    /// The base is chosen from the kind of failure, multiplied by the attempt
    /// number and capped at `max_delay`.
    pub fn delay_after(&self, attempt: u32, error: &GenerationError) -> Duration {
        if self.respect_retry_after {
            if let GenerationError::RateLimited {
                retry_after: Some(hint),
                ..
            } = error
            {
                return (*hint).min(self.max_delay);
            }
        }

        let base = if error.is_format_failure() {
            self.format_base_delay
        } else {
            self.base_delay
        };
        let linear = base.saturating_mul(attempt.max(1)).min(self.max_delay);

        match self.jitter {
            JitterStrategy::None => linear,
            JitterStrategy::Equal => {
                let half = linear.as_secs_f64() / 2.0;
                Duration::from_secs_f64(half + fastrand::f64() * half)
            }
        }
    }
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport() -> GenerationError {
        GenerationError::UpstreamServer {
            status: 503,
            body: String::new(),
        }
    }

    fn format() -> GenerationError {
        GenerationError::Parse { raw: "???".into() }
    }

    #[test]
    fn test_linear_delay_transport() {
        let config = BackoffConfig::standard();
        assert_eq!(config.delay_after(1, &transport()), Duration::from_millis(500));
        assert_eq!(config.delay_after(2, &transport()), Duration::from_millis(1000));
    }

    #[test]
    fn test_linear_delay_format() {
        let config = BackoffConfig::standard();
        assert_eq!(config.delay_after(1, &format()), Duration::from_millis(600));
        assert_eq!(config.delay_after(2, &format()), Duration::from_millis(1200));
    }

    #[test]
    fn test_delay_capped_at_max() {
        let config = BackoffConfig {
            max_delay: Duration::from_secs(1),
            ..BackoffConfig::standard()
        };
        assert_eq!(config.delay_after(10, &transport()), Duration::from_secs(1));
    }

    #[test]
    fn test_equal_jitter_in_range() {
        let config = BackoffConfig::standard().with_jitter();
        for _ in 0..100 {
            let d = config.delay_after(2, &transport());
            assert!(d >= Duration::from_millis(500), "delay {:?} < 500ms", d);
            assert!(d <= Duration::from_millis(1000), "delay {:?} > 1s", d);
        }
    }

    #[test]
    fn test_retry_after_respected_when_enabled() {
        let err = GenerationError::RateLimited {
            body: String::new(),
            retry_after: Some(Duration::from_secs(90)),
        };
        let ignoring = BackoffConfig::standard();
        assert_eq!(ignoring.delay_after(1, &err), Duration::from_millis(500));

        let honoring = BackoffConfig {
            respect_retry_after: true,
            ..BackoffConfig::standard()
        };
        assert_eq!(honoring.delay_after(1, &err), Duration::from_secs(30));
    }

    #[test]
    fn test_none_preset() {
        assert_eq!(BackoffConfig::none().max_attempts, 1);
    }
}
