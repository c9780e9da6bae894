//! Bounded retry controller.
//!
//! [`retry_with_backoff`] re-issues an async operation until it succeeds,
//! fails with a non-retryable error, or runs out of attempts. It knows
//! nothing about what the operation does: transport failures, unparseable
//! text and wrongly shaped JSON all arrive as [`GenerationError`]s and are
//! treated alike. The last error is returned as-is, so whatever diagnostic
//! payload the operation attached (raw upstream text) reaches the caller.

use crate::backend::BackoffConfig;
use crate::error::Result;
use std::future::Future;
use std::time::Duration;

/// Callback invoked before each re-issue.
///
/// Arguments: `(failed_attempt, delay_before_next, error)`.
pub type RetryCallback<'a> = &'a mut (dyn FnMut(u32, Duration, &crate::GenerationError) + Send);

/// Run `operation` up to `config.max_attempts` times with linear backoff.
///
/// `operation` receives the 1-indexed attempt number. Each call site owns
/// its own budget; nothing is shared between invocations.
///
/// # Example
///
/// ```
/// use classtoon::backend::BackoffConfig;
/// use classtoon::retry::retry_with_backoff;
///
/// # tokio_test::block_on(async {
/// let value = retry_with_backoff(&BackoffConfig::standard(), &mut |_, _, _| {}, |attempt| async move {
///     Ok::<_, classtoon::GenerationError>(attempt * 10)
/// })
/// .await
/// .unwrap();
/// assert_eq!(value, 10);
/// # });
/// ```
pub async fn retry_with_backoff<T, F, Fut>(
    config: &BackoffConfig,
    on_retry: RetryCallback<'_>,
    mut operation: F,
) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        let err = match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if !err.is_retryable() || attempt >= max_attempts {
            return Err(err);
        }

        let delay = config.delay_after(attempt, &err);
        on_retry(attempt, delay, &err);
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}
