//! Exponential backoff retry for transient failures.
//!
//! Retry here is a caller policy, not background machinery: the driver runs
//! inside the caller's own future, holds no state beyond the loop, and leans
//! on the idempotency contract of the operation it wraps for safety.

use std::time::Duration;

use crate::error::UsageReportError;

/// Configuration for exponential backoff.
///
/// The delay between attempts doubles (by default) from `initial_delay` up
/// to `max_delay`.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use billing_bridge::reliability::RetryPolicy;
///
/// // Default policy: 3 attempts, 100ms initial delay, 5s max delay
/// let policy = RetryPolicy::default();
///
/// // More patient policy for a flaky network path
/// let patient = RetryPolicy {
///     max_attempts: 5,
///     initial_delay: Duration::from_millis(250),
///     max_delay: Duration::from_secs(10),
///     backoff_multiplier: 2.0,
/// };
/// ```
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first (default: 3).
    pub max_attempts: u32,
    /// Delay before the first retry (default: 100ms).
    pub initial_delay: Duration,
    /// Upper bound on any single delay (default: 5s).
    pub max_delay: Duration,
    /// Multiplier applied per attempt (default: 2.0).
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a default policy with a custom attempt count.
    #[must_use]
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self { max_attempts, ..Self::default() }
    }

    /// Delay before the retry following `attempt` (zero-based), capped at
    /// `max_delay`.
    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        #[allow(
            clippy::cast_precision_loss,
            reason = "acceptable for duration calculations"
        )]
        let delay_ms = self.initial_delay.as_millis() as f64
            * self
                .backoff_multiplier
                .powi(attempt.try_into().expect("attempt count should fit in i32"));
        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            reason = "delay_ms is positive and bounded by max_delay below"
        )]
        let delay = Duration::from_millis(delay_ms as u64);
        delay.min(self.max_delay)
    }
}

/// Drives an operation with exponential backoff.
///
/// Errors the classifier marks non-retryable abort immediately; retryable
/// errors are reattempted until `max_attempts` is exhausted, with increasing
/// delays in between. The wrapped operation must be safe to repeat - for
/// usage reporting that safety comes from resubmitting under the same
/// idempotency key.
///
/// # Errors
///
/// The first non-retryable error, or the last retryable error once attempts
/// are exhausted.
///
/// # Panics
///
/// Panics if `max_attempts` is 0, which is a configuration error: a policy
/// must allow at least one attempt.
#[allow(clippy::missing_panics_doc, reason = "panic documented above")]
pub async fn retry_with_backoff<F, Fut, T, E>(
    policy: &RetryPolicy,
    retryable: impl Fn(&E) -> bool,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut last_error = None;

    for attempt in 0..policy.max_attempts {
        match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    tracing::info!(attempt = attempt + 1, "operation succeeded after retry");
                }
                return Ok(value);
            }
            Err(error) => {
                if !retryable(&error) {
                    tracing::warn!(error = %error, "operation failed terminally, not retrying");
                    return Err(error);
                }

                tracing::warn!(
                    attempt = attempt + 1,
                    max_attempts = policy.max_attempts,
                    error = %error,
                    "operation failed, will retry"
                );
                last_error = Some(error);

                // No sleep after the final attempt.
                if attempt + 1 < policy.max_attempts {
                    let delay = policy.delay_for_attempt(attempt);
                    tracing::debug!(delay_ms = delay.as_millis(), "sleeping before retry");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    Err(last_error.expect("at least one attempt should have been made"))
}

/// Classifies a usage-report error for retry purposes.
///
/// Transport failures (timeouts, connection failures, 5xx responses) left
/// the applied state unknown and may be retried under the same idempotency
/// key. Rejections are definitive: the platform evaluated the report and
/// refused it, so repeating the call cannot succeed.
#[must_use]
pub fn is_retryable(error: &UsageReportError) -> bool {
    match error {
        UsageReportError::TransportFailure(_) => true,
        UsageReportError::Rejected(_) => false,
    }
}
