//! Retry logic with exponential backoff
//!
//! Delivery attempts against a single service are retried on transient
//! failures only. Delays grow exponentially from
//! [`RetryConfig::initial_delay`], are capped at [`RetryConfig::max_delay`],
//! and can optionally be jittered.
//!
//! # Example
//!
//! ```no_run
//! use pingcast::retry::{IsRetryable, retry_with_backoff};
//! use pingcast::config::RetryConfig;
//!
//! #[derive(Debug)]
//! enum MyError {
//!     Transient,
//!     Permanent,
//! }
//!
//! impl std::fmt::Display for MyError {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         write!(f, "{:?}", self)
//!     }
//! }
//!
//! impl IsRetryable for MyError {
//!     fn is_retryable(&self) -> bool {
//!         matches!(self, MyError::Transient)
//!     }
//! }
//!
//! # async fn example() -> Result<(), MyError> {
//! let config = RetryConfig::default();
//! let (result, attempts) = retry_with_backoff(&config, 2, || async {
//!     Ok::<_, MyError>(())
//! }).await;
//! result?;
//! assert_eq!(attempts, 1);
//! # Ok(())
//! # }
//! ```

use crate::config::RetryConfig;
use crate::error::DeliveryError;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Trait for errors that can be classified as retryable or not
///
/// Transient failures (timeouts, connection errors, 5xx) should return `true`.
/// Permanent failures (4xx, protocol faults, rate limiting) should return `false`.
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for DeliveryError {
    fn is_retryable(&self) -> bool {
        match self {
            DeliveryError::Network { .. }
            | DeliveryError::Timeout { .. }
            | DeliveryError::Server { .. } => true,
            // The service told us to back off; hammering it again won't help
            DeliveryError::RateLimited { .. } => false,
            DeliveryError::Protocol { .. } | DeliveryError::Rejected { .. } => false,
        }
    }
}

/// Delay before retry number `retry` (1-based), before jitter
///
/// `initial_delay * backoff_multiplier^(retry - 1)`, capped at `max_delay`.
pub fn backoff_delay(config: &RetryConfig, retry: u32) -> Duration {
    let exponent = retry.saturating_sub(1) as i32;
    let secs = config.initial_delay.as_secs_f64() * config.backoff_multiplier.powi(exponent);
    if !secs.is_finite() || secs >= config.max_delay.as_secs_f64() {
        return config.max_delay;
    }
    Duration::from_secs_f64(secs.max(0.0))
}

/// Execute an async operation with exponential backoff retry logic
///
/// # Arguments
///
/// * `config` - Backoff configuration (delays, multiplier, jitter)
/// * `max_retries` - Retries allowed after the first attempt
/// * `operation` - Async closure that returns `Result<T, E>` where E implements IsRetryable
///
/// # Returns
///
/// The successful result or the last error, together with the number of
/// attempts made.
pub async fn retry_with_backoff<F, Fut, T, E>(
    config: &RetryConfig,
    max_retries: u32,
    mut operation: F,
) -> (Result<T, E>, u32)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
{
    let mut retries = 0;

    loop {
        match operation().await {
            Ok(result) => {
                if retries > 0 {
                    tracing::info!(attempts = retries + 1, "operation succeeded after retry");
                }
                return (Ok(result), retries + 1);
            }
            Err(e) if e.is_retryable() && retries < max_retries => {
                retries += 1;

                let delay = backoff_delay(config, retries);
                let delay = if config.jitter { add_jitter(delay) } else { delay };

                tracing::warn!(
                    error = %e,
                    retry = retries,
                    max_retries,
                    delay_ms = delay.as_millis() as u64,
                    "attempt failed, retrying"
                );

                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                if e.is_retryable() {
                    tracing::warn!(
                        error = %e,
                        attempts = retries + 1,
                        "operation failed after all retry attempts exhausted"
                    );
                } else {
                    tracing::debug!(error = %e, "operation failed with non-retryable error");
                }
                return (Err(e), retries + 1);
            }
        }
    }
}

/// Add random jitter to a delay
///
/// Jitter is uniformly distributed between 0% and 100% of the delay, so the
/// actual delay lands between `delay` and `2 * delay`.
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    Duration::from_secs_f64(delay.as_secs_f64() * (1.0 + jitter_factor))
}
