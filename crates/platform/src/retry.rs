//! Retry with exponential backoff
//!
//! Used for startup connections to external services. Cancellation and
//! not-found classes must be declared non-retryable by the caller's
//! `retryable` predicate.

use std::future::Future;
use std::time::Duration;

/// Backoff configuration
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_wait: Duration,
    pub max_wait: Duration,
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_wait: Duration::from_millis(100),
            max_wait: Duration::from_secs(5),
            multiplier: 2.0,
        }
    }
}

/// Run `operation` until it succeeds, retrying transient failures
///
/// Waits grow exponentially from `initial_wait` up to `max_wait`. The final
/// error is returned once `max_attempts` is exhausted or `retryable` rejects
/// the error.
pub async fn with_retry<T, E, Fut, Op, P>(
    config: &RetryConfig,
    mut operation: Op,
    retryable: P,
) -> Result<T, E>
where
    Op: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    P: Fn(&E) -> bool,
{
    let mut wait = config.initial_wait;

    for attempt in 1..=config.max_attempts {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !retryable(&err) || attempt >= config.max_attempts {
                    return Err(err);
                }

                tracing::warn!(
                    attempt = attempt,
                    max = config.max_attempts,
                    wait_ms = wait.as_millis() as u64,
                    error = %err,
                    "Operation failed, retrying"
                );

                tokio::time::sleep(wait).await;
                wait = Duration::from_secs_f64(
                    (wait.as_secs_f64() * config.multiplier).min(config.max_wait.as_secs_f64()),
                );
            }
        }
    }

    unreachable!("with_retry loop always returns")
}
