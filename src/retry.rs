//! Retry and timeout primitives (C1): race an operation against a deadline,
//! retry transient failures with exponential backoff.
//!
//! The backoff math and busy/locked classifier mirror what the storage layer
//! below `queue.rs` and `engine.rs` lean on for every SQL call: never retry a
//! timeout, retry busy/locked up to a budget, log every retry at `warn`.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::{message_is_retryable, EngineError, EngineResult};

/// `{max_attempts, initial_delay_ms, max_delay_ms, backoff_multiplier}` from
/// the engine configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 50,
            max_delay_ms: 2_000,
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Shorter budget used by `EngineConfig::test_mode`.
    pub fn test_mode() -> Self {
        Self {
            max_attempts: 2,
            initial_delay_ms: 5,
            max_delay_ms: 20,
            backoff_multiplier: 2.0,
        }
    }

    /// Delay to sleep after the `attempt`-th failed try (1-indexed), capped
    /// at `max_delay_ms`.
    fn delay_after_attempt(&self, attempt: u32) -> Duration {
        let scaled = self.initial_delay_ms as f64 * self.backoff_multiplier.powi(attempt as i32 - 1);
        let capped = scaled.min(self.max_delay_ms as f64).max(0.0);
        Duration::from_millis(capped as u64)
    }
}

/// Default classifier: retryable iff the error's display text matches the
/// busy/locked vocabulary, case-insensitively. `Timeout` is never retryable
/// regardless of message content.
pub fn is_retryable(err: &EngineError) -> bool {
    if matches!(err, EngineError::Timeout { .. }) {
        return false;
    }
    message_is_retryable(&err.classifier_text())
}

/// Races `fut` against a `ms`-millisecond timer. On timeout, returns
/// `EngineError::Timeout { operation, elapsed_ms: ms }`; the future is
/// dropped (cancelled) since tokio futures support cooperative cancellation
/// on drop.
pub async fn with_timeout<T, F>(fut: F, ms: u64, operation: &str) -> EngineResult<T>
where
    F: Future<Output = EngineResult<T>>,
{
    match tokio::time::timeout(Duration::from_millis(ms), fut).await {
        Ok(result) => result,
        Err(_elapsed) => Err(EngineError::timeout(operation, ms)),
    }
}

/// Retries `op` up to `policy.max_attempts` times. `should_retry` overrides
/// the default busy/locked classifier when provided. A `Timeout` failure is
/// never retried, even if `should_retry` would say yes — timeouts mean "the
/// caller stopped waiting," not "the operation failed," so retrying it would
/// double the wait rather than recover anything.
pub async fn with_retry<T, F, Fut>(
    mut op: F,
    policy: &RetryPolicy,
    should_retry: Option<&dyn Fn(&EngineError) -> bool>,
) -> EngineResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = EngineResult<T>>,
{
    let classify = should_retry.unwrap_or(&(is_retryable as fn(&EngineError) -> bool));
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                let retryable = !matches!(err, EngineError::Timeout { .. }) && classify(&err);
                if !retryable || attempt >= policy.max_attempts {
                    if attempt >= policy.max_attempts && retryable {
                        return Err(EngineError::RetriesExhausted {
                            attempts: attempt,
                            cause: Box::new(err),
                        });
                    }
                    return Err(err);
                }
                let delay = policy.delay_after_attempt(attempt);
                warn!(attempt, ?delay, error = %err, "retrying after transient failure");
                tokio::time::sleep(delay).await;
            }
        }
    }
}
