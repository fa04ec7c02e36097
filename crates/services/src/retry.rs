//! # Retry
//!
//! Shared wrapper for remote reads that may fail transiently. Auth,
//! validation, and conflict failures are the caller's problem and fail
//! fast; only transport-level failures are worth another round trip.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use domains::error::Result;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3, base_delay: Duration::from_secs(1) }
    }
}

/// Runs `op` under the default policy: three attempts, exponential
/// backoff starting at one second.
pub async fn with_retry<T, F, Fut>(op: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    with_retry_policy(RetryPolicy::default(), op).await
}

pub async fn with_retry_policy<T, F, Fut>(policy: RetryPolicy, op: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut delay = policy.base_delay;
    let mut attempt = 1u32;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt < policy.max_attempts => {
                warn!(attempt, delay_ms = delay.as_millis() as u64, error = %err, "backend call failed, retrying");
                tokio::time::sleep(delay).await;
                delay *= 2;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
