use crate::config::RetryConfig;
use crate::Result;
use std::future::Future;
use std::time::{Duration, Instant};

/// How often and how patiently a model call is repeated
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub retries: u32,
    pub initial_delay: Duration,
    pub backoff_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 2,
            initial_delay: Duration::from_millis(1000),
            backoff_factor: 1.5,
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            retries: config.retries,
            initial_delay: Duration::from_millis(config.initial_delay_ms),
            backoff_factor: config.backoff_factor.max(1.0),
        }
    }
}

/// Run `operation` until it succeeds or the policy's retries are used up.
///
/// The delay before each retry grows by `backoff_factor`. The last error is
/// returned unchanged.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, name: &str, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut delay = policy.initial_delay;
    let mut remaining = policy.retries;

    loop {
        let started = Instant::now();
        match operation().await {
            Ok(value) => {
                tracing::info!(
                    operation = name,
                    duration_ms = started.elapsed().as_millis() as u64,
                    "Operation completed successfully"
                );
                return Ok(value);
            }
            Err(e) if remaining == 0 => {
                tracing::error!(operation = name, error = %e, "Operation failed after all retries");
                return Err(e);
            }
            Err(e) => {
                tracing::warn!(
                    operation = name,
                    error = %e,
                    delay_ms = delay.as_millis() as u64,
                    retries_left = remaining,
                    "Retrying operation"
                );
                tokio::time::sleep(delay).await;
                delay = delay.mul_f64(policy.backoff_factor);
                remaining -= 1;
            }
        }
    }
}
