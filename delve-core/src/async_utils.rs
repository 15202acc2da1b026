//! Async utilities and patterns
//!
//! Retry with exponential backoff and per-call timeouts for the outbound
//! chat, search and embedding requests.

use crate::error::{DelveError, DelveResult, ErrorContext};
use serde::{Deserialize, Serialize};
use std::future::Future;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, error, warn};

/// Retry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first one
    pub max_attempts: usize,
    /// Initial delay between retries in milliseconds
    pub initial_delay_ms: u64,
    /// Maximum delay between retries in milliseconds
    pub max_delay_ms: u64,
    /// Backoff multiplier (exponential backoff)
    pub backoff_multiplier: f64,
    /// Whether to add jitter to delays
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            initial_delay_ms: 500,
            max_delay_ms: 5000,
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

/// Retry an async operation with exponential backoff.
///
/// Only recoverable errors (network, timeout, rate limit) are retried; anything
/// else is returned on the first failure.
pub async fn retry_async<F, Fut, T>(
    operation: F,
    config: &RetryConfig,
    operation_name: &str,
) -> DelveResult<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = DelveResult<T>>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;
    let mut delay = config.initial_delay_ms;

    loop {
        attempt += 1;

        debug!(
            operation = operation_name,
            attempt = attempt,
            max_attempts = max_attempts,
            "Attempting operation"
        );

        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    debug!(
                        operation = operation_name,
                        attempt = attempt,
                        "Operation succeeded after retry"
                    );
                }
                return Ok(result);
            }
            Err(error) => {
                if !error.is_recoverable() {
                    return Err(error);
                }

                if attempt >= max_attempts {
                    error!(
                        operation = operation_name,
                        attempt = attempt,
                        error = %error,
                        "Operation failed after all retry attempts"
                    );
                    return Err(error);
                }

                // A provider-supplied retry-after replaces our schedule, capped at max_delay_ms
                let base_delay = error
                    .retry_delay_ms()
                    .unwrap_or(delay)
                    .min(config.max_delay_ms);

                warn!(
                    operation = operation_name,
                    attempt = attempt,
                    error = %error,
                    delay_ms = base_delay,
                    "Operation failed, retrying"
                );

                let actual_delay = if config.jitter {
                    let jitter_factor = 0.1;
                    let jitter = (fastrand::f64() - 0.5) * 2.0 * jitter_factor;
                    (((base_delay as f64) * (1.0 + jitter)) as u64).min(config.max_delay_ms)
                } else {
                    base_delay
                };

                sleep(Duration::from_millis(actual_delay)).await;

                delay = ((delay as f64) * config.backoff_multiplier) as u64;
                delay = delay.min(config.max_delay_ms);
            }
        }
    }
}

/// Timeout wrapper for async operations
pub async fn with_timeout<F, T>(future: F, timeout_ms: u64, operation_name: &str) -> DelveResult<T>
where
    F: Future<Output = T>,
{
    match timeout(Duration::from_millis(timeout_ms), future).await {
        Ok(result) => Ok(result),
        Err(_) => Err(DelveError::Timeout {
            operation: operation_name.to_string(),
            duration_ms: timeout_ms,
            context: ErrorContext::new("async_utils")
                .with_operation("timeout")
                .with_metadata("timeout_ms", &timeout_ms.to_string())
                .with_suggestion("Increase network.request_timeout_ms")
                .with_suggestion("Check network connectivity")
                .with_suggestion("Verify service availability"),
        }),
    }
}

/// Run one outbound call under a per-attempt timeout, retrying recoverable failures
pub async fn call_with_retry<F, Fut, T>(
    operation: F,
    timeout_ms: u64,
    retry: &RetryConfig,
    operation_name: &str,
) -> DelveResult<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = DelveResult<T>>,
{
    let operation = &operation;
    retry_async(
        move || async move { with_timeout(operation(), timeout_ms, operation_name).await? },
        retry,
        operation_name,
    )
    .await
}
