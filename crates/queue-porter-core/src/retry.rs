//! Retry policy for the create-then-use settling window.
//!
//! Freshly created (or freshly deleted and recreated) queues and containers
//! can reject operations for a short while. The executor here retries
//! exactly that class of failure — not-found and transient errors — with
//! bounded exponential backoff, and propagates everything else immediately.
//! Every scheduled retry is reported through the observer seam.

use crate::observer::StorageObserver;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use storage_runtime::StorageError;
use tracing::debug;

/// Retry policy configuration for exponential backoff
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts after the initial try
    pub max_attempts: u32,

    /// Delay before the first retry
    pub initial_delay: Duration,

    /// Cap on the delay between retries
    pub max_delay: Duration,

    /// Exponential growth factor (typically 2.0)
    pub backoff_multiplier: f64,

    /// Whether to add ±25% jitter to delays
    pub use_jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(8),
            backoff_multiplier: 2.0,
            use_jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Create a new retry policy
    pub fn new(
        max_attempts: u32,
        initial_delay: Duration,
        max_delay: Duration,
        backoff_multiplier: f64,
    ) -> Self {
        Self {
            max_attempts,
            initial_delay,
            max_delay,
            backoff_multiplier,
            use_jitter: true,
        }
    }

    /// Disable jitter (deterministic delays, mostly for tests)
    pub fn without_jitter(mut self) -> Self {
        self.use_jitter = false;
        self
    }

    /// Calculate delay for a retry attempt (0-based)
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let base = self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(attempt as i32);
        let capped = base.min(self.max_delay.as_secs_f64());

        let final_delay = if self.use_jitter {
            let jitter_range = capped * 0.25;
            let jitter = rand::thread_rng().gen_range(-jitter_range..=jitter_range);
            (capped + jitter).max(0.0)
        } else {
            capped
        };

        Duration::from_secs_f64(final_delay)
    }

    /// Check whether another retry is allowed for this attempt number
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

/// Run `operation` through a provisioning settling window
///
/// Retries while the failure is a missing resource or a transient service
/// condition and the attempt budget allows; any other error propagates
/// unchanged on the spot. Each scheduled retry is reported to `observer`.
pub async fn await_provisioned<T, F, Fut>(
    policy: &RetryPolicy,
    observer: &dyn StorageObserver,
    operation_name: &str,
    mut operation: F,
) -> Result<T, StorageError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StorageError>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(error)
                if (error.is_not_found() || error.is_transient())
                    && policy.should_retry(attempt) =>
            {
                let delay = policy.calculate_delay(attempt);
                observer.retry_scheduled(operation_name, attempt);
                debug!(
                    operation = operation_name,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "waiting out provisioning window"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(error) => return Err(error),
        }
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
