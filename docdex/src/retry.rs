//! Cancellation-aware retry execution with exponential backoff and jitter.
//!
//! Every remote-call site in the crate goes through [`run_with_retry`]. The
//! executor checks the task's cancellation flag both before and after each
//! attempt, so a cancellation arriving mid-call is never masked by the
//! transient error that interrupted it.

use crate::errors::{DocdexError, Result, RetryClass};
use crate::tasks::CancellationRegistry;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Fraction of the backoff delay added as uniform random jitter.
const JITTER_FACTOR: f64 = 0.2;

/// Configuration for retry behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum attempts (including the initial one).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay before the first retry in milliseconds.
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    /// Cap on the computed delay in milliseconds.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    30_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl RetryConfig {
    /// Creates a config with the defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum attempts.
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Sets the initial delay.
    #[must_use]
    pub fn with_initial_delay_ms(mut self, delay: u64) -> Self {
        self.initial_delay_ms = delay;
        self
    }

    /// Sets the delay cap.
    #[must_use]
    pub fn with_max_delay_ms(mut self, delay: u64) -> Self {
        self.max_delay_ms = delay;
        self
    }
}

/// Computes the backoff delay after `failed_attempts` failures (1-indexed).
///
/// The base delay grows geometrically, `initial * 2^(failed_attempts - 1)`,
/// capped at `max_delay_ms`; jitter uniform over `[0, 0.2 * base]` is added
/// on top, so the result lies in `[base, 1.2 * base]`.
#[must_use]
pub fn compute_delay(config: &RetryConfig, failed_attempts: u32) -> Duration {
    let exponent = failed_attempts.saturating_sub(1);
    let base = config
        .initial_delay_ms
        .saturating_mul(2u64.saturating_pow(exponent))
        .min(config.max_delay_ms);

    let jitter_cap = (base as f64 * JITTER_FACTOR) as u64;
    let jitter = if jitter_cap == 0 {
        0
    } else {
        rand::thread_rng().gen_range(0..=jitter_cap)
    };

    Duration::from_millis(base.saturating_add(jitter))
}

/// Executes `operation` with bounded retries, honoring cooperative
/// cancellation for `task_id`.
///
/// Semantics:
/// - cancellation flagged before an attempt aborts with
///   [`DocdexError::Cancelled`] and performs no further invocations;
/// - cancellation flagged when an attempt fails surfaces `Cancelled`
///   (preserving the operation's own cancellation error, if that is what it
///   failed with) rather than the underlying failure;
/// - a [`RetryClass::NonRetriable`] failure surfaces unchanged immediately;
/// - exhaustion surfaces the most recent failure unchanged, so callers can
///   distinguish "failed after retries" from "cancelled" from
///   "non-retriable".
///
/// The backoff is a yielding [`tokio::time::sleep`]; sibling tasks keep
/// making progress during the wait.
///
/// # Errors
///
/// Propagates the operation's error per the semantics above.
pub async fn run_with_retry<T, F, Fut>(
    cancellations: &CancellationRegistry,
    config: &RetryConfig,
    task_id: Option<&str>,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut failed_attempts: u32 = 0;

    loop {
        if let Some(id) = task_id {
            if cancellations.is_cancelled(id) {
                return Err(DocdexError::cancelled(id));
            }
        }

        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if let Some(id) = task_id {
                    if cancellations.is_cancelled(id) {
                        if err.is_cancelled() {
                            return Err(err);
                        }
                        return Err(DocdexError::cancelled(id));
                    }
                }

                if err.retry_class() == RetryClass::NonRetriable {
                    return Err(err);
                }

                failed_attempts += 1;
                if failed_attempts >= config.max_attempts {
                    return Err(err);
                }

                let delay = compute_delay(config, failed_attempts);
                debug!(
                    attempt = failed_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "retrying after transient failure"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
