//! Collaborator retry utilities.
//!
//! Bounded exponential backoff for calls that fail with a retryable error
//! (rate limiting, in practice). Backoff sleeps honour the execution context.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use serde::Deserialize;
use tracing::{info, warn};

use crate::context::{ExecutionContext, Interruption};

/// Classifies an error as worth retrying.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

/// Configuration for retry behavior.
#[derive(Clone, Debug, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (not including the initial attempt).
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Backoff before the first retry, in milliseconds.
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    /// Upper bound for a single backoff, in milliseconds.
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    #[serde(default = "default_multiplier")]
    pub backoff_multiplier: f64,
    #[serde(default = "default_add_jitter")]
    pub add_jitter: bool,
}

fn default_max_retries() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    200
}

fn default_max_backoff_ms() -> u64 {
    5_000
}

fn default_multiplier() -> f64 {
    2.0
}

fn default_add_jitter() -> bool {
    true
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            backoff_multiplier: default_multiplier(),
            add_jitter: default_add_jitter(),
        }
    }
}

impl RetryConfig {
    /// Create a config with no retries.
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Small backoffs without jitter, handy for tests.
    pub fn quick(max_retries: u32) -> Self {
        Self {
            max_retries,
            initial_backoff_ms: 1,
            max_backoff_ms: 10,
            backoff_multiplier: 2.0,
            add_jitter: false,
        }
    }

    /// Calculate backoff duration for a given attempt.
    fn backoff_duration(&self, attempt: u32) -> Duration {
        let backoff = self.initial_backoff_ms as f64 * self.backoff_multiplier.powi(attempt as i32);
        let backoff_ms = backoff.min(self.max_backoff_ms as f64) as u64;

        let mut duration = Duration::from_millis(backoff_ms);

        if self.add_jitter {
            // Add up to 25% jitter
            let jitter = (backoff_ms as f64 * 0.25 * rand::thread_rng().gen::<f64>()) as u64;
            duration += Duration::from_millis(jitter);
        }

        duration
    }
}

/// Outcome of a retried call that did not succeed.
#[derive(Debug)]
pub enum RetryError<E> {
    /// The call failed with a non-retryable error or ran out of attempts.
    Failed(E),
    /// The context was cancelled or its deadline passed.
    Interrupted(Interruption),
}

/// Execute a collaborator call with retry logic.
///
/// Every attempt is guarded by `ctx`, so cancellation aborts both in-flight
/// calls and pending backoff sleeps.
pub async fn retry_call<F, Fut, T, E>(
    config: &RetryConfig,
    ctx: &ExecutionContext,
    operation_name: &str,
    f: F,
) -> Result<T, RetryError<E>>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + std::fmt::Display,
{
    let mut attempt = 0;

    loop {
        let outcome = ctx.guard(f()).await.map_err(RetryError::Interrupted)?;

        match outcome {
            Ok(result) => {
                if attempt > 0 {
                    info!(
                        operation = operation_name,
                        attempt = attempt + 1,
                        "Call succeeded after retry"
                    );
                }
                return Ok(result);
            }
            Err(err) => {
                if !err.is_retryable() {
                    return Err(RetryError::Failed(err));
                }

                if attempt >= config.max_retries {
                    warn!(
                        operation = operation_name,
                        attempt = attempt + 1,
                        error = %err,
                        "Call failed after max retries"
                    );
                    return Err(RetryError::Failed(err));
                }

                let backoff = config.backoff_duration(attempt);
                warn!(
                    operation = operation_name,
                    attempt = attempt + 1,
                    error = %err,
                    backoff_ms = backoff.as_millis() as u64,
                    "Call throttled, retrying after backoff"
                );

                ctx.sleep(backoff).await.map_err(RetryError::Interrupted)?;
                attempt += 1;
            }
        }
    }
}
