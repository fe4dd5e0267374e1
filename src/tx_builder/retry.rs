//! Bounded retry with exponential backoff and jitter

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::rpc_manager::NetworkError;

/// Retry configuration with jitter
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of attempts (including initial attempt)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Base backoff delay in milliseconds
    #[serde(default = "default_base_backoff_ms")]
    pub base_backoff_ms: u64,
    /// Maximum backoff delay in milliseconds
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    /// Jitter factor (0.0 to 1.0) - adds randomness to backoff
    #[serde(default = "default_jitter_factor")]
    pub jitter_factor: f64,
}

fn default_max_attempts() -> u32 { 3 }
fn default_base_backoff_ms() -> u64 { 100 }
fn default_max_backoff_ms() -> u64 { 5000 }
fn default_jitter_factor() -> f64 { 0.2 }

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_backoff_ms: default_base_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            jitter_factor: default_jitter_factor(),
        }
    }
}

impl RetryConfig {
    /// Calculate backoff delay for a given attempt (0-indexed)
    pub fn calculate_backoff(&self, attempt: u32) -> Duration {
        // Exponential backoff: base * 2^attempt
        let exp_backoff = (self.base_backoff_ms as f64) * 2_f64.powi(attempt.min(30) as i32);
        let capped_backoff = exp_backoff.min(self.max_backoff_ms as f64);

        // Add jitter to prevent thundering herd
        let jitter_range = capped_backoff * self.jitter_factor.clamp(0.0, 1.0);
        let jitter = if jitter_range > 0.0 {
            rand::thread_rng().gen_range(-jitter_range..=jitter_range)
        } else {
            0.0
        };
        let final_backoff = (capped_backoff + jitter).max(0.0);

        Duration::from_millis(final_backoff as u64)
    }
}

/// Why a retried operation gave up
#[derive(Debug, Clone)]
pub enum RetryFailure {
    /// Non-retryable error, returned on the attempt that produced it
    Fatal { attempts: u32, error: NetworkError },
    /// Every attempt failed transiently
    Exhausted { attempts: u32, last: NetworkError },
}

/// Retry an async network operation according to `config`
///
/// Transient errors back off and retry until `max_attempts` is reached;
/// anything else fails immediately. `on_attempt` sees every attempt number
/// (1-based) before it runs. Returns the value and the attempts used.
pub async fn retry_with_backoff<F, Fut, T>(
    operation_name: &str,
    config: &RetryConfig,
    mut on_attempt: impl FnMut(u32),
    mut operation: F,
) -> Result<(T, u32), RetryFailure>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, NetworkError>>,
{
    let start_time = std::time::Instant::now();
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        on_attempt(attempt);
        if attempt > 1 {
            debug!(
                operation = operation_name,
                attempt,
                max_attempts,
                "Retrying operation"
            );
        }

        let err = match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    debug!(
                        operation = operation_name,
                        attempts = attempt,
                        duration_ms = start_time.elapsed().as_millis() as u64,
                        "Operation succeeded after retry"
                    );
                }
                return Ok((result, attempt));
            }
            Err(err) => err,
        };

        if !err.is_retryable() {
            warn!(
                operation = operation_name,
                error = %err,
                "Permanent error, not retrying"
            );
            return Err(RetryFailure::Fatal {
                attempts: attempt,
                error: err,
            });
        }

        if attempt >= max_attempts {
            warn!(
                operation = operation_name,
                attempts = attempt,
                error = %err,
                "All retry attempts exhausted"
            );
            return Err(RetryFailure::Exhausted {
                attempts: attempt,
                last: err,
            });
        }

        let backoff = config.calculate_backoff(attempt - 1);
        debug!(
            operation = operation_name,
            attempt,
            backoff_ms = backoff.as_millis() as u64,
            error = %err,
            "Transient error, backing off before retry"
        );
        sleep(backoff).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn transient() -> NetworkError {
        NetworkError::Timeout {
            endpoint: "test".to_string(),
        }
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let config = RetryConfig {
            max_attempts: 10,
            base_backoff_ms: 100,
            max_backoff_ms: 1000,
            jitter_factor: 0.0,
        };
        assert_eq!(config.calculate_backoff(0), Duration::from_millis(100));
        assert_eq!(config.calculate_backoff(1), Duration::from_millis(200));
        assert_eq!(config.calculate_backoff(3), Duration::from_millis(800));
        assert_eq!(config.calculate_backoff(4), Duration::from_millis(1000));
        assert_eq!(config.calculate_backoff(100), Duration::from_millis(1000));
    }

    #[test]
    fn test_jitter_stays_in_range() {
        let config = RetryConfig::default();
        for _ in 0..100 {
            let delay = config.calculate_backoff(0).as_millis();
            assert!((80..=120).contains(&delay), "delay {}", delay);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result = retry_with_backoff("op", &RetryConfig::default(), |_| {}, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(transient())
                } else {
                    Ok("done")
                }
            }
        })
        .await;

        let (value, attempts) = result.unwrap();
        assert_eq!(value, "done");
        assert_eq!(attempts, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausts_at_ceiling() {
        let calls = AtomicU32::new(0);
        let result: Result<((), u32), _> =
            retry_with_backoff("op", &RetryConfig::default(), |_| {}, || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(transient()) }
            })
            .await;

        assert!(matches!(result, Err(RetryFailure::Exhausted { attempts: 3, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_fatal_is_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<((), u32), _> =
            retry_with_backoff("op", &RetryConfig::default(), |_| {}, || {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(NetworkError::Rejected {
                        endpoint: "test".to_string(),
                        message: "invalid instruction data".to_string(),
                    })
                }
            })
            .await;

        assert!(matches!(result, Err(RetryFailure::Fatal { attempts: 1, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_attempts_still_runs_once() {
        let config = RetryConfig {
            max_attempts: 0,
            ..RetryConfig::default()
        };
        let result = retry_with_backoff("op", &config, |_| {}, || async { Ok::<_, NetworkError>(1) }).await;
        assert_eq!(result.unwrap(), (1, 1));
    }
}
