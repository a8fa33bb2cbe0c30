//! Retry executor with exponential backoff and jitter.
//!
//! Failures are classified through `WeatherError::is_retryable`: transport
//! faults, timeouts, 5xx, and 429 are retried; other client errors are
//! rethrown immediately without consuming an attempt. When every attempt
//! fails, the last error is wrapped in `WeatherError::RetryExhausted` so
//! callers can report "failed after N attempts" instead of a raw network
//! message.

use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::NetworkConfig;
use crate::error::{Result, WeatherError};

/// Configuration for retry behavior. No global default instance exists; each
/// call site supplies (or builds) its own.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Additional attempts after the first failure.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Cap applied to every delay.
    pub max_delay: Duration,
    /// Multiplier applied per attempt (typically 2.0).
    pub backoff_factor: f64,
    /// Whether to add random jitter to delays.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: NetworkConfig::MAX_RETRIES,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            backoff_factor: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Set the number of additional attempts after the first failure.
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set the base delay.
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Set the maximum delay cap.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Enable or disable jitter.
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Delay before retrying after failure number `attempt` (zero-indexed).
    ///
    /// `min(base_delay * backoff_factor^attempt + jitter, max_delay)`, where
    /// jitter is a random 0-50% of the computed delay.
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let multiplier = self.backoff_factor.powi(attempt as i32);
        let delay_secs = self.base_delay.as_secs_f64() * multiplier;
        let capped_secs = delay_secs.min(self.max_delay.as_secs_f64());

        let final_secs = if self.jitter {
            let mut rng = rand::rng();
            let jitter_secs = capped_secs * rng.random_range(0.0..0.5);
            (capped_secs + jitter_secs).min(self.max_delay.as_secs_f64())
        } else {
            capped_secs
        };

        Duration::from_secs_f64(final_secs)
    }
}

/// Run `operation`, retrying retryable failures with backoff.
///
/// Makes at most `max_retries + 1` total attempts. Non-retryable errors are
/// returned unchanged from whichever attempt produced them.
pub async fn retry<F, Fut, T>(config: &RetryConfig, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt: u32 = 0;

    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    debug!("Operation succeeded after {} attempts", attempt + 1);
                }
                return Ok(value);
            }
            Err(e) => {
                if !e.is_retryable() {
                    debug!("Error is not retryable: {}", e);
                    return Err(e);
                }

                if attempt >= config.max_retries {
                    warn!(
                        "All {} attempts exhausted. Last error: {}",
                        attempt + 1,
                        e
                    );
                    return Err(WeatherError::RetryExhausted {
                        attempts: attempt + 1,
                        source: Box::new(e),
                    });
                }

                let delay = config.calculate_delay(attempt);
                warn!(
                    "Attempt {}/{} failed: {}. Retrying in {:?}",
                    attempt + 1,
                    config.max_retries + 1,
                    e,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// Run `operation` through a circuit breaker, with retries inside the
/// breaker's single admitted call.
///
/// Nesting order matters: the breaker sees one failure per exhausted retry
/// sequence, not one per attempt, and while OPEN it rejects before any
/// attempt is made.
pub async fn retry_with_breaker<F, Fut, T>(
    config: &RetryConfig,
    breaker: &crate::sync::circuit_breaker::CircuitBreaker,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    breaker.call(|| retry(config, &mut operation)).await
}
