//! Circuit breaker for failing API endpoints.
//!
//! State machine:
//! - CLOSED: calls pass through; failures are counted within a rolling
//!   monitoring period
//! - OPEN: calls are rejected immediately without invoking the operation
//! - HALF_OPEN: entered by the first call after the reset timeout; two
//!   consecutive successes close the circuit, any failure reopens it
//!
//! The breaker itself performs no I/O; it wraps an arbitrary async operation
//! and is composable with the retry executor.

use std::future::Future;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::error::{Result, WeatherError};

/// Circuit breaker states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Normal operation - calls flow through.
    Closed,
    /// Failing - calls are rejected immediately.
    Open,
    /// Testing recovery - calls are allowed, successes counted.
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "CLOSED"),
            CircuitState::Open => write!(f, "OPEN"),
            CircuitState::HalfOpen => write!(f, "HALF_OPEN"),
        }
    }
}

/// Configuration for circuit breaker behavior.
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Failures within the monitoring period before opening the circuit.
    pub failure_threshold: u32,
    /// Time after the last failure before a call may probe recovery.
    pub reset_timeout: Duration,
    /// Rolling window for the failure count; counts reset once this much time
    /// has passed since the last failure.
    pub monitoring_period: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout: Duration::from_secs(30),
            monitoring_period: Duration::from_secs(60),
        }
    }
}

/// Mutable breaker state, guarded by one mutex.
#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    failure_count: u32,
    last_failure: Option<Instant>,
    consecutive_successes: u32,
}

/// Circuit breaker guarding one class of API operations.
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    /// Create a new breaker with default configuration.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_config(name, CircuitBreakerConfig::default())
    }

    /// Create a new breaker with custom configuration.
    pub fn with_config(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                failure_count: 0,
                last_failure: None,
                consecutive_successes: 0,
            }),
        }
    }

    /// Current state. OPEN is reported until a call actually probes recovery;
    /// the OPEN -> HALF_OPEN transition happens on the next call after the
    /// reset timeout, not on observation.
    pub fn state(&self) -> CircuitState {
        self.inner.lock().unwrap().state
    }

    /// Run `operation` through the breaker.
    ///
    /// While OPEN (and the reset timeout has not elapsed), returns
    /// `WeatherError::CircuitOpen` without invoking the operation. Every
    /// failure of the wrapped operation counts toward the threshold.
    pub async fn call<F, Fut, T>(&self, operation: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.before_call()?;

        match operation().await {
            Ok(value) => {
                self.record_success();
                Ok(value)
            }
            Err(e) => {
                self.record_failure();
                Err(e)
            }
        }
    }

    /// Gate a call: reject while OPEN, or move to HALF_OPEN once the reset
    /// timeout has elapsed since the last failure.
    fn before_call(&self) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();

        if inner.state != CircuitState::Open {
            return Ok(());
        }

        let elapsed = inner
            .last_failure
            .map(|t| t.elapsed())
            .unwrap_or(Duration::MAX);

        if elapsed >= self.config.reset_timeout {
            inner.state = CircuitState::HalfOpen;
            inner.consecutive_successes = 0;
            debug!("Circuit breaker for {} entering HALF_OPEN", self.name);
            Ok(())
        } else {
            Err(WeatherError::CircuitOpen {
                name: self.name.clone(),
            })
        }
    }

    fn record_success(&self) {
        let mut inner = self.inner.lock().unwrap();

        if inner.state == CircuitState::HalfOpen {
            inner.consecutive_successes += 1;
            if inner.consecutive_successes >= 2 {
                inner.state = CircuitState::Closed;
                inner.failure_count = 0;
                inner.consecutive_successes = 0;
                inner.last_failure = None;
                info!("Circuit breaker for {} recovered to CLOSED", self.name);
            }
        }
    }

    fn record_failure(&self) {
        let mut inner = self.inner.lock().unwrap();
        let now = Instant::now();

        match inner.state {
            CircuitState::Closed => {
                // Rolling window: the count restarts once the monitoring
                // period has passed since the previous failure.
                let window_expired = inner
                    .last_failure
                    .map(|t| now.duration_since(t) >= self.config.monitoring_period)
                    .unwrap_or(true);

                inner.failure_count = if window_expired {
                    1
                } else {
                    inner.failure_count + 1
                };
                inner.last_failure = Some(now);

                if inner.failure_count >= self.config.failure_threshold {
                    inner.state = CircuitState::Open;
                    warn!(
                        "Circuit breaker for {} opened after {} failures",
                        self.name, inner.failure_count
                    );
                }
            }
            CircuitState::HalfOpen => {
                inner.state = CircuitState::Open;
                inner.last_failure = Some(now);
                inner.consecutive_successes = 0;
                warn!("Circuit breaker for {} reopened from HALF_OPEN", self.name);
            }
            CircuitState::Open => {
                inner.last_failure = Some(now);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn transient() -> WeatherError {
        WeatherError::Api {
            status: 500,
            message: "boom".into(),
        }
    }

    async fn fail(breaker: &CircuitBreaker) -> Result<()> {
        breaker.call(|| async { Err(transient()) }).await
    }

    async fn succeed(breaker: &CircuitBreaker) -> Result<()> {
        breaker.call(|| async { Ok(()) }).await
    }

    #[tokio::test]
    async fn test_starts_closed() {
        let breaker = CircuitBreaker::new("forecast");
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert!(succeed(&breaker).await.is_ok());
    }

    #[tokio::test]
    async fn test_opens_after_threshold_and_rejects_without_invoking() {
        let breaker = CircuitBreaker::new("forecast");

        for _ in 0..5 {
            let _ = fail(&breaker).await;
        }
        assert_eq!(breaker.state(), CircuitState::Open);

        // 6th call: rejected, operation never runs
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();
        let result: Result<()> = breaker
            .call(|| {
                let calls = calls_clone.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            })
            .await;

        assert!(matches!(result, Err(WeatherError::CircuitOpen { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_recovery_needs_two_consecutive_successes() {
        let config = CircuitBreakerConfig {
            failure_threshold: 2,
            reset_timeout: Duration::from_millis(10),
            ..Default::default()
        };
        let breaker = CircuitBreaker::with_config("forecast", config);

        let _ = fail(&breaker).await;
        let _ = fail(&breaker).await;
        assert_eq!(breaker.state(), CircuitState::Open);

        std::thread::sleep(Duration::from_millis(15));

        // First call after the timeout probes recovery
        assert!(succeed(&breaker).await.is_ok());
        assert_eq!(breaker.state(), CircuitState::HalfOpen);

        // Second consecutive success closes the circuit
        assert!(succeed(&breaker).await.is_ok());
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_half_open_failure_reopens() {
        let config = CircuitBreakerConfig {
            failure_threshold: 2,
            reset_timeout: Duration::from_millis(10),
            ..Default::default()
        };
        let breaker = CircuitBreaker::with_config("forecast", config);

        let _ = fail(&breaker).await;
        let _ = fail(&breaker).await;
        std::thread::sleep(Duration::from_millis(15));

        // Probe fails: straight back to OPEN
        let _ = fail(&breaker).await;
        assert_eq!(breaker.state(), CircuitState::Open);

        let result = succeed(&breaker).await;
        assert!(matches!(result, Err(WeatherError::CircuitOpen { .. })));
    }

    #[tokio::test]
    async fn test_failure_count_resets_after_monitoring_period() {
        let config = CircuitBreakerConfig {
            failure_threshold: 2,
            monitoring_period: Duration::from_millis(10),
            ..Default::default()
        };
        let breaker = CircuitBreaker::with_config("forecast", config);

        let _ = fail(&breaker).await;
        std::thread::sleep(Duration::from_millis(15));

        // Window expired: this failure starts a fresh count of 1
        let _ = fail(&breaker).await;
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_client_errors_count_toward_threshold() {
        let config = CircuitBreakerConfig {
            failure_threshold: 2,
            ..Default::default()
        };
        let breaker = CircuitBreaker::with_config("forecast", config);

        // Any failure of the wrapped operation counts, 404s included
        for _ in 0..2 {
            let result: Result<()> = breaker
                .call(|| async {
                    Err(WeatherError::Api {
                        status: 404,
                        message: "not found".into(),
                    })
                })
                .await;
            assert!(matches!(result, Err(WeatherError::Api { status: 404, .. })));
        }

        assert_eq!(breaker.state(), CircuitState::Open);
    }
}
