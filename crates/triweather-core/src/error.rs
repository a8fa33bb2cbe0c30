//! Error types for the Triweather sync engine.
//!
//! The taxonomy separates failures the engine may retry (transport faults,
//! timeouts, rate limiting, server errors) from those it must surface
//! immediately, and adds terminal wrappers (`RetryExhausted`, `CircuitOpen`)
//! so callers can distinguish "gave up" from a raw network message.

use std::time::Duration;
use thiserror::Error;

/// Main error type for the sync engine.
#[derive(Debug, Error)]
pub enum WeatherError {
    // Network errors
    #[error("Transport error: {message}")]
    Transport {
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    #[error("Request timeout after {0:?}")]
    Timeout(Duration),

    #[error("Rate limited, retry after {retry_after_secs:?} seconds")]
    RateLimited { retry_after_secs: Option<u64> },

    /// API returned a non-success HTTP status.
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// All retry attempts were consumed; wraps the last underlying error.
    #[error("Operation failed after {attempts} attempts: {source}")]
    RetryExhausted {
        attempts: u32,
        #[source]
        source: Box<WeatherError>,
    },

    /// Circuit breaker rejected the call without invoking the operation.
    #[error("Circuit breaker open for {name}")]
    CircuitOpen { name: String },

    // Cache errors
    #[error("Cache {operation} failed: {message}")]
    Cache { operation: String, message: String },

    // Boundary errors
    #[error("Invalid response payload: {message}")]
    InvalidResponse { message: String },
}

/// Result type alias for sync-engine operations.
pub type Result<T> = std::result::Result<T, WeatherError>;

impl From<reqwest::Error> for WeatherError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return WeatherError::Timeout(Duration::from_secs(0));
        }

        if let Some(status) = err.status() {
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                return WeatherError::RateLimited {
                    retry_after_secs: None,
                };
            }
            return WeatherError::Api {
                status: status.as_u16(),
                message: err.to_string(),
            };
        }

        WeatherError::Transport {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl WeatherError {
    /// Create a cache error naming the failed operation.
    pub fn cache(operation: impl Into<String>, message: impl Into<String>) -> Self {
        WeatherError::Cache {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Produce an owned copy of this error.
    ///
    /// Callers that join an in-flight fetch all observe the same shared
    /// failure; each gets its own value. Non-clonable `reqwest` sources are
    /// dropped, everything else is preserved structurally.
    pub fn clone_detached(&self) -> WeatherError {
        match self {
            WeatherError::Transport { message, .. } => WeatherError::Transport {
                message: message.clone(),
                source: None,
            },
            WeatherError::Timeout(d) => WeatherError::Timeout(*d),
            WeatherError::RateLimited { retry_after_secs } => WeatherError::RateLimited {
                retry_after_secs: *retry_after_secs,
            },
            WeatherError::Api { status, message } => WeatherError::Api {
                status: *status,
                message: message.clone(),
            },
            WeatherError::RetryExhausted { attempts, source } => WeatherError::RetryExhausted {
                attempts: *attempts,
                source: Box::new(source.clone_detached()),
            },
            WeatherError::CircuitOpen { name } => WeatherError::CircuitOpen { name: name.clone() },
            WeatherError::Cache { operation, message } => WeatherError::Cache {
                operation: operation.clone(),
                message: message.clone(),
            },
            WeatherError::InvalidResponse { message } => WeatherError::InvalidResponse {
                message: message.clone(),
            },
        }
    }

    /// Check if this error should trigger a retry.
    ///
    /// Transport faults, timeouts, HTTP 5xx, and 429 are transient; other
    /// client errors indicate a request the server will keep rejecting.
    pub fn is_retryable(&self) -> bool {
        match self {
            WeatherError::Transport { .. }
            | WeatherError::Timeout(_)
            | WeatherError::RateLimited { .. } => true,
            WeatherError::Api { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}
