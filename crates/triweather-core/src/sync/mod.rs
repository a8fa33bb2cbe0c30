//! Weather-data synchronization engine.
//!
//! This module provides:
//! - Retry executor with exponential backoff and jitter
//! - Circuit breaker state machine for failing endpoints
//! - `FetchCoordinator`: cache-first fetching with per-location in-flight
//!   deduplication and tolerated-optional sub-fetches
//! - `RefreshScheduler`: periodic auto-refresh plus a staleness sweep

pub mod circuit_breaker;
pub mod coordinator;
pub mod retry;
pub mod scheduler;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use coordinator::FetchCoordinator;
pub use retry::{retry, retry_with_breaker, RetryConfig};
pub use scheduler::{RefreshScheduler, SchedulerSettings};
