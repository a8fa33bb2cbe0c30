//! Centralized configuration for the sync engine.
//!
//! Constants for cache TTLs, refresh cadence, and network timeouts live here.
//! Runtime-tunable knobs (retry, circuit breaker, scheduler settings) are plain
//! structs with `Default` impls next to the code they configure.

use std::time::Duration;

/// Per-resource cache lifetimes.
pub struct CacheTtl;

impl CacheTtl {
    pub const CURRENT: Duration = Duration::from_secs(15 * 60);
    pub const WEEKLY: Duration = Duration::from_secs(15 * 60);
    pub const HISTORICAL: Duration = Duration::from_secs(24 * 60 * 60);
    pub const LOCATION_SEARCH: Duration = Duration::from_secs(60 * 60);
}

/// Refresh and staleness cadence.
pub struct SyncConfig;

impl SyncConfig {
    /// Default user-facing auto-refresh interval.
    pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(30 * 60);
    /// Fixed period of the staleness sweep.
    pub const STALENESS_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);
    /// Age beyond which a record is refetched in the background.
    pub const STALENESS_THRESHOLD: Duration = Duration::from_secs(10 * 60);
    /// Default period of the cache expiry sweep.
    pub const CACHE_SWEEP_INTERVAL: Duration = Duration::from_secs(10 * 60);
    /// Months of history requested per location.
    pub const HISTORICAL_MONTHS: u32 = 12;
}

/// Network-related configuration.
pub struct NetworkConfig;

impl NetworkConfig {
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
    pub const MAX_RETRIES: u32 = 3;
    pub const FORECAST_API_BASE: &'static str = "https://api.open-meteo.com/v1";
    pub const ARCHIVE_API_BASE: &'static str = "https://archive-api.open-meteo.com/v1";
    pub const GEOCODING_API_BASE: &'static str = "https://geocoding-api.open-meteo.com/v1";
}
