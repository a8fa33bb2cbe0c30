//! Triweather Core - weather-data synchronization engine for multi-location
//! weather comparison.
//!
//! This crate provides the headless data layer: a TTL cache with pattern
//! invalidation, a retry executor and circuit breaker for the Open-Meteo
//! APIs, a fetch coordinator with per-location in-flight deduplication, and
//! a background refresh scheduler. It carries no UI; consumers subscribe to
//! published `WeatherRecord`s.
//!
//! # Example
//!
//! ```rust,ignore
//! use triweather_core::{Location, WeatherEngine};
//!
//! #[tokio::main]
//! async fn main() -> triweather_core::Result<()> {
//!     let engine = WeatherEngine::new()?;
//!
//!     let matches = engine.search_locations("bergen").await?;
//!     let bergen = matches.first().cloned().unwrap();
//!
//!     let record = engine.fetch_weather_data(&bergen).await?;
//!     println!("{}: {:.1} C", bergen.name, record.current.temperature_c);
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cache;
pub mod cancel;
pub mod config;
pub mod error;
pub mod sync;
pub mod types;

// Re-export commonly used types
pub use api::{OpenMeteoClient, OpenMeteoConfig, WeatherApi};
pub use cache::{CacheConfig, CacheStore};
pub use cancel::CancellationToken;
pub use error::{Result, WeatherError};
pub use sync::{
    CircuitBreaker, CircuitBreakerConfig, CircuitState, FetchCoordinator, RefreshScheduler,
    RetryConfig, SchedulerSettings,
};
pub use types::{
    CurrentConditions, DailyForecast, HistoricalData, Location, MonthlyClimate, WeatherRecord,
    WeeklyForecast,
};

use std::sync::Arc;

/// Main entry point wiring the cache, coordinator, and scheduler together.
///
/// Construction is synchronous and cheap; background tasks (cache sweep,
/// auto-refresh, staleness sweep) start only when [`WeatherEngine::start`]
/// is called from within a tokio runtime.
pub struct WeatherEngine {
    cache: Arc<CacheStore>,
    coordinator: Arc<FetchCoordinator>,
    scheduler: Arc<RefreshScheduler>,
}

impl WeatherEngine {
    /// Create an engine backed by the live Open-Meteo APIs.
    pub fn new() -> Result<Self> {
        let client = OpenMeteoClient::new(OpenMeteoConfig::default())?;
        Ok(Self::with_api(Arc::new(client)))
    }

    /// Create an engine over a caller-supplied API implementation.
    pub fn with_api(api: Arc<dyn WeatherApi>) -> Self {
        let cache = Arc::new(CacheStore::new(CacheConfig::default()));
        let coordinator = Arc::new(FetchCoordinator::new(api, cache.clone()));
        let scheduler = Arc::new(RefreshScheduler::new(coordinator.clone()));
        Self {
            cache,
            coordinator,
            scheduler,
        }
    }

    /// Start the background tasks: expired-entry sweep, auto-refresh, and
    /// staleness sweep. Must be called from within a tokio runtime.
    pub fn start(&self) {
        self.cache.start_sweep();
        self.scheduler.start();
    }

    /// Replace the tracked locations used by the background loops.
    pub fn set_locations(&self, locations: Vec<Location>) {
        self.scheduler.set_locations(locations);
    }

    /// Apply new scheduling settings, re-arming the auto-refresh loop.
    pub fn apply_settings(&self, settings: SchedulerSettings) {
        self.scheduler.apply_settings(settings);
    }

    /// Fetch (or join the in-flight fetch of) one location's weather record.
    pub async fn fetch_weather_data(&self, location: &Location) -> Result<WeatherRecord> {
        self.coordinator.fetch_weather_data(location).await
    }

    /// Force a network refresh for one location.
    pub async fn refresh_weather_data(&self, location: &Location) -> Result<()> {
        self.coordinator.refresh_weather_data(location).await
    }

    /// Refresh all tracked locations, fire-and-continue.
    pub async fn refresh_all_weather_data(&self) {
        let locations = self.scheduler.locations();
        self.coordinator.refresh_all_weather_data(&locations).await;
    }

    /// Geocoding search with cached results.
    pub async fn search_locations(&self, query: &str) -> Result<Vec<Location>> {
        self.coordinator.search_locations(query).await
    }

    /// Last published record for a location id, if any.
    pub fn get_location_weather_data(&self, location_id: &str) -> Option<WeatherRecord> {
        self.coordinator.get_location_weather_data(location_id)
    }

    /// Whether a fetch for this location id is currently outstanding.
    pub fn is_location_data_loading(&self, location_id: &str) -> bool {
        self.coordinator.is_location_data_loading(location_id)
    }

    /// Stop every background task. Already-started fetches run to completion.
    pub fn shutdown(&self) {
        self.scheduler.shutdown();
        self.cache.shutdown();
    }
}

impl Drop for WeatherEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}
