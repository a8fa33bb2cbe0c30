//! Fetch coordination: cache-first reads, in-flight deduplication, and cache
//! population.
//!
//! For each location the coordinator guarantees at most one outstanding
//! network operation: a second caller arriving while a fetch is in flight
//! joins the existing shared future instead of starting another round-trip.
//! Required sub-resources (`current`, `weekly`) are fetched in parallel and
//! both must succeed; the optional `historical` fetch degrades to an empty
//! structure on failure.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use chrono::Utc;
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use tracing::{debug, info, warn};

use crate::api::WeatherApi;
use crate::cache::{keys, CacheStore};
use crate::config::{CacheTtl, SyncConfig};
use crate::error::{Result, WeatherError};
use crate::sync::retry::{retry, RetryConfig};
use crate::types::{HistoricalData, Location, WeatherRecord};

/// A fetch that concurrent callers for the same location can all await.
/// The error side is `Arc`-shared; each joiner detaches its own copy.
type SharedFetch = Shared<BoxFuture<'static, std::result::Result<WeatherRecord, Arc<WeatherError>>>>;

/// Coordinates weather fetches for all locations.
pub struct FetchCoordinator {
    api: Arc<dyn WeatherApi>,
    cache: Arc<CacheStore>,
    retry_config: RetryConfig,
    /// One entry per location id while a fetch is outstanding; removed when
    /// the fetch settles, success or failure.
    in_flight: Mutex<HashMap<String, SharedFetch>>,
    /// Published records, keyed by location id. The engine produces these;
    /// the consumer's state store holds the canonical copies.
    records: RwLock<HashMap<String, WeatherRecord>>,
}

impl FetchCoordinator {
    /// Create a coordinator over the given API client and cache.
    pub fn new(api: Arc<dyn WeatherApi>, cache: Arc<CacheStore>) -> Self {
        Self {
            api,
            cache,
            retry_config: RetryConfig::default(),
            in_flight: Mutex::new(HashMap::new()),
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Override the retry configuration used for every sub-fetch.
    pub fn with_retry_config(mut self, config: RetryConfig) -> Self {
        self.retry_config = config;
        self
    }

    /// Fetch the aggregate weather record for a location.
    ///
    /// Serves a fresh cache hit without touching the network; otherwise
    /// fetches `current` and `weekly` in parallel (both required, each
    /// retried) plus best-effort `historical`, populates the cache per
    /// sub-resource, and publishes the record.
    pub async fn fetch_weather_data(self: &Arc<Self>, location: &Location) -> Result<WeatherRecord> {
        let fetch = {
            let mut in_flight = self.in_flight.lock().unwrap();
            if let Some(existing) = in_flight.get(&location.id) {
                debug!("Joining in-flight fetch for {}", location.name);
                existing.clone()
            } else {
                let this = Arc::clone(self);
                let loc = location.clone();
                // The fetch runs as its own task so it proceeds and settles
                // even if every awaiter is dropped; the marker is removed
                // inside the task on both branches.
                let task = tokio::spawn(async move {
                    let result = this.do_fetch(&loc).await.map_err(Arc::new);
                    this.in_flight.lock().unwrap().remove(&loc.id);
                    result
                });
                let fetch = async move {
                    task.await.unwrap_or_else(|e| {
                        Err(Arc::new(WeatherError::Transport {
                            message: format!("fetch task failed: {}", e),
                            source: None,
                        }))
                    })
                }
                .boxed()
                .shared();
                in_flight.insert(location.id.clone(), fetch.clone());
                fetch
            }
        };

        fetch.await.map_err(|e| e.clone_detached())
    }

    async fn do_fetch(&self, location: &Location) -> Result<WeatherRecord> {
        let (lat, lon) = (location.latitude, location.longitude);

        if let Some(record) = self.assemble_from_cache(location) {
            debug!("Serving {} from cache", location.name);
            return Ok(record);
        }

        info!("Fetching weather data for {}", location.name);

        // Both required; either failing after retries fails the whole fetch
        let (current, weekly) = tokio::try_join!(
            retry(&self.retry_config, || self.api.current_weather(lat, lon)),
            retry(&self.retry_config, || self.api.weekly_forecast(lat, lon)),
        )?;

        // Optional: degrade to an empty structure, never fail the aggregate
        let months = SyncConfig::HISTORICAL_MONTHS;
        let historical = match retry(&self.retry_config, || {
            self.api.historical_data(lat, lon, months)
        })
        .await
        {
            Ok(mut historical) => {
                historical.location = location.name.clone();
                historical
            }
            Err(e) => {
                warn!(
                    "Historical fetch failed for {}: {}; continuing without",
                    location.name, e
                );
                HistoricalData::empty(&location.name)
            }
        };

        let record = WeatherRecord {
            current,
            weekly,
            historical,
            last_updated: Utc::now(),
        };

        self.populate_cache(lat, lon, &record);
        self.records
            .write()
            .unwrap()
            .insert(location.id.clone(), record.clone());

        Ok(record)
    }

    /// Rebuild the aggregate from fresh cache entries, if possible.
    ///
    /// Requires fresh `current` and `weekly` entries; a missing `historical`
    /// entry degrades to the empty structure just like a failed fetch.
    fn assemble_from_cache(&self, location: &Location) -> Option<WeatherRecord> {
        let (lat, lon) = (location.latitude, location.longitude);

        let current = self.cache.get(&keys::current(lat, lon))?;
        let current = serde_json::from_value(current).ok()?;
        let weekly = self.cache.get(&keys::weekly(lat, lon))?;
        let weekly = serde_json::from_value(weekly).ok()?;

        let historical = self
            .cache
            .get(&keys::historical(lat, lon, SyncConfig::HISTORICAL_MONTHS))
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_else(|| HistoricalData::empty(&location.name));

        // Keep the original fetch time if we still hold the record; the
        // staleness sweep keys off it.
        let last_updated = self
            .records
            .read()
            .unwrap()
            .get(&location.id)
            .map(|r| r.last_updated)
            .unwrap_or_else(Utc::now);

        let record = WeatherRecord {
            current,
            weekly,
            historical,
            last_updated,
        };
        self.records
            .write()
            .unwrap()
            .insert(location.id.clone(), record.clone());

        Some(record)
    }

    /// Write each sub-resource under its own key and TTL so they can be
    /// invalidated independently.
    fn populate_cache(&self, lat: f64, lon: f64, record: &WeatherRecord) {
        if let Ok(value) = serde_json::to_value(&record.current) {
            self.cache.set(keys::current(lat, lon), value, CacheTtl::CURRENT);
        }
        if let Ok(value) = serde_json::to_value(&record.weekly) {
            self.cache.set(keys::weekly(lat, lon), value, CacheTtl::WEEKLY);
        }
        if !record.historical.is_empty() {
            if let Ok(value) = serde_json::to_value(&record.historical) {
                self.cache.set(
                    keys::historical(lat, lon, SyncConfig::HISTORICAL_MONTHS),
                    value,
                    CacheTtl::HISTORICAL,
                );
            }
        }
    }

    /// Force a network round-trip for one location: invalidate its cached
    /// entries, then fetch.
    ///
    /// A cache invalidation failure is logged and does not abort the refresh.
    pub async fn refresh_weather_data(self: &Arc<Self>, location: &Location) -> Result<()> {
        let pattern = keys::location_pattern(location.latitude, location.longitude);
        if let Err(e) = self.cache.invalidate(&pattern) {
            warn!("Cache invalidation failed for {}: {}", location.name, e);
        }

        self.fetch_weather_data(location).await?;
        Ok(())
    }

    /// Refresh every location concurrently, fire-and-continue: one location's
    /// failure never aborts the others.
    pub async fn refresh_all_weather_data(self: &Arc<Self>, locations: &[Location]) {
        if let Err(e) = self.cache.invalidate(keys::ALL_CURRENT_PATTERN) {
            warn!("Cache invalidation failed during refresh-all: {}", e);
        }

        let fetches = locations.iter().map(|location| {
            let this = Arc::clone(self);
            let location = location.clone();
            async move {
                if let Err(e) = this.fetch_weather_data(&location).await {
                    warn!("Background refresh failed for {}: {}", location.name, e);
                }
            }
        });

        futures::future::join_all(fetches).await;
    }

    /// Whether a fetch for this location id is currently outstanding.
    pub fn is_location_data_loading(&self, location_id: &str) -> bool {
        self.in_flight.lock().unwrap().contains_key(location_id)
    }

    /// Whether any fetch is currently outstanding (scheduler overlap guard).
    pub fn any_fetch_in_flight(&self) -> bool {
        !self.in_flight.lock().unwrap().is_empty()
    }

    /// Last published record for a location, if any.
    pub fn get_location_weather_data(&self, location_id: &str) -> Option<WeatherRecord> {
        self.records.read().unwrap().get(location_id).cloned()
    }

    /// Seed a published record directly, bypassing the fetch path.
    #[cfg(test)]
    pub(crate) fn publish_record(&self, location_id: &str, record: WeatherRecord) {
        self.records
            .write()
            .unwrap()
            .insert(location_id.to_string(), record);
    }

    /// Geocoding search, served from cache for repeated queries.
    pub async fn search_locations(&self, query: &str) -> Result<Vec<Location>> {
        let key = keys::location_search(query);

        if let Some(cached) = self.cache.get(&key) {
            if let Ok(locations) = serde_json::from_value(cached) {
                debug!("Serving location search {:?} from cache", query);
                return Ok(locations);
            }
        }

        let locations = retry(&self.retry_config, || self.api.search_locations(query)).await?;

        if let Ok(value) = serde_json::to_value(&locations) {
            self.cache.set(key, value, CacheTtl::LOCATION_SEARCH);
        }

        Ok(locations)
    }
}
