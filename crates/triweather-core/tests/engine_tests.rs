//! Integration tests for the WeatherEngine public interface.
//!
//! These tests drive the engine through its facade the way a UI layer would:
//! search for locations, fetch records, force refreshes, and observe the
//! loading flag.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use triweather_core::{
    CurrentConditions, HistoricalData, Location, Result, WeatherApi, WeatherEngine, WeeklyForecast,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("triweather_core=debug")),
        )
        .with_test_writer()
        .try_init();
}

/// Fixed-response API double counting calls per endpoint.
struct FixedApi {
    current_calls: AtomicU32,
    search_calls: AtomicU32,
}

impl FixedApi {
    fn new() -> Self {
        Self {
            current_calls: AtomicU32::new(0),
            search_calls: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl WeatherApi for FixedApi {
    async fn current_weather(&self, _lat: f64, _lon: f64) -> Result<CurrentConditions> {
        self.current_calls.fetch_add(1, Ordering::SeqCst);
        Ok(CurrentConditions {
            temperature_c: 7.5,
            feels_like_c: 5.0,
            humidity_pct: 88.0,
            wind_speed_kmh: 22.0,
            weather_code: 61,
            observed_at: Utc::now(),
        })
    }

    async fn weekly_forecast(&self, _lat: f64, _lon: f64) -> Result<WeeklyForecast> {
        Ok(WeeklyForecast { daily: Vec::new() })
    }

    async fn historical_data(&self, _lat: f64, _lon: f64, _months: u32) -> Result<HistoricalData> {
        Ok(HistoricalData {
            location: String::new(),
            start_date: "2025-08-27".into(),
            end_date: "2026-08-27".into(),
            monthly: Vec::new(),
        })
    }

    async fn search_locations(&self, query: &str) -> Result<Vec<Location>> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![Location {
            id: "2759794".into(),
            name: query.to_string(),
            country: "Netherlands".into(),
            latitude: 52.374,
            longitude: 4.8897,
        }])
    }
}

fn engine() -> (WeatherEngine, Arc<FixedApi>) {
    init_tracing();
    let api = Arc::new(FixedApi::new());
    (WeatherEngine::with_api(api.clone()), api)
}

#[tokio::test]
async fn test_search_then_fetch_publishes_record() {
    let (engine, _api) = engine();

    let matches = engine.search_locations("amsterdam").await.unwrap();
    let location = matches.first().cloned().unwrap();

    let record = engine.fetch_weather_data(&location).await.unwrap();
    assert_eq!(record.current.temperature_c, 7.5);
    assert_eq!(record.historical.location, "amsterdam");

    let published = engine.get_location_weather_data(&location.id).unwrap();
    assert_eq!(published.current, record.current);
    assert!(!engine.is_location_data_loading(&location.id));
}

#[tokio::test]
async fn test_second_fetch_is_served_from_cache() {
    let (engine, api) = engine();
    let location = Location {
        id: "bergen".into(),
        name: "Bergen".into(),
        country: "Norway".into(),
        latitude: 60.39,
        longitude: 5.33,
    };

    engine.fetch_weather_data(&location).await.unwrap();
    engine.fetch_weather_data(&location).await.unwrap();

    assert_eq!(api.current_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_refresh_bypasses_cache() {
    let (engine, api) = engine();
    let location = Location {
        id: "bergen".into(),
        name: "Bergen".into(),
        country: "Norway".into(),
        latitude: 60.39,
        longitude: 5.33,
    };

    engine.fetch_weather_data(&location).await.unwrap();
    engine.refresh_weather_data(&location).await.unwrap();

    assert_eq!(api.current_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_refresh_all_covers_tracked_locations() {
    let (engine, api) = engine();
    let locations = vec![
        Location {
            id: "bergen".into(),
            name: "Bergen".into(),
            country: "Norway".into(),
            latitude: 60.39,
            longitude: 5.33,
        },
        Location {
            id: "tromso".into(),
            name: "Tromso".into(),
            country: "Norway".into(),
            latitude: 69.6492,
            longitude: 18.9553,
        },
    ];
    engine.set_locations(locations.clone());

    engine.refresh_all_weather_data().await;

    assert_eq!(api.current_calls.load(Ordering::SeqCst), 2);
    for location in &locations {
        assert!(engine.get_location_weather_data(&location.id).is_some());
    }
}

#[tokio::test]
async fn test_repeated_search_hits_cache() {
    let (engine, api) = engine();

    engine.search_locations("amsterdam").await.unwrap();
    engine.search_locations("amsterdam").await.unwrap();

    assert_eq!(api.search_calls.load(Ordering::SeqCst), 1);
}
