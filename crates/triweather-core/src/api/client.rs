//! Open-Meteo HTTP client.
//!
//! Implements the `WeatherApi` trait the engine consumes. Status handling is
//! explicit: 429 becomes `RateLimited` (with any `Retry-After` hint), other
//! non-success statuses become `Api` errors carrying the status code, and a
//! payload that fails to parse is an `InvalidResponse` with a body excerpt.

use async_trait::async_trait;
use chrono::{Months, Utc};
use reqwest::{header, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::config::NetworkConfig;
use crate::error::{Result, WeatherError};
use crate::types::{CurrentConditions, HistoricalData, Location, WeeklyForecast};

use super::wire::{ArchiveResponse, CurrentResponse, ForecastResponse, GeocodingResponse};

/// The remote weather/geocoding API as the engine sees it.
///
/// Implementations raise typed errors carrying an HTTP status when one was
/// received; absence of a status implies a transport-level failure.
#[async_trait]
pub trait WeatherApi: Send + Sync {
    async fn current_weather(&self, lat: f64, lon: f64) -> Result<CurrentConditions>;

    async fn weekly_forecast(&self, lat: f64, lon: f64) -> Result<WeeklyForecast>;

    async fn historical_data(&self, lat: f64, lon: f64, months: u32) -> Result<HistoricalData>;

    async fn search_locations(&self, query: &str) -> Result<Vec<Location>>;
}

/// Configuration for the Open-Meteo client.
#[derive(Debug, Clone)]
pub struct OpenMeteoConfig {
    /// Base URL for forecast endpoints.
    pub forecast_base: String,
    /// Base URL for the historical archive.
    pub archive_base: String,
    /// Base URL for the geocoding search.
    pub geocoding_base: String,
    /// Request timeout.
    pub timeout: Duration,
}

impl Default for OpenMeteoConfig {
    fn default() -> Self {
        Self {
            forecast_base: NetworkConfig::FORECAST_API_BASE.to_string(),
            archive_base: NetworkConfig::ARCHIVE_API_BASE.to_string(),
            geocoding_base: NetworkConfig::GEOCODING_API_BASE.to_string(),
            timeout: NetworkConfig::REQUEST_TIMEOUT,
        }
    }
}

impl OpenMeteoConfig {
    /// Point every endpoint at one base URL (for test servers).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.forecast_base = url.clone();
        self.archive_base = url.clone();
        self.geocoding_base = url;
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Open-Meteo API client.
#[derive(Debug, Clone)]
pub struct OpenMeteoClient {
    http: reqwest::Client,
    config: OpenMeteoConfig,
}

impl OpenMeteoClient {
    /// Create a new client with the given configuration.
    pub fn new(config: OpenMeteoConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent("Triweather/0.3")
            .build()
            .map_err(|e| WeatherError::Transport {
                message: format!("Failed to create HTTP client: {}", e),
                source: Some(e),
            })?;

        Ok(Self { http, config })
    }

    /// GET `url` with `query` and deserialize the JSON response body.
    async fn get_json<T: DeserializeOwned>(&self, url: &str, query: &[(&str, String)]) -> Result<T> {
        let response = self.http.get(url).query(query).send().await?;

        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            return Err(WeatherError::RateLimited { retry_after_secs });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(WeatherError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = response.text().await?;

        serde_json::from_str(&body).map_err(|e| WeatherError::InvalidResponse {
            message: format!("{} (body: {})", e, body.chars().take(200).collect::<String>()),
        })
    }
}

#[async_trait]
impl WeatherApi for OpenMeteoClient {
    async fn current_weather(&self, lat: f64, lon: f64) -> Result<CurrentConditions> {
        let url = format!("{}/forecast", self.config.forecast_base);
        let payload: CurrentResponse = self
            .get_json(
                &url,
                &[
                    ("latitude", lat.to_string()),
                    ("longitude", lon.to_string()),
                    (
                        "current",
                        "temperature_2m,apparent_temperature,relative_humidity_2m,\
                         wind_speed_10m,weather_code"
                            .to_string(),
                    ),
                    ("timezone", "UTC".to_string()),
                ],
            )
            .await?;

        payload.into_domain()
    }

    async fn weekly_forecast(&self, lat: f64, lon: f64) -> Result<WeeklyForecast> {
        let url = format!("{}/forecast", self.config.forecast_base);
        let payload: ForecastResponse = self
            .get_json(
                &url,
                &[
                    ("latitude", lat.to_string()),
                    ("longitude", lon.to_string()),
                    (
                        "daily",
                        "temperature_2m_min,temperature_2m_max,precipitation_sum,weather_code"
                            .to_string(),
                    ),
                    ("forecast_days", "7".to_string()),
                    ("timezone", "UTC".to_string()),
                ],
            )
            .await?;

        payload.into_domain()
    }

    async fn historical_data(&self, lat: f64, lon: f64, months: u32) -> Result<HistoricalData> {
        let end = Utc::now().date_naive();
        let start = end.checked_sub_months(Months::new(months)).unwrap_or(end);

        let url = format!("{}/archive", self.config.archive_base);
        let payload: ArchiveResponse = self
            .get_json(
                &url,
                &[
                    ("latitude", lat.to_string()),
                    ("longitude", lon.to_string()),
                    ("start_date", start.to_string()),
                    ("end_date", end.to_string()),
                    (
                        "daily",
                        "temperature_2m_mean,temperature_2m_max,temperature_2m_min,\
                         precipitation_sum"
                            .to_string(),
                    ),
                    ("timezone", "UTC".to_string()),
                ],
            )
            .await?;

        payload.into_domain(&format!("{:.4},{:.4}", lat, lon))
    }

    async fn search_locations(&self, query: &str) -> Result<Vec<Location>> {
        let url = format!("{}/search", self.config.geocoding_base);
        let payload: GeocodingResponse = self
            .get_json(
                &url,
                &[
                    ("name", query.to_string()),
                    ("count", "10".to_string()),
                ],
            )
            .await?;

        Ok(payload.into_domain())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = OpenMeteoConfig::default();
        assert_eq!(config.forecast_base, NetworkConfig::FORECAST_API_BASE);
        assert_eq!(config.archive_base, NetworkConfig::ARCHIVE_API_BASE);
        assert_eq!(config.geocoding_base, NetworkConfig::GEOCODING_API_BASE);
        assert_eq!(config.timeout, NetworkConfig::REQUEST_TIMEOUT);
    }

    #[test]
    fn test_config_builder() {
        let config = OpenMeteoConfig::default()
            .with_base_url("http://localhost:9100")
            .with_timeout(Duration::from_secs(3));

        assert_eq!(config.forecast_base, "http://localhost:9100");
        assert_eq!(config.archive_base, "http://localhost:9100");
        assert_eq!(config.geocoding_base, "http://localhost:9100");
        assert_eq!(config.timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_client_creation() {
        let client = OpenMeteoClient::new(OpenMeteoConfig::default());
        assert!(client.is_ok());
    }
}
