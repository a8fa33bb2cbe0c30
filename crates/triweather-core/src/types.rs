//! Domain model for weather data.
//!
//! These are the shapes the rest of the engine (and the UI/state layer)
//! handles. Wire formats from the remote API are converted into these at the
//! boundary in `api::wire` so no raw payload shapes leak inward.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A location the user compares weather for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Stable identifier, unique within the app (e.g. geocoding result id).
    pub id: String,
    pub name: String,
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Current observed conditions at a location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub temperature_c: f64,
    pub feels_like_c: f64,
    pub humidity_pct: f64,
    pub wind_speed_kmh: f64,
    /// WMO weather interpretation code.
    pub weather_code: u8,
    pub observed_at: DateTime<Utc>,
}

/// One day of the forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyForecast {
    /// ISO-8601 calendar date.
    pub date: String,
    pub temp_min_c: f64,
    pub temp_max_c: f64,
    pub precipitation_mm: f64,
    pub weather_code: u8,
}

/// Seven-day forecast for a location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyForecast {
    pub daily: Vec<DailyForecast>,
}

/// Aggregated climate figures for one month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyClimate {
    /// Month in `YYYY-MM` form.
    pub month: String,
    pub temp_mean_c: f64,
    pub temp_max_c: f64,
    pub temp_min_c: f64,
    pub precipitation_mm: f64,
}

/// Historical climate data for a location.
///
/// Optional in a [`WeatherRecord`]: when the historical fetch fails, the record
/// carries `HistoricalData::empty` instead of failing the whole operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalData {
    pub location: String,
    pub start_date: String,
    pub end_date: String,
    pub monthly: Vec<MonthlyClimate>,
}

impl HistoricalData {
    /// Well-formed empty structure substituted when the historical fetch fails.
    pub fn empty(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            start_date: String::new(),
            end_date: String::new(),
            monthly: Vec::new(),
        }
    }

    /// True if this is a degraded (empty) structure.
    pub fn is_empty(&self) -> bool {
        self.monthly.is_empty()
    }
}

/// Aggregate weather record for one location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    pub current: CurrentConditions,
    pub weekly: WeeklyForecast,
    pub historical: HistoricalData,
    pub last_updated: DateTime<Utc>,
}

impl WeatherRecord {
    /// Whether this record is older than the given staleness threshold.
    pub fn is_stale(&self, threshold: std::time::Duration) -> bool {
        let age = Utc::now().signed_duration_since(self.last_updated);
        age.to_std().map(|age| age > threshold).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_empty_historical_is_well_formed() {
        let hist = HistoricalData::empty("Bergen");
        assert_eq!(hist.location, "Bergen");
        assert!(hist.monthly.is_empty());
        assert!(hist.start_date.is_empty());
        assert!(hist.end_date.is_empty());
        assert!(hist.is_empty());
    }

    #[test]
    fn test_record_staleness() {
        let record = WeatherRecord {
            current: CurrentConditions {
                temperature_c: 12.0,
                feels_like_c: 10.5,
                humidity_pct: 80.0,
                wind_speed_kmh: 14.0,
                weather_code: 3,
                observed_at: Utc::now(),
            },
            weekly: WeeklyForecast { daily: Vec::new() },
            historical: HistoricalData::empty("Bergen"),
            last_updated: Utc::now() - chrono::Duration::minutes(11),
        };

        assert!(record.is_stale(Duration::from_secs(10 * 60)));
        assert!(!record.is_stale(Duration::from_secs(20 * 60)));
    }
}
