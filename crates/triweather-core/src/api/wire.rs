//! Wire-format payloads for the Open-Meteo endpoints.
//!
//! Each response shape is an explicit serde struct validated here and
//! converted to the domain model immediately. Array-of-columns payloads
//! (Open-Meteo's daily blocks) are checked for consistent lengths before
//! conversion; a mismatch is an `InvalidResponse`, not a panic.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;

use crate::error::{Result, WeatherError};
use crate::types::{
    CurrentConditions, DailyForecast, HistoricalData, Location, MonthlyClimate, WeeklyForecast,
};

fn invalid(message: impl Into<String>) -> WeatherError {
    WeatherError::InvalidResponse {
        message: message.into(),
    }
}

/// Parse an Open-Meteo timestamp (`YYYY-MM-DDTHH:MM`, UTC requested).
fn parse_time(raw: &str) -> Result<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M")
        .map(|naive| naive.and_utc())
        .map_err(|e| invalid(format!("bad timestamp {:?}: {}", raw, e)))
}

// === Current conditions ===

#[derive(Debug, Deserialize)]
pub struct CurrentResponse {
    pub current: CurrentBlock,
}

#[derive(Debug, Deserialize)]
pub struct CurrentBlock {
    pub time: String,
    pub temperature_2m: f64,
    pub apparent_temperature: f64,
    pub relative_humidity_2m: f64,
    pub wind_speed_10m: f64,
    pub weather_code: u8,
}

impl CurrentResponse {
    pub fn into_domain(self) -> Result<CurrentConditions> {
        Ok(CurrentConditions {
            temperature_c: self.current.temperature_2m,
            feels_like_c: self.current.apparent_temperature,
            humidity_pct: self.current.relative_humidity_2m,
            wind_speed_kmh: self.current.wind_speed_10m,
            weather_code: self.current.weather_code,
            observed_at: parse_time(&self.current.time)?,
        })
    }
}

// === Weekly forecast ===

#[derive(Debug, Deserialize)]
pub struct ForecastResponse {
    pub daily: DailyBlock,
}

#[derive(Debug, Deserialize)]
pub struct DailyBlock {
    pub time: Vec<String>,
    pub temperature_2m_min: Vec<f64>,
    pub temperature_2m_max: Vec<f64>,
    pub precipitation_sum: Vec<f64>,
    pub weather_code: Vec<u8>,
}

impl ForecastResponse {
    pub fn into_domain(self) -> Result<WeeklyForecast> {
        let daily = self.daily;
        let days = daily.time.len();
        if daily.temperature_2m_min.len() != days
            || daily.temperature_2m_max.len() != days
            || daily.precipitation_sum.len() != days
            || daily.weather_code.len() != days
        {
            return Err(invalid("daily forecast arrays have mismatched lengths"));
        }

        let daily = (0..days)
            .map(|i| DailyForecast {
                date: daily.time[i].clone(),
                temp_min_c: daily.temperature_2m_min[i],
                temp_max_c: daily.temperature_2m_max[i],
                precipitation_mm: daily.precipitation_sum[i],
                weather_code: daily.weather_code[i],
            })
            .collect();

        Ok(WeeklyForecast { daily })
    }
}

// === Historical archive ===

#[derive(Debug, Deserialize)]
pub struct ArchiveResponse {
    pub daily: ArchiveDailyBlock,
}

#[derive(Debug, Deserialize)]
pub struct ArchiveDailyBlock {
    pub time: Vec<String>,
    pub temperature_2m_mean: Vec<Option<f64>>,
    pub temperature_2m_max: Vec<Option<f64>>,
    pub temperature_2m_min: Vec<Option<f64>>,
    pub precipitation_sum: Vec<Option<f64>>,
}

/// Running aggregate for one month of daily archive rows.
#[derive(Default)]
struct MonthAccumulator {
    mean_sum: f64,
    max_sum: f64,
    min_sum: f64,
    precipitation: f64,
    days: u32,
}

impl ArchiveResponse {
    /// Aggregate daily archive rows into per-month climate figures.
    ///
    /// Days with missing readings (nulls in the archive) are skipped rather
    /// than treated as zero, so partial months stay representative.
    pub fn into_domain(self, location: &str) -> Result<HistoricalData> {
        let daily = self.daily;
        let days = daily.time.len();
        if daily.temperature_2m_mean.len() != days
            || daily.temperature_2m_max.len() != days
            || daily.temperature_2m_min.len() != days
            || daily.precipitation_sum.len() != days
        {
            return Err(invalid("archive arrays have mismatched lengths"));
        }

        let start_date = daily.time.first().cloned().unwrap_or_default();
        let end_date = daily.time.last().cloned().unwrap_or_default();

        // Group by YYYY-MM prefix; rows arrive date-ordered.
        let mut months: Vec<(String, MonthAccumulator)> = Vec::new();
        for i in 0..days {
            let date = &daily.time[i];
            // get() also rejects a non-boundary byte index in malformed dates
            let month = date
                .get(..7)
                .ok_or_else(|| invalid(format!("bad archive date {:?}", date)))?;

            let (mean, max, min) = match (
                daily.temperature_2m_mean[i],
                daily.temperature_2m_max[i],
                daily.temperature_2m_min[i],
            ) {
                (Some(mean), Some(max), Some(min)) => (mean, max, min),
                _ => continue,
            };

            if months.last().map(|(m, _)| m.as_str()) != Some(month) {
                months.push((month.to_string(), MonthAccumulator::default()));
            }
            if let Some((_, acc)) = months.last_mut() {
                acc.mean_sum += mean;
                acc.max_sum += max;
                acc.min_sum += min;
                acc.precipitation += daily.precipitation_sum[i].unwrap_or(0.0);
                acc.days += 1;
            }
        }

        let monthly = months
            .into_iter()
            .map(|(month, acc)| MonthlyClimate {
                month,
                temp_mean_c: acc.mean_sum / acc.days as f64,
                temp_max_c: acc.max_sum / acc.days as f64,
                temp_min_c: acc.min_sum / acc.days as f64,
                precipitation_mm: acc.precipitation,
            })
            .collect();

        Ok(HistoricalData {
            location: location.to_string(),
            start_date,
            end_date,
            monthly,
        })
    }
}

// === Geocoding ===

#[derive(Debug, Deserialize)]
pub struct GeocodingResponse {
    /// Absent entirely when the query matches nothing.
    pub results: Option<Vec<GeocodingResult>>,
}

#[derive(Debug, Deserialize)]
pub struct GeocodingResult {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl GeocodingResponse {
    pub fn into_domain(self) -> Vec<Location> {
        self.results
            .unwrap_or_default()
            .into_iter()
            .map(|r| Location {
                id: r.id.to_string(),
                name: r.name,
                country: r.country,
                latitude: r.latitude,
                longitude: r.longitude,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_conversion() {
        let payload: CurrentResponse = serde_json::from_str(
            r#"{"current":{"time":"2026-08-27T12:00","temperature_2m":14.2,
                "apparent_temperature":12.8,"relative_humidity_2m":81.0,
                "wind_speed_10m":19.4,"weather_code":61}}"#,
        )
        .unwrap();

        let current = payload.into_domain().unwrap();
        assert_eq!(current.temperature_c, 14.2);
        assert_eq!(current.weather_code, 61);
        assert_eq!(current.observed_at.to_rfc3339(), "2026-08-27T12:00:00+00:00");
    }

    #[test]
    fn test_current_rejects_bad_timestamp() {
        let payload: CurrentResponse = serde_json::from_str(
            r#"{"current":{"time":"not-a-time","temperature_2m":1.0,
                "apparent_temperature":1.0,"relative_humidity_2m":1.0,
                "wind_speed_10m":1.0,"weather_code":0}}"#,
        )
        .unwrap();

        assert!(matches!(
            payload.into_domain(),
            Err(WeatherError::InvalidResponse { .. })
        ));
    }

    #[test]
    fn test_forecast_rejects_mismatched_arrays() {
        let payload: ForecastResponse = serde_json::from_str(
            r#"{"daily":{"time":["2026-08-27","2026-08-28"],
                "temperature_2m_min":[8.1],"temperature_2m_max":[15.0,16.2],
                "precipitation_sum":[0.0,1.2],"weather_code":[1,61]}}"#,
        )
        .unwrap();

        assert!(matches!(
            payload.into_domain(),
            Err(WeatherError::InvalidResponse { .. })
        ));
    }

    #[test]
    fn test_archive_monthly_aggregation() {
        let payload: ArchiveResponse = serde_json::from_str(
            r#"{"daily":{
                "time":["2026-06-29","2026-06-30","2026-07-01","2026-07-02"],
                "temperature_2m_mean":[10.0,12.0,20.0,22.0],
                "temperature_2m_max":[14.0,16.0,24.0,26.0],
                "temperature_2m_min":[6.0,8.0,16.0,18.0],
                "precipitation_sum":[1.0,2.0,0.0,3.5]}}"#,
        )
        .unwrap();

        let hist = payload.into_domain("Bergen").unwrap();
        assert_eq!(hist.location, "Bergen");
        assert_eq!(hist.start_date, "2026-06-29");
        assert_eq!(hist.end_date, "2026-07-02");
        assert_eq!(hist.monthly.len(), 2);

        assert_eq!(hist.monthly[0].month, "2026-06");
        assert_eq!(hist.monthly[0].temp_mean_c, 11.0);
        assert_eq!(hist.monthly[0].precipitation_mm, 3.0);

        assert_eq!(hist.monthly[1].month, "2026-07");
        assert_eq!(hist.monthly[1].temp_mean_c, 21.0);
        assert_eq!(hist.monthly[1].precipitation_mm, 3.5);
    }

    #[test]
    fn test_archive_skips_null_days() {
        let payload: ArchiveResponse = serde_json::from_str(
            r#"{"daily":{
                "time":["2026-07-01","2026-07-02"],
                "temperature_2m_mean":[20.0,null],
                "temperature_2m_max":[24.0,null],
                "temperature_2m_min":[16.0,null],
                "precipitation_sum":[0.5,null]}}"#,
        )
        .unwrap();

        let hist = payload.into_domain("Bergen").unwrap();
        assert_eq!(hist.monthly.len(), 1);
        assert_eq!(hist.monthly[0].temp_mean_c, 20.0);
    }

    #[test]
    fn test_archive_rejects_unsliceable_dates() {
        // Too short, and a multibyte char straddling the month boundary
        for time in [r#"["2026"]"#, r#"["123456é"]"#] {
            let payload: ArchiveResponse = serde_json::from_str(&format!(
                r#"{{"daily":{{"time":{},
                    "temperature_2m_mean":[10.0],
                    "temperature_2m_max":[14.0],
                    "temperature_2m_min":[6.0],
                    "precipitation_sum":[1.0]}}}}"#,
                time
            ))
            .unwrap();

            assert!(matches!(
                payload.into_domain("Bergen"),
                Err(WeatherError::InvalidResponse { .. })
            ));
        }
    }

    #[test]
    fn test_geocoding_empty_results() {
        let payload: GeocodingResponse = serde_json::from_str(r#"{"generationtime_ms":0.3}"#).unwrap();
        assert!(payload.into_domain().is_empty());
    }
}
