//! Cache key grammar.
//!
//! Key strings are a published contract: `invalidate` callers elsewhere in the
//! app build patterns against them, so the grammar must stay stable:
//!
//! - `weather:current:<lat>:<lon>`
//! - `weather:weekly:<lat>:<lon>`
//! - `weather:historical:<lat>:<lon>:<months>`
//! - `location:search:<urlencoded-query>`
//!
//! Coordinates are formatted with four decimal places so equal coordinates
//! always produce identical keys.

/// Format a coordinate for use in a cache key.
fn coord(value: f64) -> String {
    format!("{:.4}", value)
}

/// Key for current conditions at a coordinate.
pub fn current(lat: f64, lon: f64) -> String {
    format!("weather:current:{}:{}", coord(lat), coord(lon))
}

/// Key for the weekly forecast at a coordinate.
pub fn weekly(lat: f64, lon: f64) -> String {
    format!("weather:weekly:{}:{}", coord(lat), coord(lon))
}

/// Key for historical data at a coordinate over a month span.
pub fn historical(lat: f64, lon: f64, months: u32) -> String {
    format!(
        "weather:historical:{}:{}:{}",
        coord(lat),
        coord(lon),
        months
    )
}

/// Key for a location search query.
pub fn location_search(query: &str) -> String {
    format!("location:search:{}", urlencoding::encode(query))
}

/// Invalidation pattern matching every weather entry for one coordinate.
///
/// Coordinate text is regex-escaped (it contains `.`), so this pattern can
/// never fail to compile.
pub fn location_pattern(lat: f64, lon: f64) -> String {
    format!(
        "^weather:[a-z]+:{}:{}",
        regex::escape(&coord(lat)),
        regex::escape(&coord(lon))
    )
}

/// Invalidation pattern matching every current-conditions entry.
pub const ALL_CURRENT_PATTERN: &str = "^weather:current:";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_grammar() {
        assert_eq!(current(60.39, 5.33), "weather:current:60.3900:5.3300");
        assert_eq!(weekly(60.39, 5.33), "weather:weekly:60.3900:5.3300");
        assert_eq!(
            historical(60.39, 5.33, 12),
            "weather:historical:60.3900:5.3300:12"
        );
        assert_eq!(
            location_search("new york"),
            "location:search:new%20york"
        );
    }

    #[test]
    fn test_equal_coordinates_produce_equal_keys() {
        assert_eq!(current(60.39, 5.33), current(60.390000, 5.330000));
    }

    #[test]
    fn test_location_pattern_matches_all_resources() {
        let pattern = regex::Regex::new(&location_pattern(60.39, 5.33)).unwrap();
        assert!(pattern.is_match(&current(60.39, 5.33)));
        assert!(pattern.is_match(&weekly(60.39, 5.33)));
        assert!(pattern.is_match(&historical(60.39, 5.33, 12)));
        assert!(!pattern.is_match(&current(51.51, -0.13)));
        assert!(!pattern.is_match(&location_search("bergen")));
    }
}
