//! Remote weather/geocoding API boundary.
//!
//! This module provides:
//! - `WeatherApi`: the trait the engine consumes (mockable in tests)
//! - `OpenMeteoClient`: reqwest implementation against the Open-Meteo
//!   forecast, archive, and geocoding endpoints
//! - `wire`: explicit payload schemas, validated and converted to domain
//!   types at the boundary so raw wire shapes never leak inward

mod client;
pub mod wire;

pub use client::{OpenMeteoClient, OpenMeteoConfig, WeatherApi};
