//! Weather source for Stratus
//!
//! Fetches current conditions from OpenWeatherMap (or simulated readings)
//! and turns them into single-attribute samples.

pub mod provider;
pub mod source;
pub mod types;

pub use provider::WeatherProvider;
pub use source::{WeatherSource, OPENWEATHER_SOURCE, SIMULATED_SOURCE};
pub use types::*;
