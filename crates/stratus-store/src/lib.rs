//! PocketBase document store for Stratus.
//!
//! Generic record CRUD plus typed helpers for the `locations` and
//! `weather_data` collections.

pub mod client;
pub mod error;
pub mod records;

pub use client::PocketBaseClient;
pub use error::StoreError;
pub use records::{
    quote, ListQuery, ListResult, LocationFields, LocationRecord, Record, WeatherDataFields,
    WeatherDataRecord, LOCATIONS, WEATHER_DATA,
};
