//! Record shapes for the two Stratus collections.

use serde::{Deserialize, Serialize};
use stratus_weather::WeatherSample;

pub const LOCATIONS: &str = "locations";
pub const WEATHER_DATA: &str = "weather_data";

/// A stored record: system fields plus the collection's own fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record<T> {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<String>,
    #[serde(flatten)]
    pub fields: T,
}

/// One page of records.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResult<T> {
    pub page: u32,
    pub per_page: u32,
    pub total_items: i64,
    pub total_pages: i64,
    pub items: Vec<T>,
}

/// Paging, ordering and filtering for list calls.
#[derive(Debug, Clone)]
pub struct ListQuery {
    pub page: u32,
    pub per_page: u32,
    pub sort: Option<String>,
    pub filter: Option<String>,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 30,
            sort: None,
            filter: None,
        }
    }
}

impl ListQuery {
    pub fn page(mut self, page: u32, per_page: u32) -> Self {
        self.page = page;
        self.per_page = per_page;
        self
    }

    pub fn sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub(crate) fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("page", self.page.to_string()),
            ("perPage", self.per_page.to_string()),
        ];
        if let Some(sort) = &self.sort {
            params.push(("sort", sort.clone()));
        }
        if let Some(filter) = &self.filter {
            params.push(("filter", filter.clone()));
        }
        params
    }
}

/// `locations` collection fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationFields {
    pub name: String,
    pub country: String,
}

/// `weather_data` collection fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherDataFields {
    pub location: String,
    pub attribute: String,
    pub value: f64,
    /// Stored date; the store's own format on read, RFC 3339 on write
    pub timestamp: String,
    pub source: String,
}

impl From<&WeatherSample> for WeatherDataFields {
    fn from(sample: &WeatherSample) -> Self {
        Self {
            location: sample.location.clone(),
            attribute: sample.attribute.clone(),
            value: sample.value,
            timestamp: sample.timestamp.to_rfc3339(),
            source: sample.source.clone(),
        }
    }
}

pub type LocationRecord = Record<LocationFields>;
pub type WeatherDataRecord = Record<WeatherDataFields>;

/// Quote a string literal for use inside a filter expression.
pub fn quote(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{}\"", escaped)
}
