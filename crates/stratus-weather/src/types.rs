use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use stratus_core::ServiceError;

/// Weather attribute a collector can track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attribute {
    Temperature,
    Humidity,
    Pressure,
    WindSpeed,
}

impl Attribute {
    pub const ALL: [Attribute; 4] = [
        Attribute::Temperature,
        Attribute::Humidity,
        Attribute::Pressure,
        Attribute::WindSpeed,
    ];

    /// Canonical name as stored in the document store
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Temperature => "temperature",
            Self::Humidity => "humidity",
            Self::Pressure => "pressure",
            Self::WindSpeed => "wind_speed",
        }
    }
}

impl std::fmt::Display for Attribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Attribute {
    type Err = WeatherError;

    /// Case-insensitive match against the four supported names
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|a| a.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| WeatherError::UnsupportedAttribute(s.to_string()))
    }
}

/// Current conditions reported by the weather source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Resolved place name, if the source reports one
    pub place: Option<String>,
    pub country: Option<String>,
    /// Degrees Celsius
    pub temperature: f64,
    /// Percent
    pub humidity: f64,
    /// hPa
    pub pressure: f64,
    /// m/s, absent when the source omits wind data
    pub wind_speed: Option<f64>,
}

impl Observation {
    /// Extract the reading for one attribute.
    ///
    /// Temperature is rounded to one decimal place; missing wind reads as 0.
    pub fn value(&self, attribute: Attribute) -> f64 {
        match attribute {
            Attribute::Temperature => (self.temperature * 10.0).round() / 10.0,
            Attribute::Humidity => self.humidity,
            Attribute::Pressure => self.pressure,
            Attribute::WindSpeed => self.wind_speed.unwrap_or(0.0),
        }
    }
}

/// One collected reading, as written to the `weather_data` collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSample {
    pub location: String,
    /// Attribute name exactly as the collector was started with
    pub attribute: String,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
    /// Provenance tag
    pub source: String,
}

/// Weather source errors
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Unsupported attribute: {0}")]
    UnsupportedAttribute(String),
    #[error("Missing OpenWeather API key")]
    MissingApiKey,
    #[error("Invalid OpenWeather API key")]
    InvalidApiKey,
    #[error("Location not found: {0}")]
    LocationNotFound(String),
    #[error("Rate limited by weather API")]
    RateLimited,
    #[error("Weather API error: {0}")]
    Api(String),
    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<WeatherError> for ServiceError {
    fn from(err: WeatherError) -> Self {
        match err {
            WeatherError::UnsupportedAttribute(attr) => ServiceError::UnsupportedAttribute(attr),
            other => ServiceError::Upstream(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn observation() -> Observation {
        Observation {
            place: Some("Berlin".into()),
            country: Some("DE".into()),
            temperature: 21.46,
            humidity: 55.0,
            pressure: 1013.0,
            wind_speed: None,
        }
    }

    #[test]
    fn test_attribute_parse_case_insensitive() {
        assert_eq!("temperature".parse::<Attribute>().unwrap(), Attribute::Temperature);
        assert_eq!("HUMIDITY".parse::<Attribute>().unwrap(), Attribute::Humidity);
        assert_eq!("Pressure".parse::<Attribute>().unwrap(), Attribute::Pressure);
        assert_eq!("Wind_Speed".parse::<Attribute>().unwrap(), Attribute::WindSpeed);
    }

    #[test]
    fn test_attribute_parse_unsupported() {
        let err = "visibility".parse::<Attribute>().unwrap_err();
        assert!(matches!(err, WeatherError::UnsupportedAttribute(ref a) if a == "visibility"));
        assert!("wind speed".parse::<Attribute>().is_err());
        assert!("".parse::<Attribute>().is_err());
    }

    #[test]
    fn test_attribute_display_roundtrips() {
        for attr in Attribute::ALL {
            assert_eq!(attr.to_string().parse::<Attribute>().unwrap(), attr);
        }
    }

    #[test]
    fn test_temperature_rounded() {
        assert_eq!(observation().value(Attribute::Temperature), 21.5);
    }

    #[test]
    fn test_missing_wind_reads_zero() {
        assert_eq!(observation().value(Attribute::WindSpeed), 0.0);
        let mut obs = observation();
        obs.wind_speed = Some(4.1);
        assert_eq!(obs.value(Attribute::WindSpeed), 4.1);
    }

    #[test]
    fn test_error_into_service_error() {
        let err: ServiceError = WeatherError::UnsupportedAttribute("x".into()).into();
        assert_eq!(err.status_code(), 400);

        let err: ServiceError = WeatherError::RateLimited.into();
        assert_eq!(err.status_code(), 502);
    }
}
