//! Weather source selection.
//!
//! `WeatherSource` wraps the available backends behind one async interface,
//! chosen once from configuration at startup.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use stratus_core::WeatherConfig;

use crate::provider::WeatherProvider;
use crate::types::{Attribute, Observation, WeatherError, WeatherSample};

pub const OPENWEATHER_SOURCE: &str = "OpenWeatherMap";
pub const SIMULATED_SOURCE: &str = "Simulated";

/// Where weather readings come from.
#[derive(Debug, Clone)]
pub enum WeatherSource {
    /// OpenWeatherMap current-conditions API.
    OpenWeather(Arc<WeatherProvider>),

    /// Random readings in plausible ranges (no API key configured).
    Simulated,

    /// No API key and simulation disabled; every fetch fails.
    Unconfigured,
}

impl WeatherSource {
    /// Create an OpenWeatherMap-backed source.
    pub fn open_weather(provider: WeatherProvider) -> Self {
        Self::OpenWeather(Arc::new(provider))
    }

    /// Pick the backend from configuration.
    pub fn from_config(config: &WeatherConfig) -> Result<Self, WeatherError> {
        match config.effective_api_key() {
            Some(key) => {
                let provider = WeatherProvider::new(
                    &config.base_url,
                    key,
                    Duration::from_secs(config.timeout_secs),
                )?;
                tracing::info!("Weather source: OpenWeatherMap ({})", config.base_url);
                Ok(Self::open_weather(provider))
            }
            None if config.simulate_without_key => {
                tracing::warn!("Weather source: simulated readings (no API key)");
                Ok(Self::Simulated)
            }
            None => {
                tracing::warn!("Weather source: not configured (no API key)");
                Ok(Self::Unconfigured)
            }
        }
    }

    /// Provenance tag stored with each sample.
    pub fn provenance(&self) -> &'static str {
        match self {
            Self::Simulated => SIMULATED_SOURCE,
            Self::OpenWeather(_) | Self::Unconfigured => OPENWEATHER_SOURCE,
        }
    }

    /// Whether this source can confirm that a place exists.
    pub fn resolves_places(&self) -> bool {
        matches!(self, Self::OpenWeather(_))
    }

    /// Current conditions for `query`.
    pub async fn observe(&self, query: &str) -> Result<Observation, WeatherError> {
        match self {
            Self::OpenWeather(provider) => provider.current(query).await,
            Self::Simulated => Ok(simulated_observation()),
            Self::Unconfigured => Err(WeatherError::MissingApiKey),
        }
    }

    /// Fetch one reading of `attribute` for `location`.
    ///
    /// `query` is what the upstream is asked for (possibly `"name,country"`);
    /// the sample records `location` and `attribute` exactly as given.
    /// Unsupported attributes fail before any upstream call.
    pub async fn sample(
        &self,
        location: &str,
        query: &str,
        attribute: &str,
    ) -> Result<WeatherSample, WeatherError> {
        let parsed: Attribute = attribute.parse()?;
        let observation = self.observe(query).await?;

        Ok(WeatherSample {
            location: location.to_string(),
            attribute: attribute.to_string(),
            value: observation.value(parsed),
            timestamp: Utc::now(),
            source: self.provenance().to_string(),
        })
    }

    /// Check that the upstream knows `name,country`.
    ///
    /// Sources that cannot verify accept every place.
    pub async fn verify_location(&self, name: &str, country: &str) -> Result<(), WeatherError> {
        match self {
            Self::OpenWeather(provider) => {
                provider.current(&format!("{},{}", name, country)).await?;
                Ok(())
            }
            Self::Simulated | Self::Unconfigured => Ok(()),
        }
    }
}

fn simulated_observation() -> Observation {
    Observation {
        place: None,
        country: None,
        temperature: rand::random_range(15.0..30.0),
        humidity: rand::random_range(40.0..80.0),
        pressure: rand::random_range(980.0..1020.0),
        wind_speed: Some(rand::random_range(0.0..10.0)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_from_config_selection() {
        let mut config = WeatherConfig::default();
        assert!(matches!(
            WeatherSource::from_config(&config).unwrap(),
            WeatherSource::Unconfigured
        ));

        config.simulate_without_key = true;
        assert!(matches!(
            WeatherSource::from_config(&config).unwrap(),
            WeatherSource::Simulated
        ));

        config.api_key = Some("real-key".into());
        let source = WeatherSource::from_config(&config).unwrap();
        assert!(source.resolves_places());
        assert_eq!(source.provenance(), OPENWEATHER_SOURCE);
    }

    #[tokio::test]
    async fn test_simulated_ranges() {
        let source = WeatherSource::Simulated;
        for _ in 0..50 {
            let t = source.sample("Berlin", "Berlin", "temperature").await.unwrap();
            assert!((15.0..=30.0).contains(&t.value));
            let h = source.sample("Berlin", "Berlin", "humidity").await.unwrap();
            assert!((40.0..80.0).contains(&h.value));
            let p = source.sample("Berlin", "Berlin", "pressure").await.unwrap();
            assert!((980.0..1020.0).contains(&p.value));
            let w = source.sample("Berlin", "Berlin", "wind_speed").await.unwrap();
            assert!((0.0..10.0).contains(&w.value));
        }
    }

    #[tokio::test]
    async fn test_sample_echoes_attribute() {
        let source = WeatherSource::Simulated;
        let sample = source.sample("Berlin", "Berlin,DE", "Temperature").await.unwrap();
        assert_eq!(sample.location, "Berlin");
        assert_eq!(sample.attribute, "Temperature");
        assert_eq!(sample.source, SIMULATED_SOURCE);
    }

    #[tokio::test]
    async fn test_unsupported_attribute_skips_upstream() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/weather"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let provider =
            WeatherProvider::new(&server.uri(), "key", Duration::from_secs(5)).unwrap();
        let source = WeatherSource::open_weather(provider);

        let result = source.sample("Berlin", "Berlin", "visibility").await;
        assert!(matches!(result, Err(WeatherError::UnsupportedAttribute(_))));
    }

    #[tokio::test]
    async fn test_unconfigured_fails() {
        let result = WeatherSource::Unconfigured
            .sample("Berlin", "Berlin", "humidity")
            .await;
        assert!(matches!(result, Err(WeatherError::MissingApiKey)));
    }

    #[tokio::test]
    async fn test_verify_location_queries_name_and_country() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/weather"))
            .and(query_param("q", "Gaziantep,TR"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "Gaziantep",
                "main": { "temp": 30.0, "humidity": 20, "pressure": 1009 }
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/weather"))
            .and(query_param("q", "Nowhere,XX"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let provider =
            WeatherProvider::new(&server.uri(), "key", Duration::from_secs(5)).unwrap();
        let source = WeatherSource::open_weather(provider);

        assert!(source.verify_location("Gaziantep", "TR").await.is_ok());
        assert!(source.verify_location("Nowhere", "XX").await.is_err());
        assert!(WeatherSource::Simulated.verify_location("Nowhere", "XX").await.is_ok());
    }
}
