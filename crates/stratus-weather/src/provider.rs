//! OpenWeatherMap current-conditions client.

use crate::types::{Observation, WeatherError};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::instrument;

#[derive(Debug, Deserialize)]
struct CurrentResponse {
    name: Option<String>,
    sys: Option<SysSection>,
    main: MainSection,
    wind: Option<WindSection>,
}

#[derive(Debug, Deserialize)]
struct SysSection {
    country: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MainSection {
    temp: f64,
    humidity: f64,
    pressure: f64,
}

#[derive(Debug, Deserialize)]
struct WindSection {
    speed: Option<f64>,
}

impl From<CurrentResponse> for Observation {
    fn from(resp: CurrentResponse) -> Self {
        Self {
            place: resp.name,
            country: resp.sys.and_then(|s| s.country),
            temperature: resp.main.temp,
            humidity: resp.main.humidity,
            pressure: resp.main.pressure,
            wind_speed: resp.wind.and_then(|w| w.speed),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WeatherProvider {
    client: Client,
    base_url: String,
    api_key: String,
}

impl WeatherProvider {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, WeatherError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    /// Fetch current conditions for `query` (`"name"` or `"name,country"`).
    #[instrument(skip(self), level = "debug")]
    pub async fn current(&self, query: &str) -> Result<Observation, WeatherError> {
        let url = format!("{}/weather", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("q", query),
                ("appid", self.api_key.as_str()),
                ("units", "metric"),
            ])
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let body: CurrentResponse = response
                .json()
                .await
                .map_err(|e| WeatherError::Parse(e.to_string()))?;
            let observation = Observation::from(body);
            tracing::debug!(
                query,
                place = ?observation.place,
                temp = observation.temperature,
                humidity = observation.humidity,
                pressure = observation.pressure,
                wind_speed = ?observation.wind_speed,
                "Weather API response"
            );
            Ok(observation)
        } else if status == StatusCode::UNAUTHORIZED {
            Err(WeatherError::InvalidApiKey)
        } else if status == StatusCode::NOT_FOUND {
            Err(WeatherError::LocationNotFound(query.to_string()))
        } else if status == StatusCode::TOO_MANY_REQUESTS {
            Err(WeatherError::RateLimited)
        } else {
            let text = response.text().await.unwrap_or_default();
            Err(WeatherError::Api(format!("{}: {}", status, text)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer) -> WeatherProvider {
        WeatherProvider::new(&server.uri(), "test_key", Duration::from_secs(5)).unwrap()
    }

    fn berlin_body() -> serde_json::Value {
        serde_json::json!({
            "name": "Berlin",
            "sys": { "country": "DE" },
            "main": { "temp": 18.26, "feels_like": 17.9, "humidity": 62, "pressure": 1011 },
            "wind": { "speed": 3.6 }
        })
    }

    #[tokio::test]
    async fn test_current_success() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/weather"))
            .and(query_param("q", "Berlin,DE"))
            .and(query_param("appid", "test_key"))
            .and(query_param("units", "metric"))
            .respond_with(ResponseTemplate::new(200).set_body_json(berlin_body()))
            .mount(&server)
            .await;

        let obs = provider(&server).current("Berlin,DE").await.unwrap();

        assert_eq!(obs.place.as_deref(), Some("Berlin"));
        assert_eq!(obs.country.as_deref(), Some("DE"));
        assert_eq!(obs.temperature, 18.26);
        assert_eq!(obs.humidity, 62.0);
        assert_eq!(obs.pressure, 1011.0);
        assert_eq!(obs.wind_speed, Some(3.6));
    }

    #[tokio::test]
    async fn test_current_without_wind() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/weather"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "Calm",
                "main": { "temp": 10.0, "humidity": 40, "pressure": 1000 }
            })))
            .mount(&server)
            .await;

        let obs = provider(&server).current("Calm").await.unwrap();
        assert_eq!(obs.wind_speed, None);
        assert_eq!(obs.country, None);
    }

    #[tokio::test]
    async fn test_invalid_key() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/weather"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let result = provider(&server).current("Berlin").await;
        assert!(matches!(result, Err(WeatherError::InvalidApiKey)));
    }

    #[tokio::test]
    async fn test_location_not_found() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/weather"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "cod": "404", "message": "city not found"
            })))
            .mount(&server)
            .await;

        let result = provider(&server).current("Atlantis").await;
        assert!(matches!(result, Err(WeatherError::LocationNotFound(ref q)) if q == "Atlantis"));
    }

    #[tokio::test]
    async fn test_rate_limited() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/weather"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let result = provider(&server).current("Berlin").await;
        assert!(matches!(result, Err(WeatherError::RateLimited)));
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/weather"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "Berlin"
            })))
            .mount(&server)
            .await;

        let result = provider(&server).current("Berlin").await;
        assert!(matches!(result, Err(WeatherError::Parse(_))));
    }
}
