//! Fetch-then-persist: one weather reading into one `weather_data` record.

use stratus_core::ServiceError;
use stratus_store::{PocketBaseClient, WeatherDataRecord};
use stratus_weather::{Attribute, WeatherSample, WeatherSource};

/// Weather source plus document store, shared by every collector.
#[derive(Debug, Clone)]
pub struct SamplePipeline {
    source: WeatherSource,
    store: PocketBaseClient,
}

impl SamplePipeline {
    pub fn new(source: WeatherSource, store: PocketBaseClient) -> Self {
        Self { source, store }
    }

    pub fn source(&self) -> &WeatherSource {
        &self.source
    }

    pub fn store(&self) -> &PocketBaseClient {
        &self.store
    }

    /// Query string for the weather source.
    ///
    /// Known locations are qualified with their country; lookup failures
    /// fall back to the bare name.
    async fn resolve_query(&self, location: &str) -> String {
        if !self.source.resolves_places() {
            return location.to_string();
        }

        match self.store.find_location_by_name(location).await {
            Ok(Some(record)) if !record.fields.country.is_empty() => {
                format!("{},{}", location, record.fields.country)
            }
            Ok(_) => {
                tracing::debug!("Location {} not found in store, using name only", location);
                location.to_string()
            }
            Err(e) => {
                tracing::debug!(
                    "Location lookup for {} failed ({}), using name only",
                    location,
                    e
                );
                location.to_string()
            }
        }
    }

    /// Fetch one sample without persisting it.
    ///
    /// Unsupported attributes fail before any network call.
    pub async fn fetch(
        &self,
        location: &str,
        attribute: &str,
    ) -> Result<WeatherSample, ServiceError> {
        attribute.parse::<Attribute>()?;

        let query = self.resolve_query(location).await;
        let sample = self.source.sample(location, &query, attribute).await?;
        Ok(sample)
    }

    /// Write one sample to the `weather_data` collection.
    pub async fn persist(
        &self,
        sample: &WeatherSample,
    ) -> Result<WeatherDataRecord, ServiceError> {
        let record = self.store.create_weather_data(sample).await?;
        tracing::info!(
            "Saved {} data for {}: {}",
            sample.attribute,
            sample.location,
            sample.value
        );
        Ok(record)
    }

    /// Fetch one sample and write it.
    pub async fn collect(
        &self,
        location: &str,
        attribute: &str,
    ) -> Result<WeatherSample, ServiceError> {
        let sample = self.fetch(location, attribute).await?;
        self.persist(&sample).await?;
        Ok(sample)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use stratus_weather::WeatherProvider;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn weather_body() -> serde_json::Value {
        serde_json::json!({
            "name": "Berlin",
            "sys": { "country": "DE" },
            "main": { "temp": 12.34, "humidity": 71, "pressure": 1008 },
            "wind": { "speed": 5.2 }
        })
    }

    fn created_body() -> serde_json::Value {
        serde_json::json!({
            "id": "w1",
            "location": "Berlin",
            "attribute": "temperature",
            "value": 12.3,
            "timestamp": "2025-03-01 10:00:00.000Z",
            "source": "OpenWeatherMap"
        })
    }

    async fn mount_location(store: &MockServer, items: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path("/api/collections/locations/records"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "page": 1, "perPage": 1, "totalItems": 0, "totalPages": 1, "items": items
            })))
            .mount(store)
            .await;
    }

    fn pipeline(weather: &MockServer, store: &MockServer) -> SamplePipeline {
        let provider =
            WeatherProvider::new(&weather.uri(), "key", Duration::from_secs(5)).unwrap();
        SamplePipeline::new(
            WeatherSource::open_weather(provider),
            PocketBaseClient::new(&store.uri(), None).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_collect_qualifies_known_location() {
        let weather = MockServer::start().await;
        let store = MockServer::start().await;

        mount_location(
            &store,
            serde_json::json!([{ "id": "l1", "name": "Berlin", "country": "DE" }]),
        )
        .await;

        Mock::given(method("GET"))
            .and(path("/weather"))
            .and(query_param("q", "Berlin,DE"))
            .respond_with(ResponseTemplate::new(200).set_body_json(weather_body()))
            .expect(1)
            .mount(&weather)
            .await;

        Mock::given(method("POST"))
            .and(path("/api/collections/weather_data/records"))
            .and(body_partial_json(serde_json::json!({
                "location": "Berlin",
                "attribute": "temperature",
                "value": 12.3,
                "source": "OpenWeatherMap"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(created_body()))
            .expect(1)
            .mount(&store)
            .await;

        let sample = pipeline(&weather, &store)
            .collect("Berlin", "temperature")
            .await
            .unwrap();

        assert_eq!(sample.value, 12.3);
        assert_eq!(sample.attribute, "temperature");
    }

    #[tokio::test]
    async fn test_collect_uses_bare_name_when_lookup_fails() {
        let weather = MockServer::start().await;
        let store = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/collections/locations/records"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&store)
            .await;

        Mock::given(method("GET"))
            .and(path("/weather"))
            .and(query_param("q", "Berlin"))
            .respond_with(ResponseTemplate::new(200).set_body_json(weather_body()))
            .expect(1)
            .mount(&weather)
            .await;

        Mock::given(method("POST"))
            .and(path("/api/collections/weather_data/records"))
            .respond_with(ResponseTemplate::new(200).set_body_json(created_body()))
            .expect(1)
            .mount(&store)
            .await;

        let sample = pipeline(&weather, &store)
            .collect("Berlin", "HUMIDITY")
            .await
            .unwrap();

        assert_eq!(sample.attribute, "HUMIDITY");
        assert_eq!(sample.value, 71.0);
    }

    #[tokio::test]
    async fn test_each_attribute_writes_once() {
        for (attribute, expected) in [
            ("temperature", 12.3),
            ("humidity", 71.0),
            ("pressure", 1008.0),
            ("wind_speed", 5.2),
        ] {
            let weather = MockServer::start().await;
            let store = MockServer::start().await;

            mount_location(&store, serde_json::json!([])).await;

            Mock::given(method("GET"))
                .and(path("/weather"))
                .respond_with(ResponseTemplate::new(200).set_body_json(weather_body()))
                .mount(&weather)
                .await;

            Mock::given(method("POST"))
                .and(path("/api/collections/weather_data/records"))
                .and(body_partial_json(serde_json::json!({
                    "attribute": attribute,
                    "value": expected
                })))
                .respond_with(ResponseTemplate::new(200).set_body_json(created_body()))
                .expect(1)
                .mount(&store)
                .await;

            let sample = pipeline(&weather, &store)
                .collect("Berlin", attribute)
                .await
                .unwrap();
            assert_eq!(sample.value, expected);
        }
    }

    #[tokio::test]
    async fn test_unsupported_attribute_makes_no_calls() {
        let weather = MockServer::start().await;
        let store = MockServer::start().await;

        let result = pipeline(&weather, &store).collect("Berlin", "visibility").await;

        assert!(matches!(result, Err(ServiceError::UnsupportedAttribute(_))));
        assert!(weather.received_requests().await.unwrap().is_empty());
        assert!(store.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_is_upstream_error() {
        let store = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/collections/weather_data/records"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&store)
            .await;

        let pipeline = SamplePipeline::new(
            WeatherSource::Simulated,
            PocketBaseClient::new(&store.uri(), None).unwrap(),
        );

        let result = pipeline.collect("Berlin", "pressure").await;
        assert!(matches!(result, Err(ServiceError::Upstream(_))));
    }
}
