//! PocketBase records API client.

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use stratus_core::PocketBaseConfig;
use stratus_weather::WeatherSample;
use tracing::instrument;

use crate::error::StoreError;
use crate::records::{
    quote, ListQuery, ListResult, LocationFields, LocationRecord, Record, WeatherDataFields,
    WeatherDataRecord, LOCATIONS, WEATHER_DATA,
};

const REQUEST_TIMEOUT_SECS: u64 = 15;
const FULL_LIST_PAGE_SIZE: u32 = 200;

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PocketBaseClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl PocketBaseClient {
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    pub fn from_config(config: &PocketBaseConfig) -> Result<Self, StoreError> {
        Self::new(&config.url, config.token.clone())
    }

    fn records_url(&self, collection: &str) -> String {
        format!(
            "{}/api/collections/{}/records",
            self.base_url,
            urlencoding::encode(collection)
        )
    }

    fn record_url(&self, collection: &str, id: &str) -> String {
        format!("{}/{}", self.records_url(collection), urlencoding::encode(id))
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => req.header("Authorization", token),
            None => req,
        }
    }

    // =========== Generic record operations ===========

    /// List one page of a collection.
    #[instrument(skip(self), level = "debug")]
    pub async fn list<T: DeserializeOwned>(
        &self,
        collection: &str,
        query: &ListQuery,
    ) -> Result<ListResult<Record<T>>, StoreError> {
        let response = self
            .authorize(self.client.get(self.records_url(collection)))
            .query(&query.params())
            .send()
            .await?;

        self.handle_response(response, collection).await
    }

    /// Every record matching `sort`/`filter`, fetched page by page.
    #[instrument(skip(self), level = "debug")]
    pub async fn full_list<T: DeserializeOwned>(
        &self,
        collection: &str,
        sort: Option<&str>,
        filter: Option<&str>,
    ) -> Result<Vec<Record<T>>, StoreError> {
        let mut items = Vec::new();
        let mut page = 1;

        loop {
            let mut query = ListQuery::default().page(page, FULL_LIST_PAGE_SIZE);
            query.sort = sort.map(str::to_string);
            query.filter = filter.map(str::to_string);

            let result: ListResult<Record<T>> = self.list(collection, &query).await?;
            let fetched = result.items.len();
            items.extend(result.items);

            if fetched == 0 || i64::from(page) >= result.total_pages {
                break;
            }
            page += 1;
        }

        tracing::debug!("Fetched {} records from {}", items.len(), collection);
        Ok(items)
    }

    /// First record matching `filter`; `NotFound` when nothing matches.
    pub async fn first<T: DeserializeOwned>(
        &self,
        collection: &str,
        filter: &str,
    ) -> Result<Record<T>, StoreError> {
        let query = ListQuery::default().page(1, 1).filter(filter);
        let result: ListResult<Record<T>> = self.list(collection, &query).await?;

        result
            .items
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::NotFound(format!("{} where {}", collection, filter)))
    }

    /// Fetch one record by id.
    #[instrument(skip(self), level = "debug")]
    pub async fn get<T: DeserializeOwned>(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Record<T>, StoreError> {
        let response = self
            .authorize(self.client.get(self.record_url(collection, id)))
            .send()
            .await?;

        self.handle_response(response, &format!("{}/{}", collection, id))
            .await
    }

    /// Create a record.
    #[instrument(skip(self, fields), level = "debug")]
    pub async fn create<B: Serialize, T: DeserializeOwned>(
        &self,
        collection: &str,
        fields: &B,
    ) -> Result<Record<T>, StoreError> {
        let response = self
            .authorize(self.client.post(self.records_url(collection)))
            .json(fields)
            .send()
            .await?;

        self.handle_response(response, collection).await
    }

    /// Patch a record.
    #[instrument(skip(self, fields), level = "debug")]
    pub async fn update<B: Serialize, T: DeserializeOwned>(
        &self,
        collection: &str,
        id: &str,
        fields: &B,
    ) -> Result<Record<T>, StoreError> {
        let response = self
            .authorize(self.client.patch(self.record_url(collection, id)))
            .json(fields)
            .send()
            .await?;

        self.handle_response(response, &format!("{}/{}", collection, id))
            .await
    }

    /// Delete a record.
    #[instrument(skip(self), level = "debug")]
    pub async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let response = self
            .authorize(self.client.delete(self.record_url(collection, id)))
            .send()
            .await?;

        // Delete returns 204 No Content on success
        if response.status().is_success() {
            Ok(())
        } else {
            Err(self
                .error_from(response, &format!("{}/{}", collection, id))
                .await)
        }
    }

    // =========== locations ===========

    /// Location with exactly this name, if any.
    pub async fn find_location_by_name(
        &self,
        name: &str,
    ) -> Result<Option<LocationRecord>, StoreError> {
        let filter = format!("name={}", quote(name));
        match self.first(LOCATIONS, &filter).await {
            Ok(record) => Ok(Some(record)),
            Err(StoreError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Location whose name and country contain the given values (case-insensitive).
    pub async fn find_similar_location(
        &self,
        name: &str,
        country: &str,
    ) -> Result<Option<LocationRecord>, StoreError> {
        let filter = format!("name~{} && country~{}", quote(name), quote(country));
        match self.first(LOCATIONS, &filter).await {
            Ok(record) => Ok(Some(record)),
            Err(StoreError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn list_locations(
        &self,
        sort: Option<&str>,
    ) -> Result<Vec<LocationRecord>, StoreError> {
        self.full_list(LOCATIONS, sort, None).await
    }

    pub async fn get_location(&self, id: &str) -> Result<LocationRecord, StoreError> {
        self.get(LOCATIONS, id).await
    }

    pub async fn create_location(
        &self,
        fields: &LocationFields,
    ) -> Result<LocationRecord, StoreError> {
        let record: LocationRecord = self.create(LOCATIONS, fields).await?;
        tracing::info!("Created location {} ({})", record.fields.name, record.id);
        Ok(record)
    }

    pub async fn update_location(
        &self,
        id: &str,
        fields: &LocationFields,
    ) -> Result<LocationRecord, StoreError> {
        self.update(LOCATIONS, id, fields).await
    }

    pub async fn delete_location(&self, id: &str) -> Result<(), StoreError> {
        self.delete(LOCATIONS, id).await
    }

    // =========== weather_data ===========

    /// Persist one sample.
    pub async fn create_weather_data(
        &self,
        sample: &WeatherSample,
    ) -> Result<WeatherDataRecord, StoreError> {
        let fields = WeatherDataFields::from(sample);
        self.create(WEATHER_DATA, &fields).await
    }

    /// Newest samples for a location.
    pub async fn recent_weather_data(
        &self,
        location: &str,
        limit: u32,
    ) -> Result<ListResult<WeatherDataRecord>, StoreError> {
        let query = ListQuery::default()
            .page(1, limit)
            .sort("-created")
            .filter(format!("location = {}", quote(location)));
        self.list(WEATHER_DATA, &query).await
    }

    /// Helper to handle API responses and errors.
    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
        what: &str,
    ) -> Result<T, StoreError> {
        if response.status().is_success() {
            response
                .json()
                .await
                .map_err(|e| StoreError::Parse(format!("JSON parse error: {}", e)))
        } else {
            Err(self.error_from(response, what).await)
        }
    }

    async fn error_from(&self, response: reqwest::Response, what: &str) -> StoreError {
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return StoreError::NotFound(what.to_string());
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .ok()
            .and_then(|b| b.message)
            .unwrap_or(text);

        StoreError::Api {
            status: status.as_u16(),
            message,
        }
    }
}
