//! HTTP client for the collector service.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use stratus_collector::{Collector, StartRequest, StoppedCollector};
use stratus_core::ServiceError;
use thiserror::Error;
use tracing::instrument;
use url::Url;

const REQUEST_TIMEOUT_SECS: u64 = 15;

/// Collector service errors.
#[derive(Error, Debug)]
pub enum CollectorClientError {
    #[error("Invalid collector service URL: {0}")]
    InvalidUrl(String),

    #[error("Collector service unreachable: {0}")]
    Network(#[from] reqwest::Error),

    /// Non-2xx reply; `message` is the upstream `error` field when present.
    #[error("Collector service returned {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("Failed to parse collector service response: {0}")]
    Parse(String),
}

impl From<CollectorClientError> for ServiceError {
    fn from(err: CollectorClientError) -> Self {
        match err {
            CollectorClientError::Upstream { status, message } => match status {
                400 => ServiceError::Validation(message),
                404 => ServiceError::NotFound(message),
                409 => ServiceError::conflict(message),
                _ => ServiceError::Upstream(message),
            },
            other => ServiceError::Upstream(other.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// Reply of `DELETE /collect/:id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopResponse {
    pub message: String,
    pub collector: StoppedCollector,
}

/// Client for the collector service's start/stop/list surface.
#[derive(Debug, Clone)]
pub struct CollectorServiceClient {
    client: Client,
    base_url: Url,
}

impl CollectorServiceClient {
    pub fn new(base_url: &str) -> Result<Self, CollectorClientError> {
        let base_url =
            Url::parse(base_url).map_err(|e| CollectorClientError::InvalidUrl(e.to_string()))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self { client, base_url })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.as_str().trim_end_matches('/'), path)
    }

    #[instrument(skip(self), level = "debug")]
    pub async fn list(&self) -> Result<Vec<Collector>, CollectorClientError> {
        let response = self.client.get(self.endpoint("collectors")).send().await?;
        self.handle_response(response).await
    }

    #[instrument(skip(self, request), level = "debug")]
    pub async fn start(&self, request: &StartRequest) -> Result<Collector, CollectorClientError> {
        let response = self
            .client
            .post(self.endpoint("collect"))
            .json(request)
            .send()
            .await?;
        self.handle_response(response).await
    }

    #[instrument(skip(self), level = "debug")]
    pub async fn stop(&self, id: &str) -> Result<StopResponse, CollectorClientError> {
        let path = format!("collect/{}", urlencoding::encode(id));
        let response = self.client.delete(self.endpoint(&path)).send().await?;
        self.handle_response(response).await
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, CollectorClientError> {
        let status = response.status();
        if status.is_success() {
            return response
                .json()
                .await
                .map_err(|e| CollectorClientError::Parse(e.to_string()));
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .ok()
            .and_then(|b| b.error)
            .unwrap_or_else(|| default_message(status));

        tracing::debug!("Collector service error {}: {}", status, message);
        Err(CollectorClientError::Upstream {
            status: status.as_u16(),
            message,
        })
    }
}

fn default_message(status: StatusCode) -> String {
    status
        .canonical_reason()
        .unwrap_or("Collector service error")
        .to_string()
}
