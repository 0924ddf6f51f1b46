//! HTTP surface of the collector service.

pub mod cities;
pub mod collectors;

use std::convert::Infallible;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use stratus_core::ServiceError;
use stratus_store::PocketBaseClient;
use stratus_weather::WeatherSource;
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

use crate::manager::CollectorManager;

const MAX_BODY_BYTES: u64 = 16 * 1024;

/// Shared state handed to every route.
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<CollectorManager>,
}

impl AppState {
    pub fn new(manager: Arc<CollectorManager>) -> Self {
        Self { manager }
    }

    pub fn store(&self) -> &PocketBaseClient {
        self.manager.pipeline().store()
    }

    pub fn source(&self) -> &WeatherSource {
        self.manager.pipeline().source()
    }
}

/// A `ServiceError` carried through warp's rejection chain.
#[derive(Debug)]
pub struct ApiError(pub ServiceError);

impl warp::reject::Reject for ApiError {}

pub fn reject(err: impl Into<ServiceError>) -> Rejection {
    warp::reject::custom(ApiError(err.into()))
}

pub fn with_state(
    state: AppState,
) -> impl Filter<Extract = (AppState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

pub(crate) fn json_body<T: DeserializeOwned + Send>(
) -> impl Filter<Extract = (T,), Error = Rejection> + Clone {
    warp::body::content_length_limit(MAX_BODY_BYTES).and(warp::body::json())
}

pub(crate) fn error_reply(status: StatusCode, message: &str) -> warp::reply::Response {
    warp::reply::with_status(
        warp::reply::json(&serde_json::json!({ "error": message })),
        status,
    )
    .into_response()
}

/// Turn rejections into `{"error": ...}` responses.
pub async fn handle_rejection(err: Rejection) -> Result<warp::reply::Response, Infallible> {
    if let Some(ApiError(e)) = err.find::<ApiError>() {
        let status =
            StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!("Request failed: {}", e);
        } else {
            tracing::debug!("Request rejected: {}", e);
        }
        return Ok(
            warp::reply::with_status(warp::reply::json(&e.to_body()), status).into_response(),
        );
    }

    if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        tracing::debug!("Malformed request body: {}", e);
        return Ok(error_reply(StatusCode::BAD_REQUEST, "Invalid JSON body"));
    }

    if err.is_not_found() {
        return Ok(error_reply(StatusCode::NOT_FOUND, "Not found"));
    }

    if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        return Ok(error_reply(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed"));
    }

    if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        return Ok(error_reply(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large"));
    }

    if err.find::<warp::reject::UnsupportedMediaType>().is_some() {
        return Ok(error_reply(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "Content-Type must be application/json",
        ));
    }

    tracing::error!("Unhandled rejection: {:?}", err);
    Ok(error_reply(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error"))
}

/// All collector-service routes with error recovery, CORS and request tracing.
pub fn routes(
    state: AppState,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let cors = warp::cors()
        .allow_any_origin()
        .allow_methods(vec!["GET", "POST", "PUT", "DELETE"])
        .allow_headers(vec!["content-type"]);

    collectors::routes(state.clone())
        .or(cities::routes(state))
        .recover(handle_rejection)
        .with(cors)
        .with(warp::trace::request())
}
