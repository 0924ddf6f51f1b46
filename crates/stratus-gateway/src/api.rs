//! Gateway routes under `/api`.
//!
//! Collector calls are forwarded to the collector service; reads go straight
//! to the document store. No state is kept here.

use std::convert::Infallible;

use serde_json::json;
use stratus_collector::api::{handle_rejection, reject};
use stratus_collector::{StartRequest, MISSING_PARAMETERS};
use stratus_core::ServiceError;
use stratus_store::PocketBaseClient;
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

use crate::client::CollectorServiceClient;

const MAX_BODY_BYTES: u64 = 16 * 1024;
const RECENT_WEATHER_LIMIT: u32 = 50;

#[derive(Clone)]
pub struct GatewayState {
    pub collectors: CollectorServiceClient,
    pub store: PocketBaseClient,
}

fn with_state(
    state: GatewayState,
) -> impl Filter<Extract = (GatewayState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

/// Gateway routes with error recovery, CORS and request tracing.
pub fn routes(
    state: GatewayState,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let list = warp::path!("api" / "collectors")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(list_collectors);

    let start = warp::path!("api" / "collectors")
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json::<StartRequest>())
        .and(with_state(state.clone()))
        .and_then(start_collector);

    let stop = warp::path!("api" / "collectors" / String)
        .and(warp::delete())
        .and(with_state(state.clone()))
        .and_then(stop_collector);

    let weather = warp::path!("api" / "weather" / String)
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(recent_weather);

    let locations = warp::path!("api" / "locations")
        .and(warp::get())
        .and(with_state(state))
        .and_then(list_locations);

    let cors = warp::cors()
        .allow_any_origin()
        .allow_methods(vec!["GET", "POST", "PUT", "DELETE"])
        .allow_headers(vec!["content-type"]);

    list.or(start)
        .or(stop)
        .or(weather)
        .or(locations)
        .recover(handle_rejection)
        .with(cors)
        .with(warp::trace::request())
}

async fn list_collectors(state: GatewayState) -> Result<impl Reply, Rejection> {
    let collectors = state.collectors.list().await.map_err(reject)?;
    Ok(warp::reply::json(&collectors))
}

async fn start_collector(
    request: StartRequest,
    state: GatewayState,
) -> Result<impl Reply, Rejection> {
    if !request.is_complete() {
        return Err(reject(ServiceError::validation(MISSING_PARAMETERS)));
    }

    let collector = state.collectors.start(&request).await.map_err(reject)?;
    tracing::info!(collector_id = %collector.id, "Started collector via gateway");

    Ok(warp::reply::with_status(
        warp::reply::json(&collector),
        StatusCode::CREATED,
    ))
}

async fn stop_collector(id: String, state: GatewayState) -> Result<impl Reply, Rejection> {
    let id = decode_segment(&id)?;
    let stopped = state.collectors.stop(&id).await.map_err(reject)?;

    Ok(warp::reply::json(&json!({
        "message": stopped.message,
        "collector": stopped.collector,
    })))
}

async fn recent_weather(location: String, state: GatewayState) -> Result<impl Reply, Rejection> {
    let location = decode_segment(&location)?;
    let records = state
        .store
        .recent_weather_data(&location, RECENT_WEATHER_LIMIT)
        .await
        .map_err(reject)?;
    Ok(warp::reply::json(&records))
}

async fn list_locations(state: GatewayState) -> Result<impl Reply, Rejection> {
    let locations = state.store.list_locations(None).await.map_err(reject)?;
    Ok(warp::reply::json(&locations))
}

fn decode_segment(segment: &str) -> Result<String, Rejection> {
    urlencoding::decode(segment)
        .map(|s| s.into_owned())
        .map_err(|_| reject(ServiceError::validation("Invalid path segment")))
}
