//! `/collect` and `/collectors` routes.

use serde_json::json;
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

use super::{json_body, reject, with_state, AppState};
use crate::manager::StartRequest;

pub fn routes(state: AppState) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let start = warp::path!("collect")
        .and(warp::post())
        .and(json_body::<StartRequest>())
        .and(with_state(state.clone()))
        .and_then(start_collector);

    let stop = warp::path!("collect" / String)
        .and(warp::delete())
        .and(with_state(state.clone()))
        .and_then(stop_collector);

    let list = warp::path!("collectors")
        .and(warp::get())
        .and(with_state(state))
        .and_then(list_collectors);

    start.or(stop).or(list)
}

async fn start_collector(request: StartRequest, state: AppState) -> Result<impl Reply, Rejection> {
    let collector = state.manager.start(&request).map_err(reject)?;
    Ok(warp::reply::with_status(
        warp::reply::json(&collector),
        StatusCode::CREATED,
    ))
}

async fn stop_collector(id: String, state: AppState) -> Result<impl Reply, Rejection> {
    let stopped = state.manager.stop(&id).map_err(reject)?;
    Ok(warp::reply::json(&json!({
        "message": "Collector stopped",
        "collector": stopped,
    })))
}

async fn list_collectors(state: AppState) -> Result<impl Reply, Rejection> {
    Ok(warp::reply::json(&state.manager.list()))
}
