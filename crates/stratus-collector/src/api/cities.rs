//! `/cities` routes over the `locations` collection.

use serde::Deserialize;
use serde_json::json;
use stratus_core::ServiceError;
use stratus_store::{LocationFields, StoreError};
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

use super::{json_body, reject, with_state, AppState};

const CITY_REQUIRED: &str = "City name and country are required";
const CITY_EXISTS: &str = "City already exists";
const CITY_NOT_FOUND: &str = "City not found";
const CITY_UNVERIFIED: &str =
    "City not found in weather service. Please verify the city name and country.";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CityRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

impl CityRequest {
    /// Trimmed name and country, both required.
    pub fn validate(&self) -> Result<LocationFields, ServiceError> {
        let name = self.name.as_deref().map(str::trim).unwrap_or_default();
        let country = self.country.as_deref().map(str::trim).unwrap_or_default();

        if name.is_empty() || country.is_empty() {
            return Err(ServiceError::validation(CITY_REQUIRED));
        }

        Ok(LocationFields {
            name: name.to_string(),
            country: country.to_string(),
        })
    }
}

pub fn routes(state: AppState) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let list = warp::path!("cities")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(list_cities);

    let create = warp::path!("cities")
        .and(warp::post())
        .and(json_body::<CityRequest>())
        .and(with_state(state.clone()))
        .and_then(create_city);

    let update = warp::path!("cities" / String)
        .and(warp::put())
        .and(json_body::<CityRequest>())
        .and(with_state(state.clone()))
        .and_then(update_city);

    let delete = warp::path!("cities" / String)
        .and(warp::delete())
        .and(with_state(state))
        .and_then(delete_city);

    list.or(create).or(update).or(delete)
}

fn city_not_found(err: StoreError) -> ServiceError {
    if err.is_not_found() {
        ServiceError::not_found(CITY_NOT_FOUND)
    } else {
        err.into()
    }
}

/// Ask the weather source whether it knows this place.
///
/// Only a real upstream can answer; other sources accept everything.
async fn verify(state: &AppState, city: &LocationFields) -> Result<(), ServiceError> {
    if !state.source().resolves_places() {
        return Ok(());
    }

    state
        .source()
        .verify_location(&city.name, &city.country)
        .await
        .map_err(|e| {
            tracing::warn!("Could not verify {},{}: {}", city.name, city.country, e);
            ServiceError::validation(CITY_UNVERIFIED)
        })
}

async fn list_cities(state: AppState) -> Result<impl Reply, Rejection> {
    let cities = state.store().list_locations(Some("name")).await.map_err(reject)?;
    Ok(warp::reply::json(&cities))
}

async fn create_city(request: CityRequest, state: AppState) -> Result<impl Reply, Rejection> {
    let city = request.validate().map_err(reject)?;

    let existing = state
        .store()
        .find_similar_location(&city.name, &city.country)
        .await
        .map_err(reject)?;
    if existing.is_some() {
        return Err(reject(ServiceError::conflict(CITY_EXISTS)));
    }

    verify(&state, &city).await.map_err(reject)?;

    let record = state.store().create_location(&city).await.map_err(reject)?;
    Ok(warp::reply::with_status(
        warp::reply::json(&record),
        StatusCode::CREATED,
    ))
}

async fn update_city(
    id: String,
    request: CityRequest,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    let city = request.validate().map_err(reject)?;

    verify(&state, &city).await.map_err(reject)?;

    let record = state
        .store()
        .update_location(&id, &city)
        .await
        .map_err(|e| reject(city_not_found(e)))?;

    tracing::info!("Updated city {} ({})", record.fields.name, record.id);
    Ok(warp::reply::json(&record))
}

async fn delete_city(id: String, state: AppState) -> Result<impl Reply, Rejection> {
    let city = state
        .store()
        .get_location(&id)
        .await
        .map_err(|e| reject(city_not_found(e)))?;

    let active = state.manager.active_for_location(&city.fields.name);
    if !active.is_empty() {
        let message = format!(
            "Cannot delete city {}. {} active collector(s) are using this location. \
             Please stop all collectors for this city first.",
            city.fields.name,
            active.len()
        );
        return Err(reject(ServiceError::Conflict {
            message,
            details: Some(json!({ "activeCollectors": active })),
        }));
    }

    state
        .store()
        .delete_location(&id)
        .await
        .map_err(|e| reject(city_not_found(e)))?;

    tracing::info!("Deleted city {} ({})", city.fields.name, city.id);
    Ok(warp::reply::json(&json!({
        "message": "City deleted successfully",
        "deletedCity": city,
    })))
}
