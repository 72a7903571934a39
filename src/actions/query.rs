//! Client → Master Query/View Surface (C9, spec.md §6).

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::flight_points_repo::FlightPointsRepository;
use crate::flights_repo::{FlightFilter, FlightsRepository};
use crate::suburbs_repo::SuburbsRepository;
use crate::web::AppState;

use super::json_error;

#[derive(Debug, Deserialize)]
pub struct SuburbsQuery {
    #[serde(default)]
    pub srsname: Option<String>,
    pub bbox: String,
    #[serde(default)]
    pub zoom: Option<f64>,
    #[serde(default)]
    pub aircraft: Option<String>,
}

fn parse_bbox(raw: &str) -> Option<(f64, f64, f64, f64)> {
    let parts: Vec<f64> = raw.split(',').filter_map(|p| p.trim().parse().ok()).collect();
    match parts[..] {
        [min_x, min_y, max_x, max_y] => Some((min_x, min_y, max_x, max_y)),
        _ => None,
    }
}

/// `GET /api/suburbs?srsname=&bbox=&zoom=&aircraft=` (spec.md §6): the
/// viewport's Suburbs as a GeoJSON `FeatureCollection`, each Feature
/// carrying a `num_points` count (optionally scoped to `aircraft`).
pub async fn suburbs_geojson(State(state): State<AppState>, Query(params): Query<SuburbsQuery>) -> impl IntoResponse {
    let Some((min_x, min_y, max_x, max_y)) = parse_bbox(&params.bbox) else {
        return json_error(StatusCode::BAD_REQUEST, "malformed bbox, expected \"minX,minY,maxX,maxY\"").into_response();
    };

    let suburbs_repo = SuburbsRepository::new(state.pool.clone());
    let suburbs = match suburbs_repo.within_bbox(min_x, min_y, max_x, max_y).await {
        Ok(s) => s,
        Err(e) => return json_error(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()).into_response(),
    };

    let icaos = params.aircraft.as_ref().map(|s| s.split(',').map(str::to_string).collect::<Vec<_>>());
    let points_repo = FlightPointsRepository::new(state.pool.clone());
    let counts: std::collections::HashMap<String, i64> = match points_repo.count_by_suburb(icaos.as_deref()).await {
        Ok(c) => c.into_iter().collect(),
        Err(e) => return json_error(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()).into_response(),
    };

    let features: Vec<Value> = suburbs
        .iter()
        .map(|suburb| {
            json!({
                "type": "Feature",
                "geometry": suburb.geometry,
                "properties": {
                    "suburbHash": suburb.suburb_hash,
                    "name": suburb.name,
                    "postcode": suburb.postcode,
                    "stateCode": suburb.state_code,
                    "numPoints": counts.get(&suburb.suburb_hash).copied().unwrap_or(0),
                },
            })
        })
        .collect();

    Json(json!({
        "type": "FeatureCollection",
        "srsName": params.srsname.unwrap_or_else(|| "EPSG:4326".to_string()),
        "features": features,
    }))
    .into_response()
}

#[derive(Debug, Deserialize)]
pub struct FlightsQuery {
    #[serde(default)]
    pub aircraft: Option<String>,
    #[serde(default)]
    pub has_departure_details: Option<bool>,
    #[serde(default)]
    pub has_arrival_details: Option<bool>,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    100
}

/// `GET /api/flights` (SPEC_FULL.md §2, folded from the original webapp's
/// `query_flights`/`query_flights_from`).
pub async fn query_flights(State(state): State<AppState>, Query(params): Query<FlightsQuery>) -> impl IntoResponse {
    let repo = FlightsRepository::new(state.pool.clone());
    let filter = FlightFilter {
        aircraft_icao: params.aircraft,
        has_departure_details: params.has_departure_details,
        has_arrival_details: params.has_arrival_details,
    };
    match repo.query(&filter, params.limit).await {
        Ok(flights) => Json(super::DataListResponse { data: flights }).into_response(),
        Err(e) => json_error(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()).into_response(),
    }
}

/// `GET /api/flights/{flight_hash}`.
pub async fn get_flight(State(state): State<AppState>, Path(flight_hash): Path<Uuid>) -> impl IntoResponse {
    let repo = FlightsRepository::new(state.pool.clone());
    match repo.get(flight_hash).await {
        Ok(Some(flight)) => Json(super::DataResponse { data: flight }).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => json_error(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()).into_response(),
    }
}
