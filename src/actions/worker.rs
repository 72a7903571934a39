//! Worker → Master HTTP API (spec.md §6). All routes are nested under
//! `/api/worker` and require the caller be loopback (spec.md §7
//! `RadarWorkerRequired`: 404 to non-loopback/non-agent callers, 403 to
//! loopback callers that fail authentication).

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, warn};

use crate::aircraft::AircraftWire;
use crate::aircraft_repo::AircraftRepository;
use crate::error::DomainError;
use crate::flights_repo::FlightsRepository;
use crate::orchestrator::SubmissionOutcome;
use crate::web::AppState;
use crate::worker::{Worker, WorkerType};
use crate::worker_repo::WorkersRepository;

use super::{domain_error_response, json_error};

const WORKER_USER_AGENT_PREFIX: &str = "aireyes/slave";

/// spec.md §7 `RadarWorkerRequired`: 404 (deliberately opaque) to
/// non-loopback or non-agent requests, 403 to loopback requests whose
/// `WorkerUniqueId` header doesn't match a known worker.
fn require_radar_worker(addr: &SocketAddr, headers: &HeaderMap) -> Result<(), StatusCode> {
    if !addr.ip().is_loopback() {
        return Err(StatusCode::NOT_FOUND);
    }
    let is_agent = headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ua| ua.starts_with(WORKER_USER_AGENT_PREFIX));
    if !is_agent {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(())
}

fn worker_unique_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get("WorkerUniqueId")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticateRequest {
    pub worker_name: String,
    pub worker_unique_id: String,
}

pub async fn authenticate_worker(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(body): Json<AuthenticateRequest>,
) -> impl IntoResponse {
    if let Err(status) = require_radar_worker(&addr, &headers) {
        return status.into_response();
    }

    let repo = WorkersRepository::new(state.pool.clone());
    let mut worker = match repo.get(&body.worker_name).await {
        Ok(Some(w)) if w.unique_id != body.worker_unique_id => {
            return StatusCode::FORBIDDEN.into_response();
        }
        Ok(Some(w)) => w,
        Ok(None) => Worker {
            name: body.worker_name.clone(),
            unique_id: body.worker_unique_id.clone(),
            worker_type: WorkerType::AircraftTracker.as_str().to_string(),
            enabled: true,
            phone_home_url: None,
            proxy_url: None,
            pid: None,
            running: false,
            initialising: false,
            executed_at: None,
            shutdown_at: None,
            init_started_at: None,
            last_update: None,
            error_json: None,
        },
        Err(e) => {
            error!(error = %e, "failed to look up worker");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    worker.unique_id = body.worker_unique_id;
    worker.begin_initialising(Utc::now());
    if let Err(e) = repo.upsert(&worker).await {
        error!(error = %e, "failed to persist worker authentication");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    (StatusCode::OK, "OK").into_response()
}

pub async fn master_liveness() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetView {
    pub icao: String,
    pub name: Option<String>,
    pub airport_code: Option<String>,
}

pub async fn worker_targets(State(state): State<AppState>) -> impl IntoResponse {
    let repo = AircraftRepository::new(state.pool.clone());
    match repo.list_fleet().await {
        Ok(fleet) => Json(
            fleet
                .into_iter()
                .map(|a| TargetView {
                    icao: a.icao,
                    name: a.flight_name,
                    airport_code: a.airport_code,
                })
                .collect::<Vec<_>>(),
        )
        .into_response(),
        Err(e) => {
            error!(error = %e, "failed to list fleet");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "failed to list fleet").into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum AircraftBatch {
    One(AircraftWire),
    Many(Vec<AircraftWire>),
}

impl AircraftBatch {
    fn into_vec(self) -> Vec<AircraftWire> {
        match self {
            AircraftBatch::One(a) => vec![a],
            AircraftBatch::Many(a) => a,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PointAck {
    #[serde(rename = "flightPointHash")]
    pub flight_point_hash: String,
    pub synchronised: bool,
}

/// `POST /api/worker/aircraft` (spec.md §6): a live point batch for one or
/// more aircraft, dispatched through the Submission Orchestrator (C7) one
/// (aircraft, day) at a time.
pub async fn ingest_aircraft(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(body): Json<AircraftBatch>,
) -> impl IntoResponse {
    if let Err(status) = require_radar_worker(&addr, &headers) {
        return status.into_response();
    }

    let aircraft_repo = AircraftRepository::new(state.pool.clone());
    let catalog_guard = state.suburb_catalog.read().await;
    let catalog = catalog_guard.as_ref();

    let mut acks = serde_json::Map::new();
    for wire in body.into_vec() {
        let icao = wire.icao.clone();

        if let Ok(None) = aircraft_repo.get(&icao).await {
            let aircraft = crate::aircraft::Aircraft {
                icao: icao.clone(),
                aircraft_type: wire.aircraft_type.clone(),
                flight_name: wire.flight_name.clone(),
                registration: wire.registration.clone(),
                description: wire.description.clone(),
                year: wire.year,
                owner_operator: wire.owner_operator.clone(),
                image: wire.image.clone(),
                airport_code: wire.airport_code.clone(),
                top_speed_knots: None,
                fuel_type: None,
                fuel_gal_per_hour: None,
                fuel_capacity_gal: None,
                range_nm: None,
                endurance_hours: None,
                passenger_load: None,
                co2_per_gram: None,
            }
            .with_derived_airport_code();
            if let Err(e) = aircraft_repo.upsert(&aircraft).await {
                error!(error = %e, icao, "failed to register new aircraft");
            }
        }
        let aircraft = match aircraft_repo.get(&icao).await {
            Ok(a) => a,
            Err(e) => {
                error!(error = %e, icao, "failed to load aircraft");
                None
            }
        };

        let mut by_day: std::collections::BTreeMap<NaiveDate, Vec<crate::flight_point::FlightPoint>> =
            std::collections::BTreeMap::new();
        for point_wire in wire.flight_points {
            let day = point_wire.day_date();
            by_day.entry(day).or_default().push(point_wire.into_flight_point());
        }

        let mut point_hashes = Vec::new();
        for (day, points) in by_day {
            for p in &points {
                point_hashes.push(p.flight_point_hash.clone());
            }
            if let Err(e) = state
                .orchestrator
                .submit_partial(aircraft.as_ref(), &icao, day, points, catalog, &[])
                .await
            {
                warn!(error = %e, icao, %day, "submitPartial failed, points recorded but not yet assimilated");
            }
        }

        acks.insert(
            icao,
            serde_json::to_value(
                point_hashes
                    .into_iter()
                    .map(|h| PointAck {
                        flight_point_hash: h,
                        synchronised: true,
                    })
                    .collect::<Vec<_>>(),
            )
            .unwrap_or(Value::Null),
        );
    }

    Json(Value::Object(acks)).into_response()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeoutReport {
    pub aircraft_icao: String,
    #[allow(dead_code)]
    pub last_binary_update: Option<f64>,
    #[allow(dead_code)]
    pub current_config_aircraft_timeout: Option<f64>,
    #[allow(dead_code)]
    pub time_of_report: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct TimeoutResponse {
    pub determination: &'static str,
}

/// `POST /api/worker/aircraft/{icao}/timeout` (spec.md §6, §8 scenario 5).
pub async fn report_timeout(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Path(icao): Path<String>,
    Json(_body): Json<TimeoutReport>,
) -> impl IntoResponse {
    if let Err(status) = require_radar_worker(&addr, &headers) {
        return status.into_response();
    }

    let repo = FlightsRepository::new(state.pool.clone());
    let determination = match repo.latest_for_aircraft(&icao).await {
        Ok(Some(flight)) if flight.has_arrival_details => "landing",
        _ => "hold",
    };
    Json(TimeoutResponse { determination }).into_response()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceRequest {
    pub day: NaiveDate,
    pub aircraft: String,
    #[serde(default)]
    pub intentionally_empty: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceResponse {
    pub command: &'static str,
    pub receipts: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_trace_history: Option<(String, NaiveDate)>,
}

/// `POST /api/worker/trace` (spec.md §6): history-trawler completion plus
/// next assignment via the Worker Coordinator (C8).
pub async fn submit_trace(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(body): Json<TraceRequest>,
) -> impl IntoResponse {
    if let Err(status) = require_radar_worker(&addr, &headers) {
        return status.into_response();
    }

    let worker_name = worker_unique_id(&headers).unwrap_or_default();
    let mut receipts = Vec::new();

    if !body.intentionally_empty {
        let SubmissionOutcome { flights, .. } =
            match state.orchestrator.revise_day(None, &body.aircraft, body.day, false, &[]).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(error = %e, icao = body.aircraft, day = %body.day, "reviseDay failed during trace submission");
                    SubmissionOutcome { flights: vec![], warnings: vec![e] }
                }
            };
        receipts = flights.into_iter().map(|f| f.flight_hash.to_string()).collect();
    }

    if let Err(e) = state
        .worker_coordinator
        .complete_trace_history_work(&worker_name, &body.aircraft, body.day)
        .await
    {
        warn!(error = %e, "failed to release worker lock after trace submission");
    }

    match state.worker_coordinator.assign_trace_history_work(&worker_name, false).await {
        Ok(next) => Json(TraceResponse {
            command: "trawl",
            receipts,
            requested_trace_history: Some(next),
        })
        .into_response(),
        Err(DomainError::NoAssignableWorkLeft) => Json(TraceResponse {
            command: "shutdown",
            receipts,
            requested_trace_history: None,
        })
        .into_response(),
        Err(e) => domain_error_response(&e),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerSignalBody {
    pub worker_name: String,
    pub pid: Option<i32>,
}

/// `POST /api/worker/update/{signal}` (spec.md §6, §4.7 transitions).
pub async fn worker_signal(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Path(signal): Path<String>,
    Json(body): Json<WorkerSignalBody>,
) -> impl IntoResponse {
    if let Err(status) = require_radar_worker(&addr, &headers) {
        return status.into_response();
    }

    let repo = WorkersRepository::new(state.pool.clone());
    let Ok(Some(mut worker)) = repo.get(&body.worker_name).await else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let now = Utc::now();
    match signal.as_str() {
        "initialised" => worker.mark_running(body.pid, now),
        "heartbeat" => worker.heartbeat(now),
        "shutdown" => worker.mark_shutdown(now),
        _ => return StatusCode::BAD_REQUEST.into_response(),
    }

    if let Err(e) = repo.upsert(&worker).await {
        error!(error = %e, "failed to persist worker signal");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    (StatusCode::OK, "OK").into_response()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerErrorReport {
    pub worker_name: String,
    pub error_code: String,
    pub friendly_description: Option<String>,
    pub stack_trace: Option<String>,
    pub extra_information: Option<Value>,
}

/// `POST /api/worker/error` (spec.md §6): persisted, never fatal to the
/// caller.
pub async fn worker_error(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(body): Json<WorkerErrorReport>,
) -> impl IntoResponse {
    if let Err(status) = require_radar_worker(&addr, &headers) {
        return status.into_response();
    }

    let repo = WorkersRepository::new(state.pool.clone());
    if let Ok(Some(mut worker)) = repo.get(&body.worker_name).await {
        worker.record_error(serde_json::json!({
            "errorCode": body.error_code,
            "friendlyDescription": body.friendly_description,
            "stackTrace": body.stack_trace,
            "extraInformation": body.extra_information,
        }));
        if let Err(e) = repo.upsert(&worker).await {
            error!(error = %e, "failed to persist worker error report");
        }
    }
    (StatusCode::OK, "OK").into_response()
}
