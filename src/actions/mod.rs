//! Query/View Surface (C9) and Worker HTTP API handlers (spec.md §6),
//! grouped into submodules by the resource they serve the way the
//! teacher's `actions/` does.

pub mod query;
pub mod worker;

pub use query::*;
pub use worker::*;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use serde::Serialize;
use serde_json::json;

use crate::error::DomainError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataResponse<T> {
    pub data: T,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataListResponse<T> {
    pub data: Vec<T>,
}

pub fn json_error(status: StatusCode, message: &str) -> impl IntoResponse {
    (status, Json(json!({ "errors": message })))
}

/// Maps a [`DomainError`] onto an HTTP status per spec.md §7's taxonomy.
pub fn domain_error_response(error: &DomainError) -> axum::response::Response {
    let status = match error {
        DomainError::SchemaValidationFail(_) => StatusCode::BAD_REQUEST,
        DomainError::RadarWorkerRequired => StatusCode::FORBIDDEN,
        DomainError::MultiplePotentialFlights(_)
        | DomainError::FlightsVerifiedError { .. }
        | DomainError::HistoryVerifiedError { .. } => StatusCode::CONFLICT,
        DomainError::NoAssignableWorkLeft => StatusCode::OK,
        _ => StatusCode::UNPROCESSABLE_ENTITY,
    };
    json_error(status, &error.to_string()).into_response()
}
