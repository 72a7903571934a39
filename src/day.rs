use chrono::NaiveDate;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::days;

/// A UTC calendar date with at least one [`FlightPoint`](crate::flight_point::FlightPoint).
/// Exists iff referenced (spec.md §3); rows are created lazily by the
/// Submission Orchestrator (C7), never pre-populated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Queryable, Selectable, Insertable)]
#[diesel(table_name = days)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Day {
    pub date: NaiveDate,
}
