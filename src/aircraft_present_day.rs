use chrono::NaiveDate;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::aircraft_present_days;

/// The (aircraft, day) junction, created lazily when any data arrives for
/// the pair (spec.md §3). Carries three independent verification flags —
/// independent in the sense that setting one never implies another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = aircraft_present_days)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct AircraftPresentDay {
    pub icao: String,
    pub date: NaiveDate,
    pub history_verified: bool,
    pub flights_verified: bool,
    pub geolocation_verified: bool,
}
