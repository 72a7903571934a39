use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::flights;

/// A single complete journey, takeoff to landing (or taxi-only), identified
/// by `flight_hash` (spec.md §3).
///
/// **Invariant:** membership of a FlightPoint in a Flight is exclusive;
/// `first_point_ts` never decreases once set unless a re-assimilation
/// explicitly extends the flight backward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = flights)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Flight {
    pub flight_hash: Uuid,
    pub aircraft_icao: String,
    pub takeoff_airport_hash: Option<String>,
    pub landing_airport_hash: Option<String>,
    pub distance_meters: Option<f64>,
    pub fuel_gallons: Option<f64>,
    pub avg_speed_knots: Option<f64>,
    pub avg_altitude_ft: Option<f64>,
    pub total_minutes: Option<i32>,
    pub prohibited_minutes: Option<i32>,
    pub total_co2_kg: Option<f64>,
    pub has_departure_details: bool,
    pub has_arrival_details: bool,
    pub taxi_only: bool,
    pub is_on_ground: bool,
    pub first_point_ts: DateTime<Utc>,
    pub last_point_ts: DateTime<Utc>,
}

impl Flight {
    pub fn new_empty(aircraft_icao: &str, first_point_ts: DateTime<Utc>, last_point_ts: DateTime<Utc>) -> Self {
        Self {
            flight_hash: Uuid::new_v4(),
            aircraft_icao: aircraft_icao.to_string(),
            takeoff_airport_hash: None,
            landing_airport_hash: None,
            distance_meters: None,
            fuel_gallons: None,
            avg_speed_knots: None,
            avg_altitude_ft: None,
            total_minutes: None,
            prohibited_minutes: None,
            total_co2_kg: None,
            has_departure_details: false,
            has_arrival_details: false,
            taxi_only: false,
            is_on_ground: false,
            first_point_ts,
            last_point_ts,
        }
    }

    /// How many UTC calendar dates this flight's points span — used by the
    /// cross-day-stitch seed scenario (spec.md §8, scenario 2).
    pub fn days_across(&self) -> i64 {
        (self.last_point_ts.date_naive() - self.first_point_ts.date_naive()).num_days() + 1
    }
}
