use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::aircraft;

/// Fuel consumption figures for an aircraft, used by the Flight Assimilator
/// (C6) to compute fuel-gallons and CO2 statistics. Absent entirely when
/// the aircraft has no fuel data on file — see [`DomainError::NoFuelFiguresData`](crate::error::DomainError::NoFuelFiguresData).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FuelFigures {
    pub gal_per_hour: f64,
    pub capacity_gal: f64,
    pub range_nm: f64,
    pub endurance_hours: f64,
    pub passenger_load: i32,
    pub co2_per_gram: f64,
}

/// A tracked airframe, identified by its 6-hex ICAO address. Immutable
/// except for fuel-figure refresh (spec.md §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Queryable, Selectable, Insertable)]
#[diesel(table_name = aircraft)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Aircraft {
    pub icao: String,
    pub aircraft_type: Option<String>,
    pub flight_name: Option<String>,
    pub registration: Option<String>,
    pub description: Option<String>,
    pub year: Option<i32>,
    pub owner_operator: Option<String>,
    pub image: Option<String>,
    pub airport_code: Option<String>,
    pub top_speed_knots: Option<f64>,
    pub fuel_type: Option<String>,
    pub fuel_gal_per_hour: Option<f64>,
    pub fuel_capacity_gal: Option<f64>,
    pub range_nm: Option<f64>,
    pub endurance_hours: Option<f64>,
    pub passenger_load: Option<i32>,
    pub co2_per_gram: Option<f64>,
}

impl Aircraft {
    pub fn fuel_figures(&self) -> Option<FuelFigures> {
        Some(FuelFigures {
            gal_per_hour: self.fuel_gal_per_hour?,
            capacity_gal: self.fuel_capacity_gal?,
            range_nm: self.range_nm?,
            endurance_hours: self.endurance_hours?,
            passenger_load: self.passenger_load?,
            co2_per_gram: self.co2_per_gram?,
        })
    }

    /// Derives `airport_code` from the ICAO suffix when not explicitly set.
    /// See spec.md §9 "Schema-loader objects" — an explicit constructor
    /// replacing the original's reflective post-load hook.
    pub fn with_derived_airport_code(mut self) -> Self {
        if self.airport_code.is_none() && self.icao.len() == 6 {
            self.airport_code = Some(self.icao[2..].to_uppercase());
        }
        self
    }
}

/// Wire shape for `Aircraft` as posted by a worker (spec.md §6).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AircraftWire {
    pub icao: String,
    #[serde(rename = "type")]
    pub aircraft_type: Option<String>,
    pub flight_name: Option<String>,
    pub registration: Option<String>,
    pub description: Option<String>,
    pub year: Option<i32>,
    pub owner_operator: Option<String>,
    pub image: Option<String>,
    pub airport_code: Option<String>,
    #[serde(rename = "FlightPoints", default)]
    pub flight_points: Vec<crate::flight_point::FlightPointWire>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare(icao: &str) -> Aircraft {
        Aircraft {
            icao: icao.to_string(),
            aircraft_type: None,
            flight_name: None,
            registration: None,
            description: None,
            year: None,
            owner_operator: None,
            image: None,
            airport_code: None,
            top_speed_knots: None,
            fuel_type: None,
            fuel_gal_per_hour: None,
            fuel_capacity_gal: None,
            range_nm: None,
            endurance_hours: None,
            passenger_load: None,
            co2_per_gram: None,
        }
    }

    #[test]
    fn derives_airport_code_from_icao_suffix() {
        let a = bare("7c68b7").with_derived_airport_code();
        assert_eq!(a.airport_code.as_deref(), Some("68B7"));
    }

    #[test]
    fn leaves_explicit_airport_code_alone() {
        let mut a = bare("7c68b7");
        a.airport_code = Some("YSSY".to_string());
        let a = a.with_derived_airport_code();
        assert_eq!(a.airport_code.as_deref(), Some("YSSY"));
    }

    #[test]
    fn fuel_figures_requires_every_field() {
        let mut a = bare("7c68b7");
        a.fuel_gal_per_hour = Some(12.0);
        assert!(a.fuel_figures().is_none());
    }
}
