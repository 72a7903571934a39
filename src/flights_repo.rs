use anyhow::Result;
use diesel::prelude::*;
use uuid::Uuid;

use crate::flight::Flight;
use crate::schema::flights;
use crate::{PgPool, PgPooledConnection};

/// Query filters for the Query/View Surface (C9) — folded in per
/// SPEC_FULL.md §2, replacing the source's lazy/dynamic query attributes
/// (spec.md §9) with explicit repository methods.
#[derive(Debug, Clone, Default)]
pub struct FlightFilter {
    pub aircraft_icao: Option<String>,
    pub has_departure_details: Option<bool>,
    pub has_arrival_details: Option<bool>,
}

#[derive(Clone)]
pub struct FlightsRepository {
    pool: PgPool,
}

impl FlightsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn get_connection(&self) -> Result<PgPooledConnection> {
        self.pool
            .get()
            .map_err(|e| anyhow::anyhow!("failed to get database connection: {e}"))
    }

    pub async fn get(&self, flight_hash: Uuid) -> Result<Option<Flight>> {
        let mut conn = self.get_connection()?;
        Ok(flights::table
            .filter(flights::flight_hash.eq(flight_hash))
            .select(Flight::as_select())
            .first(&mut conn)
            .optional()?)
    }

    pub async fn upsert(&self, flight: &Flight) -> Result<()> {
        let mut conn = self.get_connection()?;
        diesel::insert_into(flights::table)
            .values(flight)
            .on_conflict(flights::flight_hash)
            .do_update()
            .set(flight)
            .execute(&mut conn)?;
        Ok(())
    }

    pub async fn latest_for_aircraft(&self, icao: &str) -> Result<Option<Flight>> {
        let mut conn = self.get_connection()?;
        Ok(flights::table
            .filter(flights::aircraft_icao.eq(icao))
            .order(flights::last_point_ts.desc())
            .select(Flight::as_select())
            .first(&mut conn)
            .optional()?)
    }

    /// `query_flights`/`query_flights_from` from the original webapp,
    /// folded into this repository (SPEC_FULL.md §2).
    pub async fn query(&self, filter: &FlightFilter, limit: i64) -> Result<Vec<Flight>> {
        let mut conn = self.get_connection()?;
        let mut query = flights::table.into_boxed();

        if let Some(icao) = &filter.aircraft_icao {
            query = query.filter(flights::aircraft_icao.eq(icao.clone()));
        }
        if let Some(has_departure) = filter.has_departure_details {
            query = query.filter(flights::has_departure_details.eq(has_departure));
        }
        if let Some(has_arrival) = filter.has_arrival_details {
            query = query.filter(flights::has_arrival_details.eq(has_arrival));
        }

        Ok(query
            .order(flights::first_point_ts.desc())
            .limit(limit)
            .select(Flight::as_select())
            .load(&mut conn)?)
    }

    pub async fn count_for_aircraft(&self, icao: &str) -> Result<i64> {
        let mut conn = self.get_connection()?;
        Ok(flights::table
            .filter(flights::aircraft_icao.eq(icao))
            .count()
            .get_result(&mut conn)?)
    }
}
