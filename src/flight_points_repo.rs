use anyhow::Result;
use chrono::NaiveDate;
use diesel::prelude::*;
use uuid::Uuid;

use crate::flight_point::FlightPoint;
use crate::schema::flight_points;
use crate::{PgPool, PgPooledConnection};

#[derive(Clone)]
pub struct FlightPointsRepository {
    pool: PgPool,
}

impl FlightPointsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn get_connection(&self) -> Result<PgPooledConnection> {
        self.pool
            .get()
            .map_err(|e| anyhow::anyhow!("failed to get database connection: {e}"))
    }

    /// Idempotent insert keyed on `flight_point_hash` (spec.md §5
    /// "At-most-once effects"): retried ingestion leaves the store
    /// unchanged.
    pub async fn insert_batch(&self, points: &[FlightPoint]) -> Result<usize> {
        let mut conn = self.get_connection()?;
        let inserted = diesel::insert_into(flight_points::table)
            .values(points)
            .on_conflict(flight_points::flight_point_hash)
            .do_nothing()
            .execute(&mut conn)?;
        Ok(inserted)
    }

    pub async fn for_aircraft_day(&self, icao: &str, date: NaiveDate) -> Result<Vec<FlightPoint>> {
        let mut conn = self.get_connection()?;
        Ok(flight_points::table
            .filter(flight_points::aircraft_icao.eq(icao))
            .filter(flight_points::day_date.eq(date))
            .order(flight_points::timestamp.asc())
            .select(FlightPoint::as_select())
            .load(&mut conn)?)
    }

    pub async fn set_suburb(&self, flight_point_hash: &str, suburb_hash: Option<&str>) -> Result<()> {
        let mut conn = self.get_connection()?;
        diesel::update(flight_points::table.filter(flight_points::flight_point_hash.eq(flight_point_hash)))
            .set(flight_points::suburb_hash.eq(suburb_hash))
            .execute(&mut conn)?;
        Ok(())
    }

    pub async fn set_projected_position(
        &self,
        flight_point_hash: &str,
        projected_x: f64,
        projected_y: f64,
        crs_epsg: i32,
        utm_epsg_zone: i32,
    ) -> Result<()> {
        let mut conn = self.get_connection()?;
        diesel::update(flight_points::table.filter(flight_points::flight_point_hash.eq(flight_point_hash)))
            .set((
                flight_points::projected_x.eq(projected_x),
                flight_points::projected_y.eq(projected_y),
                flight_points::crs_epsg.eq(crs_epsg),
                flight_points::utm_epsg_zone.eq(utm_epsg_zone),
            ))
            .execute(&mut conn)?;
        Ok(())
    }

    /// Re-points every point still attached to no flight (or to the
    /// flights being merged) onto `flight_hash` — used by the Flight
    /// Assimilator (C6) when pointing an aggregated point set at the
    /// dominant Flight.
    pub async fn assign_flight(&self, flight_point_hashes: &[String], flight_hash: Uuid) -> Result<()> {
        let mut conn = self.get_connection()?;
        diesel::update(flight_points::table.filter(flight_points::flight_point_hash.eq_any(flight_point_hashes)))
            .set(flight_points::flight_hash.eq(flight_hash))
            .execute(&mut conn)?;
        Ok(())
    }

    pub async fn for_flight(&self, flight_hash: Uuid) -> Result<Vec<FlightPoint>> {
        let mut conn = self.get_connection()?;
        Ok(flight_points::table
            .filter(flight_points::flight_hash.eq(flight_hash))
            .order(flight_points::timestamp.asc())
            .select(FlightPoint::as_select())
            .load(&mut conn)?)
    }

    /// Per-suburb point counts, optionally restricted to a set of aircraft
    /// (spec.md §6: `GET /api/suburbs`'s `properties.num_points`).
    pub async fn count_by_suburb(&self, icaos: Option<&[String]>) -> Result<Vec<(String, i64)>> {
        let mut conn = self.get_connection()?;
        let base = flight_points::table.filter(flight_points::suburb_hash.is_not_null());
        let rows: Vec<(Option<String>, i64)> = match icaos {
            Some(icaos) => base
                .filter(flight_points::aircraft_icao.eq_any(icaos.to_vec()))
                .group_by(flight_points::suburb_hash)
                .select((flight_points::suburb_hash, diesel::dsl::count_star()))
                .load(&mut conn)?,
            None => base
                .group_by(flight_points::suburb_hash)
                .select((flight_points::suburb_hash, diesel::dsl::count_star()))
                .load(&mut conn)?,
        };
        Ok(rows.into_iter().filter_map(|(hash, count)| Some((hash?, count))).collect())
    }

    pub async fn count_for_aircraft_day(&self, icao: &str, date: NaiveDate) -> Result<i64> {
        let mut conn = self.get_connection()?;
        Ok(flight_points::table
            .filter(flight_points::aircraft_icao.eq(icao))
            .filter(flight_points::day_date.eq(date))
            .count()
            .get_result(&mut conn)?)
    }
}
