use anyhow::Result;
use diesel::prelude::*;

use crate::aircraft::Aircraft;
use crate::schema::aircraft;
use crate::{PgPool, PgPooledConnection};

#[derive(Clone)]
pub struct AircraftRepository {
    pool: PgPool,
}

impl AircraftRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn get_connection(&self) -> Result<PgPooledConnection> {
        self.pool
            .get()
            .map_err(|e| anyhow::anyhow!("failed to get database connection: {e}"))
    }

    pub async fn get(&self, icao: &str) -> Result<Option<Aircraft>> {
        let mut conn = self.get_connection()?;
        let icao = icao.to_string();
        Ok(aircraft::table
            .filter(aircraft::icao.eq(&icao))
            .select(Aircraft::as_select())
            .first(&mut conn)
            .optional()?)
    }

    pub async fn list_fleet(&self) -> Result<Vec<Aircraft>> {
        let mut conn = self.get_connection()?;
        Ok(aircraft::table.select(Aircraft::as_select()).load(&mut conn)?)
    }

    /// Refresh fuel figures only — the rest of an Aircraft row is immutable
    /// once created (spec.md §3).
    pub async fn refresh_fuel_figures(
        &self,
        icao: &str,
        fuel_type: Option<&str>,
        gal_per_hour: f64,
        capacity_gal: f64,
        range_nm: f64,
        endurance_hours: f64,
        passenger_load: i32,
        co2_per_gram: f64,
    ) -> Result<()> {
        let mut conn = self.get_connection()?;
        diesel::update(aircraft::table.filter(aircraft::icao.eq(icao)))
            .set((
                aircraft::fuel_type.eq(fuel_type),
                aircraft::fuel_gal_per_hour.eq(gal_per_hour),
                aircraft::fuel_capacity_gal.eq(capacity_gal),
                aircraft::range_nm.eq(range_nm),
                aircraft::endurance_hours.eq(endurance_hours),
                aircraft::passenger_load.eq(passenger_load),
                aircraft::co2_per_gram.eq(co2_per_gram),
            ))
            .execute(&mut conn)?;
        Ok(())
    }

    pub async fn upsert(&self, new_aircraft: &Aircraft) -> Result<()> {
        let mut conn = self.get_connection()?;
        diesel::insert_into(aircraft::table)
            .values(new_aircraft)
            .on_conflict(aircraft::icao)
            .do_nothing()
            .execute(&mut conn)?;
        Ok(())
    }
}
