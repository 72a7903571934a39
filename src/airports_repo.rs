use anyhow::Result;
use diesel::prelude::*;

use crate::airport::Airport;
use crate::schema::airports;
use crate::{PgPool, PgPooledConnection};

#[derive(Clone)]
pub struct AirportsRepository {
    pool: PgPool,
}

impl AirportsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn get_connection(&self) -> Result<PgPooledConnection> {
        self.pool
            .get()
            .map_err(|e| anyhow::anyhow!("failed to get database connection: {e}"))
    }

    pub async fn all(&self) -> Result<Vec<Airport>> {
        let mut conn = self.get_connection()?;
        Ok(airports::table.select(Airport::as_select()).load(&mut conn)?)
    }

    /// Airports whose zone-set includes `utm_epsg_zone` (spec.md §4.5).
    pub async fn by_utm_zone(&self, utm_epsg_zone: i32) -> Result<Vec<Airport>> {
        let mut conn = self.get_connection()?;
        Ok(airports::table
            .filter(airports::utm_epsg_zones.contains(vec![utm_epsg_zone]))
            .select(Airport::as_select())
            .load(&mut conn)?)
    }

    pub async fn upsert(&self, airport: &Airport) -> Result<()> {
        let mut conn = self.get_connection()?;
        diesel::insert_into(airports::table)
            .values(airport)
            .on_conflict(airports::airport_hash)
            .do_nothing()
            .execute(&mut conn)?;
        Ok(())
    }
}
