use anyhow::Result;
use diesel::prelude::*;

use crate::schema::{suburb_neighbours, suburbs};
use crate::suburb::{Suburb, SuburbNeighbour};
use crate::{PgPool, PgPooledConnection};

#[derive(Clone)]
pub struct SuburbsRepository {
    pool: PgPool,
}

impl SuburbsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn get_connection(&self) -> Result<PgPooledConnection> {
        self.pool
            .get()
            .map_err(|e| anyhow::anyhow!("failed to get database connection: {e}"))
    }

    pub async fn all(&self) -> Result<Vec<Suburb>> {
        let mut conn = self.get_connection()?;
        Ok(suburbs::table.select(Suburb::as_select()).load(&mut conn)?)
    }

    pub async fn get(&self, suburb_hash: &str) -> Result<Option<Suburb>> {
        let mut conn = self.get_connection()?;
        Ok(suburbs::table
            .filter(suburbs::suburb_hash.eq(suburb_hash))
            .select(Suburb::as_select())
            .first(&mut conn)
            .optional()?)
    }

    /// Suburbs of `state_code` whose zone-set includes `utm_epsg_zone`
    /// (spec.md §4.2, "Same-state UTM filter").
    pub async fn by_state_and_utm_zone(&self, state_code: &str, utm_epsg_zone: i32) -> Result<Vec<Suburb>> {
        let mut conn = self.get_connection()?;
        Ok(suburbs::table
            .filter(suburbs::state_code.eq(state_code))
            .filter(suburbs::utm_epsg_zones.contains(vec![utm_epsg_zone]))
            .select(Suburb::as_select())
            .load(&mut conn)?)
    }

    /// All suburbs whose zone-set includes `utm_epsg_zone`, across every
    /// state (spec.md §4.2, "Global UTM filter").
    pub async fn by_utm_zone(&self, utm_epsg_zone: i32) -> Result<Vec<Suburb>> {
        let mut conn = self.get_connection()?;
        Ok(suburbs::table
            .filter(suburbs::utm_epsg_zones.contains(vec![utm_epsg_zone]))
            .select(Suburb::as_select())
            .load(&mut conn)?)
    }

    /// Suburbs whose bounding box overlaps the given view box (spec.md §6,
    /// `GET /api/suburbs?bbox=...`).
    pub async fn within_bbox(&self, min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Result<Vec<Suburb>> {
        let mut conn = self.get_connection()?;
        Ok(suburbs::table
            .filter(suburbs::min_x.le(max_x))
            .filter(suburbs::max_x.ge(min_x))
            .filter(suburbs::min_y.le(max_y))
            .filter(suburbs::max_y.ge(min_y))
            .select(Suburb::as_select())
            .load(&mut conn)?)
    }

    pub async fn neighbours_of(&self, suburb_hash: &str) -> Result<Vec<String>> {
        let mut conn = self.get_connection()?;
        Ok(suburb_neighbours::table
            .filter(suburb_neighbours::suburb_hash.eq(suburb_hash))
            .select(suburb_neighbours::neighbour_hash)
            .load(&mut conn)?)
    }

    /// The full neighbour relation, for building a [`crate::locator::SuburbCatalog`]
    /// at startup.
    pub async fn all_neighbour_pairs(&self) -> Result<Vec<(String, String)>> {
        let mut conn = self.get_connection()?;
        Ok(suburb_neighbours::table
            .select((suburb_neighbours::suburb_hash, suburb_neighbours::neighbour_hash))
            .load(&mut conn)?)
    }

    pub async fn upsert(&self, suburb: &Suburb) -> Result<()> {
        let mut conn = self.get_connection()?;
        diesel::insert_into(suburbs::table)
            .values(suburb)
            .on_conflict(suburbs::suburb_hash)
            .do_nothing()
            .execute(&mut conn)?;
        Ok(())
    }

    /// Replaces the materialised neighbour relation for the whole suburb
    /// set with `pairs` (spec.md §9 "Cyclic graphs": symmetric insertion
    /// into an explicit many-to-many table).
    pub async fn replace_neighbours(&self, pairs: &[(String, String)]) -> Result<()> {
        let mut conn = self.get_connection()?;
        conn.transaction(|conn| {
            diesel::delete(suburb_neighbours::table).execute(conn)?;
            let rows: Vec<SuburbNeighbour> = pairs
                .iter()
                .map(|(a, b)| SuburbNeighbour {
                    suburb_hash: a.clone(),
                    neighbour_hash: b.clone(),
                })
                .collect();
            if !rows.is_empty() {
                diesel::insert_into(suburb_neighbours::table).values(&rows).execute(conn)?;
            }
            diesel::QueryResult::Ok(())
        })?;
        Ok(())
    }
}
