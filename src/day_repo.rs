use anyhow::Result;
use chrono::NaiveDate;
use diesel::prelude::*;

use crate::day::Day;
use crate::schema::days;
use crate::{PgPool, PgPooledConnection};

#[derive(Clone)]
pub struct DayRepository {
    pool: PgPool,
}

impl DayRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn get_connection(&self) -> Result<PgPooledConnection> {
        self.pool
            .get()
            .map_err(|e| anyhow::anyhow!("failed to get database connection: {e}"))
    }

    /// Ensures a Day row exists for `date` (spec.md §3: "Exists iff any
    /// FlightPoint references it").
    pub async fn ensure_exists(&self, date: NaiveDate) -> Result<()> {
        let mut conn = self.get_connection()?;
        diesel::insert_into(days::table)
            .values(Day { date })
            .on_conflict(days::date)
            .do_nothing()
            .execute(&mut conn)?;
        Ok(())
    }
}
