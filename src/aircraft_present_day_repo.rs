use anyhow::Result;
use chrono::NaiveDate;
use diesel::prelude::*;

use crate::aircraft_present_day::AircraftPresentDay;
use crate::schema::aircraft_present_days;
use crate::{PgPool, PgPooledConnection};

#[derive(Clone)]
pub struct AircraftPresentDayRepository {
    pool: PgPool,
}

impl AircraftPresentDayRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn get_connection(&self) -> Result<PgPooledConnection> {
        self.pool
            .get()
            .map_err(|e| anyhow::anyhow!("failed to get database connection: {e}"))
    }

    pub async fn get(&self, icao: &str, date: NaiveDate) -> Result<Option<AircraftPresentDay>> {
        let mut conn = self.get_connection()?;
        Ok(aircraft_present_days::table
            .filter(aircraft_present_days::icao.eq(icao))
            .filter(aircraft_present_days::date.eq(date))
            .select(AircraftPresentDay::as_select())
            .first(&mut conn)
            .optional()?)
    }

    /// Creates the junction row lazily on first arrival of data for the
    /// pair (spec.md §3). Row-level lock is acquired by the caller
    /// (Submission Orchestrator, C7) via `SELECT ... FOR UPDATE` in
    /// [`Self::lock_for_update`] to serialize concurrent ingestions on the
    /// same mutation unit (spec.md §5).
    pub async fn ensure_exists(&self, icao: &str, date: NaiveDate) -> Result<AircraftPresentDay> {
        let mut conn = self.get_connection()?;
        let row = AircraftPresentDay {
            icao: icao.to_string(),
            date,
            history_verified: false,
            flights_verified: false,
            geolocation_verified: false,
        };
        diesel::insert_into(aircraft_present_days::table)
            .values(&row)
            .on_conflict((aircraft_present_days::icao, aircraft_present_days::date))
            .do_nothing()
            .execute(&mut conn)?;

        Ok(aircraft_present_days::table
            .filter(aircraft_present_days::icao.eq(icao))
            .filter(aircraft_present_days::date.eq(date))
            .select(AircraftPresentDay::as_select())
            .first(&mut conn)?)
    }

    /// Row-level lock on the (aircraft, day) mutation unit, held for the
    /// rest of the enclosing transaction (spec.md §5).
    pub fn lock_for_update(
        conn: &mut PgConnection,
        icao: &str,
        date: NaiveDate,
    ) -> diesel::QueryResult<AircraftPresentDay> {
        aircraft_present_days::table
            .filter(aircraft_present_days::icao.eq(icao))
            .filter(aircraft_present_days::date.eq(date))
            .select(AircraftPresentDay::as_select())
            .for_update()
            .first(conn)
    }

    pub async fn set_flags(
        &self,
        icao: &str,
        date: NaiveDate,
        history_verified: Option<bool>,
        flights_verified: Option<bool>,
        geolocation_verified: Option<bool>,
    ) -> Result<()> {
        let mut conn = self.get_connection()?;

        if let Some(v) = history_verified {
            diesel::update(
                aircraft_present_days::table
                    .filter(aircraft_present_days::icao.eq(icao))
                    .filter(aircraft_present_days::date.eq(date)),
            )
            .set(aircraft_present_days::history_verified.eq(v))
            .execute(&mut conn)?;
        }
        if let Some(v) = flights_verified {
            diesel::update(
                aircraft_present_days::table
                    .filter(aircraft_present_days::icao.eq(icao))
                    .filter(aircraft_present_days::date.eq(date)),
            )
            .set(aircraft_present_days::flights_verified.eq(v))
            .execute(&mut conn)?;
        }
        if let Some(v) = geolocation_verified {
            diesel::update(
                aircraft_present_days::table
                    .filter(aircraft_present_days::icao.eq(icao))
                    .filter(aircraft_present_days::date.eq(date)),
            )
            .set(aircraft_present_days::geolocation_verified.eq(v))
            .execute(&mut conn)?;
        }
        Ok(())
    }

    /// Any (aircraft, day) with `history_verified=false` and no
    /// WorkerLock — candidates for `assignTraceHistoryWork` (spec.md
    /// §4.7).
    pub async fn find_unlocked_unverified(&self) -> Result<Option<(String, NaiveDate)>> {
        use crate::schema::worker_locks;

        let mut conn = self.get_connection()?;
        let row: Option<(String, NaiveDate)> = aircraft_present_days::table
            .left_join(
                worker_locks::table.on(worker_locks::icao
                    .eq(aircraft_present_days::icao)
                    .and(worker_locks::date.eq(aircraft_present_days::date))),
            )
            .filter(aircraft_present_days::history_verified.eq(false))
            .filter(worker_locks::worker_name.is_null())
            .select((aircraft_present_days::icao, aircraft_present_days::date))
            .first(&mut conn)
            .optional()?;
        Ok(row)
    }
}
