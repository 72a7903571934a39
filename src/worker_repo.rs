use anyhow::Result;
use chrono::NaiveDate;
use diesel::prelude::*;

use crate::schema::{worker_locks, workers};
use crate::worker::Worker;
use crate::worker_lock::WorkerLock;
use crate::{PgPool, PgPooledConnection};

#[derive(Clone)]
pub struct WorkersRepository {
    pool: PgPool,
}

impl WorkersRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn get_connection(&self) -> Result<PgPooledConnection> {
        self.pool
            .get()
            .map_err(|e| anyhow::anyhow!("failed to get database connection: {e}"))
    }

    pub async fn get(&self, name: &str) -> Result<Option<Worker>> {
        let mut conn = self.get_connection()?;
        Ok(workers::table
            .filter(workers::name.eq(name))
            .select(Worker::as_select())
            .first(&mut conn)
            .optional()?)
    }

    pub async fn all(&self) -> Result<Vec<Worker>> {
        let mut conn = self.get_connection()?;
        Ok(workers::table.select(Worker::as_select()).load(&mut conn)?)
    }

    pub async fn upsert(&self, worker: &Worker) -> Result<()> {
        let mut conn = self.get_connection()?;
        diesel::insert_into(workers::table)
            .values(worker)
            .on_conflict(workers::name)
            .do_update()
            .set(worker)
            .execute(&mut conn)?;
        Ok(())
    }

    /// A worker's existing WorkerLock, if it already has one (spec.md
    /// §4.7: when `multiple_assignments_allowed=false` the existing
    /// assignment is returned rather than creating a new one).
    pub async fn existing_lock(&self, worker_name: &str) -> Result<Option<WorkerLock>> {
        let mut conn = self.get_connection()?;
        Ok(worker_locks::table
            .filter(worker_locks::worker_name.eq(worker_name))
            .select(WorkerLock::as_select())
            .first(&mut conn)
            .optional()?)
    }

    /// Single write path for assignment (spec.md §5): the unique
    /// constraint on `(icao, date)` makes duplicate assignment
    /// impossible, surfaced here as a `Result` rather than a panic.
    pub async fn insert_lock(&self, lock: &WorkerLock) -> Result<bool> {
        let mut conn = self.get_connection()?;
        let inserted = diesel::insert_into(worker_locks::table)
            .values(lock)
            .on_conflict((worker_locks::icao, worker_locks::date))
            .do_nothing()
            .execute(&mut conn)?;
        Ok(inserted == 1)
    }

    pub async fn release_lock(&self, worker_name: &str, icao: &str, date: NaiveDate) -> Result<()> {
        let mut conn = self.get_connection()?;
        diesel::delete(
            worker_locks::table
                .filter(worker_locks::worker_name.eq(worker_name))
                .filter(worker_locks::icao.eq(icao))
                .filter(worker_locks::date.eq(date)),
        )
        .execute(&mut conn)?;
        Ok(())
    }

    pub async fn release_all_locks_for(&self, worker_name: &str) -> Result<()> {
        let mut conn = self.get_connection()?;
        diesel::delete(worker_locks::table.filter(worker_locks::worker_name.eq(worker_name))).execute(&mut conn)?;
        Ok(())
    }
}
