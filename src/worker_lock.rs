use chrono::NaiveDate;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::worker_locks;

/// Exclusive assignment of one AircraftPresentDay to one history worker
/// (spec.md §3). A unique constraint on `(icao, date)` makes duplicate
/// assignment impossible (spec.md §5).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Queryable, Selectable, Insertable)]
#[diesel(table_name = worker_locks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct WorkerLock {
    pub worker_name: String,
    pub icao: String,
    pub date: NaiveDate,
}
