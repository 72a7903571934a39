pub mod actions;
pub mod aircraft;
pub mod aircraft_present_day;
pub mod aircraft_present_day_repo;
pub mod aircraft_repo;
pub mod airport;
pub mod airports_repo;
pub mod assimilator;
pub mod config;
pub mod day;
pub mod day_repo;
pub mod error;
pub mod flight;
pub mod flight_point;
pub mod flight_points_repo;
pub mod flights_repo;
pub mod geometry;
pub mod locator;
pub mod logging;
pub mod metrics;
pub mod orchestrator;
pub mod schema;
pub mod stitcher;
pub mod suburb;
pub mod suburbs_repo;
pub mod timeline;
pub mod web;
pub mod worker;
pub mod worker_coordinator;
pub mod worker_lock;
pub mod worker_repo;

use diesel::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};

/// Shared connection pool type alias, the way the teacher defines it in
/// `web.rs`/`*_repo.rs` (duplicated across files there; centralised here
/// since every repository in this crate needs it).
pub type PgPool = Pool<ConnectionManager<PgConnection>>;
pub type PgPooledConnection = PooledConnection<ConnectionManager<PgConnection>>;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

pub fn build_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    Pool::builder()
        .build(manager)
        .map_err(|e| anyhow::anyhow!("failed to build database pool: {e}"))
}

pub fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    let mut conn = pool.get()?;
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|e| anyhow::anyhow!("failed to run pending migrations: {e}"))?;
    Ok(())
}
