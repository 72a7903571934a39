//! HTTP wiring (SPEC_FULL.md §1): an `AppState`/`Router` pair in the
//! teacher's `web.rs` shape — a `Clone` state struct carrying the pool and
//! shared services, routes grouped by resource and nested under a prefix.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::actions;
use crate::aircraft_present_day_repo::AircraftPresentDayRepository;
use crate::config::Config;
use crate::day_repo::DayRepository;
use crate::flight_points_repo::FlightPointsRepository;
use crate::flights_repo::FlightsRepository;
use crate::locator::SuburbCatalog;
use crate::metrics;
use crate::orchestrator::Orchestrator;
use crate::suburbs_repo::SuburbsRepository;
use crate::worker_coordinator::WorkerCoordinator;
use crate::worker_repo::WorkersRepository;
use crate::{PgPool, build_pool};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub orchestrator: Arc<Orchestrator>,
    pub worker_coordinator: Arc<WorkerCoordinator>,
    pub suburb_catalog: Arc<RwLock<Option<SuburbCatalog>>>,
}

impl AppState {
    pub fn new(pool: PgPool, config: Config) -> Self {
        let orchestrator = Orchestrator {
            day_repo: DayRepository::new(pool.clone()),
            present_day_repo: AircraftPresentDayRepository::new(pool.clone()),
            flight_points_repo: FlightPointsRepository::new(pool.clone()),
            flights_repo: FlightsRepository::new(pool.clone()),
            config: config.clone(),
        };
        let worker_coordinator = WorkerCoordinator::new(
            WorkersRepository::new(pool.clone()),
            AircraftPresentDayRepository::new(pool.clone()),
            config.worker,
            "aireyes-worker".to_string(),
        );
        Self {
            pool,
            config,
            orchestrator: Arc::new(orchestrator),
            worker_coordinator: Arc::new(worker_coordinator),
            suburb_catalog: Arc::new(RwLock::new(None)),
        }
    }

    /// (Re)builds the in-memory suburb catalog from the store (spec.md
    /// §4.2). Called once at startup and whenever `load-kml` admin command
    /// reloads the suburb set.
    pub async fn refresh_suburb_catalog(&self) -> anyhow::Result<()> {
        let repo = SuburbsRepository::new(self.pool.clone());
        let suburbs = repo.all().await?;
        let pairs = repo.all_neighbour_pairs().await?;
        let catalog = SuburbCatalog::new(suburbs, pairs);
        *self.suburb_catalog.write().await = Some(catalog);
        Ok(())
    }
}

/// Builds the Axum router: `/api/worker/*` (worker HTTP API, spec.md §6)
/// and `/api/*` (the client query surface, C9).
pub fn app(state: AppState) -> Router {
    let worker_routes = Router::new()
        .route("/authenticate", post(actions::authenticate_worker))
        .route("/master", get(actions::master_liveness))
        .route("/targets", get(actions::worker_targets))
        .route("/aircraft", post(actions::ingest_aircraft))
        .route("/aircraft/{icao}/timeout", post(actions::report_timeout))
        .route("/trace", post(actions::submit_trace))
        .route("/update/{signal}", post(actions::worker_signal))
        .route("/error", post(actions::worker_error));

    let query_routes = Router::new()
        .route("/suburbs", get(actions::suburbs_geojson))
        .route("/flights", get(actions::query_flights))
        .route("/flights/{flight_hash}", get(actions::get_flight));

    Router::new()
        .nest("/api/worker", worker_routes)
        .nest("/api", query_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

pub async fn serve(config: Config) -> anyhow::Result<()> {
    let pool = build_pool(&config.database_url)?;
    let state = AppState::new(pool, config.clone());
    state.refresh_suburb_catalog().await.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "starting with no suburb catalog loaded");
    });

    let metrics_addr: SocketAddr = config.metrics_bind_addr.parse()?;
    tokio::spawn(metrics::start_metrics_server(metrics_addr));

    let app = app(state);
    let addr: SocketAddr = config.bind_addr.parse()?;
    info!("listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
    Ok(())
}
