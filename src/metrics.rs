//! Metrics (SPEC_FULL.md §1): Prometheus recorder, installed the way the
//! teacher's `metrics.rs` does, instrumented at the seams the teacher
//! instruments analogous work (`flight_lifecycle.rs`'s
//! `metrics::histogram!` around per-event processing).

use std::net::SocketAddr;
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use axum::{Router, routing::get};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::info;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub fn init_metrics() -> PrometheusHandle {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            metrics_exporter_prometheus::Matcher::Full("aireyes_assimilation_duration_seconds".to_string()),
            &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0],
        )
        .expect("failed to set buckets for aireyes_assimilation_duration_seconds")
        .set_buckets_for_metric(
            metrics_exporter_prometheus::Matcher::Full("aireyes_geolocation_duration_seconds".to_string()),
            &[0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0],
        )
        .expect("failed to set buckets for aireyes_geolocation_duration_seconds")
        .install_recorder()
        .expect("failed to install Prometheus recorder")
}

/// Zeroes the counters this service emits so they appear in Prometheus
/// before the first event, the way the teacher's `initialize_run_metrics`
/// does for its own domain counters.
pub fn initialize_service_metrics() {
    metrics::counter!("aireyes_flight_points_ingested_total").absolute(0);
    metrics::counter!("aireyes_flights_assimilated_total").absolute(0);
    metrics::counter!("aireyes_assimilation_failures_total").absolute(0);
    metrics::counter!("aireyes_revision_required_total").absolute(0);
    metrics::counter!("aireyes_worker_stuck_total").absolute(0);
    metrics::gauge!("aireyes_workers_active").set(0.0);
}

pub async fn process_metrics_task() {
    let start_time = Instant::now();
    loop {
        metrics::gauge!("process.uptime.seconds").set(start_time.elapsed().as_secs() as f64);
        metrics::gauge!("process.is_up").set(1.0);
        tokio::time::sleep(Duration::from_secs(5)).await;
    }
}

pub async fn start_metrics_server(bind_addr: SocketAddr) {
    let handle = init_metrics();
    METRICS_HANDLE.set(handle).expect("metrics handle already initialized");
    initialize_service_metrics();
    tokio::spawn(process_metrics_task());

    let app = Router::new().route(
        "/metrics",
        get(|| async {
            let handle = METRICS_HANDLE.get().expect("metrics handle not initialized");
            handle.render()
        }),
    );

    info!("starting metrics server on http://{}/metrics", bind_addr);
    let listener = tokio::net::TcpListener::bind(bind_addr).await.expect("failed to bind metrics server");
    axum::serve(listener, app).await.expect("metrics server failed");
}
