//! CLI entry point (SPEC_FULL.md §1): `serve` runs the HTTP API, `sweep`
//! runs one worker-coordinator maintenance pass, `load-*` bootstrap the
//! reference datasets from filesystem inputs (spec.md §6 "Filesystem
//! inputs" — configuration-file loading and KML parsing are themselves out
//! of scope per spec.md §1, so `load-suburbs` takes the already-parsed
//! Suburb shape rather than raw KML).

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::Deserialize;
use tracing::{info, warn};

use aireyes::aircraft_repo::AircraftRepository;
use aireyes::airport::{Airport, airport_hash, parse_bootstrap_coordinate};
use aireyes::airports_repo::AirportsRepository;
use aireyes::config::Config;
use aireyes::geometry;
use aireyes::geometry::rtree::neighbour_pairs;
use aireyes::suburb::{Suburb, suburb_hash};
use aireyes::suburbs_repo::SuburbsRepository;
use aireyes::{build_pool, logging, run_migrations, web};

#[derive(Parser)]
#[command(name = "aireyes", about = "ADS-B/MLAT flight-tracking master service")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Runs the HTTP API (worker ingestion + client queries).
    Serve,
    /// Runs one worker-coordinator maintenance pass: reconciles live
    /// processes against recorded PIDs and resets any stuck worker.
    Sweep,
    /// Loads (or replaces) the Suburb set and rebuilds its neighbour
    /// relation from a JSON file of already-parsed suburb records.
    LoadSuburbs {
        #[arg(long)]
        path: PathBuf,
    },
    /// Loads the Airport set from a bootstrap JSON coordinate list.
    LoadAirports {
        #[arg(long)]
        path: PathBuf,
    },
    /// Refreshes Aircraft fuel figures from a JSON file.
    LoadFuelFigures {
        #[arg(long)]
        path: PathBuf,
    },
}

#[derive(Debug, Deserialize)]
struct SuburbRecord {
    name: String,
    postcode: Option<String>,
    state_code: String,
    /// GeoJSON `Polygon` or `MultiPolygon` geometry object.
    geometry: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct AirportRecord {
    name: String,
    latitude: String,
    longitude: String,
}

#[derive(Debug, Deserialize)]
struct FuelFiguresRecord {
    icao: String,
    fuel_type: Option<String>,
    gal_per_hour: f64,
    capacity_gal: f64,
    range_nm: f64,
    endurance_hours: f64,
    passenger_load: i32,
    co2_per_gram: f64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    logging::init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    run_migrations(&build_pool(&config.database_url)?)?;

    match cli.command {
        Command::Serve => web::serve(config).await?,
        Command::Sweep => run_sweep(config).await?,
        Command::LoadSuburbs { path } => load_suburbs(config, &path).await?,
        Command::LoadAirports { path } => load_airports(config, &path).await?,
        Command::LoadFuelFigures { path } => load_fuel_figures(config, &path).await?,
    }

    Ok(())
}

async fn run_sweep(config: Config) -> anyhow::Result<()> {
    let state = web::AppState::new(build_pool(&config.database_url)?, config);
    let reset = state.worker_coordinator.sweep_stuck_workers().await?;
    let reconciled = state.worker_coordinator.reconcile_processes().await?;
    info!(reset = reset.len(), reconciled = reconciled.len(), "sweep complete");
    Ok(())
}

async fn load_suburbs(config: Config, path: &PathBuf) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(path)?;
    let records: Vec<SuburbRecord> = serde_json::from_str(&raw)?;

    let pool = build_pool(&config.database_url)?;
    let repo = SuburbsRepository::new(pool);

    let mut suburbs = Vec::with_capacity(records.len());
    for record in records {
        let Some(polygon) = geometry::multi_polygon_from_geojson(&record.geometry) else {
            warn!(name = record.name, "skipping suburb with unparseable geometry");
            continue;
        };
        let bbox = geo::BoundingRect::bounding_rect(&polygon)
            .ok_or_else(|| anyhow::anyhow!("suburb {} has a degenerate polygon", record.name))?;
        let coords_key = format!("{:.4},{:.4}", bbox.min().x, bbox.min().y);
        let hash = suburb_hash(
            &record.name,
            record.postcode.as_deref().unwrap_or(""),
            &record.state_code,
            &coords_key,
        );
        let utm_epsg_zones = vec![
            geometry::utm_zone(bbox.min().x, bbox.min().y),
            geometry::utm_zone(bbox.max().x, bbox.max().y),
        ]
        .into_iter()
        .collect::<std::collections::BTreeSet<_>>()
        .into_iter()
        .collect();

        suburbs.push(Suburb {
            suburb_hash: hash,
            name: record.name,
            postcode: record.postcode,
            state_code: record.state_code,
            min_x: bbox.min().x,
            min_y: bbox.min().y,
            max_x: bbox.max().x,
            max_y: bbox.max().y,
            utm_epsg_zones,
            geometry: record.geometry,
        });
    }

    for suburb in &suburbs {
        repo.upsert(suburb).await?;
    }
    let pairs = neighbour_pairs(&suburbs);
    repo.replace_neighbours(&pairs).await?;

    info!(suburbs = suburbs.len(), neighbour_pairs = pairs.len(), "suburb set loaded");
    Ok(())
}

async fn load_airports(config: Config, path: &PathBuf) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(path)?;
    let records: Vec<AirportRecord> = serde_json::from_str(&raw)?;

    let pool = build_pool(&config.database_url)?;
    let repo = AirportsRepository::new(pool);

    let mut loaded = 0usize;
    for record in records {
        let latitude = parse_bootstrap_coordinate(&record.latitude)?;
        let longitude = parse_bootstrap_coordinate(&record.longitude)?;
        let polygon = geometry::buffer_point(geo::Point::new(longitude, latitude), config.airport_buffer_meters);
        let utm_epsg_zones = vec![geometry::utm_zone(longitude, latitude)];

        let airport = Airport {
            airport_hash: airport_hash(&record.name, latitude, longitude),
            name: record.name,
            latitude,
            longitude,
            buffer_meters: config.airport_buffer_meters,
            utm_epsg_zones,
            geometry: geometry::polygon_to_geojson(&polygon),
        };
        repo.upsert(&airport).await?;
        loaded += 1;
    }

    info!(loaded, "airport set loaded");
    Ok(())
}

async fn load_fuel_figures(config: Config, path: &PathBuf) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(path)?;
    let records: Vec<FuelFiguresRecord> = serde_json::from_str(&raw)?;

    let pool = build_pool(&config.database_url)?;
    let repo = AircraftRepository::new(pool);

    let mut refreshed = 0usize;
    for record in records {
        repo.refresh_fuel_figures(
            &record.icao,
            record.fuel_type.as_deref(),
            record.gal_per_hour,
            record.capacity_gal,
            record.range_nm,
            record.endurance_hours,
            record.passenger_load,
            record.co2_per_gram,
        )
        .await?;
        refreshed += 1;
    }

    info!(refreshed, "fuel figures refreshed");
    Ok(())
}
