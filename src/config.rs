//! Runtime configuration.
//!
//! Deliberately out of scope for this spec is *how* configuration is
//! loaded from a file (see spec.md §1 Non-goals); this module only defines
//! the shape and the environment-variable overrides, the way the teacher's
//! `ingest_config.rs` reads tunables from the environment rather than a
//! config file format.

use std::env;
use std::time::Duration;

/// Thresholds driving the Timeline Builder's (C4) new-flight decision
/// table and the Cross-Day Stitcher (C5).
#[derive(Debug, Clone, Copy)]
pub struct FlightThresholds {
    /// `TD_NEW_GROUNDED`: seconds between two grounded points beyond which
    /// the gap is considered a new flight.
    pub new_flight_grounded_secs: i64,
    /// `TD_NEW_MIDAIR_START`
    pub new_flight_midair_start_secs: i64,
    /// `TD_NEW_MIDAIR_END`
    pub new_flight_midair_end_secs: i64,
    /// `TD_NEW_MIDAIR_BOTH`: catch-all threshold used by the inaccuracy
    /// resolver when both endpoints are airborne.
    pub new_flight_midair_both_secs: i64,
    /// `TD_INACCURACY_CHECK`: minimum gap, with both endpoints airborne,
    /// that defers to the inaccuracy resolver at all.
    pub inaccuracy_check_secs: i64,
    /// `MAX_ALT_MIDAIR_DISAPPEAR`, in feet.
    pub max_altitude_midair_disappear_ft: i32,
    /// `MIN_FRAGMENTS_FOR_PARTIAL`
    pub min_fragments_for_partial: usize,
    /// `MIN_POSITIONAL_PATH_POINTS`
    pub min_positional_path_points: usize,
    /// Whether the inaccuracy resolver's catch-all rule is active at all.
    pub inaccuracy_solvency_enabled: bool,
}

impl Default for FlightThresholds {
    fn default() -> Self {
        Self {
            new_flight_grounded_secs: 900,
            new_flight_midair_start_secs: 300,
            new_flight_midair_end_secs: 300,
            new_flight_midair_both_secs: 1800,
            inaccuracy_check_secs: 120,
            max_altitude_midair_disappear_ft: 1000,
            min_fragments_for_partial: 2,
            min_positional_path_points: 2,
            inaccuracy_solvency_enabled: true,
        }
    }
}

/// Worker coordination (C8) timing.
#[derive(Debug, Clone, Copy)]
pub struct WorkerThresholds {
    pub stuck_timeout: Duration,
    /// Maximum number of days `collectBackwardUntilTakeoff`/
    /// `collectForwardUntilLanding` will walk before giving up.
    pub max_stitch_days: usize,
}

impl Default for WorkerThresholds {
    fn default() -> Self {
        Self {
            stuck_timeout: Duration::from_secs(300),
            max_stitch_days: 100,
        }
    }
}

/// Emissions/fuel constants, grounded in `calculations.py`.
#[derive(Debug, Clone, Copy)]
pub struct EmissionsConstants {
    pub knots_to_kmh: f64,
    pub gallons_to_tonnes: f64,
}

impl Default for EmissionsConstants {
    fn default() -> Self {
        Self {
            knots_to_kmh: 1.852,
            gallons_to_tonnes: 0.031_491_395_793_499,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub metrics_bind_addr: String,
    /// The projected CRS all geometry is stored in internally (EPSG code).
    /// Wire coordinates arrive as EPSG:4326 and are transformed on ingest.
    pub projected_epsg: i32,
    /// Prohibited-hours window is evaluated in this IANA timezone.
    /// Source TODO 0x06: hard-coded `Australia/Sydney` upstream; here it is
    /// parameterized per-deployment (see DESIGN.md Open Questions).
    pub local_timezone: String,
    pub flight: FlightThresholds,
    pub worker: WorkerThresholds,
    pub emissions: EmissionsConstants,
    /// Radius, in meters, an Airport's point is buffered by to form its
    /// projected polygon.
    pub airport_buffer_meters: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            bind_addr: "127.0.0.1:8080".to_string(),
            metrics_bind_addr: "127.0.0.1:9090".to_string(),
            projected_epsg: 3112,
            local_timezone: "Australia/Sydney".to_string(),
            flight: FlightThresholds::default(),
            worker: WorkerThresholds::default(),
            emissions: EmissionsConstants::default(),
            airport_buffer_meters: 2000.0,
        }
    }
}

impl Config {
    /// Loads configuration from environment variables, falling back to
    /// [`Config::default`] for anything unset. Mirrors the teacher's
    /// `env::var(...).unwrap_or_else(...)` idiom rather than a config-file
    /// parser (out of scope per spec.md §1).
    pub fn from_env() -> anyhow::Result<Self> {
        let mut config = Config::default();

        if let Ok(url) = env::var("DATABASE_URL") {
            config.database_url = url;
        }
        if let Ok(addr) = env::var("BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Ok(addr) = env::var("METRICS_BIND_ADDR") {
            config.metrics_bind_addr = addr;
        }
        if let Ok(epsg) = env::var("PROJECTED_EPSG") {
            config.projected_epsg = epsg.parse()?;
        }
        if let Ok(tz) = env::var("LOCAL_TIMEZONE") {
            config.local_timezone = tz;
        }

        Ok(config)
    }
}
