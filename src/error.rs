//! Domain error taxonomy (see spec §7).
//!
//! Glue code (handlers, repositories, `main`) keeps using `anyhow`, the way
//! the teacher crate does throughout its `*_repo.rs` modules. The core
//! algorithms (locator, timeline, stitcher, assimilator, orchestrator,
//! worker coordinator) return `DomainError` so callers can match on the
//! specific condition instead of inspecting a string.

use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    /// A single flight's calculation must be downgraded (null statistic);
    /// the rest of the assimilation continues.
    #[error("flight point position integrity violated for aircraft {icao}: {reason}")]
    FlightPointPositionIntegrity { icao: String, reason: &'static str },

    #[error("geometry operation attempted without a CRS: {0}")]
    InvalidCrs(&'static str),

    #[error("no flight path: fewer than {required} positional points")]
    NoFlightPath { required: usize },

    /// Cross-day stitching hit missing or contradictory day data; the
    /// (aircraft, day) pair must be enqueued for a later revision pass.
    #[error("flight data revision required for aircraft {icao} on {day}")]
    FlightDataRevisionRequired {
        icao: String,
        day: chrono::NaiveDate,
    },

    #[error("aircraft {icao} has no fuel consumption figures")]
    NoFuelFiguresData { icao: String },

    #[error("no airports loaded")]
    NoAirportsLoaded,

    /// More than one distinct Flight is referenced by the point set under
    /// assimilation; fatal to this assimilation attempt.
    #[error("multiple potential flights found for assimilation: {0:?}")]
    MultiplePotentialFlights(Vec<Uuid>),

    #[error("aircraft present day ({icao}, {day}) is already flights_verified")]
    FlightsVerifiedError {
        icao: String,
        day: chrono::NaiveDate,
    },

    #[error("aircraft present day ({icao}, {day}) is not yet history_verified")]
    HistoryVerifiedError {
        icao: String,
        day: chrono::NaiveDate,
    },

    /// Not really an error: a normal control signal meaning the worker
    /// should be told to shut down. Kept in this enum because it is
    /// produced and matched at the same boundary as the other conditions.
    #[error("no assignable work left")]
    NoAssignableWorkLeft,

    #[error("radar worker authentication required")]
    RadarWorkerRequired,

    #[error("zero flights were created or updated during assimilation")]
    NoFlightsAssimilated,

    #[error("no partial flights available for assimilation on aircraft {icao}, day {day}")]
    NoPartialFlights {
        icao: String,
        day: chrono::NaiveDate,
    },

    #[error("malformed ingestion payload: {0}")]
    SchemaValidationFail(String),
}

pub type DomainResult<T> = Result<T, DomainError>;
