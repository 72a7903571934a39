//! Flight Assimilator (C6, spec.md §4.5): creates or updates a Flight
//! entity from a cluster of PartialFlights believed to form one flight.

use chrono::Timelike;
use geo::{Contains, Euclidean, Length};
use std::collections::HashSet;
use uuid::Uuid;

use crate::aircraft::Aircraft;
use crate::airport::Airport;
use crate::config::{Config, EmissionsConstants};
use crate::error::DomainError;
use crate::flight::Flight;
use crate::flight_point::FlightPoint;
use crate::geometry;
use crate::timeline::PartialFlight;

/// `(Flight, wasCreated)` plus bookkeeping for the caller (spec.md §4.5):
/// the full set of point hashes now belonging to this flight (for
/// re-pointing via `FlightPointsRepository::assign_flight`), and any
/// non-fatal warnings raised while computing a statistic.
pub struct AssimilationOutcome {
    pub flight: Flight,
    pub was_created: bool,
    pub point_hashes: Vec<String>,
    pub warnings: Vec<DomainError>,
}

/// Runs the full assimilation procedure over `partials`, which must already
/// be in chronological order and non-empty (the orchestrator is responsible
/// for raising `NoPartialFlights` before calling this).
pub fn assimilate(
    icao: &str,
    partials: &[PartialFlight],
    aircraft: Option<&Aircraft>,
    airports: &[Airport],
    config: &Config,
) -> Result<AssimilationOutcome, DomainError> {
    // 1. Flatten and sort.
    let mut points: Vec<FlightPoint> = partials.iter().flat_map(|p| p.points.iter().cloned()).collect();
    points.sort_by_key(|p| p.timestamp);
    let first = points.first().expect("non-empty partial set").clone();
    let last = points.last().expect("non-empty partial set").clone();

    // 2. Determine dominance.
    let distinct_flights: HashSet<Uuid> = points.iter().filter_map(|p| p.flight_hash).collect();
    if distinct_flights.len() > 1 {
        return Err(DomainError::MultiplePotentialFlights(distinct_flights.into_iter().collect()));
    }
    let dominant = distinct_flights.into_iter().next();
    let (flight_hash, was_created) = match dominant {
        Some(hash) => (hash, false),
        None => (Uuid::new_v4(), true),
    };

    let mut warnings = Vec::new();

    // 4. Compute statistics.
    let distance_meters = compute_distance(&points, config.flight.min_positional_path_points);
    let total_minutes = ((last.timestamp - first.timestamp).num_seconds() as f64 / 60.0).round() as i32;
    let prohibited_minutes = compute_prohibited_minutes(&points, &config.local_timezone);
    let avg_speed_knots = average_ground_speed(&points);
    let avg_altitude_ft = average_altitude(&points);
    let fuel_figures = aircraft.and_then(|a| a.fuel_figures());
    let fuel_gallons = fuel_figures.map(|f| (total_minutes as f64 / 60.0) * f.gal_per_hour);
    let total_co2_kg = compute_co2(distance_meters, avg_speed_knots, total_minutes, fuel_figures, &config.emissions);

    let starts_with_takeoff = partials
        .first()
        .map(|p| p.starts_with_takeoff(&config.flight))
        .unwrap_or(false);
    let is_airborne_anywhere = points.iter().any(|p| p.is_airborne());
    let ends_with_landing = is_airborne_anywhere
        && partials
            .last()
            .map(|p| p.ends_with_landing(&config.flight))
            .unwrap_or(false);

    // 5. Airport determination.
    let takeoff_airport_hash = if starts_with_takeoff {
        match determine_airport(first_positional(&points), airports, icao) {
            Ok(hash) => hash,
            Err(e) => {
                warnings.push(e);
                None
            }
        }
    } else {
        None
    };
    let landing_airport_hash = if ends_with_landing {
        match determine_airport(last_positional(&points), airports, icao) {
            Ok(hash) => hash,
            Err(e) => {
                warnings.push(e);
                None
            }
        }
    } else {
        None
    };

    // 6. Copy statistics to the Flight record.
    let flight = Flight {
        flight_hash,
        aircraft_icao: icao.to_string(),
        takeoff_airport_hash: takeoff_airport_hash.clone(),
        landing_airport_hash: landing_airport_hash.clone(),
        distance_meters,
        fuel_gallons,
        avg_speed_knots,
        avg_altitude_ft,
        total_minutes: Some(total_minutes),
        prohibited_minutes: Some(prohibited_minutes),
        total_co2_kg,
        has_departure_details: takeoff_airport_hash.is_some(),
        has_arrival_details: landing_airport_hash.is_some(),
        taxi_only: !is_airborne_anywhere,
        is_on_ground: last.is_on_ground,
        first_point_ts: first.timestamp,
        last_point_ts: last.timestamp,
    };

    Ok(AssimilationOutcome {
        flight,
        was_created,
        point_hashes: points.into_iter().map(|p| p.flight_point_hash).collect(),
        warnings,
    })
}

fn first_positional(points: &[FlightPoint]) -> Option<&FlightPoint> {
    points.iter().find(|p| p.projected_position().is_some())
}

fn last_positional(points: &[FlightPoint]) -> Option<&FlightPoint> {
    points.iter().rev().find(|p| p.projected_position().is_some())
}

/// Distance as the length of the LineString over positional points, in
/// meters. `None` if fewer than `min_points` positional points exist
/// (spec.md §4.5).
fn compute_distance(points: &[FlightPoint], min_points: usize) -> Option<f64> {
    let positional: Vec<geo::Point<f64>> = points.iter().filter_map(|p| p.projected_position()).collect();
    if positional.len() < min_points {
        return None;
    }
    let line = geo::LineString::from(positional);
    Some(Euclidean.length(&line))
}

fn average_ground_speed(points: &[FlightPoint]) -> Option<f64> {
    let values: Vec<f64> = points
        .iter()
        .filter(|p| p.is_airborne())
        .filter_map(|p| p.ground_speed_knots)
        .collect();
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

fn average_altitude(points: &[FlightPoint]) -> Option<f64> {
    let values: Vec<f64> = points
        .iter()
        .filter_map(|p| {
            let alt = p.altitude_ft?;
            if p.is_on_ground && alt <= 0 { None } else { Some(alt as f64) }
        })
        .collect();
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Total minutes of flight whose local time-of-day lies in [20:00, 07:00),
/// in the configured timezone (spec.md §4.5). Falls back to UTC if the
/// configured timezone string doesn't parse.
fn compute_prohibited_minutes(points: &[FlightPoint], local_timezone: &str) -> i32 {
    let tz: chrono_tz::Tz = local_timezone.parse().unwrap_or(chrono_tz::UTC);
    let mut secs = 0i64;
    for window in points.windows(2) {
        let gap = (window[1].timestamp - window[0].timestamp).num_seconds();
        let local_hour = window[0].timestamp.with_timezone(&tz).hour();
        if !(7..20).contains(&local_hour) {
            secs += gap;
        }
    }
    (secs as f64 / 60.0).round() as i32
}

/// CO2 (kg) chain from spec.md §4.5. `None` (a downgraded statistic, not an
/// error) when distance, speed, or fuel data is missing, or when pax/km are
/// zero.
fn compute_co2(
    distance_meters: Option<f64>,
    avg_speed_knots: Option<f64>,
    total_minutes: i32,
    fuel: Option<crate::aircraft::FuelFigures>,
    emissions: &EmissionsConstants,
) -> Option<f64> {
    let distance_meters = distance_meters?;
    let avg_speed_knots = avg_speed_knots?;
    let fuel = fuel?;
    let pax = fuel.passenger_load as f64;
    let km = distance_meters / 1000.0;
    if pax <= 0.0 || km <= 0.0 {
        return None;
    }
    let hours = total_minutes as f64 / 60.0;
    let fuel_gallons = hours * fuel.gal_per_hour;
    let fuel_tonnes = fuel_gallons * emissions.gallons_to_tonnes;
    let fuel_per_pax_per_km = (fuel_tonnes * 1_000_000.0) / (km * pax);
    let co2_per_pax_per_km = fuel_per_pax_per_km * fuel.co2_per_gram;
    let kmh = avg_speed_knots * emissions.knots_to_kmh;
    let co2_per_pax_per_hour = ((co2_per_pax_per_km * kmh) / 1000.0).round();
    Some(hours * co2_per_pax_per_hour * pax)
}

/// Computes the point's UTM zone, filters Airports whose zone-set includes
/// it, restricts to those whose polygon contains the point, and picks the
/// one whose centroid is nearest (spec.md §4.5). Raises
/// `FlightPointPositionIntegrity` (downgrades to `None`, not fatal) when no
/// positional endpoint is available.
fn determine_airport(point: Option<&FlightPoint>, airports: &[Airport], icao: &str) -> Result<Option<String>, DomainError> {
    let point = point.ok_or_else(|| DomainError::FlightPointPositionIntegrity {
        icao: icao.to_string(),
        reason: "no positional point available at the flight endpoint",
    })?;
    let projected = point.projected_position().ok_or_else(|| DomainError::FlightPointPositionIntegrity {
        icao: icao.to_string(),
        reason: "endpoint has no projected position",
    })?;
    let zone = match point.utm_epsg_zone {
        Some(z) => z,
        None => {
            let (lon, lat) = point.position().ok_or_else(|| DomainError::FlightPointPositionIntegrity {
                icao: icao.to_string(),
                reason: "endpoint has no geographic position to derive a UTM zone from",
            })?;
            geometry::utm_zone(lon, lat)
        }
    };

    let mut best: Option<(&Airport, f64)> = None;
    for airport in airports.iter().filter(|a| a.utm_epsg_zones.contains(&zone)) {
        let polygon = airport.polygon();
        if !polygon.contains(&projected) {
            continue;
        }
        let Some(centroid) = airport.centroid() else { continue };
        let distance = (centroid.x() - projected.x()).hypot(centroid.y() - projected.y());
        if best.as_ref().map(|(_, d)| distance < *d).unwrap_or(true) {
            best = Some((airport, distance));
        }
    }
    Ok(best.map(|(a, _)| a.airport_hash.clone()))
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, NaiveDate};

    use super::*;

    fn point(ts: i64, on_ground: bool, altitude_ft: Option<i32>, projected: Option<(f64, f64)>, gs: Option<f64>) -> FlightPoint {
        FlightPoint {
            flight_point_hash: format!("p{ts}"),
            aircraft_icao: "7c68b7".to_string(),
            day_date: NaiveDate::from_ymd_opt(2022, 7, 29).unwrap(),
            flight_hash: None,
            timestamp: DateTime::from_timestamp(ts, 0).unwrap(),
            longitude: projected.map(|(x, _)| x),
            latitude: projected.map(|(_, y)| y),
            projected_x: projected.map(|(x, _)| x),
            projected_y: projected.map(|(_, y)| y),
            crs_epsg: projected.map(|_| 3112),
            utm_epsg_zone: projected.map(|_| 32756),
            altitude_ft,
            ground_speed_knots: gs,
            track_deg: None,
            vertical_rate_ft_per_min: None,
            data_source: None,
            is_on_ground: on_ground,
            is_ascending: false,
            is_descending: false,
            suburb_hash: None,
        }
    }

    fn partial(points: Vec<FlightPoint>) -> PartialFlight {
        PartialFlight {
            points,
            started_with_takeoff_override: false,
            ended_with_landing_override: false,
        }
    }

    #[test]
    fn taxi_only_when_never_airborne() {
        let points = vec![point(0, true, Some(0), Some((0.0, 0.0)), None), point(60, true, Some(0), Some((1.0, 1.0)), None)];
        let config = Config::default();
        let outcome = assimilate("7c68b7", &[partial(points)], None, &[], &config).unwrap();
        assert!(outcome.flight.taxi_only);
        assert!(outcome.was_created);
    }

    #[test]
    fn multiple_potential_flights_is_fatal() {
        let mut p1 = point(0, true, Some(0), Some((0.0, 0.0)), None);
        p1.flight_hash = Some(Uuid::new_v4());
        let mut p2 = point(60, true, Some(0), Some((1.0, 1.0)), None);
        p2.flight_hash = Some(Uuid::new_v4());
        let config = Config::default();
        let result = assimilate("7c68b7", &[partial(vec![p1, p2])], None, &[], &config);
        assert!(matches!(result, Err(DomainError::MultiplePotentialFlights(_))));
    }

    #[test]
    fn distance_requires_minimum_positional_points() {
        let mut config = Config::default();
        config.flight.min_positional_path_points = 3;
        let points = vec![point(0, true, Some(0), Some((0.0, 0.0)), None), point(60, true, Some(0), Some((1.0, 0.0)), None)];
        let outcome = assimilate("7c68b7", &[partial(points)], None, &[], &config).unwrap();
        assert!(outcome.flight.distance_meters.is_none());
    }

    #[test]
    fn average_speed_only_counts_airborne_points() {
        let points = vec![
            point(0, true, Some(0), Some((0.0, 0.0)), Some(5.0)),
            point(60, false, Some(3000), Some((1.0, 0.0)), Some(120.0)),
            point(120, false, Some(3000), Some((2.0, 0.0)), Some(140.0)),
        ];
        let config = Config::default();
        let outcome = assimilate("7c68b7", &[partial(points)], None, &[], &config).unwrap();
        assert_eq!(outcome.flight.avg_speed_knots, Some(130.0));
    }

    #[test]
    fn dominant_flight_is_reused_not_recreated() {
        let existing = Uuid::new_v4();
        let mut p1 = point(0, true, Some(0), Some((0.0, 0.0)), None);
        p1.flight_hash = Some(existing);
        let p2 = point(60, true, Some(0), Some((1.0, 0.0)), None);
        let config = Config::default();
        let outcome = assimilate("7c68b7", &[partial(vec![p1, p2])], None, &[], &config).unwrap();
        assert!(!outcome.was_created);
        assert_eq!(outcome.flight.flight_hash, existing);
    }
}
