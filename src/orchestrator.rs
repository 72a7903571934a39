//! Submission Orchestrator (C7, spec.md §4.6): entry point for worker
//! ingestion. Normalizes and dedups points, maintains the
//! Day/AircraftPresentDay junction rows, and dispatches into the Timeline
//! Builder (C4) and Flight Assimilator (C6).

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::aircraft::Aircraft;
use crate::aircraft_present_day_repo::AircraftPresentDayRepository;
use crate::airport::Airport;
use crate::assimilator::{self, AssimilationOutcome};
use crate::config::Config;
use crate::day_repo::DayRepository;
use crate::error::DomainError;
use crate::flight::Flight;
use crate::flight_point::FlightPoint;
use crate::flight_points_repo::FlightPointsRepository;
use crate::flights_repo::FlightsRepository;
use crate::geometry;
use crate::locator::{self, SuburbCatalog};
use crate::stitcher::{self, DayTimelineSource};
use crate::timeline::{self, DailyFlightsView, PartialFlight};

pub struct Orchestrator {
    pub day_repo: DayRepository,
    pub present_day_repo: AircraftPresentDayRepository,
    pub flight_points_repo: FlightPointsRepository,
    pub flights_repo: FlightsRepository,
    pub config: Config,
}

/// Result of a `submitPartial`/`reviseDay` call: the Flights touched and
/// any non-fatal per-partial warnings (spec.md §7, "Missing prerequisites"
/// and "Data integrity" — recorded rather than aborting the whole batch).
pub struct SubmissionOutcome {
    pub flights: Vec<Flight>,
    pub warnings: Vec<DomainError>,
}

impl Orchestrator {
    /// `submitPartial(aircraft, day, newPoints, worker)` (spec.md §4.6).
    pub async fn submit_partial(
        &self,
        aircraft: Option<&Aircraft>,
        icao: &str,
        day: NaiveDate,
        new_points: Vec<FlightPoint>,
        suburb_catalog: Option<&SuburbCatalog>,
        airports: &[Airport],
    ) -> anyhow::Result<SubmissionOutcome> {
        self.day_repo.ensure_exists(day).await?;
        self.present_day_repo.ensure_exists(icao, day).await?;
        self.present_day_repo.set_flags(icao, day, Some(false), Some(false), None).await?;

        let existing_points = self.flight_points_repo.for_aircraft_day(icao, day).await?;
        let old_view = timeline::build_daily_view(&existing_points, &self.config.flight);

        let top_speed = aircraft.and_then(|a| a.top_speed_knots);
        let projected_epsg = self.config.projected_epsg;
        let mut corrected_points: Vec<FlightPoint> = new_points
            .into_iter()
            .map(|p| p.corrected_for_top_speed(top_speed))
            .map(|mut p| {
                if let Some((lon, lat)) = p.position() {
                    if let Ok(projected) = geometry::transform(geo::Point::new(lon, lat), 4326, projected_epsg) {
                        p = p.with_projected_position(projected, projected_epsg);
                        p.utm_epsg_zone = Some(geometry::utm_zone(lon, lat));
                    } else {
                        warn!(icao, "failed to project flight point, leaving unlocated");
                    }
                }
                p
            })
            .collect();
        corrected_points.sort_by_key(|p| p.timestamp);

        if let Some(catalog) = suburb_catalog {
            let hint = existing_points.iter().rev().find_map(|p| p.suburb_hash.clone());
            let located = locator::locate(&corrected_points, hint.as_deref(), catalog);
            for (point, outcome) in corrected_points.iter_mut().zip(located.outcomes) {
                point.suburb_hash = outcome.suburb_hash;
            }
        }

        metrics::counter!("aireyes_flight_points_ingested_total").increment(corrected_points.len() as u64);
        self.flight_points_repo.insert_batch(&corrected_points).await?;

        let outcome = match find_predecessor(&old_view.partials, &corrected_points) {
            Some(predecessor) if !predecessor_requires_new_flight(predecessor, &corrected_points, &self.config) => {
                let mut merged = predecessor.points.clone();
                merged.extend(corrected_points.clone());
                let seed = PartialFlight {
                    points: merged,
                    started_with_takeoff_override: predecessor.started_with_takeoff_override,
                    ended_with_landing_override: predecessor.ended_with_landing_override,
                };
                let seed = self.stitch_partial(icao, day, seed).await?;
                self.assimilate_partials(icao, &[seed], aircraft, airports).await?
            }
            _ => self.assimilate_full_day(icao, day, aircraft, airports).await?,
        };

        self.present_day_repo.set_flags(icao, day, None, None, Some(suburb_catalog.is_some())).await?;
        Ok(outcome)
    }

    /// `reviseDay(aircraft, day, force)` (spec.md §4.6): background full
    /// pass, requiring `history_verified=true` and `flights_verified=false`
    /// unless `force`.
    pub async fn revise_day(
        &self,
        aircraft: Option<&Aircraft>,
        icao: &str,
        day: NaiveDate,
        force: bool,
        airports: &[Airport],
    ) -> Result<SubmissionOutcome, DomainError> {
        let present_day = self
            .present_day_repo
            .get(icao, day)
            .await
            .map_err(|_| DomainError::FlightDataRevisionRequired { icao: icao.to_string(), day })?
            .ok_or_else(|| {
                metrics::counter!("aireyes_revision_required_total").increment(1);
                DomainError::FlightDataRevisionRequired { icao: icao.to_string(), day }
            })?;

        if !force {
            if present_day.flights_verified {
                return Err(DomainError::FlightsVerifiedError { icao: icao.to_string(), day });
            }
            if !present_day.history_verified {
                return Err(DomainError::HistoryVerifiedError { icao: icao.to_string(), day });
            }
        }

        let outcome = self
            .assimilate_full_day(icao, day, aircraft, airports)
            .await
            .map_err(|_| DomainError::NoFlightsAssimilated)?;

        if outcome.flights.is_empty() {
            return Err(DomainError::NoFlightsAssimilated);
        }

        self.present_day_repo
            .set_flags(icao, day, None, Some(true), None)
            .await
            .map_err(|_| DomainError::NoFlightsAssimilated)?;
        Ok(outcome)
    }

    async fn assimilate_full_day(
        &self,
        icao: &str,
        day: NaiveDate,
        aircraft: Option<&Aircraft>,
        airports: &[Airport],
    ) -> anyhow::Result<SubmissionOutcome> {
        let points = self.flight_points_repo.for_aircraft_day(icao, day).await?;
        let view = timeline::build_daily_view(&points, &self.config.flight);
        if view.partials.is_empty() {
            return Err(DomainError::NoPartialFlights { icao: icao.to_string(), day }.into());
        }

        let mut stitched = Vec::with_capacity(view.partials.len());
        for partial in view.partials {
            match self.stitch_partial(icao, day, partial).await {
                Ok(partial) => stitched.push(partial),
                Err(e) => warn!(icao, %day, error = %e, "cross-day stitching incomplete, deferring partial"),
            }
        }

        self.assimilate_partials(icao, &stitched, aircraft, airports).await
    }

    /// Runs the Cross-Day Stitcher (C5, spec.md §4.4) over a partial that
    /// doesn't already start with a takeoff and end with a landing, so
    /// flights spanning a UTC day boundary (spec.md §8 scenarios 2 & 3) are
    /// assembled from both days' points before assimilation.
    async fn stitch_partial(&self, icao: &str, day: NaiveDate, mut partial: PartialFlight) -> Result<PartialFlight, DomainError> {
        let thresholds = &self.config.flight;
        let max_days = self.config.worker.max_stitch_days;

        if !partial.starts_with_takeoff(thresholds) {
            partial = stitcher::collect_backward_until_takeoff(partial, icao, day, self, thresholds, max_days).await?;
        }
        if !partial.ends_with_landing(thresholds) {
            partial = stitcher::collect_forward_until_landing(partial, icao, day, self, thresholds, max_days).await?;
        }
        Ok(partial)
    }

    async fn assimilate_partials(
        &self,
        icao: &str,
        partials: &[PartialFlight],
        aircraft: Option<&Aircraft>,
        airports: &[Airport],
    ) -> anyhow::Result<SubmissionOutcome> {
        let mut flights = Vec::new();
        let mut warnings = Vec::new();

        for partial in partials {
            match assimilator::assimilate(icao, std::slice::from_ref(partial), aircraft, airports, &self.config) {
                Ok(AssimilationOutcome {
                    flight,
                    point_hashes,
                    warnings: partial_warnings,
                    ..
                }) => {
                    self.flights_repo.upsert(&flight).await?;
                    self.flight_points_repo.assign_flight(&point_hashes, flight.flight_hash).await?;
                    warnings.extend(partial_warnings);
                    metrics::counter!("aireyes_flights_assimilated_total").increment(1);
                    flights.push(flight);
                }
                Err(e) => {
                    warn!(icao, error = %e, "partial assimilation failed, continuing");
                    metrics::counter!("aireyes_assimilation_failures_total").increment(1);
                    warnings.push(e);
                }
            }
        }

        if flights.is_empty() {
            return Err(DomainError::NoFlightsAssimilated.into());
        }

        info!(icao, flights = flights.len(), "assimilation complete");
        Ok(SubmissionOutcome { flights, warnings })
    }
}

impl DayTimelineSource for Orchestrator {
    async fn timeline_for(&self, icao: &str, date: NaiveDate) -> anyhow::Result<DailyFlightsView> {
        let points = self.flight_points_repo.for_aircraft_day(icao, date).await?;
        Ok(timeline::build_daily_view(&points, &self.config.flight))
    }
}

/// Locates the latest partial whose start precedes `new_points`'s first
/// timestamp and whose next sibling (if any) starts after `new_points`'s
/// last timestamp (spec.md §4.6).
fn find_predecessor<'a>(partials: &'a [PartialFlight], new_points: &[FlightPoint]) -> Option<&'a PartialFlight> {
    let first_new = new_points.first()?.timestamp;
    let last_new = new_points.last()?.timestamp;

    let mut best = None;
    for (i, partial) in partials.iter().enumerate() {
        let Some(start) = partial.points.first().map(|p| p.timestamp) else { continue };
        let Some(end) = partial.points.last().map(|p| p.timestamp) else { continue };
        if start >= first_new || end >= first_new {
            continue;
        }
        let next_starts_after_new = match partials.get(i + 1) {
            Some(next) => next.points.first().map(|p| p.timestamp > last_new).unwrap_or(true),
            None => true,
        };
        if next_starts_after_new {
            best = Some(partial);
        }
    }
    best
}

fn predecessor_requires_new_flight(predecessor: &PartialFlight, new_points: &[FlightPoint], config: &Config) -> bool {
    let (Some(last), Some(first)) = (predecessor.points.last(), new_points.first()) else {
        return true;
    };
    timeline::constitutes_new_flight(last, first, &config.flight).constitutes_new_flight
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;

    use super::*;

    fn point(ts: i64) -> FlightPoint {
        FlightPoint {
            flight_point_hash: format!("p{ts}"),
            aircraft_icao: "7c68b7".to_string(),
            day_date: NaiveDate::from_ymd_opt(2022, 7, 29).unwrap(),
            flight_hash: None,
            timestamp: DateTime::from_timestamp(ts, 0).unwrap(),
            longitude: Some(151.0),
            latitude: Some(-33.0),
            projected_x: None,
            projected_y: None,
            crs_epsg: None,
            utm_epsg_zone: None,
            altitude_ft: Some(3000),
            ground_speed_knots: None,
            track_deg: None,
            vertical_rate_ft_per_min: None,
            data_source: None,
            is_on_ground: false,
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
    fn finds_the_partial_immediately_preceding_new_points() {
        let partials = vec![partial(vec![point(0), point(10)]), partial(vec![point(1000), point(1010)])];
        let new_points = vec![point(20), point(30)];
        let predecessor = find_predecessor(&partials, &new_points).unwrap();
        assert_eq!(predecessor.points[0].flight_point_hash, "p0");
    }

    #[test]
    fn no_predecessor_when_a_later_partial_already_starts_within_range() {
        let partials = vec![partial(vec![point(0), point(10)]), partial(vec![point(15), point(1010)])];
        let new_points = vec![point(20), point(30)];
        assert!(find_predecessor(&partials, &new_points).is_none());
    }

    #[test]
    fn no_predecessor_with_empty_new_points() {
        let partials = vec![partial(vec![point(0), point(10)])];
        assert!(find_predecessor(&partials, &[]).is_none());
    }
}
