//! Cross-Day Stitcher (C5, spec.md §4.4): walks adjacent AircraftPresentDay
//! rows to assemble a full Flight from a seed PartialFlight that is
//! incomplete in one direction.

use chrono::NaiveDate;

use crate::config::FlightThresholds;
use crate::error::DomainError;
use crate::timeline::{DailyFlightsView, PartialFlight, constitutes_new_flight};

/// Supplies a day's already-built timeline view. Implemented over the
/// repository layer in production, and over an in-memory fixture in tests —
/// kept as a plain `async fn` trait (stable since edition 2024, no
/// `async-trait` needed) rather than a repository-shaped struct so the
/// stitcher's own logic stays independently testable.
pub trait DayTimelineSource {
    async fn timeline_for(&self, icao: &str, date: NaiveDate) -> anyhow::Result<DailyFlightsView>;
}

/// `collectBackwardUntilTakeoff(seed)` (spec.md §4.4): walks previous days
/// (bounded by `max_days`) until the seed's true start is confirmed, either
/// by a decisive new-flight boundary or by reaching a partial that itself
/// starts with a takeoff.
pub async fn collect_backward_until_takeoff<S: DayTimelineSource>(
    mut seed: PartialFlight,
    icao: &str,
    seed_date: NaiveDate,
    source: &S,
    thresholds: &FlightThresholds,
    max_days: usize,
) -> Result<PartialFlight, DomainError> {
    let mut cursor = seed_date;

    for _ in 0..max_days {
        if seed.starts_with_takeoff(thresholds) {
            return Ok(seed);
        }

        let prev_date = cursor
            .pred_opt()
            .ok_or_else(|| revision_required(icao, cursor))?;

        let view = source
            .timeline_for(icao, prev_date)
            .await
            .map_err(|_| revision_required(icao, prev_date))?;

        let Some(prior_partial) = view.partials.last() else {
            return Err(revision_required(icao, prev_date));
        };

        let seed_first = seed
            .points
            .first()
            .ok_or_else(|| revision_required(icao, seed_date))?;
        let prior_last = prior_partial
            .points
            .last()
            .expect("non-empty partial has a last point");

        let resolution = constitutes_new_flight(prior_last, seed_first, thresholds);
        if resolution.constitutes_new_flight {
            seed.started_with_takeoff_override = true;
            return Ok(seed);
        }

        let mut merged = prior_partial.points.clone();
        merged.extend(seed.points);
        seed.points = merged;

        if prior_partial.starts_with_takeoff(thresholds) {
            seed.started_with_takeoff_override = true;
            return Ok(seed);
        }

        cursor = prev_date;
    }

    Err(revision_required(icao, cursor))
}

/// `collectForwardUntilLanding(seed)` (spec.md §4.4): symmetric forward
/// walk, setting `ended_with_landing_override`.
pub async fn collect_forward_until_landing<S: DayTimelineSource>(
    mut seed: PartialFlight,
    icao: &str,
    seed_date: NaiveDate,
    source: &S,
    thresholds: &FlightThresholds,
    max_days: usize,
) -> Result<PartialFlight, DomainError> {
    let mut cursor = seed_date;

    for _ in 0..max_days {
        if seed.ends_with_landing(thresholds) {
            return Ok(seed);
        }

        let next_date = cursor
            .succ_opt()
            .ok_or_else(|| revision_required(icao, cursor))?;

        let view = source
            .timeline_for(icao, next_date)
            .await
            .map_err(|_| revision_required(icao, next_date))?;

        let Some(next_partial) = view.partials.first() else {
            return Err(revision_required(icao, next_date));
        };

        let seed_last = seed
            .points
            .last()
            .ok_or_else(|| revision_required(icao, seed_date))?;
        let next_first = next_partial
            .points
            .first()
            .expect("non-empty partial has a first point");

        let resolution = constitutes_new_flight(seed_last, next_first, thresholds);
        if resolution.constitutes_new_flight {
            seed.ended_with_landing_override = true;
            return Ok(seed);
        }

        seed.points.extend(next_partial.points.clone());

        if next_partial.ends_with_landing(thresholds) {
            seed.ended_with_landing_override = true;
            return Ok(seed);
        }

        cursor = next_date;
    }

    Err(revision_required(icao, cursor))
}

fn revision_required(icao: &str, day: NaiveDate) -> DomainError {
    DomainError::FlightDataRevisionRequired {
        icao: icao.to_string(),
        day,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use chrono::DateTime;

    use super::*;
    use crate::flight_point::FlightPoint;
    use crate::timeline::build_daily_view;

    fn point(icao: &str, day: NaiveDate, ts: i64, on_ground: bool, altitude_ft: Option<i32>) -> FlightPoint {
        FlightPoint {
            flight_point_hash: format!("{icao}-{ts}"),
            aircraft_icao: icao.to_string(),
            day_date: day,
            flight_hash: None,
            timestamp: DateTime::from_timestamp(ts, 0).unwrap(),
            longitude: Some(151.0),
            latitude: Some(-33.0),
            projected_x: None,
            projected_y: None,
            crs_epsg: None,
            utm_epsg_zone: None,
            altitude_ft,
            ground_speed_knots: None,
            track_deg: None,
            vertical_rate_ft_per_min: None,
            data_source: None,
            is_on_ground: on_ground,
            is_ascending: false,
            is_descending: false,
            suburb_hash: None,
        }
    }

    struct FixtureSource {
        days: Mutex<HashMap<NaiveDate, Vec<FlightPoint>>>,
    }

    impl DayTimelineSource for FixtureSource {
        async fn timeline_for(&self, _icao: &str, date: NaiveDate) -> anyhow::Result<DailyFlightsView> {
            let days = self.days.lock().unwrap();
            let points = days.get(&date).cloned().ok_or_else(|| anyhow::anyhow!("no data for {date}"))?;
            Ok(build_daily_view(&points, &FlightThresholds::default()))
        }
    }

    #[tokio::test]
    async fn stops_when_prior_day_confirms_a_takeoff() {
        let thresholds = FlightThresholds::default();
        let day0 = NaiveDate::from_ymd_opt(2022, 7, 28).unwrap();
        let day1 = NaiveDate::from_ymd_opt(2022, 7, 29).unwrap();

        let prior_day_points = vec![
            point("7c68b7", day0, 0, true, Some(0)),
            point("7c68b7", day0, 100, false, Some(3000)),
            point("7c68b7", day0, 200, true, Some(0)),
        ];
        let source = FixtureSource {
            days: Mutex::new(HashMap::from([(day0, prior_day_points)])),
        };

        let seed_points = vec![point("7c68b7", day1, 300, false, Some(5000)), point("7c68b7", day1, 310, false, Some(5000))];
        let seed = PartialFlight {
            points: seed_points,
            started_with_takeoff_override: false,
            ended_with_landing_override: false,
        };

        let stitched = collect_backward_until_takeoff(seed, "7c68b7", day1, &source, &thresholds, 100)
            .await
            .unwrap();
        assert!(stitched.starts_with_takeoff(&thresholds));
    }

    #[tokio::test]
    async fn missing_prior_day_raises_revision_required() {
        let thresholds = FlightThresholds::default();
        let day1 = NaiveDate::from_ymd_opt(2022, 7, 29).unwrap();
        let source = FixtureSource { days: Mutex::new(HashMap::new()) };

        let seed = PartialFlight {
            points: vec![point("7c68b7", day1, 300, false, Some(5000))],
            started_with_takeoff_override: false,
            ended_with_landing_override: false,
        };

        let result = collect_backward_until_takeoff(seed, "7c68b7", day1, &source, &thresholds, 100).await;
        assert!(matches!(result, Err(DomainError::FlightDataRevisionRequired { .. })));
    }

    #[tokio::test]
    async fn forward_walk_confirms_landing() {
        let thresholds = FlightThresholds::default();
        let day0 = NaiveDate::from_ymd_opt(2022, 7, 29).unwrap();
        let day1 = NaiveDate::from_ymd_opt(2022, 7, 30).unwrap();

        let next_day_points = vec![
            point("7c68b7", day1, 1000, true, Some(0)),
            point("7c68b7", day1, 1100, false, Some(3000)),
            point("7c68b7", day1, 1200, true, Some(0)),
        ];
        let source = FixtureSource {
            days: Mutex::new(HashMap::from([(day1, next_day_points)])),
        };

        let seed = PartialFlight {
            points: vec![point("7c68b7", day0, 500, false, Some(5000)), point("7c68b7", day0, 510, false, Some(5000))],
            started_with_takeoff_override: false,
            ended_with_landing_override: false,
        };

        let stitched = collect_forward_until_landing(seed, "7c68b7", day0, &source, &thresholds, 100)
            .await
            .unwrap();
        assert!(stitched.ends_with_landing(&thresholds));
    }
}
