//! Timeline Builder (C4, spec.md §4.3): interleaves a day's FlightPoints
//! with Start/Change/End descriptors and partitions them into PartialFlights.

use crate::config::FlightThresholds;
use crate::flight_point::FlightPoint;

/// `Change(Pᵢ, Pᵢ₊₁)` — holds `Δt` and the grounded flags of each endpoint
/// (spec.md §4.3).
#[derive(Debug, Clone, Copy)]
pub struct Change {
    pub delta_secs: i64,
    pub prev_grounded: bool,
    pub next_grounded: bool,
    pub prev_altitude_ft: Option<i32>,
    pub next_altitude_ft: Option<i32>,
}

impl Change {
    pub fn between(prev: &FlightPoint, next: &FlightPoint) -> Self {
        Self {
            delta_secs: (next.timestamp - prev.timestamp).num_seconds(),
            prev_grounded: prev.is_on_ground,
            next_grounded: next.is_on_ground,
            prev_altitude_ft: prev.altitude_ft,
            next_altitude_ft: next.altitude_ft,
        }
    }
}

/// Outcome of the decision table before the inaccuracy resolver runs
/// (spec.md §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeDecision {
    New,
    NotNew,
    /// Both endpoints airborne and `Δt ≥ TD_INACCURACY_CHECK`: defer to
    /// [`resolve_inaccuracy`].
    Defer,
}

/// `constitutesNewFlight()`'s decision table (spec.md §4.3), evaluated
/// before the inaccuracy resolver.
pub fn evaluate_change(change: &Change, thresholds: &FlightThresholds) -> ChangeDecision {
    match (change.prev_grounded, change.next_grounded) {
        (true, true) => {
            if change.delta_secs > thresholds.new_flight_grounded_secs {
                ChangeDecision::New
            } else {
                ChangeDecision::NotNew
            }
        }
        (true, false) => {
            let next_alt = change.next_altitude_ft.unwrap_or(i32::MAX);
            if change.delta_secs > thresholds.new_flight_midair_start_secs
                && next_alt < thresholds.max_altitude_midair_disappear_ft
            {
                ChangeDecision::New
            } else {
                ChangeDecision::NotNew
            }
        }
        (false, true) => {
            let prev_alt = change.prev_altitude_ft.unwrap_or(i32::MAX);
            if change.delta_secs > thresholds.new_flight_midair_end_secs
                && prev_alt < thresholds.max_altitude_midair_disappear_ft
            {
                ChangeDecision::New
            } else {
                ChangeDecision::NotNew
            }
        }
        (false, false) => {
            if change.delta_secs >= thresholds.inaccuracy_check_secs {
                ChangeDecision::Defer
            } else {
                ChangeDecision::NotNew
            }
        }
    }
}

/// Inaccuracy solution record (SPEC_FULL.md §2): the resolver's verdict,
/// auditable via `reason_code` rather than a bare bool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InaccuracyResolution {
    pub constitutes_new_flight: bool,
    pub reason_code: &'static str,
}

/// Catch-all applied when both endpoints are airborne and the decision
/// table deferred (spec.md §4.3). Gated by `inaccuracy_solvency_enabled`
/// (`config.INACCURACY_SOLVENCY_ENABLED` upstream).
pub fn resolve_inaccuracy(change: &Change, thresholds: &FlightThresholds) -> InaccuracyResolution {
    if !thresholds.inaccuracy_solvency_enabled {
        return InaccuracyResolution {
            constitutes_new_flight: false,
            reason_code: "inaccuracy-solvency-disabled",
        };
    }
    if change.delta_secs > thresholds.new_flight_midair_both_secs {
        InaccuracyResolution {
            constitutes_new_flight: true,
            reason_code: "catch-all",
        }
    } else {
        InaccuracyResolution {
            constitutes_new_flight: false,
            reason_code: "not-new-flight",
        }
    }
}

/// Full `constitutesNewFlight()` query: runs the decision table and, when
/// it defers, the inaccuracy resolver.
pub fn constitutes_new_flight(prev: &FlightPoint, next: &FlightPoint, thresholds: &FlightThresholds) -> InaccuracyResolution {
    let change = Change::between(prev, next);
    match evaluate_change(&change, thresholds) {
        ChangeDecision::New => InaccuracyResolution {
            constitutes_new_flight: true,
            reason_code: "decision-table",
        },
        ChangeDecision::NotNew => InaccuracyResolution {
            constitutes_new_flight: false,
            reason_code: "decision-table",
        },
        ChangeDecision::Defer => resolve_inaccuracy(&change, thresholds),
    }
}

/// A contiguous run of FlightPoints on a single day, not yet assimilated
/// into a Flight (spec.md §4.3). Completeness w.r.t. neighbouring days is
/// determined by the Cross-Day Stitcher (C5); `is_complete` here only
/// reflects this partial's own endpoints.
#[derive(Debug, Clone)]
pub struct PartialFlight {
    pub points: Vec<FlightPoint>,
    /// Set by the Cross-Day Stitcher when a backward walk determines the
    /// true start was a takeoff despite this partial's own first point not
    /// looking grounded (spec.md §4.4).
    pub started_with_takeoff_override: bool,
    /// Symmetric, set by a forward walk (spec.md §4.4).
    pub ended_with_landing_override: bool,
}

impl PartialFlight {
    fn new(points: Vec<FlightPoint>) -> Self {
        Self {
            points,
            started_with_takeoff_override: false,
            ended_with_landing_override: false,
        }
    }

    pub fn starts_with_takeoff(&self, thresholds: &FlightThresholds) -> bool {
        if self.started_with_takeoff_override {
            return true;
        }
        match self.points.first() {
            None => false,
            Some(p) => p.is_on_ground || p.altitude_ft.unwrap_or(i32::MAX) < thresholds.max_altitude_midair_disappear_ft,
        }
    }

    pub fn ends_with_landing(&self, thresholds: &FlightThresholds) -> bool {
        if self.ended_with_landing_override {
            return true;
        }
        match self.points.last() {
            None => false,
            Some(p) => p.is_on_ground || p.altitude_ft.unwrap_or(i32::MAX) < thresholds.max_altitude_midair_disappear_ft,
        }
    }

    /// Complete within this single day: begins with a takeoff and ends with
    /// a landing (spec.md §4.3). Does not account for cross-day joins.
    pub fn is_complete_within_day(&self, thresholds: &FlightThresholds) -> bool {
        self.starts_with_takeoff(thresholds) && self.ends_with_landing(thresholds)
    }
}

/// The full per-day view: the interleaved timeline's PartialFlights, plus
/// any fragments discarded for being too short (spec.md §4.3).
#[derive(Debug, Clone)]
pub struct DailyFlightsView {
    pub partials: Vec<PartialFlight>,
    pub discarded_fragment_count: usize,
}

/// Builds the day's timeline from all of an (aircraft, day)'s FlightPoints
/// and partitions it into PartialFlights (spec.md §4.3). `points` need not
/// be pre-sorted; this function sorts by timestamp before walking.
pub fn build_daily_view(points: &[FlightPoint], thresholds: &FlightThresholds) -> DailyFlightsView {
    let mut sorted: Vec<FlightPoint> = points.to_vec();
    sorted.sort_by_key(|p| p.timestamp);

    let mut partials = Vec::new();
    let mut current: Vec<FlightPoint> = Vec::new();
    let mut discarded = 0usize;

    for point in sorted {
        if let Some(prev) = current.last() {
            let resolution = constitutes_new_flight(prev, &point, thresholds);
            if resolution.constitutes_new_flight {
                close_partial(&mut partials, &mut current, &mut discarded, thresholds);
            }
        }
        current.push(point);
    }
    close_partial(&mut partials, &mut current, &mut discarded, thresholds);

    DailyFlightsView {
        partials,
        discarded_fragment_count: discarded,
    }
}

fn close_partial(
    partials: &mut Vec<PartialFlight>,
    current: &mut Vec<FlightPoint>,
    discarded: &mut usize,
    thresholds: &FlightThresholds,
) {
    if current.is_empty() {
        return;
    }
    let fragment = std::mem::take(current);
    if fragment.len() < thresholds.min_fragments_for_partial {
        tracing::info!(len = fragment.len(), "discarding short partial flight fragment");
        *discarded += 1;
        return;
    }
    partials.push(PartialFlight::new(fragment));
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, NaiveDate};

    use super::*;

    fn point(ts: i64, on_ground: bool, altitude_ft: Option<i32>) -> FlightPoint {
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

    #[test]
    fn grounded_gap_beyond_threshold_is_new_flight() {
        let thresholds = FlightThresholds::default();
        let prev = point(0, true, Some(0));
        let next = point(thresholds.new_flight_grounded_secs + 1, true, Some(0));
        let resolution = constitutes_new_flight(&prev, &next, &thresholds);
        assert!(resolution.constitutes_new_flight);
    }

    #[test]
    fn short_grounded_gap_is_not_new_flight() {
        let thresholds = FlightThresholds::default();
        let prev = point(0, true, Some(0));
        let next = point(10, true, Some(0));
        let resolution = constitutes_new_flight(&prev, &next, &thresholds);
        assert!(!resolution.constitutes_new_flight);
    }

    #[test]
    fn both_airborne_defers_to_inaccuracy_resolver() {
        let thresholds = FlightThresholds::default();
        let prev = point(0, false, Some(5000));
        let next = point(thresholds.new_flight_midair_both_secs + 1, false, Some(5000));
        let resolution = constitutes_new_flight(&prev, &next, &thresholds);
        assert!(resolution.constitutes_new_flight);
        assert_eq!(resolution.reason_code, "catch-all");
    }

    #[test]
    fn inaccuracy_resolver_respects_disabled_switch() {
        let mut thresholds = FlightThresholds::default();
        thresholds.inaccuracy_solvency_enabled = false;
        let change = Change {
            delta_secs: thresholds.new_flight_midair_both_secs + 1,
            prev_grounded: false,
            next_grounded: false,
            prev_altitude_ft: Some(5000),
            next_altitude_ft: Some(5000),
        };
        let resolution = resolve_inaccuracy(&change, &thresholds);
        assert!(!resolution.constitutes_new_flight);
        assert_eq!(resolution.reason_code, "inaccuracy-solvency-disabled");
    }

    #[test]
    fn builds_two_partials_across_a_long_grounded_gap() {
        let thresholds = FlightThresholds::default();
        let points = vec![
            point(0, true, Some(0)),
            point(10, false, Some(3000)),
            point(20, true, Some(0)),
            point(20 + thresholds.new_flight_grounded_secs + 1, true, Some(0)),
            point(20 + thresholds.new_flight_grounded_secs + 11, false, Some(3000)),
            point(20 + thresholds.new_flight_grounded_secs + 21, true, Some(0)),
        ];
        let view = build_daily_view(&points, &thresholds);
        assert_eq!(view.partials.len(), 2);
        assert_eq!(view.partials[0].points.len(), 3);
        assert_eq!(view.partials[1].points.len(), 3);
    }

    #[test]
    fn short_fragments_are_discarded() {
        let mut thresholds = FlightThresholds::default();
        thresholds.min_fragments_for_partial = 3;
        let points = vec![point(0, true, Some(0)), point(10, true, Some(0))];
        let view = build_daily_view(&points, &thresholds);
        assert!(view.partials.is_empty());
        assert_eq!(view.discarded_fragment_count, 1);
    }

    #[test]
    fn complete_partial_starts_with_takeoff_and_ends_with_landing() {
        let thresholds = FlightThresholds::default();
        let points = vec![point(0, true, Some(0)), point(10, false, Some(3000)), point(20, true, Some(0))];
        let partial = PartialFlight::new(points);
        assert!(partial.is_complete_within_day(&thresholds));
    }
}
