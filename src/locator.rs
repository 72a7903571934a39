//! Geospatial Locator (C3, spec.md §4.2): assigns each FlightPoint in a
//! time-ordered batch to a Suburb using a tiered lookup, falling through
//! cheaper methods before paying for a full scan.

use std::collections::HashMap;
use std::time::Duration;

use crate::flight_point::FlightPoint;
use crate::geometry;
use crate::suburb::Suburb;

/// In-memory view over the Suburb set and its materialised neighbour
/// relation, built once per geolocation pass. Kept independent of the
/// repository layer so the tiered strategy is a pure function over data the
/// caller has already loaded (spec.md §9: this is the part of the original
/// webapp that leaned on live `ST_Contains` queries; here it's indexed
/// ahead of time and walked in memory, with the PostGIS-native path noted
/// as an alternative backend in spec.md §4.2 rather than implemented).
pub struct SuburbCatalog {
    by_hash: HashMap<String, Suburb>,
    neighbours: HashMap<String, Vec<String>>,
}

impl SuburbCatalog {
    pub fn new(suburbs: Vec<Suburb>, neighbour_pairs: Vec<(String, String)>) -> Self {
        let mut neighbours: HashMap<String, Vec<String>> = HashMap::new();
        for (a, b) in neighbour_pairs {
            neighbours.entry(a).or_default().push(b);
        }
        let by_hash = suburbs.into_iter().map(|s| (s.suburb_hash.clone(), s)).collect();
        Self { by_hash, neighbours }
    }

    fn get(&self, hash: &str) -> Option<&Suburb> {
        self.by_hash.get(hash)
    }

    fn neighbours_of(&self, hash: &str) -> impl Iterator<Item = &Suburb> {
        self.neighbours
            .get(hash)
            .into_iter()
            .flatten()
            .filter_map(move |h| self.get(h))
    }

    fn by_state_and_zone(&self, state_code: &str, utm_epsg_zone: i32) -> impl Iterator<Item = &Suburb> {
        self.by_hash
            .values()
            .filter(move |s| s.state_code == state_code && s.utm_epsg_zones.contains(&utm_epsg_zone))
    }

    fn by_zone(&self, utm_epsg_zone: i32) -> impl Iterator<Item = &Suburb> {
        self.by_hash.values().filter(move |s| s.utm_epsg_zones.contains(&utm_epsg_zone))
    }
}

/// Which tier produced the result, or why the point has no suburb
/// (spec.md §4.2: "result object carrying per-point outcome").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Methodology {
    NoPosition,
    LastSuburbContainment,
    LastSuburbNeighbours,
    SameStateUtmFilter,
    GlobalUtmFilter,
    SearchExhausted,
}

#[derive(Debug, Clone)]
pub struct PointOutcome {
    pub flight_point_hash: String,
    pub suburb_hash: Option<String>,
    pub methodology: Methodology,
}

pub struct LocateResult {
    pub outcomes: Vec<PointOutcome>,
    pub elapsed: Duration,
}

/// `locate(points, hint_suburb?) -> per-point suburb-or-failure` (spec.md
/// §4.2). `points` must already be in time order; this function never
/// reorders them and never queries a UTM zone whose suburb set doesn't
/// include that zone (spec.md §4.2 invariant — enforced structurally by
/// [`SuburbCatalog::by_state_and_zone`]/[`SuburbCatalog::by_zone`] only ever
/// returning suburbs whose zone-set contains the query zone).
pub fn locate(points: &[FlightPoint], hint_suburb: Option<&str>, catalog: &SuburbCatalog) -> LocateResult {
    let started = std::time::Instant::now();
    let mut last_suburb: Option<String> = hint_suburb.and_then(|h| catalog.get(h)).map(|s| s.suburb_hash.clone());
    let mut last_state: Option<String> = last_suburb.as_deref().and_then(|h| catalog.get(h)).map(|s| s.state_code.clone());

    let mut outcomes = Vec::with_capacity(points.len());
    for point in points {
        let outcome = locate_one(point, &last_suburb, &last_state, catalog);
        if let Some(hash) = &outcome.suburb_hash {
            if let Some(suburb) = catalog.get(hash) {
                last_state = Some(suburb.state_code.clone());
            }
            last_suburb = Some(hash.clone());
        }
        outcomes.push(outcome);
    }

    LocateResult {
        outcomes,
        elapsed: started.elapsed(),
    }
}

fn locate_one(
    point: &FlightPoint,
    last_suburb: &Option<String>,
    last_state: &Option<String>,
    catalog: &SuburbCatalog,
) -> PointOutcome {
    let Some(projected) = point.projected_position() else {
        return PointOutcome {
            flight_point_hash: point.flight_point_hash.clone(),
            suburb_hash: None,
            methodology: Methodology::NoPosition,
        };
    };

    // Tier 1: last-suburb containment.
    if let Some(last_hash) = last_suburb
        && let Some(suburb) = catalog.get(last_hash)
        && geometry::contains(&suburb.multi_polygon(), projected)
    {
        return hit(point, last_hash.clone(), Methodology::LastSuburbContainment);
    }

    // Tier 2: last-suburb neighbours.
    if let Some(last_hash) = last_suburb {
        for neighbour in catalog.neighbours_of(last_hash) {
            if geometry::contains(&neighbour.multi_polygon(), projected) {
                return hit(point, neighbour.suburb_hash.clone(), Methodology::LastSuburbNeighbours);
            }
        }
    }

    let Some((lon, lat)) = point.position() else {
        return PointOutcome {
            flight_point_hash: point.flight_point_hash.clone(),
            suburb_hash: None,
            methodology: Methodology::NoPosition,
        };
    };
    let zone = geometry::utm_zone(lon, lat);

    // Tier 3: same-state UTM filter.
    if let Some(state) = last_state {
        for candidate in catalog.by_state_and_zone(state, zone) {
            if geometry::contains(&candidate.multi_polygon(), projected) {
                return hit(point, candidate.suburb_hash.clone(), Methodology::SameStateUtmFilter);
            }
        }
    }

    // Tier 4: global UTM filter.
    for candidate in catalog.by_zone(zone) {
        if geometry::contains(&candidate.multi_polygon(), projected) {
            return hit(point, candidate.suburb_hash.clone(), Methodology::GlobalUtmFilter);
        }
    }

    // Tier 5: exhausted.
    PointOutcome {
        flight_point_hash: point.flight_point_hash.clone(),
        suburb_hash: None,
        methodology: Methodology::SearchExhausted,
    }
}

fn hit(point: &FlightPoint, suburb_hash: String, methodology: Methodology) -> PointOutcome {
    PointOutcome {
        flight_point_hash: point.flight_point_hash.clone(),
        suburb_hash: Some(suburb_hash),
        methodology,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, NaiveDate};

    use super::*;

    fn square_suburb(hash: &str, state: &str, min: (f64, f64), max: (f64, f64)) -> Suburb {
        Suburb {
            suburb_hash: hash.to_string(),
            name: hash.to_string(),
            postcode: None,
            state_code: state.to_string(),
            min_x: min.0,
            min_y: min.1,
            max_x: max.0,
            max_y: max.1,
            utm_epsg_zones: vec![32756],
            geometry: serde_json::json!({
                "type": "MultiPolygon",
                "coordinates": [[[[min.0, min.1], [max.0, min.1], [max.0, max.1], [min.0, max.1], [min.0, min.1]]]],
            }),
        }
    }

    fn point(hash: &str, projected: (f64, f64)) -> FlightPoint {
        FlightPoint {
            flight_point_hash: hash.to_string(),
            aircraft_icao: "7c68b7".to_string(),
            day_date: NaiveDate::from_ymd_opt(2022, 7, 29).unwrap(),
            flight_hash: None,
            timestamp: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            longitude: Some(151.2093),
            latitude: Some(-33.8688),
            projected_x: Some(projected.0),
            projected_y: Some(projected.1),
            crs_epsg: Some(3112),
            utm_epsg_zone: Some(32756),
            altitude_ft: Some(1000),
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

    #[test]
    fn last_suburb_containment_is_the_hot_path() {
        let catalog = SuburbCatalog::new(vec![square_suburb("a", "NSW", (0.0, 0.0), (10.0, 10.0))], vec![]);
        let points = vec![point("p1", (5.0, 5.0))];
        let result = locate(&points, Some("a"), &catalog);
        assert_eq!(result.outcomes[0].suburb_hash.as_deref(), Some("a"));
        assert_eq!(result.outcomes[0].methodology, Methodology::LastSuburbContainment);
    }

    #[test]
    fn falls_through_to_neighbours_then_zone_filter() {
        let catalog = SuburbCatalog::new(
            vec![
                square_suburb("a", "NSW", (0.0, 0.0), (10.0, 10.0)),
                square_suburb("b", "NSW", (10.0, 0.0), (20.0, 10.0)),
                square_suburb("c", "QLD", (100.0, 100.0), (110.0, 110.0)),
            ],
            vec![("a".to_string(), "b".to_string())],
        );
        let points = vec![point("p1", (15.0, 5.0))];
        let result = locate(&points, Some("a"), &catalog);
        assert_eq!(result.outcomes[0].suburb_hash.as_deref(), Some("b"));
        assert_eq!(result.outcomes[0].methodology, Methodology::LastSuburbNeighbours);
    }

    #[test]
    fn no_projected_position_fails_fast() {
        let catalog = SuburbCatalog::new(vec![], vec![]);
        let mut p = point("p1", (0.0, 0.0));
        p.projected_x = None;
        p.projected_y = None;
        p.crs_epsg = None;
        let result = locate(&[p], None, &catalog);
        assert_eq!(result.outcomes[0].methodology, Methodology::NoPosition);
        assert!(result.outcomes[0].suburb_hash.is_none());
    }

    #[test]
    fn search_exhausted_when_nothing_contains_the_point() {
        let catalog = SuburbCatalog::new(vec![square_suburb("a", "NSW", (0.0, 0.0), (10.0, 10.0))], vec![]);
        let points = vec![point("p1", (500.0, 500.0))];
        let result = locate(&points, None, &catalog);
        assert_eq!(result.outcomes[0].methodology, Methodology::SearchExhausted);
        assert!(result.outcomes[0].suburb_hash.is_none());
    }

    #[test]
    fn preserves_input_order() {
        let catalog = SuburbCatalog::new(vec![square_suburb("a", "NSW", (0.0, 0.0), (10.0, 10.0))], vec![]);
        let points = vec![point("p1", (5.0, 5.0)), point("p2", (500.0, 500.0)), point("p3", (5.0, 5.0))];
        let result = locate(&points, None, &catalog);
        let hashes: Vec<&str> = result.outcomes.iter().map(|o| o.flight_point_hash.as_str()).collect();
        assert_eq!(hashes, vec!["p1", "p2", "p3"]);
    }
}
