//! R-tree indexing over polygon sets (spec.md §4.1). `rstar` is the
//! standard companion crate to `geo` for this (see SPEC_FULL.md §1); none
//! of the example repos needed one, but `geo`'s own documentation points
//! at `rstar::primitives::GeomWithData` as the idiomatic way to pair a
//! geometry with an identifier before indexing it, and `geo-types` itself
//! implements `RTreeObject` directly for `Polygon`/`MultiPolygon` under its
//! `use-rstar_0_12` feature, so no wrapper geometry is needed.

use geo::Intersects;
use rstar::RTree;
use rstar::primitives::GeomWithData;

use crate::airport::Airport;
use crate::suburb::Suburb;

pub type SuburbEntry = GeomWithData<geo::MultiPolygon<f64>, String>;
pub type AirportEntry = GeomWithData<geo::Polygon<f64>, String>;

/// Builds an R-tree over each suburb's `MultiPolygon`, carrying its
/// `suburb_hash` as the associated data.
pub fn build_suburb_index(suburbs: &[Suburb]) -> RTree<SuburbEntry> {
    let entries = suburbs
        .iter()
        .map(|s| GeomWithData::new(s.multi_polygon(), s.suburb_hash.clone()))
        .collect();
    RTree::bulk_load(entries)
}

/// Builds an R-tree over each airport's buffered polygon, carrying its
/// `airport_hash` as the associated data.
pub fn build_airport_index(airports: &[Airport]) -> RTree<AirportEntry> {
    let entries = airports
        .iter()
        .map(|a| GeomWithData::new(a.polygon(), a.airport_hash.clone()))
        .collect();
    RTree::bulk_load(entries)
}

/// Computes the symmetric neighbour relation for a set of suburbs: two
/// suburbs are neighbours iff their polygons touch or intersect
/// (spec.md §3). Bounding boxes narrow the candidate set via the R-tree,
/// exact polygon intersection confirms it — spec.md §9 "Cyclic graphs"
/// calls for materialising this as an explicit many-to-many table with
/// symmetric insertion, which is what the returned pairs are for.
pub fn neighbour_pairs(suburbs: &[Suburb]) -> Vec<(String, String)> {
    let index = build_suburb_index(suburbs);
    let mut pairs = Vec::new();
    for suburb in suburbs {
        let bbox = suburb.bounding_box();
        let envelope = rstar::AABB::from_corners(
            geo::Point::new(bbox.min().x, bbox.min().y),
            geo::Point::new(bbox.max().x, bbox.max().y),
        );
        for candidate in index.locate_in_envelope_intersecting(&envelope) {
            if candidate.data == suburb.suburb_hash {
                continue;
            }
            let candidate_suburb = suburbs_by_hash(suburbs, &candidate.data);
            if suburb.multi_polygon().intersects(&candidate_suburb.multi_polygon()) {
                pairs.push((suburb.suburb_hash.clone(), candidate.data.clone()));
            }
        }
    }
    pairs
}

fn suburbs_by_hash<'a>(suburbs: &'a [Suburb], hash: &str) -> &'a Suburb {
    suburbs
        .iter()
        .find(|s| s.suburb_hash == hash)
        .expect("candidate hash came from the same slice")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn suburb(hash: &str, min: (f64, f64), max: (f64, f64)) -> Suburb {
        Suburb {
            suburb_hash: hash.to_string(),
            name: hash.to_string(),
            postcode: None,
            state_code: "NSW".to_string(),
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

    #[test]
    fn adjacent_suburbs_are_neighbours() {
        let suburbs = vec![suburb("a", (0.0, 0.0), (1.0, 1.0)), suburb("b", (1.0, 0.0), (2.0, 1.0))];
        let pairs = neighbour_pairs(&suburbs);
        assert!(pairs.contains(&("a".to_string(), "b".to_string())));
        assert!(pairs.contains(&("b".to_string(), "a".to_string())));
    }

    #[test]
    fn distant_suburbs_are_not_neighbours() {
        let suburbs = vec![suburb("a", (0.0, 0.0), (1.0, 1.0)), suburb("b", (10.0, 10.0), (11.0, 11.0))];
        assert!(neighbour_pairs(&suburbs).is_empty());
    }
}
