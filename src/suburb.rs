use blake2::{Blake2b, Digest, digest::consts::U16};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::{states, suburb_neighbours, suburbs};

type Blake2b128 = Blake2b<U16>;

/// State/territory a Suburb belongs to. The source stores an "Unknown"
/// sentinel string for unrecognised codes; represented here as a tagged
/// variant (spec.md §9).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StateCode {
    Known(String),
    Unknown,
}

impl StateCode {
    pub fn as_str(&self) -> &str {
        match self {
            StateCode::Known(s) => s,
            StateCode::Unknown => "unknown",
        }
    }

    pub fn parse(s: &str) -> Self {
        if s.is_empty() || s.eq_ignore_ascii_case("unknown") {
            StateCode::Unknown
        } else {
            StateCode::Known(s.to_string())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Queryable, Selectable, Insertable)]
#[diesel(table_name = states)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct State {
    pub code: String,
}

/// BLAKE2b digest of `(name, postcode, state, coords-string)` (spec.md §3).
pub fn suburb_hash(name: &str, postcode: &str, state: &str, coords: &str) -> String {
    let mut hasher = Blake2b128::new();
    hasher.update(name.as_bytes());
    hasher.update(postcode.as_bytes());
    hasher.update(state.as_bytes());
    hasher.update(coords.as_bytes());
    hex::encode(hasher.finalize())
}

/// Smallest administrative polygon; a FlightPoint is geolocated to at most
/// one Suburb (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Insertable)]
#[diesel(table_name = suburbs)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Suburb {
    pub suburb_hash: String,
    pub name: String,
    pub postcode: Option<String>,
    pub state_code: String,
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
    pub utm_epsg_zones: Vec<i32>,
    pub geometry: serde_json::Value,
}

impl Suburb {
    pub fn state(&self) -> StateCode {
        StateCode::parse(&self.state_code)
    }

    pub fn multi_polygon(&self) -> geo::MultiPolygon<f64> {
        crate::geometry::multi_polygon_from_geojson(&self.geometry)
            .unwrap_or_else(|| geo::MultiPolygon(vec![]))
    }

    pub fn bounding_box(&self) -> geo::Rect<f64> {
        geo::Rect::new((self.min_x, self.min_y), (self.max_x, self.max_y))
    }
}

/// Symmetric many-to-many "neighbour" relation — suburbs whose polygons
/// touch or intersect (spec.md §3). Materialised as an explicit junction
/// table per spec.md §9 "Cyclic graphs": both directions are inserted
/// together by [`crate::geometry::rtree::neighbour_pairs`].
#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Insertable)]
#[diesel(table_name = suburb_neighbours)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct SuburbNeighbour {
    pub suburb_hash: String,
    pub neighbour_hash: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_code_parses_unknown() {
        assert_eq!(StateCode::parse(""), StateCode::Unknown);
        assert_eq!(StateCode::parse("unknown"), StateCode::Unknown);
        assert_eq!(StateCode::parse("NSW"), StateCode::Known("NSW".to_string()));
    }
}
