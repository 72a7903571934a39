use blake2::{Blake2b, Digest, digest::consts::U16};
use diesel::prelude::*;
use geo::Centroid;
use serde::{Deserialize, Serialize};

use crate::schema::airports;

type Blake2b128 = Blake2b<U16>;

/// BLAKE2b digest of `(name, lat, lon)`, hex-encoded (spec.md §3).
pub fn airport_hash(name: &str, latitude: f64, longitude: f64) -> String {
    let mut hasher = Blake2b128::new();
    hasher.update(name.as_bytes());
    hasher.update(latitude.to_string().as_bytes());
    hasher.update(longitude.to_string().as_bytes());
    hex::encode(hasher.finalize())
}

/// An airport: a point buffered by a configured radius to form a polygon
/// (spec.md §3), associated with the set of UTM EPSG zones that polygon
/// intersects.
#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Insertable)]
#[diesel(table_name = airports)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Airport {
    pub airport_hash: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub buffer_meters: f64,
    pub utm_epsg_zones: Vec<i32>,
    /// GeoJSON geometry, excluded from default typed queries — see
    /// `src/schema.rs` and DESIGN.md.
    pub geometry: serde_json::Value,
}

impl Airport {
    pub fn centroid(&self) -> Option<geo::Point<f64>> {
        self.polygon().centroid()
    }

    pub fn polygon(&self) -> geo::Polygon<f64> {
        crate::geometry::polygon_from_geojson(&self.geometry)
            .unwrap_or_else(|| geo::Polygon::new(geo::LineString(vec![]), vec![]))
    }
}

/// Parses an airport coordinate formatted like the source's bootstrap JSON
/// list, e.g. `"-33.0000(S)"` (spec.md §6 "Filesystem inputs").
pub fn parse_bootstrap_coordinate(raw: &str) -> anyhow::Result<f64> {
    let trimmed = raw.trim().trim_end_matches(')');
    let (number, hemisphere) = trimmed
        .strip_suffix(['N', 'n'])
        .map(|n| (n, 1.0))
        .or_else(|| trimmed.strip_suffix(['S', 's']).map(|n| (n, -1.0)))
        .or_else(|| trimmed.strip_suffix(['E', 'e']).map(|n| (n, 1.0)))
        .or_else(|| trimmed.strip_suffix(['W', 'w']).map(|n| (n, -1.0)))
        .ok_or_else(|| anyhow::anyhow!("unrecognised coordinate format: {raw}"))?;
    let number: f64 = number.trim_end_matches('(').parse()?;
    Ok(number.abs() * hemisphere)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bootstrap_southern_coordinate() {
        assert_eq!(parse_bootstrap_coordinate("-33.0000(S)").unwrap(), -33.0);
    }

    #[test]
    fn parses_bootstrap_eastern_coordinate() {
        assert_eq!(parse_bootstrap_coordinate("151.0000(E)").unwrap(), 151.0);
    }

    #[test]
    fn hash_is_stable() {
        let a = airport_hash("Bankstown", -33.9243, 150.9888);
        let b = airport_hash("Bankstown", -33.9243, 150.9888);
        assert_eq!(a, b);
    }
}
