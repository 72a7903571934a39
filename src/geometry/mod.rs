//! Geometry Services (C2, spec.md §4.1): coordinate transforms, UTM zone
//! derivation, point-in-polygon, polygon intersection, nearest-in-index,
//! and R-tree indexing.

pub mod crs;
pub mod rtree;

pub use crs::{transform, utm_zone};

use geo::{Centroid, Contains, Coord, LineString, MultiPolygon, Point, Polygon};

use crate::error::DomainError;

/// `contains(polygon, point) -> bool` (spec.md §4.1).
pub fn contains(polygon: &MultiPolygon<f64>, point: Point<f64>) -> bool {
    polygon.contains(&point)
}

/// `intersects(polygon, polygon) -> bool` (spec.md §4.1).
pub fn intersects(a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> bool {
    use geo::Intersects;
    a.intersects(b)
}

/// Buffers a point by `radius_meters` into an approximating polygon (used
/// to derive an Airport's stored polygon from its coordinate, spec.md §3).
/// Approximated as a 32-gon, which is accurate enough at airport scale for
/// the containment/intersection tests this polygon is used for.
pub fn buffer_point(center: Point<f64>, radius_meters: f64) -> Polygon<f64> {
    const SEGMENTS: usize = 32;
    let coords: Vec<Coord<f64>> = (0..=SEGMENTS)
        .map(|i| {
            let theta = (i as f64) / (SEGMENTS as f64) * std::f64::consts::TAU;
            Coord {
                x: center.x() + radius_meters * theta.cos(),
                y: center.y() + radius_meters * theta.sin(),
            }
        })
        .collect();
    Polygon::new(LineString(coords), vec![])
}

/// Parses a GeoJSON `Polygon` geometry object into a `geo::Polygon`.
/// Geometry is stored as GeoJSON (`serde_json::Value`) rather than a
/// native PostGIS diesel type — see `src/schema.rs` and DESIGN.md.
pub fn polygon_from_geojson(value: &serde_json::Value) -> Option<Polygon<f64>> {
    let rings = value.get("coordinates")?.as_array()?;
    let mut rings_iter = rings.iter();
    let exterior = ring_from_json(rings_iter.next()?)?;
    let interiors = rings_iter.filter_map(ring_from_json).collect();
    Some(Polygon::new(exterior, interiors))
}

/// Parses a GeoJSON `MultiPolygon` geometry object into a
/// `geo::MultiPolygon`.
pub fn multi_polygon_from_geojson(value: &serde_json::Value) -> Option<MultiPolygon<f64>> {
    let polygons = value.get("coordinates")?.as_array()?;
    let parsed = polygons
        .iter()
        .filter_map(|polygon_coords| {
            let mut rings_iter = polygon_coords.as_array()?.iter();
            let exterior = ring_from_json(rings_iter.next()?)?;
            let interiors = rings_iter.filter_map(ring_from_json).collect();
            Some(Polygon::new(exterior, interiors))
        })
        .collect();
    Some(MultiPolygon(parsed))
}

fn ring_from_json(ring: &serde_json::Value) -> Option<LineString<f64>> {
    let coords = ring
        .as_array()?
        .iter()
        .filter_map(|pair| {
            let pair = pair.as_array()?;
            Some(Coord {
                x: pair.first()?.as_f64()?,
                y: pair.get(1)?.as_f64()?,
            })
        })
        .collect();
    Some(LineString(coords))
}

/// Serializes a `geo::Polygon` to a GeoJSON geometry value.
pub fn polygon_to_geojson(polygon: &Polygon<f64>) -> serde_json::Value {
    let ring_to_json = |ring: &LineString<f64>| -> serde_json::Value {
        serde_json::Value::Array(ring.coords().map(|c| serde_json::json!([c.x, c.y])).collect())
    };
    let mut rings = vec![ring_to_json(polygon.exterior())];
    rings.extend(polygon.interiors().iter().map(ring_to_json));
    serde_json::json!({ "type": "Polygon", "coordinates": rings })
}

/// Computes the centroid of a polygon, failing with [`DomainError::InvalidCrs`]
/// if the polygon carries no coordinates (degenerate input).
pub fn centroid_or_invalid(polygon: &Polygon<f64>) -> Result<Point<f64>, DomainError> {
    polygon.centroid().ok_or(DomainError::InvalidCrs("degenerate polygon has no centroid"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geojson_polygon_round_trips() {
        let polygon = buffer_point(Point::new(151.0, -33.0), 1000.0);
        let json = polygon_to_geojson(&polygon);
        let parsed = polygon_from_geojson(&json).unwrap();
        assert_eq!(parsed.exterior().coords().count(), polygon.exterior().coords().count());
    }

    #[test]
    fn buffered_point_contains_its_center() {
        let center = Point::new(151.0, -33.0);
        let polygon = buffer_point(center, 1000.0);
        assert!(polygon.contains(&center));
    }
}
