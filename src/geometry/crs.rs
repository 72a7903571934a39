//! Coordinate transforms between EPSG:4326 and a single configured
//! projected CRS (spec.md §4.1). No generic reprojection crate is pulled
//! in: the transform contract is narrow (WGS84 <-> one configured
//! projected CRS), so it is implemented directly as an Albers-style
//! equal-area transform parameterised by the destination EPSG's standard
//! parallels, the way the teacher hand-rolls its own distance/spline math
//! in `geometry/spline.rs` rather than reaching for a geodesy crate.

use crate::error::DomainError;
use geo::Point;

/// Standard parallels and origin for a projected CRS. EPSG:3112
/// (GDA94 / Geoscience Australia Lambert) is the only one wired up by
/// default; other EPSG codes can be added here as deployments require.
#[derive(Debug, Clone, Copy)]
struct LambertParams {
    origin_lon: f64,
    origin_lat: f64,
    standard_parallel_1: f64,
    standard_parallel_2: f64,
}

const EARTH_RADIUS_M: f64 = 6_371_000.0;

fn params_for_epsg(epsg: i32) -> Option<LambertParams> {
    match epsg {
        3112 => Some(LambertParams {
            origin_lon: 134.0,
            origin_lat: 0.0,
            standard_parallel_1: -18.0,
            standard_parallel_2: -36.0,
        }),
        _ => None,
    }
}

/// Transforms a point between EPSG:4326 (lon, lat in degrees) and the
/// given projected EPSG. Fails with [`DomainError::InvalidCrs`] if either
/// side names an EPSG this deployment hasn't configured.
pub fn transform(point: Point<f64>, src_epsg: i32, dst_epsg: i32) -> Result<Point<f64>, DomainError> {
    match (src_epsg, dst_epsg) {
        (4326, dst) => to_projected(point, dst),
        (src, 4326) => to_geographic(point, src),
        _ => Err(DomainError::InvalidCrs("unsupported transform pair")),
    }
}

fn to_projected(point: Point<f64>, dst_epsg: i32) -> Result<Point<f64>, DomainError> {
    let params = params_for_epsg(dst_epsg).ok_or(DomainError::InvalidCrs("unconfigured projected CRS"))?;
    let lon = point.x().to_radians();
    let lat = point.y().to_radians();
    let lon0 = params.origin_lon.to_radians();
    let lat0 = params.origin_lat.to_radians();
    let phi1 = params.standard_parallel_1.to_radians();
    let phi2 = params.standard_parallel_2.to_radians();

    let n = (phi1.sin() + phi2.sin()) / 2.0;
    let c = phi1.cos().powi(2) + 2.0 * n * phi1.sin();
    let rho0 = (EARTH_RADIUS_M / n) * (c - 2.0 * n * lat0.sin()).sqrt();
    let rho = (EARTH_RADIUS_M / n) * (c - 2.0 * n * lat.sin()).sqrt();
    let theta = n * (lon - lon0);

    let x = rho * theta.sin();
    let y = rho0 - rho * theta.cos();
    Ok(Point::new(x, y))
}

fn to_geographic(point: Point<f64>, src_epsg: i32) -> Result<Point<f64>, DomainError> {
    let params = params_for_epsg(src_epsg).ok_or(DomainError::InvalidCrs("unconfigured projected CRS"))?;
    let lon0 = params.origin_lon.to_radians();
    let lat0 = params.origin_lat.to_radians();
    let phi1 = params.standard_parallel_1.to_radians();
    let phi2 = params.standard_parallel_2.to_radians();

    let n = (phi1.sin() + phi2.sin()) / 2.0;
    let c = phi1.cos().powi(2) + 2.0 * n * phi1.sin();
    let rho0 = (EARTH_RADIUS_M / n) * (c - 2.0 * n * lat0.sin()).sqrt();

    // Snyder's Albers inverse needs both atan2 arguments carrying the sign
    // of `n` (negative for southern-hemisphere standard parallels), or the
    // recovered longitude lands a half-turn away from the original.
    let sign = n.signum();
    let rho = sign * (point.x().powi(2) + (rho0 - point.y()).powi(2)).sqrt();
    let theta = (sign * point.x()).atan2(sign * (rho0 - point.y()));

    let lon = lon0 + theta / n;
    let sin_lat = ((c - (rho * n / EARTH_RADIUS_M).powi(2)) / (2.0 * n)).clamp(-1.0, 1.0);
    let lat = sin_lat.asin();

    Ok(Point::new(lon.to_degrees(), lat.to_degrees()))
}

/// UTM-style EPSG zone key from a geographic point (spec.md §4.1):
/// `32700 − round((45+lat)/90)·100 + round((183+lon)/6)`.
pub fn utm_zone(lon: f64, lat: f64) -> i32 {
    32700 - ((45.0 + lat) / 90.0).round() as i32 * 100 + ((183.0 + lon) / 6.0).round() as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utm_zone_matches_reference_formula_for_sydney() {
        // Sydney: -33.8688, 151.2093 -> EPSG 32756
        let zone = utm_zone(151.2093, -33.8688);
        assert_eq!(zone, 32756);
    }

    #[test]
    fn transform_roundtrips_within_tolerance() {
        let original = Point::new(151.2093, -33.8688);
        let projected = transform(original, 4326, 3112).unwrap();
        let back = transform(projected, 3112, 4326).unwrap();
        assert!((back.x() - original.x()).abs() < 1e-3);
        assert!((back.y() - original.y()).abs() < 1e-3);
    }

    #[test]
    fn transform_rejects_unconfigured_crs() {
        let original = Point::new(151.2093, -33.8688);
        assert!(transform(original, 4326, 9999).is_err());
    }
}
